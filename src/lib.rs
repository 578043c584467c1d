//! # periodic-delaunay
//!
//! This is a library for computing Delaunay triangulations of point sets on
//! the three-dimensional flat torus, inspired by the periodic triangulations
//! of [CGAL](https://www.cgal.org).
//!
//! # Features
//!
//! - Periodic 3D Delaunay triangulations in any cuboidal domain
//! - Incremental insertion, removal and relocation of points
//! - Automatic switch between a one-sheet and a 27-sheet covering
//! - Exact predicates with a deterministic symbolic tie-break
//! - Nearest-vertex queries, conflict regions, Gabriel tests and Voronoi duals
//! - Serialization/Deserialization with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! ```rust
//! use periodic_delaunay::prelude::*;
//!
//! let mut dt = PeriodicDelaunayTriangulation::new();
//! for p in [
//!     [0.1, 0.2, 0.3],
//!     [0.6, 0.7, 0.8],
//!     [0.4, 0.9, 0.15],
//!     [0.85, 0.35, 0.55],
//! ] {
//!     dt.insert(Point::new(p)).unwrap();
//! }
//!
//! assert_eq!(dt.number_of_vertices(), 4);
//! // V - E + F - C = 0 on the three-torus.
//! assert_eq!(
//!     dt.number_of_vertices() + dt.number_of_facets(),
//!     dt.number_of_edges() + dt.number_of_cells()
//! );
//! assert!(dt.is_valid());
//! ```
//!
//! # Coverings
//!
//! Few or badly spread points cannot be triangulated on the torus directly:
//! some tetrahedra would wrap onto themselves. The triangulation then stores
//! a 3×3×3 block of copies of every point and reports only one copy of each
//! simplex. Once every circumsphere is smaller than a quarter of the shortest
//! domain side it collapses to a single sheet:
//!
//! ```rust
//! use periodic_delaunay::prelude::*;
//!
//! let mut dt = PeriodicDelaunayTriangulation::new();
//! dt.insert(Point::new([0.5, 0.5, 0.5])).unwrap();
//! assert_eq!(dt.number_of_sheets(), [3, 3, 3]);
//! assert_eq!(dt.number_of_cells(), 6);
//! assert_eq!(dt.number_of_stored_cells(), 162);
//! ```
//!
//! # Removal
//!
//! ```rust
//! use periodic_delaunay::prelude::*;
//!
//! let points = [
//!     Point::new([0.1, 0.2, 0.3]),
//!     Point::new([0.6, 0.7, 0.8]),
//!     Point::new([0.4, 0.9, 0.15]),
//! ];
//! let mut dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
//! let (key, _) = dt.vertices().next().unwrap();
//! dt.remove(key).unwrap();
//! assert_eq!(dt.number_of_vertices(), 2);
//! assert!(dt.is_valid());
//! ```

// Allow multiple crate versions due to transitive dependencies
#![expect(clippy::multiple_crate_versions)]
// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// The `core` module contains the periodic triangulation data structure and
/// the algorithms that build and query it.
///
/// It includes the `Tds` struct, the `Cell`, `Facet` and `Vertex`
/// components, the covering manager and the public
/// [`PeriodicDelaunayTriangulation`](core::periodic_delaunay_triangulation::PeriodicDelaunayTriangulation)
/// facade.
pub mod core {
    /// Triangulation algorithms for construction, maintenance, and querying
    pub mod algorithms {
        /// Bowyer-Watson insertion with frame-aware conflict regions
        pub mod insertion;
        /// Point location algorithms (facet walking)
        pub mod locate;
        /// Vertex removal by star retriangulation
        pub mod removal;
    }
    /// Fluent construction API
    pub mod builder;
    pub mod cell;
    /// High-performance collection types optimized for computational geometry
    pub mod collections;
    /// One-sheet / 27-sheet covering transitions
    pub mod covering;
    pub mod facet;
    /// Public periodic Delaunay triangulation
    pub mod periodic_delaunay_triangulation;
    /// Read-only queries: nearest vertex, Gabriel tests, duals
    pub mod query;
    /// JSON persistence through a data transfer object
    pub mod serialization;
    pub mod triangulation_data_structure;
    pub mod util;
    pub mod vertex;
    // Re-export the `core` modules.
    pub use cell::*;
    pub use covering::*;
    pub use facet::*;
    pub use periodic_delaunay_triangulation::*;
    pub use triangulation_data_structure::*;
    pub use vertex::*;
    // Note: collections module not re-exported here to avoid namespace pollution
    // Import specific types via prelude or use crate::core::collections::
}

/// Contains geometric types: points, lattice offsets, the periodic domain,
/// predicates and kernels.
///
/// Predicates on periodic points go through
/// [`PeriodicKernel`](geometry::periodic::PeriodicKernel), which lifts them by
/// their lattice offsets before calling the underlying
/// [`Kernel`](geometry::kernel::Kernel).
pub mod geometry {
    pub mod domain;
    /// Certified signs on lifted coordinates (ball filter, rational fallback)
    pub mod exact;
    /// Geometric kernel abstraction (CGAL-style)
    pub mod kernel;
    pub mod offset;
    pub mod periodic;
    pub mod point;
    pub mod predicates;
    /// Segments, triangles and tetrahedra in lifted coordinates
    pub mod primitives;
    /// Circumsphere and distance computations
    pub mod util;
    pub use domain::*;
    pub use offset::*;
    pub use periodic::*;
    pub use point::*;
    pub use predicates::*;
    pub use primitives::*;
}

/// A prelude module that re-exports commonly used types.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    // Re-export from core
    pub use crate::core::{
        algorithms::insertion::{ConflictCell, ConflictFacet, InsertionError},
        algorithms::locate::{LocateError, LocateType, Location},
        algorithms::removal::RemovalError,
        builder::PeriodicDelaunayTriangulationBuilder,
        cell::*,
        covering::*,
        facet::*,
        periodic_delaunay_triangulation::*,
        serialization::{SerializationError, TriangulationDto},
        triangulation_data_structure::*,
        vertex::*,
    };

    // Re-export commonly used collection types from core::collections
    pub use crate::core::collections::{FastHashMap, FastHashSet, SmallBuffer};

    // Re-export from geometry
    pub use crate::geometry::{
        domain::*, kernel::*, offset::*, periodic::*, point::*, predicates::*, primitives::*,
    };
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
