//! Fluent builder for [`PeriodicDelaunayTriangulation`].
//!
//! [`PeriodicDelaunayTriangulationBuilder`] gathers the domain, kernel and
//! [`ConstructionOptions`] behind one composable API.
//!
//! | Situation | Recommended API |
//! |---|---|
//! | Unit cube, default options | [`PeriodicDelaunayTriangulation::from_points`] |
//! | Custom domain, options or kernel | [`PeriodicDelaunayTriangulationBuilder`] |
//!
//! # Examples
//!
//! ```rust
//! use periodic_delaunay::core::builder::PeriodicDelaunayTriangulationBuilder;
//! use periodic_delaunay::core::periodic_delaunay_triangulation::ConstructionOptionsBuilder;
//! use periodic_delaunay::geometry::domain::Domain;
//! use periodic_delaunay::geometry::kernel::FastKernel;
//! use periodic_delaunay::geometry::point::Point;
//!
//! let points = vec![
//!     Point::new([0.5, 1.0, 1.5]),
//!     Point::new([1.5, 0.25, 0.5]),
//!     Point::new([2.5, 1.75, 1.0]),
//! ];
//! let options = ConstructionOptionsBuilder::default()
//!     .max_walk_steps(500)
//!     .build()
//!     .unwrap();
//!
//! let dt = PeriodicDelaunayTriangulationBuilder::new(&points)
//!     .domain(Domain::new([0.0; 3], [3.0, 2.0, 2.0]).unwrap())
//!     .kernel(FastKernel::new())
//!     .options(options)
//!     .large_point_set(true)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(dt.number_of_vertices(), 3);
//! assert_eq!(dt.options().max_walk_steps(), 500);
//! ```

#![forbid(unsafe_code)]

use crate::core::algorithms::insertion::InsertionError;
use crate::core::periodic_delaunay_triangulation::{
    ConstructionOptions, PeriodicDelaunayTriangulation,
};
use crate::geometry::domain::Domain;
use crate::geometry::kernel::{Kernel, RobustKernel};
use crate::geometry::point::Point;

/// Builder for [`PeriodicDelaunayTriangulation`].
///
/// # Type Parameters
///
/// - `'p`: Lifetime of the borrowed point slice.
/// - `K`: Predicate kernel; [`RobustKernel`] unless changed with
///   [`kernel`](Self::kernel).
#[derive(Clone, Debug)]
pub struct PeriodicDelaunayTriangulationBuilder<'p, K: Kernel = RobustKernel> {
    points: &'p [Point],
    domain: Domain,
    kernel: K,
    options: ConstructionOptions,
    /// Force Hilbert sorting regardless of the threshold.
    large_point_set: bool,
}

impl<'p> PeriodicDelaunayTriangulationBuilder<'p, RobustKernel> {
    /// A builder for `points` in the unit cube with the robust kernel.
    #[must_use]
    pub fn new(points: &'p [Point]) -> Self {
        Self {
            points,
            domain: Domain::unit_cube(),
            kernel: RobustKernel::new(),
            options: ConstructionOptions::default(),
            large_point_set: false,
        }
    }
}

impl<'p, K: Kernel> PeriodicDelaunayTriangulationBuilder<'p, K> {
    /// Use `domain` as the fundamental domain. Points outside it are wrapped.
    #[must_use]
    pub const fn domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    /// Evaluate predicates with `kernel`.
    #[must_use]
    pub fn kernel<K2: Kernel>(self, kernel: K2) -> PeriodicDelaunayTriangulationBuilder<'p, K2> {
        PeriodicDelaunayTriangulationBuilder {
            points: self.points,
            domain: self.domain,
            kernel,
            options: self.options,
            large_point_set: self.large_point_set,
        }
    }

    /// Construction options.
    #[must_use]
    pub const fn options(mut self, options: ConstructionOptions) -> Self {
        self.options = options;
        self
    }

    /// Hilbert-sort the points even below the configured threshold.
    #[must_use]
    pub const fn large_point_set(mut self, large_point_set: bool) -> Self {
        self.large_point_set = large_point_set;
        self
    }

    /// Build the triangulation.
    ///
    /// # Errors
    ///
    /// Returns [`InsertionError::NonFinitePoint`] if any point is not finite.
    pub fn build(self) -> Result<PeriodicDelaunayTriangulation<K>, InsertionError> {
        let mut dt = PeriodicDelaunayTriangulation::with_options(self.domain, self.kernel, self.options);
        dt.insert_range(self.points.iter().copied(), self.large_point_set)?;
        Ok(dt)
    }
}
