//! Vertices of a periodic triangulation.
//!
//! A [`Vertex`] is one equivalence class of points under the lattice of
//! domain translations. It stores the canonical in-domain representative, a
//! UUID that identifies it across serialization, and one incident cell per
//! materialized copy: a single entry in the one-sheet covering, 27 entries in
//! the three-sheet covering (indexed by [`Offset::copy_index`]).
//!
//! # Examples
//!
//! ```rust
//! use periodic_delaunay::core::vertex::VertexBuilder;
//! use periodic_delaunay::geometry::point::Point;
//!
//! let vertex = VertexBuilder::default()
//!     .point(Point::new([0.25, 0.5, 0.75]))
//!     .build()
//!     .unwrap();
//! assert!(vertex.is_valid().is_ok());
//! assert!(vertex.incident_cells().is_empty());
//! ```
//!
//! [`Offset::copy_index`]: crate::geometry::offset::Offset::copy_index

#![forbid(unsafe_code)]

use thiserror::Error;
use uuid::Uuid;

use super::triangulation_data_structure::CellKey;
use super::util::{UuidValidationError, make_uuid, validate_uuid};
use crate::geometry::point::Point;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur during vertex validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum VertexValidationError {
    /// The point has a NaN or infinite coordinate.
    #[error("Vertex point {point} is not finite")]
    NonFinitePoint {
        /// The offending point.
        point: Point,
    },
    /// The vertex UUID is invalid.
    #[error("Invalid UUID: {source}")]
    InvalidUuid {
        /// The underlying UUID validation error.
        #[from]
        source: UuidValidationError,
    },
}

// =============================================================================
// VERTEX STRUCT DEFINITION
// =============================================================================

/// A vertex of the periodic triangulation.
///
/// # Properties
///
/// - **`point`**: the canonical representative, inside the domain once stored
/// - **`uuid`**: auto-generated external identity
/// - **`incident_cells`**: one cell per materialized copy, managed by the TDS
#[derive(Builder, Clone, Debug)]
pub struct Vertex {
    /// Canonical in-domain point.
    point: Point,
    /// A universally unique identifier for the vertex.
    #[builder(setter(skip), default = "make_uuid()")]
    uuid: Uuid,
    /// Incident cell of each materialized copy, by copy index.
    ///
    /// Not serialized: `CellKey`s are only valid within the current storage
    /// map and are rebuilt with `Tds::assign_incident_cells`.
    #[builder(setter(skip), default)]
    pub(crate) incident_cells: Vec<Option<CellKey>>,
}

impl Vertex {
    /// Create a vertex with a fresh UUID.
    #[must_use]
    pub fn new(point: Point) -> Self {
        Self {
            point,
            uuid: make_uuid(),
            incident_cells: Vec::new(),
        }
    }

    /// Create a vertex with a given UUID (used when deserializing).
    #[must_use]
    pub const fn new_with_uuid(point: Point, uuid: Uuid) -> Self {
        Self {
            point,
            uuid,
            incident_cells: Vec::new(),
        }
    }

    /// The canonical point.
    #[inline]
    #[must_use]
    pub const fn point(&self) -> &Point {
        &self.point
    }

    /// The vertex UUID.
    #[inline]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The incident cell of every materialized copy, by copy index.
    #[inline]
    #[must_use]
    pub fn incident_cells(&self) -> &[Option<CellKey>] {
        &self.incident_cells
    }

    /// The incident cell of copy `copy`.
    #[inline]
    #[must_use]
    pub fn incident_cell(&self, copy: usize) -> Option<CellKey> {
        self.incident_cells.get(copy).copied().flatten()
    }

    pub(crate) const fn set_point(&mut self, point: Point) {
        self.point = point;
    }

    pub(crate) fn set_incident_cell(&mut self, copy: usize, cell: CellKey) {
        if let Some(slot) = self.incident_cells.get_mut(copy) {
            *slot = Some(cell);
        }
    }

    pub(crate) fn reset_incident_cells(&mut self, copies: usize) {
        self.incident_cells.clear();
        self.incident_cells.resize(copies, None);
    }

    /// Check the point and the UUID.
    ///
    /// # Errors
    ///
    /// Returns [`VertexValidationError`] for a non-finite point or an invalid
    /// UUID. Incident cells are checked by the TDS, which owns the cells.
    pub fn is_valid(&self) -> Result<(), VertexValidationError> {
        if !self.point.is_finite() {
            return Err(VertexValidationError::NonFinitePoint { point: self.point });
        }
        validate_uuid(&self.uuid)?;
        Ok(())
    }
}
