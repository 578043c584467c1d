//! Persistence of periodic triangulations.
//!
//! A triangulation is written as a [`TriangulationDto`]: the domain, the
//! covering, the vertices with their UUIDs, and the stored cells with vertex
//! and neighbor indices into those arrays. Reading validates everything and
//! never produces an invalid triangulation.
//!
//! # Examples
//!
//! ```rust
//! use periodic_delaunay::prelude::*;
//!
//! let points = [Point::new([0.1, 0.2, 0.3]), Point::new([0.6, 0.4, 0.8])];
//! let dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
//!
//! let mut buffer = Vec::new();
//! dt.write_to(&mut buffer).unwrap();
//! let restored = PeriodicDelaunayTriangulation::<RobustKernel>::read_from(buffer.as_slice()).unwrap();
//! assert!(dt == restored);
//! ```

#![forbid(unsafe_code)]

use std::io;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::core::cell::Cell;
use crate::core::collections::{FastHashMap, Uuid};
use crate::core::covering::{CoveringManager, CoveringSheets};
use crate::core::periodic_delaunay_triangulation::{
    ConstructionOptions, PeriodicDelaunayTriangulation,
};
use crate::core::triangulation_data_structure::{CellKey, Tds, VertexKey};
use crate::core::util::{UuidValidationError, validate_unique_uuids};
use crate::core::vertex::Vertex;
use crate::geometry::domain::Domain;
use crate::geometry::kernel::Kernel;
use crate::geometry::offset::Offset;
use crate::geometry::periodic::PeriodicKernel;
use crate::geometry::point::Point;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors raised while writing or reading a triangulation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerializationError {
    /// JSON encoding, decoding or the underlying I/O failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A vertex UUID is nil, not version 4, or repeated
    #[error("Invalid vertex UUID: {0}")]
    InvalidUuid(#[from] UuidValidationError),

    /// An index refers past the end of its array
    #[error("{what} index {index} out of range (length {len})")]
    IndexOutOfRange {
        /// Which array the index points into
        what: &'static str,
        /// The index
        index: usize,
        /// Length of the array
        len: usize,
    },

    /// The data does not describe a valid periodic Delaunay triangulation
    #[error("Structural violation: {message}")]
    StructuralViolation {
        /// What is wrong
        message: String,
    },
}

// =============================================================================
// DATA TRANSFER OBJECTS
// =============================================================================

/// A vertex as stored on disk.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VertexDto {
    /// Stable identity.
    pub uuid: Uuid,
    /// Canonical point inside the domain.
    pub point: Point,
}

/// A stored cell as written on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDto {
    /// Indices into [`TriangulationDto::vertices`].
    pub vertices: [usize; 4],
    /// Stored offsets.
    pub offsets: [Offset; 4],
    /// Indices into [`TriangulationDto::cells`].
    pub neighbors: [usize; 4],
}

/// Serialized form of a [`PeriodicDelaunayTriangulation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriangulationDto {
    /// Fundamental domain.
    pub domain: Domain,
    /// Covering of the stored cells.
    pub sheets: CoveringSheets,
    /// Vertices.
    pub vertices: Vec<VertexDto>,
    /// Stored cells, every copy included.
    pub cells: Vec<CellDto>,
}

fn violation(message: impl Into<String>) -> SerializationError {
    SerializationError::StructuralViolation {
        message: message.into(),
    }
}

fn checked_index(what: &'static str, index: usize, len: usize) -> Result<usize, SerializationError> {
    if index < len {
        Ok(index)
    } else {
        Err(SerializationError::IndexOutOfRange { what, index, len })
    }
}

// =============================================================================
// CONVERSION
// =============================================================================

impl<K: Kernel> PeriodicDelaunayTriangulation<K> {
    /// Snapshot as a data transfer object.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::StructuralViolation`] if a cell has a
    /// dangling vertex or neighbor, which only happens on a corrupted
    /// structure.
    pub fn to_dto(&self) -> Result<TriangulationDto, SerializationError> {
        let tds = self.tds();
        let vertex_index: FastHashMap<VertexKey, usize> =
            tds.vertex_keys().enumerate().map(|(i, k)| (k, i)).collect();
        let cell_index: FastHashMap<CellKey, usize> =
            tds.cell_keys().enumerate().map(|(i, k)| (k, i)).collect();

        let vertices = tds
            .vertices()
            .map(|(_, v)| VertexDto {
                uuid: v.uuid(),
                point: *v.point(),
            })
            .collect();

        let mut cells = Vec::with_capacity(tds.number_of_stored_cells());
        for (key, cell) in tds.cells() {
            let mut vertices = [0; 4];
            let mut neighbors = [0; 4];
            for i in 0..4 {
                vertices[i] = *vertex_index
                    .get(&cell.vertex(i))
                    .ok_or_else(|| violation(format!("cell {key:?} has a dangling vertex")))?;
                neighbors[i] = cell
                    .neighbor(i)
                    .and_then(|n| cell_index.get(&n).copied())
                    .ok_or_else(|| violation(format!("cell {key:?} has a dangling neighbor")))?;
            }
            cells.push(CellDto {
                vertices,
                offsets: *cell.offsets(),
                neighbors,
            });
        }

        Ok(TriangulationDto {
            domain: *self.domain(),
            sheets: tds.sheets(),
            vertices,
            cells,
        })
    }

    /// Rebuild and validate a triangulation from a data transfer object.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] for bad UUIDs or indices, and
    /// [`SerializationError::StructuralViolation`] if the result would not be
    /// a valid periodic Delaunay triangulation.
    pub fn from_dto(
        dto: &TriangulationDto,
        kernel: K,
        options: ConstructionOptions,
    ) -> Result<Self, SerializationError> {
        validate_unique_uuids(dto.vertices.iter().map(|v| &v.uuid))?;

        let kernel = PeriodicKernel::new(dto.domain, kernel);
        if dto.vertices.is_empty() {
            if !dto.cells.is_empty() {
                return Err(violation("cells without vertices"));
            }
            return Ok(Self::from_parts(Tds::new(), kernel, options));
        }

        let mut tds = Tds::new();
        tds.set_sheets(dto.sheets);
        let mut vertex_keys = Vec::with_capacity(dto.vertices.len());
        for v in &dto.vertices {
            if !dto.domain.contains(&v.point) {
                return Err(violation(format!("point {} lies outside the domain", v.point)));
            }
            vertex_keys.push(tds.insert_vertex(Vertex::new_with_uuid(v.point, v.uuid)));
        }

        let manager = CoveringManager::new(&dto.domain);
        let mut cell_keys = Vec::with_capacity(dto.cells.len());
        for c in &dto.cells {
            let mut vertices = [VertexKey::default(); 4];
            for (slot, &index) in vertices.iter_mut().zip(&c.vertices) {
                *slot = vertex_keys[checked_index("vertex", index, vertex_keys.len())?];
            }
            let candidate = Cell::new(vertices, c.offsets, false);
            let points = tds
                .periodic_points_of(&candidate)
                .ok_or_else(|| violation("cell references a missing vertex"))?;
            let oversized = manager.is_oversized(&kernel, &points);
            cell_keys.push(tds.insert_cell(Cell::new(vertices, c.offsets, oversized)));
        }

        tds.assign_neighbors()
            .map_err(|e| violation(format!("neighbors cannot be rebuilt: {e}")))?;
        for (c, &key) in dto.cells.iter().zip(&cell_keys) {
            for (i, &index) in c.neighbors.iter().enumerate() {
                let expected = cell_keys[checked_index("cell", index, cell_keys.len())?];
                if tds.neighbor(key, i) != Some(expected) {
                    return Err(violation(format!(
                        "neighbor {i} of cell {key:?} does not share its facet"
                    )));
                }
            }
        }
        tds.assign_incident_cells()
            .map_err(|e| violation(format!("incidence cannot be rebuilt: {e}")))?;

        let dt = Self::from_parts(tds, kernel, options);
        dt.validate().map_err(|e| violation(e.to_string()))?;
        Ok(dt)
    }

    /// Write as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::Json`] on encoding or I/O failure.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), SerializationError> {
        serde_json::to_writer(writer, &self.to_dto()?)?;
        Ok(())
    }
}

impl<K: Kernel + Default> PeriodicDelaunayTriangulation<K> {
    /// Read JSON written by [`write_to`](Self::write_to).
    ///
    /// # Errors
    ///
    /// See [`from_dto`](Self::from_dto).
    pub fn read_from<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let dto: TriangulationDto = serde_json::from_reader(reader)?;
        Self::from_dto(&dto, K::default(), ConstructionOptions::default())
    }
}

impl<K: Kernel> Serialize for PeriodicDelaunayTriangulation<K> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_dto()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

/// Kernels are stateless, so the kernel is rebuilt with `K::default()`.
impl<'de, K: Kernel + Default> Deserialize<'de> for PeriodicDelaunayTriangulation<K> {
    fn deserialize<De>(deserializer: De) -> Result<Self, De::Error>
    where
        De: Deserializer<'de>,
    {
        let dto = TriangulationDto::deserialize(deserializer)?;
        Self::from_dto(&dto, K::default(), ConstructionOptions::default())
            .map_err(serde::de::Error::custom)
    }
}
