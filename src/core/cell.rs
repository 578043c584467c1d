//! Tetrahedral cells with periodic offsets.
//!
//! A [`Cell`] stores four vertex keys, the lattice offset of each vertex
//! slot, and the neighbor across the facet opposite each slot. The lifted
//! position of slot `i` is `point(vertices[i]) + offsets[i] ⊙ extent`; the
//! four lifted positions are always positively oriented.
//!
//! Offsets are stored normalized: with `S` sheets, every axis satisfies
//! `0 <= min_i offsets[i] < S` (see [`normalize_offsets`]). In the
//! three-sheet covering `offset mod 3` names the copy of the vertex a slot
//! refers to; in the one-sheet covering every slot refers to the only copy.

#![forbid(unsafe_code)]

use thiserror::Error;

use super::collections::FacetIndex;
use super::triangulation_data_structure::{CellKey, VertexKey};
use crate::geometry::offset::Offset;

/// A (vertex, copy) pair: the combinatorial identity of a cell slot.
///
/// Two slots denote the same node iff they have the same vertex key and the
/// same offset modulo the number of sheets.
pub type Node = (VertexKey, Offset);

/// Errors that can occur during cell validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CellValidationError {
    /// Two slots of the cell refer to the same node.
    #[error("Slots {first} and {second} refer to the same node")]
    DuplicateNode {
        /// First slot.
        first: usize,
        /// Second slot.
        second: usize,
    },
    /// The offsets are not normalized for the covering.
    #[error("Offsets {offsets:?} are not normalized for {sheets} sheet(s)")]
    UnnormalizedOffsets {
        /// The stored offsets.
        offsets: [Offset; 4],
        /// Sheets per axis.
        sheets: i32,
    },
    /// A neighbor pointer is missing.
    #[error("Missing neighbor across facet {facet}")]
    MissingNeighbor {
        /// Facet index.
        facet: FacetIndex,
    },
}

/// Subtract `S · floor(min / S)` per axis so the minimum offset lies in `[0, S)`.
///
/// ```rust
/// use periodic_delaunay::core::cell::normalize_offsets;
/// use periodic_delaunay::geometry::offset::Offset;
///
/// let o = [
///     Offset::new(-1, 3, 0),
///     Offset::new(0, 4, 1),
///     Offset::new(-1, 4, 0),
///     Offset::new(0, 3, 1),
/// ];
/// let n = normalize_offsets(o, 3);
/// assert_eq!(n[0], Offset::new(2, 0, 0));
/// assert_eq!(normalize_offsets(o, 1)[1], Offset::new(1, 1, 1));
/// ```
#[must_use]
pub fn normalize_offsets<const N: usize>(offsets: [Offset; N], sheets: i32) -> [Offset; N] {
    let min = Offset::component_min(offsets.iter().copied());
    let shift = min.div_euclid(sheets) * sheets;
    offsets.map(|o| o - shift)
}

/// Whether `offsets` already satisfy [`normalize_offsets`].
#[must_use]
pub fn offsets_are_normalized(offsets: &[Offset], sheets: i32) -> bool {
    let min = Offset::component_min(offsets.iter().copied());
    min.div_euclid(sheets).is_zero()
}

/// A positively oriented tetrahedron of the periodic triangulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    vertices: [VertexKey; 4],
    offsets: [Offset; 4],
    pub(crate) neighbors: [Option<CellKey>; 4],
    pub(crate) oversized: bool,
}

impl Cell {
    /// Create a cell without neighbors.
    #[must_use]
    pub const fn new(vertices: [VertexKey; 4], offsets: [Offset; 4], oversized: bool) -> Self {
        Self {
            vertices,
            offsets,
            neighbors: [None; 4],
            oversized,
        }
    }

    /// Vertex keys by slot.
    #[inline]
    #[must_use]
    pub const fn vertices(&self) -> &[VertexKey; 4] {
        &self.vertices
    }

    /// Vertex key of slot `i`.
    #[inline]
    #[must_use]
    pub const fn vertex(&self, i: usize) -> VertexKey {
        self.vertices[i]
    }

    /// Offsets by slot.
    #[inline]
    #[must_use]
    pub const fn offsets(&self) -> &[Offset; 4] {
        &self.offsets
    }

    /// Offset of slot `i`.
    #[inline]
    #[must_use]
    pub const fn offset(&self, i: usize) -> Offset {
        self.offsets[i]
    }

    /// Neighbors by opposite slot.
    #[inline]
    #[must_use]
    pub const fn neighbors(&self) -> &[Option<CellKey>; 4] {
        &self.neighbors
    }

    /// Neighbor across the facet opposite slot `i`.
    #[inline]
    #[must_use]
    pub const fn neighbor(&self, i: usize) -> Option<CellKey> {
        self.neighbors[i]
    }

    /// Whether the circumradius is too large for the one-sheet covering.
    #[inline]
    #[must_use]
    pub const fn is_oversized(&self) -> bool {
        self.oversized
    }

    /// Node of slot `i` for a covering with `sheets` sheets per axis.
    #[inline]
    #[must_use]
    pub const fn node(&self, i: usize, sheets: i32) -> Node {
        (self.vertices[i], self.offsets[i].rem_euclid(sheets))
    }

    /// Slot holding `node`, if any.
    #[must_use]
    pub fn index_of_node(&self, node: Node, sheets: i32) -> Option<usize> {
        (0..4).find(|&i| self.node(i, sheets) == node)
    }

    /// Whether any slot refers to `vertex`.
    #[must_use]
    pub fn contains_vertex(&self, vertex: VertexKey) -> bool {
        self.vertices.contains(&vertex)
    }

    /// Slot whose neighbor is `cell`, if any.
    #[must_use]
    pub fn index_of_neighbor(&self, cell: CellKey) -> Option<usize> {
        self.neighbors.iter().position(|n| *n == Some(cell))
    }

    /// The same cell translated by `shift` (neighbors cleared).
    #[must_use]
    pub fn translated(&self, shift: Offset) -> Self {
        Self::new(self.vertices, self.offsets.map(|o| o + shift), self.oversized)
    }

    /// Check slots and offsets for a covering with `sheets` sheets.
    ///
    /// # Errors
    ///
    /// Returns [`CellValidationError`] if two slots share a node, the offsets
    /// are not normalized, or a neighbor is missing.
    pub fn is_valid(&self, sheets: i32) -> Result<(), CellValidationError> {
        for first in 0..4 {
            for second in (first + 1)..4 {
                if self.node(first, sheets) == self.node(second, sheets) {
                    return Err(CellValidationError::DuplicateNode { first, second });
                }
            }
        }
        if !offsets_are_normalized(&self.offsets, sheets) {
            return Err(CellValidationError::UnnormalizedOffsets {
                offsets: self.offsets,
                sheets,
            });
        }
        if let Some(facet) = self.neighbors.iter().position(Option::is_none) {
            return Err(CellValidationError::MissingNeighbor {
                facet: FacetIndex::try_from(facet).unwrap_or(FacetIndex::MAX),
            });
        }
        Ok(())
    }
}
