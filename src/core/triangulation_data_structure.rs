//! The periodic triangulation data structure.
//!
//! [`Tds`] owns the vertex and cell arenas of a triangulation of the flat
//! 3-torus and the covering state (one or three sheets per axis). It is
//! purely combinatorial apart from storing each vertex's canonical point:
//! predicates live in [`PeriodicKernel`], and the algorithms that need them
//! take both.
//!
//! # Periodic adjacency
//!
//! Adjacency is an offset-tagged graph rather than a wrap-around pointer
//! structure. A cell stores, per slot, a vertex key and a lattice offset, and
//! its four neighbors. Two neighbors see their shared facet in frames that
//! differ by a single lattice translation, the *neighbor translation*:
//!
//! ```text
//! offsets_c[k] = offsets_n[m] + t      for every matching slot pair (k, m)
//! ```
//!
//! In the three-sheet covering `t ≡ 0 (mod 3)`, so the copy a slot refers to
//! (`offset mod 3`) is preserved across neighbors.
//!
//! # Topological Invariants
//!
//! - **Facet Sharing Invariant**: every facet key appears in exactly two
//!   cells (there is no boundary on a torus).
//! - **Neighbor Consistency**: neighbor pointers are mutual and the shared
//!   facet agrees under one translation.
//! - **Vertex Incidence**: every materialized copy of a vertex has an
//!   incident cell containing it.
//! - **Oversized counter**: equals the number of cells flagged oversized.
//!
//! [`PeriodicKernel`]: crate::geometry::periodic::PeriodicKernel

#![forbid(unsafe_code)]

use slotmap::new_key_type;
use thiserror::Error;
use uuid::Uuid;

use super::cell::{Cell, CellValidationError, Node, normalize_offsets};
use super::collections::{
    CellKeySet, FastHashMap, FastHashSet, SmallBuffer, StorageMap, VertexKeySet,
};
use super::covering::CoveringSheets;
use super::facet::VERTEX_TRIPLES;
use super::vertex::{Vertex, VertexValidationError};
use crate::geometry::offset::Offset;
use crate::geometry::periodic::PeriodicPoint;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors found by structural validation of a [`Tds`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TdsValidationError {
    /// A vertex failed its own validation.
    #[error("Invalid vertex {vertex_id}: {source}")]
    InvalidVertex {
        /// The UUID of the invalid vertex.
        vertex_id: Uuid,
        /// The underlying vertex validation error.
        source: VertexValidationError,
    },
    /// A cell failed its own validation.
    #[error("Invalid cell {cell:?}: {source}")]
    InvalidCell {
        /// The key of the invalid cell.
        cell: CellKey,
        /// The underlying cell validation error.
        source: CellValidationError,
    },
    /// Neighbor relationships are invalid.
    #[error("Invalid neighbor relationships: {message}")]
    InvalidNeighbors {
        /// Description of the neighbor validation failure.
        message: String,
    },
    /// A facet is not shared by exactly two cells.
    #[error("Facet sharing violated: {message}")]
    FacetSharing {
        /// Description of the facet sharing failure.
        message: String,
    },
    /// A vertex copy has no (or a wrong) incident cell.
    #[error("Vertex incidence inconsistency: {message}")]
    IncidenceInconsistency {
        /// Description of the incidence failure.
        message: String,
    },
    /// The oversized-cell counter does not match the cell flags.
    #[error("Oversized cell counter is {counter} but {flagged} cells are flagged")]
    OversizedCounter {
        /// The stored counter.
        counter: usize,
        /// The number of flagged cells.
        flagged: usize,
    },
    /// Internal data structure inconsistency.
    #[error("Internal data structure inconsistency: {message}")]
    InconsistentDataStructure {
        /// Description of the inconsistency.
        message: String,
    },
}

// =============================================================================
// KEYS AND SIGNATURES
// =============================================================================

new_key_type! {
    /// Key type for accessing vertices in the storage map.
    ///
    /// Stable for the lifetime of the vertex, including across covering
    /// transitions and fallback rebuilds.
    pub struct VertexKey;
}

new_key_type! {
    /// Key type for accessing cells in the storage map.
    ///
    /// Cells are replaced wholesale by insertions, removals and covering
    /// transitions; do not keep a `CellKey` across a mutation.
    pub struct CellKey;
}

/// Translation-invariant identity of a facet in the current covering: its
/// three `(vertex, offset)` pairs after normalization, sorted.
pub type FacetKey = [(VertexKey, Offset); 3];

/// Translation-invariant identity of a cell: its four `(vertex, offset)`
/// pairs relative to the smallest pair, sorted.
///
/// All periodic copies of one logical cell share the same signature, in
/// either covering.
pub type CellSignature = [(VertexKey, Offset); 4];

/// Stored-edge identity, as [`FacetKey`] for two slots.
pub type EdgeKey = [(VertexKey, Offset); 2];

// =============================================================================
// TDS
// =============================================================================

/// Periodic triangulation data structure.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::core::covering::CoveringSheets;
/// use periodic_delaunay::core::triangulation_data_structure::Tds;
///
/// let tds = Tds::new();
/// assert_eq!(tds.sheets(), CoveringSheets::Three);
/// assert_eq!(tds.number_of_vertices(), 0);
/// assert!(tds.is_valid().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct Tds {
    /// Storage map for vertices.
    vertices: StorageMap<VertexKey, Vertex>,
    /// Storage map for cells.
    cells: StorageMap<CellKey, Cell>,
    /// Current covering.
    sheets: CoveringSheets,
    /// Number of cells with the oversized flag set.
    oversized_cells: usize,
}

impl Default for Tds {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ACCESSORS AND MUTATORS
// =============================================================================

impl Tds {
    /// An empty structure in the three-sheet covering.
    #[must_use]
    pub fn new() -> Self {
        Self {
            vertices: StorageMap::with_key(),
            cells: StorageMap::with_key(),
            sheets: CoveringSheets::Three,
            oversized_cells: 0,
        }
    }

    /// The current covering.
    #[inline]
    #[must_use]
    pub const fn sheets(&self) -> CoveringSheets {
        self.sheets
    }

    /// Sheets per axis: 1 or 3.
    #[inline]
    #[must_use]
    pub const fn sheet_count(&self) -> i32 {
        self.sheets.per_axis()
    }

    /// Materialized copies per vertex: 1 or 27.
    #[inline]
    #[must_use]
    pub const fn copies(&self) -> usize {
        self.sheets.copies()
    }

    pub(crate) const fn set_sheets(&mut self, sheets: CoveringSheets) {
        self.sheets = sheets;
    }

    /// Number of vertices (logical, not counting copies).
    #[must_use]
    pub fn number_of_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of materialized vertex copies.
    #[must_use]
    pub fn number_of_stored_vertices(&self) -> usize {
        self.vertices.len() * self.copies()
    }

    /// Number of stored cells.
    #[must_use]
    pub fn number_of_stored_cells(&self) -> usize {
        self.cells.len()
    }

    /// Number of stored facets; every facet is shared by two cells.
    #[must_use]
    pub fn number_of_stored_facets(&self) -> usize {
        self.cells.len() * 2
    }

    /// Number of distinct stored edges.
    #[must_use]
    pub fn number_of_stored_edges(&self) -> usize {
        let s = self.sheet_count();
        let mut edges: FastHashSet<EdgeKey> = FastHashSet::default();
        for cell in self.cells.values() {
            for i in 0..4 {
                for j in (i + 1)..4 {
                    edges.insert(edge_key(cell, i, j, s));
                }
            }
        }
        edges.len()
    }

    /// Number of cells flagged oversized.
    #[inline]
    #[must_use]
    pub const fn number_of_oversized_cells(&self) -> usize {
        self.oversized_cells
    }

    /// Iterate over vertices.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexKey, &Vertex)> {
        self.vertices.iter()
    }

    /// Iterate over vertex keys.
    pub fn vertex_keys(&self) -> impl Iterator<Item = VertexKey> + '_ {
        self.vertices.keys()
    }

    /// Iterate over stored cells.
    pub fn cells(&self) -> impl Iterator<Item = (CellKey, &Cell)> {
        self.cells.iter()
    }

    /// Iterate over stored cell keys.
    pub fn cell_keys(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.cells.keys()
    }

    /// A vertex by key.
    #[must_use]
    pub fn vertex(&self, key: VertexKey) -> Option<&Vertex> {
        self.vertices.get(key)
    }

    /// A cell by key.
    #[must_use]
    pub fn cell(&self, key: CellKey) -> Option<&Cell> {
        self.cells.get(key)
    }

    /// Whether `key` names a vertex.
    #[must_use]
    pub fn contains_vertex(&self, key: VertexKey) -> bool {
        self.vertices.contains_key(key)
    }

    /// Whether `key` names a cell.
    #[must_use]
    pub fn contains_cell(&self, key: CellKey) -> bool {
        self.cells.contains_key(key)
    }

    pub(crate) fn vertex_mut(&mut self, key: VertexKey) -> Option<&mut Vertex> {
        self.vertices.get_mut(key)
    }

    /// Store a vertex with empty incidence for the current covering.
    pub(crate) fn insert_vertex(&mut self, mut vertex: Vertex) -> VertexKey {
        vertex.reset_incident_cells(self.copies());
        self.vertices.insert(vertex)
    }

    pub(crate) fn remove_vertex(&mut self, key: VertexKey) -> Option<Vertex> {
        self.vertices.remove(key)
    }

    /// Store a cell and keep the oversized counter in step.
    pub(crate) fn insert_cell(&mut self, cell: Cell) -> CellKey {
        if cell.is_oversized() {
            self.oversized_cells += 1;
        }
        self.cells.insert(cell)
    }

    /// Remove a cell and keep the oversized counter in step.
    pub(crate) fn remove_cell(&mut self, key: CellKey) -> Option<Cell> {
        let cell = self.cells.remove(key)?;
        if cell.is_oversized() {
            self.oversized_cells = self.oversized_cells.saturating_sub(1);
        }
        Some(cell)
    }

    /// Drop every cell and vertex incidence.
    pub(crate) fn clear_cells(&mut self) {
        self.cells.clear();
        self.oversized_cells = 0;
        let copies = self.copies();
        for vertex in self.vertices.values_mut() {
            vertex.reset_incident_cells(copies);
        }
    }

    /// Drop everything and return to the empty three-sheet state.
    pub(crate) fn clear(&mut self) {
        self.cells.clear();
        self.vertices.clear();
        self.oversized_cells = 0;
        self.sheets = CoveringSheets::Three;
    }

    pub(crate) fn set_neighbor(&mut self, cell: CellKey, index: usize, neighbor: CellKey) {
        if let Some(c) = self.cells.get_mut(cell) {
            c.neighbors[index] = Some(neighbor);
        }
    }
}

// =============================================================================
// PERIODIC COMBINATORICS
// =============================================================================

/// Sorted `(vertex, offset)` pairs of `slots`, offsets normalized together.
fn sorted_pairs<const N: usize>(
    cell: &Cell,
    slots: [usize; N],
    sheets: i32,
) -> ([(VertexKey, Offset); N], [usize; N]) {
    let offsets = normalize_offsets(slots.map(|s| cell.offset(s)), sheets);
    let mut order: [usize; N] = std::array::from_fn(|k| k);
    order.sort_by_key(|&k| (cell.vertex(slots[k]), offsets[k]));
    (
        order.map(|k| (cell.vertex(slots[k]), offsets[k])),
        order.map(|k| slots[k]),
    )
}

fn edge_key(cell: &Cell, i: usize, j: usize, sheets: i32) -> EdgeKey {
    sorted_pairs(cell, [i, j], sheets).0
}

/// Translation-invariant signature of a cell.
#[must_use]
pub fn cell_signature(cell: &Cell) -> CellSignature {
    let anchor = (0..4)
        .min_by_key(|&i| (cell.vertex(i), cell.offset(i)))
        .unwrap_or(0);
    let base = cell.offset(anchor);
    let mut pairs: [(VertexKey, Offset); 4] =
        std::array::from_fn(|i| (cell.vertex(i), cell.offset(i) - base));
    pairs.sort_unstable();
    pairs
}

/// Offset of the slot [`cell_signature`] anchors on.
#[must_use]
pub fn signature_anchor_offset(cell: &Cell) -> Offset {
    (0..4)
        .map(|i| (cell.vertex(i), cell.offset(i)))
        .min()
        .map_or(Offset::ZERO, |(_, o)| o)
}

impl Tds {
    /// The node of slot `i` of `cell`.
    #[must_use]
    pub fn node(&self, cell: CellKey, i: usize) -> Option<Node> {
        Some(self.cells.get(cell)?.node(i, self.sheet_count()))
    }

    /// Canonical point and offset of slot `i` of `cell`.
    #[must_use]
    pub fn periodic_point(&self, cell: CellKey, i: usize) -> Option<PeriodicPoint> {
        let c = self.cells.get(cell)?;
        let v = self.vertices.get(c.vertex(i))?;
        Some((*v.point(), c.offset(i)))
    }

    /// The four periodic points of `cell`.
    #[must_use]
    pub fn periodic_points(&self, cell: CellKey) -> Option<[PeriodicPoint; 4]> {
        self.cells.get(cell).and_then(|c| self.periodic_points_of(c))
    }

    /// The four periodic points of a (possibly not yet stored) cell.
    #[must_use]
    pub fn periodic_points_of(&self, cell: &Cell) -> Option<[PeriodicPoint; 4]> {
        let mut out = [(crate::geometry::point::Point::default(), Offset::ZERO); 4];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = (*self.vertices.get(cell.vertex(i))?.point(), cell.offset(i));
        }
        Some(out)
    }

    /// Neighbor across the facet opposite slot `i`.
    #[must_use]
    pub fn neighbor(&self, cell: CellKey, i: usize) -> Option<CellKey> {
        self.cells.get(cell)?.neighbor(i)
    }

    /// Key of the facet of `cell` opposite slot `i`.
    #[must_use]
    pub fn facet_key(&self, cell: CellKey, i: usize) -> Option<FacetKey> {
        let c = self.cells.get(cell)?;
        Some(sorted_pairs(c, VERTEX_TRIPLES[i], self.sheet_count()).0)
    }

    /// Index in the neighbor of the slot opposite the shared facet.
    #[must_use]
    pub fn mirror_index(&self, cell: CellKey, i: usize) -> Option<usize> {
        let n = self.neighbor(cell, i)?;
        let key = self.facet_key(cell, i)?;
        let neighbor = self.cells.get(n)?;
        (0..4).find(|&j| {
            neighbor.neighbor(j) == Some(cell)
                && !(n == cell && j == i)
                && self.facet_key(n, j) == Some(key)
        })
    }

    /// Translation `t` with `offsets_c[k] = offsets_n[m] + t` on the facet
    /// shared with the neighbor opposite slot `i`.
    #[must_use]
    pub fn neighbor_translation(&self, cell: CellKey, i: usize) -> Option<Offset> {
        let n = self.neighbor(cell, i)?;
        let j = self.mirror_index(cell, i)?;
        self.translation_between(cell, i, n, j)
    }

    /// Translation between two cells sharing a facet, from matched slots.
    pub(crate) fn translation_between(
        &self,
        cell: CellKey,
        i: usize,
        neighbor: CellKey,
        j: usize,
    ) -> Option<Offset> {
        let s = self.sheet_count();
        let c = self.cells.get(cell)?;
        let n = self.cells.get(neighbor)?;
        let (_, cs) = sorted_pairs(c, VERTEX_TRIPLES[i], s);
        let (_, ns) = sorted_pairs(n, VERTEX_TRIPLES[j], s);
        Some(c.offset(cs[0]) - n.offset(ns[0]))
    }

    /// Rebuild all neighbor pointers from facet keys.
    ///
    /// # Errors
    ///
    /// Returns [`TdsValidationError::FacetSharing`] if a facet key does not
    /// occur exactly twice.
    pub fn assign_neighbors(&mut self) -> Result<(), TdsValidationError> {
        type FacetInfo = (CellKey, usize);
        let s = self.sheet_count();
        let mut facet_map: FastHashMap<FacetKey, SmallBuffer<FacetInfo, 2>> =
            FastHashMap::default();
        facet_map.reserve(self.cells.len() * 2);
        for (key, cell) in &self.cells {
            for i in 0..4 {
                let fk = sorted_pairs(cell, VERTEX_TRIPLES[i], s).0;
                facet_map.entry(fk).or_default().push((key, i));
            }
        }

        let mut updates: Vec<(CellKey, usize, CellKey)> = Vec::with_capacity(self.cells.len() * 4);
        for (fk, sharing) in &facet_map {
            if sharing.len() != 2 {
                return Err(TdsValidationError::FacetSharing {
                    message: format!("facet {fk:?} is shared by {} cells", sharing.len()),
                });
            }
            let (a, ia) = sharing[0];
            let (b, ib) = sharing[1];
            updates.push((a, ia, b));
            updates.push((b, ib, a));
        }
        for (cell, index, neighbor) in updates {
            self.set_neighbor(cell, index, neighbor);
        }
        Ok(())
    }

    /// Rebuild every vertex's per-copy incident cell.
    ///
    /// # Errors
    ///
    /// Returns [`TdsValidationError::InconsistentDataStructure`] if a cell
    /// refers to a missing vertex.
    pub fn assign_incident_cells(&mut self) -> Result<(), TdsValidationError> {
        let copies = self.copies();
        let s = self.sheet_count();
        for vertex in self.vertices.values_mut() {
            vertex.reset_incident_cells(copies);
        }
        for (key, cell) in &self.cells {
            for i in 0..4 {
                let vertex = self.vertices.get_mut(cell.vertex(i)).ok_or_else(|| {
                    TdsValidationError::InconsistentDataStructure {
                        message: format!(
                            "cell {key:?} refers to missing vertex {:?}",
                            cell.vertex(i)
                        ),
                    }
                })?;
                vertex.set_incident_cell(cell.offset(i).copy_index(s), key);
            }
        }
        Ok(())
    }

    /// All cells incident to the node `(vertex, copy)`.
    ///
    /// # Errors
    ///
    /// Returns [`TdsValidationError::IncidenceInconsistency`] if the copy has
    /// no incident cell or the incident cell does not contain it.
    pub fn star_of_node(
        &self,
        vertex: VertexKey,
        copy: usize,
    ) -> Result<Vec<CellKey>, TdsValidationError> {
        let s = self.sheet_count();
        let node = (vertex, Offset::from_copy_index(copy, s));
        let start = self
            .vertices
            .get(vertex)
            .and_then(|v| v.incident_cell(copy))
            .ok_or_else(|| TdsValidationError::IncidenceInconsistency {
                message: format!("copy {copy} of vertex {vertex:?} has no incident cell"),
            })?;

        let mut star = vec![start];
        let mut visited = CellKeySet::default();
        visited.insert(start);
        let mut cursor = 0;
        while cursor < star.len() {
            let key = star[cursor];
            cursor += 1;
            let cell = self.cells.get(key).ok_or_else(|| {
                TdsValidationError::InconsistentDataStructure {
                    message: format!("star walk reached missing cell {key:?}"),
                }
            })?;
            let Some(at) = cell.index_of_node(node, s) else {
                return Err(TdsValidationError::IncidenceInconsistency {
                    message: format!("cell {key:?} in the star of {node:?} does not contain it"),
                });
            };
            for j in (0..4).filter(|&j| j != at) {
                if let Some(n) = cell.neighbor(j)
                    && visited.insert(n)
                {
                    star.push(n);
                }
            }
        }
        Ok(star)
    }

    /// Vertices adjacent to `vertex` in the stored structure.
    #[must_use]
    pub fn adjacent_vertices(&self, vertex: VertexKey) -> VertexKeySet {
        let mut out = VertexKeySet::default();
        let copies = self.vertices.get(vertex).map_or(0, |v| v.incident_cells().len());
        for copy in 0..copies {
            if let Ok(star) = self.star_of_node(vertex, copy) {
                for key in star {
                    if let Some(cell) = self.cells.get(key) {
                        out.extend(cell.vertices().iter().copied().filter(|&v| v != vertex));
                    }
                }
            }
        }
        out
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

impl Tds {
    /// Run the structural checks of the module documentation.
    ///
    /// Geometric checks (orientation, Delaunay property, covering criterion)
    /// need a kernel and are run by the triangulation facade.
    ///
    /// # Errors
    ///
    /// Returns the first [`TdsValidationError`] found.
    pub fn is_valid(&self) -> Result<(), TdsValidationError> {
        if self.cells.is_empty() {
            if self.vertices.is_empty() {
                return Ok(());
            }
            return Err(TdsValidationError::InconsistentDataStructure {
                message: format!("{} vertices but no cells", self.vertices.len()),
            });
        }
        self.validate_vertices()?;
        self.validate_cells()?;
        self.validate_neighbors()?;
        self.validate_facet_sharing()?;
        self.validate_incidence()?;

        let flagged = self.cells.values().filter(|c| c.is_oversized()).count();
        if flagged != self.oversized_cells {
            return Err(TdsValidationError::OversizedCounter {
                counter: self.oversized_cells,
                flagged,
            });
        }
        Ok(())
    }

    fn validate_vertices(&self) -> Result<(), TdsValidationError> {
        for vertex in self.vertices.values() {
            vertex
                .is_valid()
                .map_err(|source| TdsValidationError::InvalidVertex {
                    vertex_id: vertex.uuid(),
                    source,
                })?;
        }
        Ok(())
    }

    fn validate_cells(&self) -> Result<(), TdsValidationError> {
        let s = self.sheet_count();
        for (key, cell) in &self.cells {
            cell.is_valid(s)
                .map_err(|source| TdsValidationError::InvalidCell { cell: key, source })?;
            for &v in cell.vertices() {
                if !self.vertices.contains_key(v) {
                    return Err(TdsValidationError::InconsistentDataStructure {
                        message: format!("cell {key:?} refers to missing vertex {v:?}"),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_neighbors(&self) -> Result<(), TdsValidationError> {
        let s = self.sheet_count();
        for (key, cell) in &self.cells {
            for i in 0..4 {
                let Some(n) = cell.neighbor(i) else {
                    return Err(TdsValidationError::InvalidNeighbors {
                        message: format!("cell {key:?} has no neighbor across facet {i}"),
                    });
                };
                if !self.cells.contains_key(n) {
                    return Err(TdsValidationError::InvalidNeighbors {
                        message: format!("cell {key:?} points to missing neighbor {n:?}"),
                    });
                }
                let Some(j) = self.mirror_index(key, i) else {
                    return Err(TdsValidationError::InvalidNeighbors {
                        message: format!(
                            "neighbor {n:?} of cell {key:?} across facet {i} does not point back through the same facet"
                        ),
                    });
                };
                let (Some(c), Some(nc)) = (self.cells.get(key), self.cells.get(n)) else {
                    continue;
                };
                let (_, cs) = sorted_pairs(c, VERTEX_TRIPLES[i], s);
                let (_, ns) = sorted_pairs(nc, VERTEX_TRIPLES[j], s);
                let t = c.offset(cs[0]) - nc.offset(ns[0]);
                for k in 0..3 {
                    if c.vertex(cs[k]) != nc.vertex(ns[k]) || c.offset(cs[k]) - nc.offset(ns[k]) != t
                    {
                        return Err(TdsValidationError::InvalidNeighbors {
                            message: format!(
                                "cells {key:?} and {n:?} do not agree on their shared facet under one translation"
                            ),
                        });
                    }
                }
                if !t.rem_euclid(s).is_zero() {
                    return Err(TdsValidationError::InvalidNeighbors {
                        message: format!(
                            "translation {t} between {key:?} and {n:?} is not a multiple of {s}"
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_facet_sharing(&self) -> Result<(), TdsValidationError> {
        let s = self.sheet_count();
        let mut counts: FastHashMap<FacetKey, usize> = FastHashMap::default();
        for cell in self.cells.values() {
            for triple in VERTEX_TRIPLES {
                *counts.entry(sorted_pairs(cell, triple, s).0).or_default() += 1;
            }
        }
        if let Some((fk, n)) = counts.iter().find(|(_, n)| **n != 2) {
            return Err(TdsValidationError::FacetSharing {
                message: format!("facet {fk:?} is shared by {n} cells"),
            });
        }
        Ok(())
    }

    fn validate_incidence(&self) -> Result<(), TdsValidationError> {
        let s = self.sheet_count();
        let copies = self.copies();
        for (vk, vertex) in &self.vertices {
            if vertex.incident_cells().len() != copies {
                return Err(TdsValidationError::IncidenceInconsistency {
                    message: format!(
                        "vertex {vk:?} tracks {} copies, expected {copies}",
                        vertex.incident_cells().len()
                    ),
                });
            }
            for copy in 0..copies {
                let node = (vk, Offset::from_copy_index(copy, s));
                let ok = vertex
                    .incident_cell(copy)
                    .and_then(|c| self.cells.get(c))
                    .is_some_and(|c| c.index_of_node(node, s).is_some());
                if !ok {
                    return Err(TdsValidationError::IncidenceInconsistency {
                        message: format!("copy {copy} of vertex {vk:?} has no valid incident cell"),
                    });
                }
            }
        }
        Ok(())
    }
}
