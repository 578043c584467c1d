//! Facets and edges as views into cells.
//!
//! Neither is stored: a [`Facet`] is a cell plus the index of the opposite
//! slot, an [`Edge`] is a cell plus two slots. Both are `Copy` handles that
//! stay valid as long as the cell exists.

#![forbid(unsafe_code)]

use std::fmt;

use super::collections::FacetIndex;
use super::triangulation_data_structure::CellKey;

/// Slots of the facet opposite each slot, ordered so that the triple
/// followed by the opposite slot has the orientation of the cell.
///
/// For a positively oriented cell, a point `x` is on the cell's side of facet
/// `i` iff `(p[t0], p[t1], p[t2], x)` is positive, with `[t0, t1, t2] =
/// VERTEX_TRIPLES[i]`.
pub const VERTEX_TRIPLES: [[usize; 3]; 4] = [[1, 3, 2], [0, 2, 3], [0, 3, 1], [0, 1, 2]];

/// A facet: the triangle of `cell` opposite slot `index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Facet {
    cell: CellKey,
    index: FacetIndex,
}

impl Facet {
    /// Create a facet handle. `index` must be in `0..4`.
    #[must_use]
    pub const fn new(cell: CellKey, index: FacetIndex) -> Self {
        Self { cell, index }
    }

    /// Create a facet handle from a `usize` slot.
    #[must_use]
    pub fn from_slot(cell: CellKey, slot: usize) -> Self {
        Self::new(cell, FacetIndex::try_from(slot & 3).unwrap_or(0))
    }

    /// The cell.
    #[inline]
    #[must_use]
    pub const fn cell(&self) -> CellKey {
        self.cell
    }

    /// Index of the opposite slot.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> FacetIndex {
        self.index
    }

    /// Index of the opposite slot as `usize`.
    #[inline]
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.index as usize
    }

    /// The three slots of the facet, oriented as in [`VERTEX_TRIPLES`].
    #[inline]
    #[must_use]
    pub const fn vertex_slots(&self) -> [usize; 3] {
        VERTEX_TRIPLES[self.index as usize]
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Facet({:?}, {})", self.cell, self.index)
    }
}

/// An edge: the segment between slots `i` and `j` of `cell`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    cell: CellKey,
    i: FacetIndex,
    j: FacetIndex,
}

impl Edge {
    /// Create an edge handle. `i` and `j` must be distinct slots in `0..4`.
    #[must_use]
    pub const fn new(cell: CellKey, i: FacetIndex, j: FacetIndex) -> Self {
        Self { cell, i, j }
    }

    /// Create an edge handle from `usize` slots.
    #[must_use]
    pub fn from_slots(cell: CellKey, i: usize, j: usize) -> Self {
        Self::new(
            cell,
            FacetIndex::try_from(i & 3).unwrap_or(0),
            FacetIndex::try_from(j & 3).unwrap_or(0),
        )
    }

    /// The cell.
    #[inline]
    #[must_use]
    pub const fn cell(&self) -> CellKey {
        self.cell
    }

    /// The two slots.
    #[inline]
    #[must_use]
    pub const fn slots(&self) -> (usize, usize) {
        (self.i as usize, self.j as usize)
    }

    /// The two slots not on the edge, ordered so that
    /// `(i, j, k, l)` is an even permutation of `(0, 1, 2, 3)`.
    #[must_use]
    pub const fn opposite_slots(&self) -> (usize, usize) {
        let (i, j) = self.slots();
        let mut rest = [0_usize; 2];
        let mut n = 0;
        let mut s = 0;
        while s < 4 {
            if s != i && s != j {
                rest[n] = s;
                n += 1;
            }
            s += 1;
        }
        let (k, l) = (rest[0], rest[1]);
        if permutation_is_even([i, j, k, l]) {
            (k, l)
        } else {
            (l, k)
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edge({:?}, {}, {})", self.cell, self.i, self.j)
    }
}

const fn permutation_is_even(p: [usize; 4]) -> bool {
    let mut inversions = 0;
    let mut a = 0;
    while a < 4 {
        let mut b = a + 1;
        while b < 4 {
            if p[a] > p[b] {
                inversions += 1;
            }
            b += 1;
        }
        a += 1;
    }
    inversions % 2 == 0
}
