//! One-sheet / three-sheet covering management.
//!
//! A periodic triangulation is stored either as a single copy of every
//! vertex (the one-sheet covering) or as the 27 copies of a 3×3×3 block of
//! domains (the three-sheet covering). The one-sheet encoding is only a valid
//! simplicial complex when every circumsphere is small compared to the
//! domain: a cell is *oversized* when its squared circumradius reaches
//! `(min_extent / 4)²`. The three-sheet encoding is always valid for the
//! domains [`Domain`] accepts.
//!
//! [`CoveringManager::update`] runs after every mutation and switches between
//! the two encodings:
//!
//! - three sheets and no oversized cell: collapse to one sheet;
//! - one sheet and at least one oversized cell: expand to three sheets.
//!
//! Both transitions are complete when `update` returns and never change the
//! logical triangulation. Vertex keys survive; cell keys do not.
//!
//! [`Domain`]: crate::geometry::domain::Domain

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::cell::{Cell, normalize_offsets};
use super::collections::FastHashMap;
use super::triangulation_data_structure::{
    CellKey, CellSignature, Tds, TdsValidationError, VertexKey, cell_signature,
    signature_anchor_offset,
};
use crate::geometry::domain::Domain;
use crate::geometry::kernel::Kernel;
use crate::geometry::offset::Offset;
use crate::geometry::periodic::{PeriodicKernel, PeriodicPoint};

/// Relative safety margin applied to the oversized threshold.
pub const OVERSIZED_MARGIN: f64 = 1e-9;

/// Number of materialized domain copies per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoveringSheets {
    /// One copy of every vertex.
    One,
    /// A 3×3×3 block of copies.
    #[default]
    Three,
}

impl CoveringSheets {
    /// Sheets per axis.
    #[inline]
    #[must_use]
    pub const fn per_axis(self) -> i32 {
        match self {
            Self::One => 1,
            Self::Three => 3,
        }
    }

    /// Copies per vertex.
    #[inline]
    #[must_use]
    pub const fn copies(self) -> usize {
        match self {
            Self::One => 1,
            Self::Three => 27,
        }
    }

    /// Sheets on each axis, as reported by `number_of_sheets()`.
    #[inline]
    #[must_use]
    pub const fn as_array(self) -> [i32; 3] {
        let s = self.per_axis();
        [s, s, s]
    }
}

/// What [`CoveringManager::update`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoveringTransition {
    /// The covering was already appropriate.
    Unchanged,
    /// Collapsed from three sheets to one.
    Collapsed,
    /// Expanded from one sheet to three.
    Expanded,
    /// A collapse was due but the cell copies did not group into 27; the
    /// structure stays at three sheets.
    CollapseAbandoned,
}

/// Decides the oversized flag of cells and performs covering transitions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoveringManager {
    threshold_squared: f64,
}

impl CoveringManager {
    /// A manager for `domain`.
    #[must_use]
    pub fn new(domain: &Domain) -> Self {
        let quarter = domain.min_extent() / 4.0;
        Self {
            threshold_squared: quarter * quarter * (1.0 - OVERSIZED_MARGIN),
        }
    }

    /// Squared circumradius from which a cell is oversized.
    #[inline]
    #[must_use]
    pub const fn threshold_squared(&self) -> f64 {
        self.threshold_squared
    }

    /// Whether a squared circumradius is too large for one sheet.
    ///
    /// Non-finite radii (flat cells) are oversized.
    #[inline]
    #[must_use]
    pub fn is_oversized_radius(&self, squared_radius: f64) -> bool {
        !squared_radius.is_finite() || squared_radius >= self.threshold_squared
    }

    /// Oversized flag of the cell spanned by `points`.
    #[must_use]
    pub fn is_oversized<K: Kernel>(
        &self,
        kernel: &PeriodicKernel<K>,
        points: &[PeriodicPoint; 4],
    ) -> bool {
        self.is_oversized_radius(kernel.squared_circumradius(points))
    }

    /// Switch coverings if the oversized counter asks for it.
    ///
    /// # Errors
    ///
    /// Returns a [`TdsValidationError`] if an expansion cannot re-link the
    /// copied cells. A failed collapse is not an error: the structure stays
    /// at three sheets and [`CoveringTransition::CollapseAbandoned`] is
    /// returned.
    pub fn update(&self, tds: &mut Tds) -> Result<CoveringTransition, TdsValidationError> {
        if tds.number_of_stored_cells() == 0 {
            return Ok(CoveringTransition::Unchanged);
        }
        match (tds.sheets(), tds.number_of_oversized_cells()) {
            (CoveringSheets::Three, 0) => Ok(collapse(tds)),
            (CoveringSheets::One, n) if n > 0 => {
                expand(tds)?;
                Ok(CoveringTransition::Expanded)
            }
            _ => Ok(CoveringTransition::Unchanged),
        }
    }
}

/// Collapse three sheets into one; abandons with a warning if the stored
/// cells do not come in groups of 27 translated copies.
fn collapse(tds: &mut Tds) -> CoveringTransition {
    let mut groups: FastHashMap<CellSignature, (usize, Option<CellKey>)> = FastHashMap::default();
    for (key, cell) in tds.cells() {
        let entry = groups.entry(cell_signature(cell)).or_insert((0, None));
        entry.0 += 1;
        if signature_anchor_offset(cell).rem_euclid(3).is_zero() {
            entry.1 = Some(key);
        }
    }
    let malformed = groups
        .values()
        .filter(|(count, keep)| *count != 27 || keep.is_none())
        .count();
    if malformed > 0 {
        warn!(
            groups = groups.len(),
            malformed, "three-sheet cells do not group into 27 copies; staying at three sheets"
        );
        return CoveringTransition::CollapseAbandoned;
    }

    let kept: Vec<Cell> = groups
        .values()
        .filter_map(|(_, keep)| *keep)
        .filter_map(|key| tds.cell(key))
        .map(|cell| {
            Cell::new(
                *cell.vertices(),
                normalize_offsets(*cell.offsets(), 1),
                cell.is_oversized(),
            )
        })
        .collect();

    let mut candidate = tds.clone();
    candidate.set_sheets(CoveringSheets::One);
    candidate.clear_cells();
    for cell in kept {
        candidate.insert_cell(cell);
    }
    let relinked = candidate
        .assign_neighbors()
        .and_then(|()| candidate.assign_incident_cells());
    match relinked {
        Ok(()) => {
            debug!(
                cells = candidate.number_of_stored_cells(),
                "collapsed covering to one sheet"
            );
            *tds = candidate;
            CoveringTransition::Collapsed
        }
        Err(error) => {
            warn!(%error, "one-sheet candidate failed to link; staying at three sheets");
            CoveringTransition::CollapseAbandoned
        }
    }
}

/// Expand one sheet into three by materializing every cell at the 27 shifts.
pub(crate) fn expand(tds: &mut Tds) -> Result<(), TdsValidationError> {
    let cells: Vec<Cell> = tds.cells().map(|(_, c)| c.clone()).collect();
    tds.set_sheets(CoveringSheets::Three);
    tds.clear_cells();
    for cell in &cells {
        for shift in Offset::block(3) {
            let moved = cell.translated(shift);
            tds.insert_cell(Cell::new(
                *moved.vertices(),
                normalize_offsets(*moved.offsets(), 3),
                moved.is_oversized(),
            ));
        }
    }
    tds.assign_neighbors()?;
    tds.assign_incident_cells()?;
    debug!(
        cells = tds.number_of_stored_cells(),
        "expanded covering to three sheets"
    );
    Ok(())
}

/// Replace all cells by the three-sheet triangulation of a single vertex.
///
/// The 27 copies of the vertex form a cubic lattice on the 3×3×3 torus; each
/// lattice cube is split into six tetrahedra around its main diagonal. Every
/// cell is oversized.
pub(crate) fn build_single_vertex_covering(
    tds: &mut Tds,
    vertex: VertexKey,
) -> Result<(), TdsValidationError> {
    const AXIS: [Offset; 3] = [
        Offset::new(1, 0, 0),
        Offset::new(0, 1, 0),
        Offset::new(0, 0, 1),
    ];
    // (a, b, c) axis orders; odd permutations need two slots swapped.
    const ORDERS: [(usize, usize, bool); 6] = [
        (0, 1, false),
        (1, 2, false),
        (2, 0, false),
        (0, 2, true),
        (1, 0, true),
        (2, 1, true),
    ];

    tds.set_sheets(CoveringSheets::Three);
    tds.clear_cells();
    for corner in Offset::block(3) {
        for (a, b, odd) in ORDERS {
            let mut offsets = [
                corner,
                corner + AXIS[a],
                corner + AXIS[a] + AXIS[b],
                corner + Offset::new(1, 1, 1),
            ];
            if odd {
                offsets.swap(0, 1);
            }
            tds.insert_cell(Cell::new([vertex; 4], normalize_offsets(offsets, 3), true));
        }
    }
    tds.assign_neighbors()?;
    tds.assign_incident_cells()
}
