//! Point location in a periodic triangulation.
//!
//! Implements a visibility walk on the lifted (infinite, periodic) Delaunay
//! triangulation. The walk keeps the query's *frame*: the lattice offset of
//! the query point expressed in the current cell's offsets. Crossing the
//! facet opposite slot `i` moves to the neighbor `n` and updates the frame by
//! the neighbor translation `t`, so the query stays at the same lifted
//! position:
//!
//! ```text
//! frame_n = frame_c - t      with offsets_c[k] = offsets_n[m] + t
//! ```
//!
//! Delaunay triangulations are acyclic for the visibility relation, so the
//! walk terminates; a step limit guards against corrupted input and falls
//! back to an exhaustive scan.
//!
//! # References
//!
//! - O. Devillers, S. Pion, and M. Teillaud, "Walking in a Triangulation",
//!   International Journal of Foundations of Computer Science, 2001.

use tracing::debug;

use crate::core::collections::SmallBuffer;
use crate::core::triangulation_data_structure::{CellKey, Tds, VertexKey};
use crate::geometry::kernel::Kernel;
use crate::geometry::offset::Offset;
use crate::geometry::periodic::PeriodicKernel;
use crate::geometry::point::Point;
use crate::geometry::predicates::Orientation;

/// Default safety limit on walk steps before the exhaustive fallback.
pub const DEFAULT_MAX_WALK_STEPS: usize = 10_000;

/// Where a located point lies relative to the returned cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocateType {
    /// Coincides with the vertex in this slot.
    Vertex(usize),
    /// On the edge between these two slots.
    Edge(usize, usize),
    /// On the facet opposite this slot.
    Facet(usize),
    /// Strictly inside the cell.
    Cell,
    /// The triangulation has no cells.
    Empty,
}

/// Result of point location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// The cell containing the point; `None` only for [`LocateType::Empty`].
    pub cell: Option<CellKey>,
    /// Lattice offset of the query point in the cell's frame.
    pub offset: Offset,
    /// Position of the point relative to the cell.
    pub locate_type: LocateType,
}

impl Location {
    /// Location in an empty triangulation.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            cell: None,
            offset: Offset::ZERO,
            locate_type: LocateType::Empty,
        }
    }

    /// The existing vertex the point coincides with, if any.
    #[must_use]
    pub fn vertex(&self, tds: &Tds) -> Option<VertexKey> {
        match self.locate_type {
            LocateType::Vertex(i) => Some(tds.cell(self.cell?)?.vertex(i)),
            _ => None,
        }
    }
}

/// Error during point location.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum LocateError {
    /// Triangulation has no cells
    #[error("Cannot locate in empty triangulation")]
    EmptyTriangulation,

    /// The query has a NaN or infinite coordinate
    #[error("Cannot locate non-finite point {point}")]
    NonFinitePoint {
        /// The rejected point
        point: Point,
    },

    /// Cell reference is invalid
    #[error("Invalid cell reference: {cell_key:?}")]
    InvalidCell {
        /// The invalid cell key
        cell_key: CellKey,
    },

    /// Neither the walk nor the exhaustive scan found a containing cell
    #[error("No cell contains the point after {steps} walk steps and a full scan")]
    NotFound {
        /// Number of walk steps taken
        steps: usize,
    },
}

/// Orientation of the cell with slot `i` replaced by the query.
fn facet_orientation<K: Kernel>(
    tds: &Tds,
    kernel: &PeriodicKernel<K>,
    cell_key: CellKey,
    facet_idx: usize,
    point: &Point,
    frame: Offset,
) -> Result<Orientation, LocateError> {
    let mut points = tds
        .periodic_points(cell_key)
        .ok_or(LocateError::InvalidCell { cell_key })?;
    points[facet_idx] = (*point, frame);
    Ok(kernel.orientation(&points))
}

/// Classify a point known to lie in the closed cell from its four facet
/// orientations.
fn classify(orientations: &[Orientation; 4]) -> LocateType {
    let zeros: SmallBuffer<usize, 4> = (0..4)
        .filter(|&i| orientations[i] == Orientation::DEGENERATE)
        .collect();
    let positive: SmallBuffer<usize, 4> = (0..4)
        .filter(|&i| orientations[i] == Orientation::POSITIVE)
        .collect();
    match zeros.len() {
        0 => LocateType::Cell,
        1 => LocateType::Facet(zeros[0]),
        2 => LocateType::Edge(positive[0], positive[1]),
        _ => LocateType::Vertex(positive.first().copied().unwrap_or(0)),
    }
}

/// Frame congruent to `copy` (modulo the sheet count) closest to slot 0 of
/// `cell`.
pub(crate) fn start_frame(tds: &Tds, cell: CellKey, copy: Offset) -> Offset {
    let s = tds.sheet_count();
    let anchor = tds.cell(cell).map_or(Offset::ZERO, |c| c.offset(0));
    let copy = copy.rem_euclid(s);
    copy + (anchor - copy + Offset::new(1, 1, 1)).div_euclid(s) * s
}

/// Locate copy `copy` of a canonical point.
///
/// In the one-sheet covering `copy` is ignored. In the three-sheet covering
/// the returned frame is congruent to `copy` modulo 3, so the located cell is
/// the one containing that particular copy.
///
/// # Errors
///
/// Returns [`LocateError::EmptyTriangulation`] if there are no cells, and
/// [`LocateError::NotFound`] if no cell contains the point (corrupted
/// structure).
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::core::algorithms::locate::{LocateType, locate};
/// use periodic_delaunay::prelude::*;
///
/// let mut dt = PeriodicDelaunayTriangulation::new();
/// dt.insert(Point::new([0.5, 0.5, 0.5])).unwrap();
/// let kernel = PeriodicKernel::default();
/// let location = locate(dt.tds(), &kernel, &Point::new([0.5, 0.5, 0.5]), Offset::ZERO, None, 100)
///     .unwrap();
/// assert!(matches!(location.locate_type, LocateType::Vertex(_)));
/// ```
pub fn locate<K: Kernel>(
    tds: &Tds,
    kernel: &PeriodicKernel<K>,
    point: &Point,
    copy: Offset,
    hint: Option<CellKey>,
    max_steps: usize,
) -> Result<Location, LocateError> {
    let start = match hint {
        Some(key) if tds.contains_cell(key) => key,
        _ => tds
            .cell_keys()
            .next()
            .ok_or(LocateError::EmptyTriangulation)?,
    };
    let frame = start_frame(tds, start, copy);
    walk(tds, kernel, point, start, frame, max_steps)
}

/// Visibility walk from `start` with the query at `frame` in `start`'s
/// offsets.
///
/// # Errors
///
/// See [`locate`].
pub fn walk<K: Kernel>(
    tds: &Tds,
    kernel: &PeriodicKernel<K>,
    point: &Point,
    start: CellKey,
    frame: Offset,
    max_steps: usize,
) -> Result<Location, LocateError> {
    if tds.number_of_stored_cells() == 0 {
        return Err(LocateError::EmptyTriangulation);
    }
    if !tds.contains_cell(start) {
        return Err(LocateError::InvalidCell { cell_key: start });
    }

    let mut current = start;
    let mut frame = frame;
    'walk: for _ in 0..max_steps {
        let mut orientations = [Orientation::POSITIVE; 4];
        for i in 0..4 {
            let o = facet_orientation(tds, kernel, current, i, point, frame)?;
            if o == Orientation::NEGATIVE {
                let next = tds
                    .neighbor(current, i)
                    .ok_or(LocateError::InvalidCell { cell_key: current })?;
                let t = tds
                    .neighbor_translation(current, i)
                    .ok_or(LocateError::InvalidCell { cell_key: current })?;
                current = next;
                frame -= t;
                continue 'walk;
            }
            orientations[i] = o;
        }
        return Ok(Location {
            cell: Some(current),
            offset: frame,
            locate_type: classify(&orientations),
        });
    }

    debug!(
        max_steps,
        "point location walk exhausted its step limit; scanning all cells"
    );
    scan(tds, kernel, point, frame.rem_euclid(tds.sheet_count()))
        .ok_or(LocateError::NotFound { steps: max_steps })
}

/// Test every cell in every frame congruent to `copy` that overlaps it.
fn scan<K: Kernel>(
    tds: &Tds,
    kernel: &PeriodicKernel<K>,
    point: &Point,
    copy: Offset,
) -> Option<Location> {
    let s = tds.sheet_count();
    for (key, cell) in tds.cells() {
        let lo = Offset::component_min(cell.offsets().iter().copied());
        let hi = -Offset::component_min(cell.offsets().iter().map(|o| -*o));
        let first = copy + (lo - copy).div_euclid(s) * s;
        let mut candidates = Vec::new();
        let mut x = first.get(0);
        while x <= hi.get(0) {
            let mut y = first.get(1);
            while y <= hi.get(1) {
                let mut z = first.get(2);
                while z <= hi.get(2) {
                    candidates.push(Offset::new(x, y, z));
                    z += s;
                }
                y += s;
            }
            x += s;
        }
        for frame in candidates {
            let mut orientations = [Orientation::POSITIVE; 4];
            let mut inside = true;
            for (i, slot) in orientations.iter_mut().enumerate() {
                let o = facet_orientation(tds, kernel, key, i, point, frame).ok()?;
                if o == Orientation::NEGATIVE {
                    inside = false;
                    break;
                }
                *slot = o;
            }
            if inside {
                return Some(Location {
                    cell: Some(key),
                    offset: frame,
                    locate_type: classify(&orientations),
                });
            }
        }
    }
    None
}
