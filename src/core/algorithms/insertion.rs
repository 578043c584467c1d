//! Incremental Bowyer–Watson insertion on the periodic structure.
//!
//! 1. Locate the point (facet walk with translation frames)
//! 2. Flood the conflict region from the located cell with the perturbed
//!    in-sphere test, remembering the query's frame in every cell
//! 3. Create one cell per boundary facet (the facet plus the new vertex)
//! 4. Wire the new cells to each other through their shared edges and to
//!    the outside through the recorded mirror index
//! 5. Remove the conflict cells and refresh vertex incidence
//!
//! In the three-sheet covering steps 1–5 run once for each of the 27 copies
//! of the point. In the one-sheet covering a conflict region that reaches a
//! cell in two different frames means the single copy is not enough; the
//! structure is expanded to three sheets and the insertion retried there.
//!
//! A failed insertion leaves the structure as it was: cavities are checked
//! before the first cell is touched, and a failure after some copies were
//! linked re-triangulates the other vertices without the new one.

use tracing::{debug, warn};

use crate::core::algorithms::locate::{LocateError, Location, locate, walk};
use crate::core::algorithms::removal::rebuild;
use crate::core::cell::{Cell, normalize_offsets};
use crate::core::collections::{
    CellKeyBuffer, FastHashMap, FastHashSet, KeyBasedCellMap, SmallBuffer,
};
use crate::core::covering::{
    CoveringManager, CoveringSheets, build_single_vertex_covering, expand,
};
use crate::core::facet::Facet;
use crate::core::triangulation_data_structure::{
    CellKey, EdgeKey, Tds, TdsValidationError, VertexKey,
};
use crate::core::vertex::Vertex;
use crate::geometry::kernel::Kernel;
use crate::geometry::offset::Offset;
use crate::geometry::periodic::PeriodicKernel;
use crate::geometry::point::Point;
use crate::geometry::predicates::InSphere;

// =============================================================================
// CONFLICT REGION
// =============================================================================

/// Error during conflict region finding.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictError {
    /// Starting cell is invalid
    #[error("Invalid starting cell: {cell_key:?}")]
    InvalidStartCell {
        /// The invalid cell key
        cell_key: CellKey,
    },

    /// The starting cell does not have the point inside its circumsphere
    #[error("Starting cell {cell_key:?} is not in conflict with the point")]
    StartNotInConflict {
        /// The starting cell key
        cell_key: CellKey,
    },

    /// A cell is in conflict in two different frames
    #[error("Conflict region overlaps itself at cell {cell_key:?}")]
    OverlappingRegion {
        /// The cell reached in two frames
        cell_key: CellKey,
    },

    /// Neighbor data is missing or not mutual
    #[error("Inconsistent neighbor across facet {facet} of cell {cell_key:?}")]
    InconsistentNeighbors {
        /// The cell
        cell_key: CellKey,
        /// The facet index
        facet: usize,
    },
}

/// A conflict cell together with the query's offset in its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConflictCell {
    /// The cell whose circumsphere contains the point.
    pub cell: CellKey,
    /// Lattice offset of the query point in the cell's frame.
    pub offset: Offset,
}

/// A facet together with the query's offset in its cell's frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConflictFacet {
    /// The facet, seen from a conflict cell.
    pub facet: Facet,
    /// Lattice offset of the query point in the facet cell's frame.
    pub offset: Offset,
}

/// A facet between a conflict cell and a cell outside the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryFacet {
    /// The facet, seen from its conflict cell.
    pub facet: Facet,
    /// Lattice offset of the query point in the conflict cell's frame.
    pub offset: Offset,
    /// The outside cell across the facet.
    pub outside: CellKey,
    /// Index in `outside` of the slot opposite the facet.
    pub mirror: usize,
}

/// The cells whose circumsphere contains a point, and the facets around and
/// inside them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictRegion {
    /// Conflict cells, in flood order.
    pub cells: Vec<ConflictCell>,
    /// Facets with exactly one side in conflict.
    pub boundary: Vec<BoundaryFacet>,
    /// Facets with both sides in conflict, each reported once.
    pub internal: Vec<ConflictFacet>,
}

fn perturbed_in_sphere<K: Kernel>(
    tds: &Tds,
    kernel: &PeriodicKernel<K>,
    cell_key: CellKey,
    point: &Point,
    offset: Offset,
) -> Result<InSphere, ConflictError> {
    let simplex = tds
        .periodic_points(cell_key)
        .ok_or(ConflictError::InvalidStartCell { cell_key })?;
    Ok(kernel.in_sphere_perturbed(&simplex, &(*point, offset)))
}

fn neighbor_step(
    tds: &Tds,
    cell_key: CellKey,
    facet: usize,
) -> Result<(CellKey, usize, Offset), ConflictError> {
    let err = ConflictError::InconsistentNeighbors { cell_key, facet };
    let n = tds.neighbor(cell_key, facet).ok_or_else(|| err.clone())?;
    let j = tds.mirror_index(cell_key, facet).ok_or_else(|| err.clone())?;
    let t = tds.translation_between(cell_key, facet, n, j).ok_or(err)?;
    Ok((n, j, t))
}

/// Find all cells whose circumsphere contains `point` at `offset` in the
/// frame of `start`.
///
/// Uses a depth-first flood from `start` with the symbolically perturbed
/// in-sphere test, so co-spherical configurations resolve deterministically
/// and every boundary facet separates exactly one conflict cell from one
/// non-conflict cell.
///
/// # Errors
///
/// Returns [`ConflictError::StartNotInConflict`] if `start` does not contain
/// the point in its circumsphere, and [`ConflictError::OverlappingRegion`]
/// if a cell is reached in two different frames (only possible in an unsafe
/// one-sheet state).
pub fn find_conflict_region<K: Kernel>(
    tds: &Tds,
    kernel: &PeriodicKernel<K>,
    point: &Point,
    offset: Offset,
    start: CellKey,
) -> Result<ConflictRegion, ConflictError> {
    if !tds.contains_cell(start) {
        return Err(ConflictError::InvalidStartCell { cell_key: start });
    }
    if perturbed_in_sphere(tds, kernel, start, point, offset)? != InSphere::INSIDE {
        return Err(ConflictError::StartNotInConflict { cell_key: start });
    }

    let mut conflict: KeyBasedCellMap<Offset> = KeyBasedCellMap::default();
    let mut region = ConflictRegion::default();
    let mut outside: FastHashSet<(CellKey, Offset)> = FastHashSet::default();
    let mut stack: Vec<(CellKey, Offset)> = vec![(start, offset)];

    while let Some((cell_key, frame)) = stack.pop() {
        match conflict.get(&cell_key) {
            Some(&seen) if seen == frame => continue,
            Some(_) => return Err(ConflictError::OverlappingRegion { cell_key }),
            None => {}
        }
        if outside.contains(&(cell_key, frame)) {
            continue;
        }
        if perturbed_in_sphere(tds, kernel, cell_key, point, frame)? != InSphere::INSIDE {
            outside.insert((cell_key, frame));
            continue;
        }
        conflict.insert(cell_key, frame);
        region.cells.push(ConflictCell {
            cell: cell_key,
            offset: frame,
        });
        for i in 0..4 {
            let (n, _, t) = neighbor_step(tds, cell_key, i)?;
            stack.push((n, frame - t));
        }
    }

    for cc in &region.cells {
        for i in 0..4 {
            let (n, j, t) = neighbor_step(tds, cc.cell, i)?;
            let frame_n = cc.offset - t;
            match conflict.get(&n) {
                Some(&seen) if seen != frame_n => {
                    return Err(ConflictError::OverlappingRegion { cell_key: n });
                }
                Some(_) => {
                    if (cc.cell, i) < (n, j) {
                        region.internal.push(ConflictFacet {
                            facet: Facet::from_slot(cc.cell, i),
                            offset: cc.offset,
                        });
                    }
                }
                None => region.boundary.push(BoundaryFacet {
                    facet: Facet::from_slot(cc.cell, i),
                    offset: cc.offset,
                    outside: n,
                    mirror: j,
                }),
            }
        }
    }
    Ok(region)
}

// =============================================================================
// INSERTION
// =============================================================================

/// Error during incremental insertion.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum InsertionError {
    /// The point has a NaN or infinite coordinate
    #[error("Cannot insert non-finite point {point}")]
    NonFinitePoint {
        /// The rejected point
        point: Point,
    },

    /// Conflict region finding failed
    #[error("Conflict region error: {0}")]
    ConflictRegion(#[from] ConflictError),

    /// Point location failed
    #[error("Location error: {0}")]
    Location(#[from] LocateError),

    /// Re-linking the structure failed
    #[error("Structure error: {0}")]
    Structure(#[from] TdsValidationError),

    /// Cavity filling failed
    #[error("Cavity filling failed: {message}")]
    CavityFilling {
        /// Error message
        message: String,
    },
}

/// What an insertion did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertionOutcome {
    /// A new vertex was created.
    Inserted(VertexKey),
    /// The point coincides with this existing vertex; nothing changed.
    Existing(VertexKey),
}

impl InsertionOutcome {
    /// The vertex at the inserted position.
    #[must_use]
    pub const fn vertex(self) -> VertexKey {
        match self {
            Self::Inserted(v) | Self::Existing(v) => v,
        }
    }

    /// Whether a vertex was created.
    #[must_use]
    pub const fn is_new(self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Fill the cavity of `region` with cells joining its boundary to `vertex`.
///
/// `vertex` must already be stored with `point` as its canonical point.
/// Returns the new cells.
///
/// # Errors
///
/// Returns [`InsertionError::CavityFilling`] if the cavity boundary is not a
/// closed surface; the structure is then unchanged.
pub fn fill_cavity<K: Kernel>(
    tds: &mut Tds,
    kernel: &PeriodicKernel<K>,
    manager: &CoveringManager,
    vertex: VertexKey,
    region: &ConflictRegion,
) -> Result<CellKeyBuffer, InsertionError> {
    let s = tds.sheet_count();
    let mut staged: Vec<(Cell, BoundaryFacet)> = Vec::with_capacity(region.boundary.len());
    let mut edges: FastHashMap<EdgeKey, SmallBuffer<(usize, usize), 2>> = FastHashMap::default();

    for (index, b) in region.boundary.iter().enumerate() {
        let source = tds
            .cell(b.facet.cell())
            .ok_or_else(|| InsertionError::CavityFilling {
                message: format!("boundary cell {:?} not found", b.facet.cell()),
            })?;
        let apex = b.facet.slot();
        let mut vertices = *source.vertices();
        let mut offsets = *source.offsets();
        vertices[apex] = vertex;
        offsets[apex] = b.offset;

        // Edges opposite each non-apex slot, relative to the new vertex.
        for k in (0..4).filter(|&k| k != apex) {
            let mut rest = (0..4).filter(|&x| x != apex && x != k);
            let (Some(a), Some(c)) = (rest.next(), rest.next()) else {
                continue;
            };
            let mut key = [
                (source.vertex(a), source.offset(a) - b.offset),
                (source.vertex(c), source.offset(c) - b.offset),
            ];
            key.sort_unstable();
            edges.entry(key).or_default().push((index, k));
        }

        let cell = Cell::new(vertices, normalize_offsets(offsets, s), false);
        let points = tds
            .periodic_points_of(&cell)
            .ok_or_else(|| InsertionError::CavityFilling {
                message: format!("new cell refers to a missing vertex: {:?}", cell.vertices()),
            })?;
        let oversized = manager.is_oversized(kernel, &points);
        staged.push((
            Cell::new(*cell.vertices(), *cell.offsets(), oversized),
            *b,
        ));
    }

    if let Some((key, sharing)) = edges.iter().find(|(_, sharing)| sharing.len() != 2) {
        return Err(InsertionError::CavityFilling {
            message: format!(
                "cavity edge {key:?} is shared by {} boundary facets",
                sharing.len()
            ),
        });
    }

    let mut new_cells = CellKeyBuffer::new();
    for (cell, b) in staged {
        let key = tds.insert_cell(cell);
        tds.set_neighbor(key, b.facet.slot(), b.outside);
        tds.set_neighbor(b.outside, b.mirror, key);
        new_cells.push(key);
    }

    for sharing in edges.values() {
        let (a, ka) = sharing[0];
        let (b, kb) = sharing[1];
        tds.set_neighbor(new_cells[a], ka, new_cells[b]);
        tds.set_neighbor(new_cells[b], kb, new_cells[a]);
    }

    for cc in &region.cells {
        tds.remove_cell(cc.cell);
    }

    for &key in &new_cells {
        let Some(cell) = tds.cell(key) else {
            continue;
        };
        let slots: [(VertexKey, usize); 4] =
            std::array::from_fn(|i| (cell.vertex(i), cell.offset(i).copy_index(s)));
        for (v, copy) in slots {
            if let Some(vertex) = tds.vertex_mut(v) {
                vertex.set_incident_cell(copy, key);
            }
        }
    }
    Ok(new_cells)
}

/// Insert a point, returning the new vertex or the coincident existing one.
///
/// `location`, if given, is a starting point for the walk, normally the
/// result of [`locate`] for the wrapped point; otherwise the point is located
/// from scratch.
///
/// # Errors
///
/// Returns [`InsertionError::NonFinitePoint`] for NaN or infinite
/// coordinates; other errors indicate a corrupted structure. On error the
/// structure holds the same vertices as before the call.
pub fn insert<K: Kernel>(
    tds: &mut Tds,
    kernel: &PeriodicKernel<K>,
    manager: &CoveringManager,
    point: &Point,
    location: Option<Location>,
    max_steps: usize,
) -> Result<InsertionOutcome, InsertionError> {
    let point = kernel
        .domain()
        .wrap(point)
        .map_err(|_| InsertionError::NonFinitePoint { point: *point })?;

    if tds.number_of_vertices() == 0 {
        let v = tds.insert_vertex(Vertex::new(point));
        if let Err(error) = build_single_vertex_covering(tds, v) {
            tds.clear();
            return Err(error.into());
        }
        return Ok(InsertionOutcome::Inserted(v));
    }

    // A supplied location only seeds the walk, so a stale one costs steps
    // instead of corrupting the structure.
    let location = match location {
        Some(Location {
            cell: Some(cell),
            offset,
            ..
        }) if tds.contains_cell(cell) && offset.rem_euclid(tds.sheet_count()).is_zero() => {
            walk(tds, kernel, &point, cell, offset, max_steps)?
        }
        _ => locate(tds, kernel, &point, Offset::ZERO, None, max_steps)?,
    };
    if let Some(existing) = location.vertex(tds) {
        return Ok(InsertionOutcome::Existing(existing));
    }

    let v = tds.insert_vertex(Vertex::new(point));
    if let Err(error) = insert_located_vertex(tds, kernel, manager, v, &point, location, max_steps)
    {
        roll_back(tds, kernel, manager, v, max_steps);
        return Err(error);
    }
    Ok(InsertionOutcome::Inserted(v))
}

/// Undo a failed insertion of `vertex`: drop it and, if any cell already
/// refers to it, re-triangulate the remaining vertices.
pub(crate) fn roll_back<K: Kernel>(
    tds: &mut Tds,
    kernel: &PeriodicKernel<K>,
    manager: &CoveringManager,
    vertex: VertexKey,
    max_steps: usize,
) {
    let linked = tds.cells().any(|(_, cell)| cell.contains_vertex(vertex));
    tds.remove_vertex(vertex);
    if tds.number_of_vertices() == 0 {
        tds.clear();
    } else if linked {
        debug!(?vertex, "rolling back a partial insertion");
        if let Err(error) = rebuild(tds, kernel, manager, None, max_steps) {
            warn!(%error, ?vertex, "rebuild after a failed insertion failed");
        }
    }
}

/// Triangulate a stored vertex that is not yet part of any cell.
///
/// Used to rebuild around existing vertex keys.
///
/// # Errors
///
/// Returns [`InsertionError::CavityFilling`] if the vertex coincides with
/// another vertex.
pub(crate) fn insert_existing<K: Kernel>(
    tds: &mut Tds,
    kernel: &PeriodicKernel<K>,
    manager: &CoveringManager,
    vertex: VertexKey,
    max_steps: usize,
) -> Result<(), InsertionError> {
    let point = *tds
        .vertex(vertex)
        .ok_or_else(|| InsertionError::CavityFilling {
            message: format!("vertex {vertex:?} not found"),
        })?
        .point();
    if tds.number_of_stored_cells() == 0 {
        build_single_vertex_covering(tds, vertex)?;
        return Ok(());
    }
    let location = locate(tds, kernel, &point, Offset::ZERO, None, max_steps)?;
    if location.vertex(tds).is_some() {
        return Err(InsertionError::CavityFilling {
            message: format!("vertex {vertex:?} coincides with an existing vertex"),
        });
    }
    insert_located_vertex(tds, kernel, manager, vertex, &point, location, max_steps)
}

fn insert_located_vertex<K: Kernel>(
    tds: &mut Tds,
    kernel: &PeriodicKernel<K>,
    manager: &CoveringManager,
    vertex: VertexKey,
    point: &Point,
    location: Location,
    max_steps: usize,
) -> Result<(), InsertionError> {
    let mut location = location;
    if tds.sheets() == CoveringSheets::One {
        let start = location.cell.ok_or(LocateError::EmptyTriangulation)?;
        match find_conflict_region(tds, kernel, point, location.offset, start) {
            Ok(region) => {
                fill_cavity(tds, kernel, manager, vertex, &region)?;
                manager.update(tds)?;
                return Ok(());
            }
            Err(ConflictError::OverlappingRegion { cell_key }) => {
                debug!(
                    ?cell_key,
                    "conflict region overlaps in the one-sheet covering; expanding"
                );
                expand(tds)?;
                location = locate(tds, kernel, point, Offset::ZERO, None, max_steps)?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    insert_all_copies(tds, kernel, manager, vertex, point, location, max_steps)?;
    manager.update(tds)?;
    Ok(())
}

/// Insert the 27 copies of a point into the three-sheet covering.
fn insert_all_copies<K: Kernel>(
    tds: &mut Tds,
    kernel: &PeriodicKernel<K>,
    manager: &CoveringManager,
    vertex: VertexKey,
    point: &Point,
    location: Location,
    max_steps: usize,
) -> Result<(), InsertionError> {
    let first = location.cell.ok_or(LocateError::EmptyTriangulation)?;
    // A vertex of the located cell serves as a landmark for the other
    // copies: copy `s` of the point sits next to the landmark's copy
    // `s + relative`.
    let (landmark, relative) = {
        let cell = tds
            .cell(first)
            .ok_or(LocateError::InvalidCell { cell_key: first })?;
        (cell.vertex(0), cell.offset(0) - location.offset)
    };

    for copy in Offset::block(3) {
        let located = if copy.is_zero() {
            location
        } else {
            let node_offset = (copy + relative).rem_euclid(3);
            let hint = tds
                .vertex(landmark)
                .and_then(|v| v.incident_cell(node_offset.copy_index(3)));
            let start = hint.and_then(|h| {
                let slot = tds.cell(h)?.index_of_node((landmark, node_offset), 3)?;
                Some((h, tds.cell(h)?.offset(slot) - relative))
            });
            match start {
                Some((cell, frame)) => walk(tds, kernel, point, cell, frame, max_steps)?,
                None => locate(tds, kernel, point, copy, None, max_steps)?,
            }
        };
        let start = located.cell.ok_or(LocateError::EmptyTriangulation)?;
        let region = find_conflict_region(tds, kernel, point, located.offset, start)?;
        fill_cavity(tds, kernel, manager, vertex, &region)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::predicates::Orientation;

    fn setup() -> (Tds, PeriodicKernel, CoveringManager) {
        let kernel = PeriodicKernel::default();
        let manager = CoveringManager::new(kernel.domain());
        (Tds::new(), kernel, manager)
    }

    fn all_positive(tds: &Tds, kernel: &PeriodicKernel) -> bool {
        tds.cell_keys().all(|k| {
            kernel.orientation(&tds.periodic_points(k).unwrap()) == Orientation::POSITIVE
        })
    }

    #[test]
    fn first_point_builds_the_grid() {
        let (mut tds, kernel, manager) = setup();
        let out = insert(&mut tds, &kernel, &manager, &Point::new([0.2, 0.3, 0.4]), None, 1000)
            .unwrap();
        assert!(out.is_new());
        assert_eq!(tds.number_of_stored_cells(), 162);
        assert!(tds.is_valid().is_ok());
    }

    #[test]
    fn coincident_point_returns_existing_vertex() {
        let (mut tds, kernel, manager) = setup();
        let p = Point::new([0.25, 0.5, 0.375]);
        let a = insert(&mut tds, &kernel, &manager, &p, None, 1000).unwrap();
        let b = insert(&mut tds, &kernel, &manager, &Point::new([1.25, -0.5, 0.375]), None, 1000)
            .unwrap();
        assert_eq!(b, InsertionOutcome::Existing(a.vertex()));
        assert_eq!(tds.number_of_vertices(), 1);
    }

    #[test]
    fn second_point_keeps_structure_valid() {
        let (mut tds, kernel, manager) = setup();
        insert(&mut tds, &kernel, &manager, &Point::new([0.1, 0.1, 0.1]), None, 1000).unwrap();
        insert(&mut tds, &kernel, &manager, &Point::new([0.6, 0.55, 0.5]), None, 1000).unwrap();
        assert_eq!(tds.number_of_vertices(), 2);
        assert_eq!(tds.sheets(), CoveringSheets::Three);
        assert!(tds.is_valid().is_ok(), "{:?}", tds.is_valid());
        assert!(all_positive(&tds, &kernel));
        // Three-torus Euler relation on the stored structure.
        assert_eq!(
            tds.number_of_stored_vertices() + tds.number_of_stored_facets(),
            tds.number_of_stored_edges() + tds.number_of_stored_cells()
        );
    }

    #[test]
    fn conflict_region_reports_boundary_and_internal_facets() {
        let (mut tds, kernel, manager) = setup();
        for p in [[0.1, 0.2, 0.3], [0.6, 0.7, 0.2], [0.4, 0.1, 0.8]] {
            insert(&mut tds, &kernel, &manager, &Point::new(p), None, 1000).unwrap();
        }
        let q = Point::new([0.35, 0.45, 0.55]);
        let loc = locate(&tds, &kernel, &q, Offset::ZERO, None, 1000).unwrap();
        let region =
            find_conflict_region(&tds, &kernel, &q, loc.offset, loc.cell.unwrap()).unwrap();
        assert!(!region.cells.is_empty());
        // A closed cavity: 4C = B + 2I.
        assert_eq!(
            4 * region.cells.len(),
            region.boundary.len() + 2 * region.internal.len()
        );
        for b in &region.boundary {
            let inside = kernel.in_sphere_perturbed(
                &tds.periodic_points(b.facet.cell()).unwrap(),
                &(q, b.offset),
            );
            assert_eq!(inside, InSphere::INSIDE);
            assert_eq!(tds.neighbor(b.outside, b.mirror), Some(b.facet.cell()));
        }
    }

    #[test]
    fn start_outside_is_rejected() {
        let (mut tds, kernel, manager) = setup();
        insert(&mut tds, &kernel, &manager, &Point::new([0.0; 3]), None, 1000).unwrap();
        insert(&mut tds, &kernel, &manager, &Point::new([0.5; 3]), None, 1000).unwrap();
        let q = Point::new([0.05, 0.02, 0.01]);
        let far = tds
            .cell_keys()
            .find(|&k| {
                let pts = tds.periodic_points(k).unwrap();
                kernel.in_sphere_perturbed(&pts, &(q, Offset::ZERO)) == InSphere::OUTSIDE
            })
            .unwrap();
        assert_eq!(
            find_conflict_region(&tds, &kernel, &q, Offset::ZERO, far),
            Err(ConflictError::StartNotInConflict { cell_key: far })
        );
    }

    fn three_points() -> (Tds, PeriodicKernel, CoveringManager) {
        let (mut tds, kernel, manager) = setup();
        for p in [[0.1, 0.2, 0.3], [0.6, 0.7, 0.2], [0.4, 0.1, 0.8]] {
            insert(&mut tds, &kernel, &manager, &Point::new(p), None, 1000).unwrap();
        }
        (tds, kernel, manager)
    }

    #[test]
    fn open_cavity_is_rejected_before_any_change() {
        let (mut tds, kernel, manager) = three_points();
        let cells = tds.number_of_stored_cells();
        let q = Point::new([0.35, 0.45, 0.55]);
        let loc = locate(&tds, &kernel, &q, Offset::ZERO, None, 1000).unwrap();
        let mut region =
            find_conflict_region(&tds, &kernel, &q, loc.offset, loc.cell.unwrap()).unwrap();
        region.boundary.pop();

        let v = tds.insert_vertex(Vertex::new(q));
        assert!(matches!(
            fill_cavity(&mut tds, &kernel, &manager, v, &region),
            Err(InsertionError::CavityFilling { .. })
        ));
        assert_eq!(tds.number_of_stored_cells(), cells);
        assert!(tds.cells().all(|(_, c)| !c.contains_vertex(v)));
        tds.remove_vertex(v);
        assert!(tds.is_valid().is_ok(), "{:?}", tds.is_valid());
    }

    #[test]
    fn partially_linked_copies_are_rolled_back() {
        let (mut tds, kernel, manager) = three_points();
        let cells = tds.number_of_stored_cells();
        let q = Point::new([0.35, 0.45, 0.55]);

        // Link a single one of the 27 copies, as if the second one failed.
        let v = tds.insert_vertex(Vertex::new(q));
        let loc = locate(&tds, &kernel, &q, Offset::ZERO, None, 1000).unwrap();
        let region =
            find_conflict_region(&tds, &kernel, &q, loc.offset, loc.cell.unwrap()).unwrap();
        fill_cavity(&mut tds, &kernel, &manager, v, &region).unwrap();
        assert!(tds.cells().any(|(_, c)| c.contains_vertex(v)));

        roll_back(&mut tds, &kernel, &manager, v, 1000);
        assert!(!tds.contains_vertex(v));
        assert_eq!(tds.number_of_vertices(), 3);
        assert_eq!(tds.number_of_stored_cells(), cells);
        assert!(tds.is_valid().is_ok(), "{:?}", tds.is_valid());
        assert!(all_positive(&tds, &kernel));
    }

    #[test]
    fn stale_location_only_seeds_the_walk() {
        let (mut tds, kernel, manager) = three_points();
        let far = Point::new([0.9, 0.9, 0.9]);
        let stale = locate(&tds, &kernel, &far, Offset::ZERO, None, 1000).unwrap();
        let q = Point::new([0.15, 0.25, 0.35]);
        let out = insert(&mut tds, &kernel, &manager, &q, Some(stale), 1000).unwrap();
        assert!(out.is_new());
        assert_eq!(tds.vertex(out.vertex()).unwrap().point(), &q);
        assert!(tds.is_valid().is_ok(), "{:?}", tds.is_valid());
        assert!(all_positive(&tds, &kernel));

        // A stale location must not hide a coincident vertex either.
        let again = insert(&mut tds, &kernel, &manager, &q, Some(stale), 1000).unwrap();
        assert_eq!(again, InsertionOutcome::Existing(out.vertex()));
    }

    #[test]
    fn non_finite_point_is_rejected() {
        let (mut tds, kernel, manager) = setup();
        let p = Point::new([f64::NAN, 0.0, 0.0]);
        assert!(matches!(
            insert(&mut tds, &kernel, &manager, &p, None, 10),
            Err(InsertionError::NonFinitePoint { .. })
        ));
    }
}
