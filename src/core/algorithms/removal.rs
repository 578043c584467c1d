//! Vertex removal by star-hole retriangulation.
//!
//! Removing a vertex leaves a star-shaped hole bounded by the facets
//! opposite the vertex in its incident cells. The hole is refilled with the
//! Delaunay cells of the link vertices by gift-wrapping: starting from each
//! boundary facet, the apex is the link point on the inner side whose
//! circumsphere with the facet contains no other such point (decided with
//! the perturbed in-sphere test, so the result is the same triangulation an
//! insertion of the remaining points would build).
//!
//! Each copy of the vertex is handled in its own frame: all star cells are
//! expressed relative to the removed node, so link vertices are identified
//! by `(vertex, relative offset)` pairs. New cells are staged completely
//! before the structure is touched.
//!
//! When the hole cannot be filled in place (a star that wraps around the
//! torus, a missing apex, facets left open) the remaining vertices are
//! re-triangulated from scratch, keeping every `VertexKey`.

use tracing::debug;

use crate::core::algorithms::insertion::{InsertionError, insert_existing};
use crate::core::cell::{Cell, normalize_offsets};
use crate::core::collections::{CellKeySet, Entry, FastHashMap};
use crate::core::covering::{CoveringManager, CoveringSheets, build_single_vertex_covering};
use crate::core::facet::VERTEX_TRIPLES;
use crate::core::triangulation_data_structure::{
    CellKey, Tds, TdsValidationError, VertexKey,
};
use crate::core::util::hilbert::hilbert_sort_by;
use crate::geometry::kernel::Kernel;
use crate::geometry::offset::Offset;
use crate::geometry::periodic::{PeriodicKernel, PeriodicPoint};
use crate::geometry::point::Point;
use crate::geometry::predicates::{InSphere, Orientation};

/// Bits per axis of the Hilbert order used when rebuilding.
const REBUILD_HILBERT_BITS: u32 = 16;

/// Error during vertex removal.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RemovalError {
    /// The vertex does not exist
    #[error("Vertex {vertex:?} not found")]
    VertexNotFound {
        /// The missing vertex key
        vertex: VertexKey,
    },

    /// Re-triangulating the remaining vertices failed
    #[error("Rebuild failed: {0}")]
    Rebuild(#[from] InsertionError),

    /// Re-linking the structure failed
    #[error("Structure error: {0}")]
    Structure(#[from] TdsValidationError),
}

/// Why a hole could not be filled in place.
#[derive(Debug, thiserror::Error)]
enum HoleFailure {
    #[error("a link vertex appears at two positions around the removed node")]
    DuplicateLinkNode,
    #[error("the star contains the removed vertex twice")]
    SelfIncidentStar,
    #[error("no apex on the inner side of an open facet")]
    MissingApex,
    #[error("{0} facets left open")]
    OpenFacets(usize),
    #[error("gift-wrapping did not finish within {0} steps")]
    IterationLimit(usize),
    #[error(transparent)]
    Structure(#[from] TdsValidationError),
}

/// A link vertex in the frame of the removed node.
type LinkNode = (VertexKey, Offset);
type TripleKey = [LinkNode; 3];

/// What an open facet is glued to once closed.
#[derive(Clone, Copy, Debug)]
enum Side {
    /// A hole boundary facet; index into the walls.
    Wall(usize),
    /// A staged cell and the slot opposite the facet.
    New(usize, usize),
}

#[derive(Clone, Copy, Debug)]
struct OpenFacet {
    /// Oriented so that the unfilled side is positive.
    nodes: TripleKey,
    side: Side,
}

#[derive(Clone, Copy, Debug)]
struct Wall {
    outside: CellKey,
    mirror: usize,
}

fn sorted(mut nodes: TripleKey) -> TripleKey {
    nodes.sort_unstable();
    nodes
}

/// Remove a vertex and retriangulate.
///
/// # Errors
///
/// Returns [`RemovalError::VertexNotFound`] for an unknown key. Other errors
/// indicate a corrupted structure.
pub fn remove<K: Kernel>(
    tds: &mut Tds,
    kernel: &PeriodicKernel<K>,
    manager: &CoveringManager,
    vertex: VertexKey,
    max_steps: usize,
) -> Result<(), RemovalError> {
    detach(tds, kernel, manager, vertex, max_steps)?;
    tds.remove_vertex(vertex);
    if tds.number_of_vertices() == 0 {
        tds.clear();
    }
    Ok(())
}

/// Take a vertex out of the triangulation but keep it stored, with no
/// incident cells. The other vertices stay triangulated.
///
/// # Errors
///
/// See [`remove`].
pub(crate) fn detach<K: Kernel>(
    tds: &mut Tds,
    kernel: &PeriodicKernel<K>,
    manager: &CoveringManager,
    vertex: VertexKey,
    max_steps: usize,
) -> Result<(), RemovalError> {
    if !tds.contains_vertex(vertex) {
        return Err(RemovalError::VertexNotFound { vertex });
    }
    let others: Vec<VertexKey> = tds.vertex_keys().filter(|&k| k != vertex).collect();
    match others.as_slice() {
        [] => {
            tds.set_sheets(CoveringSheets::Three);
            tds.clear_cells();
            return Ok(());
        }
        [only] => {
            build_single_vertex_covering(tds, *only)?;
        }
        _ => {
            if let Err(reason) = retriangulate_stars(tds, kernel, manager, vertex) {
                debug!(%reason, ?vertex, "in-place removal failed; rebuilding");
                rebuild(tds, kernel, manager, Some(vertex), max_steps)?;
            }
        }
    }
    let copies = tds.copies();
    if let Some(v) = tds.vertex_mut(vertex) {
        v.reset_incident_cells(copies);
    }
    manager.update(tds)?;
    Ok(())
}

/// Re-triangulate every stored vertex except `exclude` from scratch.
pub(crate) fn rebuild<K: Kernel>(
    tds: &mut Tds,
    kernel: &PeriodicKernel<K>,
    manager: &CoveringManager,
    exclude: Option<VertexKey>,
    max_steps: usize,
) -> Result<(), RemovalError> {
    let mut order: Vec<(VertexKey, Point)> = tds
        .vertices()
        .filter(|(k, _)| Some(*k) != exclude)
        .map(|(k, v)| (k, *v.point()))
        .collect();
    hilbert_sort_by(
        &mut order,
        kernel.domain(),
        REBUILD_HILBERT_BITS,
        |(_, p)| *p,
    );
    tds.set_sheets(CoveringSheets::Three);
    tds.clear_cells();
    for (key, _) in order {
        insert_existing(tds, kernel, manager, key, max_steps)?;
    }
    Ok(())
}

fn retriangulate_stars<K: Kernel>(
    tds: &mut Tds,
    kernel: &PeriodicKernel<K>,
    manager: &CoveringManager,
    vertex: VertexKey,
) -> Result<(), HoleFailure> {
    for copy in 0..tds.copies() {
        retriangulate_node(tds, kernel, manager, vertex, copy)?;
    }
    Ok(())
}

/// Fill the hole left by one copy of `vertex`.
fn retriangulate_node<K: Kernel>(
    tds: &mut Tds,
    kernel: &PeriodicKernel<K>,
    manager: &CoveringManager,
    vertex: VertexKey,
    copy: usize,
) -> Result<(), HoleFailure> {
    let s = tds.sheet_count();
    let node_offset = Offset::from_copy_index(copy, s);
    let star = tds.star_of_node(vertex, copy)?;
    let star_set: CellKeySet = star.iter().copied().collect();

    // Collect the link and the hole boundary in the node's frame.
    let mut link: FastHashMap<LinkNode, Offset> = FastHashMap::default();
    let mut walls: Vec<Wall> = Vec::with_capacity(star.len());
    let mut open: FastHashMap<TripleKey, OpenFacet> = FastHashMap::default();
    let mut queue: Vec<TripleKey> = Vec::with_capacity(star.len());

    for &key in &star {
        let cell = tds.cell(key).ok_or_else(|| {
            TdsValidationError::InconsistentDataStructure {
                message: format!("star cell {key:?} not found"),
            }
        })?;
        let at = cell
            .index_of_node((vertex, node_offset), s)
            .ok_or(HoleFailure::SelfIncidentStar)?;
        if (0..4).any(|j| j != at && cell.vertex(j) == vertex) {
            return Err(HoleFailure::SelfIncidentStar);
        }
        let shift = node_offset - cell.offset(at);
        let relative: [LinkNode; 4] =
            std::array::from_fn(|j| (cell.vertex(j), cell.offset(j) + shift));
        for &(v, r) in relative.iter().filter(|(v, _)| *v != vertex) {
            match link.entry((v, r.rem_euclid(s))) {
                Entry::Occupied(e) if *e.get() != r => return Err(HoleFailure::DuplicateLinkNode),
                Entry::Occupied(_) => {}
                Entry::Vacant(e) => {
                    e.insert(r);
                }
            }
        }

        let outside = cell.neighbor(at).ok_or(HoleFailure::SelfIncidentStar)?;
        if star_set.contains(&outside) {
            return Err(HoleFailure::SelfIncidentStar);
        }
        let mirror = tds
            .mirror_index(key, at)
            .ok_or_else(|| TdsValidationError::InvalidNeighbors {
                message: format!("no mirror for facet {at} of star cell {key:?}"),
            })?;
        let nodes = VERTEX_TRIPLES[at].map(|j| relative[j]);
        let triple = sorted(nodes);
        if open
            .insert(
                triple,
                OpenFacet {
                    nodes,
                    side: Side::Wall(walls.len()),
                },
            )
            .is_some()
        {
            return Err(HoleFailure::DuplicateLinkNode);
        }
        walls.push(Wall { outside, mirror });
        queue.push(triple);
    }

    let mut candidates: Vec<LinkNode> = link.iter().map(|(&(v, _), &r)| (v, r)).collect();
    candidates.sort_unstable();
    let point_of = |node: LinkNode| -> Option<PeriodicPoint> {
        Some((*tds.vertex(node.0)?.point(), node.1))
    };
    let mut points: FastHashMap<LinkNode, PeriodicPoint> = FastHashMap::default();
    for &node in &candidates {
        let p = point_of(node).ok_or_else(|| TdsValidationError::InconsistentDataStructure {
            message: format!("link vertex {:?} not found", node.0),
        })?;
        points.insert(node, p);
    }
    let at = |node: &LinkNode| points[node];

    // Gift-wrap.
    let limit = 16 + candidates.len() * candidates.len();
    let mut staged: Vec<[LinkNode; 4]> = Vec::new();
    let mut glue: Vec<(usize, usize, Side)> = Vec::new();
    let mut steps = 0;
    while let Some(key) = queue.pop() {
        let Some(facet) = open.remove(&key) else {
            continue;
        };
        steps += 1;
        if steps > limit {
            return Err(HoleFailure::IterationLimit(limit));
        }
        let [a, b, c] = facet.nodes;
        let base = [at(&a), at(&b), at(&c)];
        let mut apex: Option<LinkNode> = None;
        for &cand in &candidates {
            if cand == a || cand == b || cand == c {
                continue;
            }
            let q = at(&cand);
            if kernel.orientation(&[base[0], base[1], base[2], q]) != Orientation::POSITIVE {
                continue;
            }
            apex = match apex {
                Some(d)
                    if kernel.in_sphere_perturbed(&[base[0], base[1], base[2], at(&d)], &q)
                        != InSphere::INSIDE =>
                {
                    Some(d)
                }
                _ => Some(cand),
            };
        }
        let d = apex.ok_or(HoleFailure::MissingApex)?;

        let index = staged.len();
        let nodes = [a, b, c, d];
        staged.push(nodes);
        glue.push((index, 3, facet.side));
        for (k, triple) in VERTEX_TRIPLES.iter().enumerate().take(3) {
            let face = triple.map(|j| nodes[j]);
            let face_key = sorted(face);
            if let Some(other) = open.remove(&face_key) {
                glue.push((index, k, other.side));
            } else {
                open.insert(
                    face_key,
                    OpenFacet {
                        nodes: [face[0], face[2], face[1]],
                        side: Side::New(index, k),
                    },
                );
                queue.push(face_key);
            }
        }
    }
    if !open.is_empty() {
        return Err(HoleFailure::OpenFacets(open.len()));
    }

    // Stage complete cells before mutating.
    let cells: Vec<Cell> = staged
        .iter()
        .map(|nodes| {
            let pts = nodes.map(|n| at(&n));
            Cell::new(
                nodes.map(|(v, _)| v),
                normalize_offsets(nodes.map(|(_, r)| r), s),
                manager.is_oversized(kernel, &pts),
            )
        })
        .collect();

    let keys: Vec<CellKey> = cells.into_iter().map(|c| tds.insert_cell(c)).collect();
    for (index, slot, side) in glue {
        match side {
            Side::Wall(w) => {
                let wall = walls[w];
                tds.set_neighbor(keys[index], slot, wall.outside);
                tds.set_neighbor(wall.outside, wall.mirror, keys[index]);
            }
            Side::New(other, k) => {
                tds.set_neighbor(keys[index], slot, keys[other]);
                tds.set_neighbor(keys[other], k, keys[index]);
            }
        }
    }
    for key in star {
        tds.remove_cell(key);
    }
    for &key in &keys {
        let Some(cell) = tds.cell(key) else {
            continue;
        };
        let slots: [(VertexKey, usize); 4] =
            std::array::from_fn(|i| (cell.vertex(i), cell.offset(i).copy_index(s)));
        for (v, c) in slots {
            if let Some(vertex) = tds.vertex_mut(v) {
                vertex.set_incident_cell(c, key);
            }
        }
    }
    Ok(())
}
