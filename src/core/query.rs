//! Read-only queries on the periodic structure.
//!
//! Everything here works on the stored cells of either covering and reports
//! *logical* objects: one representative per class of translated copies.
//! In the three-sheet covering the representative of a cell is the copy whose
//! signature anchor lies in sheet `(0, 0, 0)`.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::io;

use crate::core::algorithms::locate::{LocateError, locate};
use crate::core::cell::Cell;
use crate::core::collections::{FastHashMap, FastHashSet, SmallBuffer};
use crate::core::facet::{Edge, Facet, VERTEX_TRIPLES};
use crate::core::triangulation_data_structure::{
    CellKey, Tds, VertexKey, signature_anchor_offset,
};
use crate::geometry::kernel::Kernel;
use crate::geometry::offset::Offset;
use crate::geometry::periodic::{PeriodicKernel, PeriodicPoint};
use crate::geometry::point::Point;
use crate::geometry::predicates::InSphere;
use crate::geometry::primitives::Segment;

/// A cell, facet or edge described by geometry only: its periodic points
/// relative to the smallest one, sorted.
///
/// Independent of vertex keys, slot order, translation and covering, so two
/// triangulations of the same point set can be compared through it.
pub type GeometricSignature = SmallBuffer<PeriodicPoint, 4>;

/// Key-based signature of a facet or edge; see
/// [`CellSignature`](crate::core::triangulation_data_structure::CellSignature).
type KeySignature = SmallBuffer<(VertexKey, Offset), 4>;

fn key_signature(pairs: impl IntoIterator<Item = (VertexKey, Offset)>) -> KeySignature {
    let mut pairs: KeySignature = pairs.into_iter().collect();
    let base = pairs.iter().min().map_or(Offset::ZERO, |&(_, o)| o);
    for pair in &mut pairs {
        pair.1 -= base;
    }
    pairs.sort_unstable();
    pairs
}

fn point_order(a: &PeriodicPoint, b: &PeriodicPoint) -> Ordering {
    a.0.cmp(&b.0).then(a.1.cmp(&b.1))
}

/// Geometric signature of a set of periodic points.
#[must_use]
pub fn geometric_signature(points: &[PeriodicPoint]) -> GeometricSignature {
    let base = points
        .iter()
        .min_by(|a, b| point_order(a, b))
        .map_or(Offset::ZERO, |p| p.1);
    let mut out: GeometricSignature = points.iter().map(|&(p, o)| (p, o - base)).collect();
    out.sort_unstable_by(point_order);
    out
}

// =============================================================================
// UNIQUE ITERATION
// =============================================================================

/// Whether `cell` is the representative of its class of copies.
#[must_use]
pub fn is_canonical(tds: &Tds, cell: &Cell) -> bool {
    tds.sheet_count() == 1 || signature_anchor_offset(cell).rem_euclid(3).is_zero()
}

/// One stored cell per logical cell.
pub fn canonical_cells(tds: &Tds) -> impl Iterator<Item = CellKey> + '_ {
    tds.cells()
        .filter(|(_, cell)| is_canonical(tds, cell))
        .map(|(key, _)| key)
}

/// One facet handle per logical facet.
#[must_use]
pub fn unique_facets(tds: &Tds) -> Vec<Facet> {
    let mut seen: FastHashSet<KeySignature> = FastHashSet::default();
    let mut out = Vec::new();
    for key in canonical_cells(tds) {
        let Some(cell) = tds.cell(key) else {
            continue;
        };
        for (i, triple) in VERTEX_TRIPLES.iter().enumerate() {
            let sig = key_signature(triple.map(|j| (cell.vertex(j), cell.offset(j))));
            if seen.insert(sig) {
                out.push(Facet::from_slot(key, i));
            }
        }
    }
    out
}

/// One edge handle per logical edge.
#[must_use]
pub fn unique_edges(tds: &Tds) -> Vec<Edge> {
    let mut seen: FastHashSet<KeySignature> = FastHashSet::default();
    let mut out = Vec::new();
    for key in canonical_cells(tds) {
        let Some(cell) = tds.cell(key) else {
            continue;
        };
        for i in 0..4 {
            for j in (i + 1)..4 {
                let sig = key_signature([
                    (cell.vertex(i), cell.offset(i)),
                    (cell.vertex(j), cell.offset(j)),
                ]);
                if seen.insert(sig) {
                    out.push(Edge::from_slots(key, i, j));
                }
            }
        }
    }
    out
}

// =============================================================================
// NEAREST VERTEX
// =============================================================================

/// The vertex of `cell` closest to `point` placed at `offset` in the cell's
/// frame.
#[must_use]
pub fn nearest_vertex_in_cell<K: Kernel>(
    tds: &Tds,
    kernel: &PeriodicKernel<K>,
    cell: CellKey,
    point: &Point,
    offset: Offset,
) -> Option<VertexKey> {
    let c = tds.cell(cell)?;
    let points = tds.periodic_points(cell)?;
    (0..4)
        .map(|i| {
            let (p, o) = points[i];
            (kernel.squared_distance(point, &p, offset, o), c.vertex(i))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, v)| v)
}

/// The vertex minimizing the periodic distance to `point`.
///
/// Locates the point, then walks greedily on the Delaunay graph; a local
/// minimum of the distance on the Delaunay graph is global.
///
/// # Errors
///
/// Returns [`LocateError`] if location fails on a non-empty structure.
pub fn nearest_vertex<K: Kernel>(
    tds: &Tds,
    kernel: &PeriodicKernel<K>,
    point: &Point,
    max_steps: usize,
) -> Result<Option<VertexKey>, LocateError> {
    if tds.number_of_stored_cells() == 0 {
        return Ok(None);
    }
    let s = tds.sheet_count();
    let location = locate(tds, kernel, point, Offset::ZERO, None, max_steps)?;
    let Some(cell_key) = location.cell else {
        return Ok(None);
    };
    let cell = tds
        .cell(cell_key)
        .ok_or(LocateError::InvalidCell { cell_key })?;
    let frame = location.offset;

    // (vertex, offset in the query frame, squared distance)
    let distance = |v: VertexKey, o: Offset| -> f64 {
        tds.vertex(v).map_or(f64::INFINITY, |vx| {
            kernel.squared_distance(point, vx.point(), frame, o)
        })
    };
    let mut best = (0..4)
        .map(|i| {
            let (v, o) = (cell.vertex(i), cell.offset(i));
            (v, o, distance(v, o))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .ok_or(LocateError::InvalidCell { cell_key })?;

    loop {
        let (v, o, d) = best;
        let copy = o.copy_index(s);
        let Ok(star) = tds.star_of_node(v, copy) else {
            break;
        };
        let node = (v, o.rem_euclid(s));
        let mut improved = best;
        for key in star {
            let Some(c) = tds.cell(key) else {
                continue;
            };
            let Some(at) = c.index_of_node(node, s) else {
                continue;
            };
            let shift = o - c.offset(at);
            for j in (0..4).filter(|&j| j != at) {
                let (w, ow) = (c.vertex(j), c.offset(j) + shift);
                let dw = distance(w, ow);
                if dw < improved.2 {
                    improved = (w, ow, dw);
                }
            }
        }
        if improved.2 < d {
            best = improved;
        } else {
            break;
        }
    }
    Ok(Some(best.0))
}

// =============================================================================
// GABRIEL
// =============================================================================

/// Whether no vertex lies strictly inside the sphere with the edge as
/// diameter.
///
/// Only the vertices of cells around the edge need checking: in a Delaunay
/// triangulation any vertex inside the diametral sphere implies one of them
/// is.
#[must_use]
pub fn is_gabriel_edge<K: Kernel>(tds: &Tds, kernel: &PeriodicKernel<K>, edge: Edge) -> bool {
    let s = tds.sheet_count();
    let (i, j) = edge.slots();
    let Some(cell) = tds.cell(edge.cell()) else {
        return false;
    };
    let Some(points) = tds.periodic_points(edge.cell()) else {
        return false;
    };
    let (va, oa) = (cell.vertex(i), cell.offset(i));
    let (vb, ob) = (cell.vertex(j), cell.offset(j));
    let segment = [points[i], points[j]];

    let Ok(star) = tds.star_of_node(va, oa.copy_index(s)) else {
        return false;
    };
    for key in star {
        let (Some(c), Some(pts)) = (tds.cell(key), tds.periodic_points(key)) else {
            continue;
        };
        let Some(at) = c.index_of_node((va, oa.rem_euclid(s)), s) else {
            continue;
        };
        let shift = oa - c.offset(at);
        let around = (0..4).any(|k| c.vertex(k) == vb && c.offset(k) + shift == ob);
        if !around {
            continue;
        }
        for k in 0..4 {
            let o = c.offset(k) + shift;
            if (c.vertex(k) == va && o == oa) || (c.vertex(k) == vb && o == ob) {
                continue;
            }
            if kernel.side_of_diametral_sphere(&segment, &(pts[k].0, o)) == InSphere::INSIDE {
                return false;
            }
        }
    }
    true
}

/// Whether no vertex lies strictly inside the smallest sphere through the
/// facet's three vertices.
///
/// Only the two opposite vertices need checking in a Delaunay triangulation.
/// A degenerate facet is never Gabriel.
#[must_use]
pub fn is_gabriel_facet<K: Kernel>(tds: &Tds, kernel: &PeriodicKernel<K>, facet: Facet) -> bool {
    let i = facet.slot();
    let Some(points) = tds.periodic_points(facet.cell()) else {
        return false;
    };
    let triangle = VERTEX_TRIPLES[i].map(|k| points[k]);

    let mut opposite: SmallBuffer<PeriodicPoint, 2> = SmallBuffer::new();
    opposite.push(points[i]);
    let across = tds.neighbor(facet.cell(), i).and_then(|n| {
        let j = tds.mirror_index(facet.cell(), i)?;
        let t = tds.neighbor_translation(facet.cell(), i)?;
        let np = tds.periodic_points(n)?;
        Some((np[j].0, np[j].1 + t))
    });
    opposite.extend(across);
    opposite.iter().all(|x| {
        kernel
            .side_of_diametral_sphere_of_triangle(&triangle, x)
            .is_some_and(|side| side != InSphere::INSIDE)
    })
}

// =============================================================================
// DUAL
// =============================================================================

/// Circumcenter of a stored cell in the cell's own frame.
#[must_use]
pub fn circumcenter<K: Kernel>(
    tds: &Tds,
    kernel: &PeriodicKernel<K>,
    cell: CellKey,
) -> Option<Point> {
    kernel.circumcenter(&tds.periodic_points(cell)?)
}

/// Voronoi vertex of a cell wrapped into the domain, and the lattice offset
/// of the unwrapped circumcenter in the cell's frame.
///
/// The circumcenter is computed from the cell's points sorted and expressed
/// relative to the smallest one, so every copy of a logical cell, whatever
/// its slot order, yields the same bits.
#[must_use]
pub fn canonical_dual<K: Kernel>(
    tds: &Tds,
    kernel: &PeriodicKernel<K>,
    cell: CellKey,
) -> Option<(Point, Offset)> {
    let pts = tds.periodic_points(cell)?;
    let base = pts.iter().min_by(|a, b| point_order(a, b))?.1;
    let mut frame = pts.map(|(p, o)| (p, o - base));
    frame.sort_unstable_by(point_order);
    let center = kernel.circumcenter(&frame)?;
    let (wrapped, turns) = kernel.domain().wrap_with_offset(&center).ok()?;
    Some((wrapped, turns + base))
}

/// Voronoi vertex of a cell, wrapped into the domain.
#[must_use]
pub fn dual<K: Kernel>(tds: &Tds, kernel: &PeriodicKernel<K>, cell: CellKey) -> Option<Point> {
    canonical_dual(tds, kernel, cell).map(|(p, _)| p)
}

/// Voronoi edge of a facet: both circumcenters in the frame of the facet's
/// cell.
#[must_use]
pub fn dual_facet<K: Kernel>(tds: &Tds, kernel: &PeriodicKernel<K>, facet: Facet) -> Option<Segment> {
    let (c, i) = (facet.cell(), facet.slot());
    let domain = kernel.domain();
    let (here, oh) = canonical_dual(tds, kernel, c)?;
    let n = tds.neighbor(c, i)?;
    let t = tds.neighbor_translation(c, i)?;
    let (there, ot) = canonical_dual(tds, kernel, n)?;
    Some(Segment::new(domain.lift(&here, oh), domain.lift(&there, ot + t)))
}

/// Write the Voronoi diagram in a line format:
///
/// ```text
/// VORONOI <n_vertices> <n_edges>
/// v <x> <y> <z>
/// e <i> <j> <ox> <oy> <oz>
/// ```
///
/// Vertices are the wrapped circumcenters of the logical cells, sorted.
/// Each edge joins vertex `i` to vertex `j` shifted by `offset ⊙ extent`.
///
/// # Errors
///
/// Returns any I/O error from `writer`.
pub fn draw_dual<K: Kernel, W: io::Write>(
    tds: &Tds,
    kernel: &PeriodicKernel<K>,
    writer: &mut W,
) -> io::Result<()> {
    // (wrapped center, geometric signature, key signature)
    let mut vertices: Vec<(Point, GeometricSignature, KeySignature)> = Vec::new();
    for key in canonical_cells(tds) {
        let (Some(cell), Some(pts)) = (tds.cell(key), tds.periodic_points(key)) else {
            continue;
        };
        let Some((wrapped, _)) = canonical_dual(tds, kernel, key) else {
            continue;
        };
        let keys = key_signature((0..4).map(|k| (cell.vertex(k), cell.offset(k))));
        vertices.push((wrapped, geometric_signature(&pts), keys));
    }
    vertices.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    let index: FastHashMap<KeySignature, usize> = vertices
        .iter()
        .enumerate()
        .map(|(i, v)| (v.2.clone(), i))
        .collect();
    let index_of = |cell: &Cell| {
        index
            .get(&key_signature((0..4).map(|k| (cell.vertex(k), cell.offset(k)))))
            .copied()
    };

    let mut edges: Vec<(usize, usize, Offset)> = Vec::new();
    for facet in unique_facets(tds) {
        let (c, i) = (facet.cell(), facet.slot());
        let (Some(n), Some(t)) = (tds.neighbor(c, i), tds.neighbor_translation(c, i)) else {
            continue;
        };
        let (Some(cell), Some(ncell)) = (tds.cell(c), tds.cell(n)) else {
            continue;
        };
        let (Some(a), Some(b)) = (index_of(cell), index_of(ncell)) else {
            continue;
        };
        let (Some((_, oa)), Some((_, ob))) =
            (canonical_dual(tds, kernel, c), canonical_dual(tds, kernel, n))
        else {
            continue;
        };
        let shift = ob + t - oa;
        edges.push(match a.cmp(&b) {
            Ordering::Less => (a, b, shift),
            Ordering::Greater => (b, a, -shift),
            // A cell next to its own translate: either direction describes
            // the same edge.
            Ordering::Equal => (a, b, shift.max(-shift)),
        });
    }
    edges.sort_unstable();

    writeln!(writer, "VORONOI {} {}", vertices.len(), edges.len())?;
    for (p, ..) in &vertices {
        writeln!(writer, "v {} {} {}", p.x(), p.y(), p.z())?;
    }
    for (a, b, o) in &edges {
        let [x, y, z] = o.to_array();
        writeln!(writer, "e {a} {b} {x} {y} {z}")?;
    }
    Ok(())
}
