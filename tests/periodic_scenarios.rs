//! Scenario tests for the periodic Delaunay triangulation.
//!
//! These tests drive the public API through complete workflows:
//! - Growing a triangulation until it collapses to a single sheet
//! - Removing points until it needs the 27-sheet covering again
//! - Moving vertices, including onto occupied positions
//! - Wrapping of points given outside the domain
//! - Logical counts and the torus Euler relation across coverings
//! - Determinism of the Voronoi dump for equal triangulations
//! - Points one ulp apart, also on a shifted non-unit domain

use periodic_delaunay::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// HELPERS
// =============================================================================

/// A 5×5×5 lattice with spacing 0.2 and jitter below 0.02 per axis.
///
/// Every empty sphere of this set is smaller than a quarter of the unit side,
/// so the triangulation fits in one sheet.
fn jittered_lattice(seed: u64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(125);
    for i in 0..5 {
        for j in 0..5 {
            for k in 0..5 {
                let base = [f64::from(i), f64::from(j), f64::from(k)];
                points.push(Point::new(base.map(|b| {
                    0.1 + 0.2 * b + rng.random_range(-0.02..0.02)
                })));
            }
        }
    }
    points
}

/// Route `tracing` output through the test harness; set `RUST_LOG=debug` to
/// see covering transitions and rebuild fallbacks.
fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

fn random_points(count: usize, seed: u64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Point::new([rng.random(), rng.random(), rng.random()]))
        .collect()
}

fn assert_torus_euler<K: Kernel>(dt: &PeriodicDelaunayTriangulation<K>) {
    assert_eq!(
        dt.number_of_vertices() + dt.number_of_facets(),
        dt.number_of_edges() + dt.number_of_cells(),
        "V - E + F - C must vanish on the three-torus"
    );
    assert_eq!(dt.number_of_facets(), 2 * dt.number_of_cells());
}

fn dual_dump<K: Kernel>(dt: &PeriodicDelaunayTriangulation<K>) -> String {
    let mut buffer = Vec::new();
    dt.draw_dual(&mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

// =============================================================================
// COVERING TRANSITIONS
// =============================================================================

#[test]
fn test_growth_collapses_to_one_sheet_and_removal_expands_again() {
    init_tracing();
    let points = jittered_lattice(7);
    let mut dt = PeriodicDelaunayTriangulation::new();

    let mut keys = Vec::new();
    for point in &points {
        keys.push(dt.insert(*point).unwrap());
        assert_torus_euler(&dt);
    }
    assert_eq!(dt.number_of_vertices(), 125);
    assert_eq!(dt.sheets(), CoveringSheets::One);
    assert_eq!(dt.number_of_sheets(), [1, 1, 1]);
    assert_eq!(dt.number_of_stored_cells(), dt.number_of_cells());
    assert!(dt.is_valid());

    // Keep lattice sites (0,0,0), (1,2,3), (3,1,2) and (4,4,4).
    let kept = [0, 38, 82, 124];
    let doomed = keys
        .iter()
        .enumerate()
        .filter(|(i, _)| !kept.contains(i))
        .map(|(_, k)| *k);
    let removed = dt.remove_range(doomed).unwrap();
    assert_eq!(removed, 121);
    assert_eq!(dt.number_of_vertices(), 4);
    assert_eq!(dt.sheets(), CoveringSheets::Three);
    assert_eq!(dt.number_of_stored_cells(), 27 * dt.number_of_cells());
    assert_torus_euler(&dt);
    assert!(dt.is_valid());
}

/// The 4×4×4 lattice `0.125 + 0.25·i` without the site `(0.375, 0.375,
/// 0.375)`, plus seven centers of lattice cubes away from that site.
///
/// The missing site leaves an octahedral hole with circumradius exactly a
/// quarter of the side, so the set needs the three-sheet covering until the
/// site is filled.
fn lattice_with_hole() -> (Vec<Point>, Point) {
    let hole = Point::new([0.375; 3]);
    let mut points = Vec::with_capacity(70);
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                let p = Point::new([i, j, k].map(|n| 0.125 + 0.25 * f64::from(n)));
                if p != hole {
                    points.push(p);
                }
            }
        }
    }
    points.extend(
        [
            [0.75, 0.75, 0.75],
            [0.75, 0.75, 0.25],
            [0.75, 0.25, 0.75],
            [0.25, 0.75, 0.75],
            [0.0, 0.0, 0.0],
            [0.5, 0.0, 0.75],
            [0.0, 0.5, 0.0],
        ]
        .map(Point::new),
    );
    (points, hole)
}

#[test]
fn test_one_insertion_collapses_seventy_vertices_to_one_sheet() {
    init_tracing();
    let (points, hole) = lattice_with_hole();
    let mut dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    assert_eq!(dt.number_of_vertices(), 70);
    assert_eq!(dt.number_of_sheets(), [3, 3, 3]);
    assert_eq!(dt.number_of_stored_vertices(), 27 * 70);
    assert!(dt.validate().is_ok(), "{:?}", dt.validate());

    let filled = dt.insert(hole).unwrap();
    assert_eq!(dt.number_of_vertices(), 71);
    assert_eq!(dt.number_of_sheets(), [1, 1, 1]);
    assert_eq!(dt.number_of_stored_vertices(), 71);
    assert_eq!(dt.number_of_stored_cells(), dt.number_of_cells());
    assert_torus_euler(&dt);
    assert!(dt.validate().is_ok(), "{:?}", dt.validate());

    dt.remove(filled).unwrap();
    assert_eq!(dt.number_of_vertices(), 70);
    assert_eq!(dt.number_of_sheets(), [3, 3, 3]);
    assert_eq!(dt.number_of_stored_cells(), 27 * dt.number_of_cells());
    assert_torus_euler(&dt);
    assert!(dt.validate().is_ok(), "{:?}", dt.validate());

    let rebuilt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    assert!(dt == rebuilt);
}

#[test]
fn test_stored_counts_scale_with_covering() {
    let mut dt = PeriodicDelaunayTriangulation::new();
    dt.insert_range(random_points(6, 11), false).unwrap();
    assert_eq!(dt.sheets(), CoveringSheets::Three);
    assert_eq!(dt.number_of_stored_vertices(), 27 * dt.number_of_vertices());
    assert_eq!(dt.number_of_stored_cells(), 27 * dt.number_of_cells());
    assert_eq!(dt.number_of_stored_edges(), 27 * dt.number_of_edges());
    assert_eq!(dt.cells().count(), dt.number_of_cells());
    assert_eq!(dt.stored_cells().count(), dt.number_of_stored_cells());
    assert_eq!(dt.facets().count(), dt.number_of_facets());
    assert_eq!(dt.edges().count(), dt.number_of_edges());
}

#[test]
fn test_clear_resets_to_empty_covering() {
    let mut dt = PeriodicDelaunayTriangulation::new();
    dt.insert_range(jittered_lattice(3), true).unwrap();
    assert_eq!(dt.sheets(), CoveringSheets::One);

    dt.clear();
    assert!(dt.is_empty());
    assert_eq!(dt.number_of_cells(), 0);
    assert_eq!(dt.sheets(), CoveringSheets::Three);

    dt.insert(Point::new([0.5, 0.5, 0.5])).unwrap();
    assert_eq!(dt.number_of_cells(), 6);
    assert!(dt.is_valid());
}

// =============================================================================
// INSERTION
// =============================================================================

#[test]
fn test_points_outside_domain_are_wrapped() {
    let domain = Domain::new([0.0, 0.0, 0.0], [1.5, 1.0, 1.0]).unwrap();
    let mut dt = PeriodicDelaunayTriangulation::with_domain(domain);

    let a = dt.insert(Point::new([2.5, -0.25, 3.0])).unwrap();
    assert_eq!(
        dt.tds().vertex(a).unwrap().point(),
        &Point::new([1.0, 0.75, 0.0])
    );

    // The same periodic position in another copy is the same vertex.
    let b = dt.insert(Point::new([-0.5, 0.75, -2.0])).unwrap();
    assert_eq!(a, b);
    assert_eq!(dt.number_of_vertices(), 1);

    for (_, vertex) in dt.vertices() {
        assert!(domain.contains(vertex.point()));
    }
}

#[test]
fn test_duplicate_insertion_is_idempotent() {
    let points = random_points(10, 5);
    let mut dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    let before = dt.number_of_cells();

    for point in &points {
        let key = dt.insert(*point).unwrap();
        assert_eq!(dt.tds().vertex(key).unwrap().point(), point);
    }
    assert_eq!(dt.number_of_vertices(), 10);
    assert_eq!(dt.number_of_cells(), before);
}

#[test]
fn test_insert_located_matches_insert() {
    let points = random_points(12, 21);
    let mut by_insert = PeriodicDelaunayTriangulation::new();
    let mut by_location = PeriodicDelaunayTriangulation::new();
    for point in &points {
        by_insert.insert(*point).unwrap();
        let location = by_location.locate(*point).unwrap();
        by_location.insert_located(*point, &location).unwrap();
    }
    assert!(by_insert == by_location);
    assert!(by_location.is_valid());
}

#[test]
fn test_non_finite_points_leave_triangulation_untouched() {
    let mut dt = PeriodicDelaunayTriangulation::from_points(&random_points(5, 1), Domain::unit_cube())
        .unwrap();
    let result = dt.insert_range(
        [Point::new([0.3, 0.3, 0.3]), Point::new([f64::NAN, 0.1, 0.1])],
        false,
    );
    assert!(matches!(result, Err(InsertionError::NonFinitePoint { .. })));
    assert_eq!(dt.number_of_vertices(), 5);
}

/// `x` moved by one unit in the last place.
fn ulp_up(x: f64) -> f64 {
    x.next_up()
}

#[test]
fn test_one_ulp_neighbors_are_distinct_valid_vertices() {
    init_tracing();
    for seed in 0..10 {
        let mut points = random_points(25, seed);
        let mut dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
        for i in 0..5 {
            let [x, y, z] = points[i].to_array();
            let neighbor = Point::new([ulp_up(x), y, z]);
            let key = dt.insert(neighbor).unwrap();
            assert_eq!(dt.tds().vertex(key).unwrap().point(), &neighbor, "seed {seed}");
            points.push(neighbor);
        }
        assert_eq!(dt.number_of_vertices(), 30, "seed {seed}");
        assert!(dt.validate().is_ok(), "seed {seed}: {:?}", dt.validate());

        let fresh = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
        assert!(dt == fresh, "seed {seed}");
    }
}

#[test]
fn test_one_ulp_neighbor_across_the_period() {
    // Copies of 0 and of the largest coordinate below 1 touch across the
    // boundary of the domain.
    let below_one = 1.0_f64.next_down();
    let points = [
        Point::new([0.0, 0.5, 0.5]),
        Point::new([below_one, 0.5, 0.5]),
        Point::new([f64::from_bits(1), 0.5, 0.5]),
        Point::new([0.25, 0.125, 0.75]),
        Point::new([0.625, 0.875, 0.25]),
    ];
    let dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    assert_eq!(dt.number_of_vertices(), 5);
    assert!(dt.validate().is_ok(), "{:?}", dt.validate());
    assert_torus_euler(&dt);
}

#[test]
fn test_near_degenerate_lattice_on_shifted_domain() {
    init_tracing();
    let domain = Domain::new([0.1, 0.3, -0.7], [0.8, 1.0, 0.0]).unwrap();
    let extent = domain.extent();
    let lo = domain.lo();

    let mut points = Vec::new();
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                let p = [i, j, k];
                points.push(Point::new(std::array::from_fn(|axis| {
                    lo[axis] + extent[axis] * f64::from(p[axis]) / 4.0
                })));
            }
        }
    }
    // One-ulp neighbors of a few sites and one site given in another copy.
    for index in [0, 21, 42, 63] {
        let [x, y, z] = points[index].to_array();
        points.push(Point::new([x, ulp_up(y), z]));
    }
    let [x, y, z] = points[5].to_array();
    points.push(Point::new([x + extent[0], y - extent[1], z]));

    let mut dt = PeriodicDelaunayTriangulation::with_domain(domain);
    for point in &points {
        dt.insert(*point).unwrap();
    }
    assert!(dt.validate().is_ok(), "{:?}", dt.validate());
    for (_, vertex) in dt.vertices() {
        assert!(domain.contains(vertex.point()));
    }
    let mut distinct: Vec<[u64; 3]> = points
        .iter()
        .map(|p| domain.wrap(p).unwrap().to_array().map(f64::to_bits))
        .collect();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(dt.number_of_vertices(), distinct.len());
    assert_torus_euler(&dt);

    // Removing the perturbed sites again keeps everything consistent.
    let extra: Vec<VertexKey> = dt
        .vertices()
        .filter(|(_, v)| !points[..64].contains(v.point()))
        .map(|(k, _)| k)
        .collect();
    dt.remove_range(extra).unwrap();
    assert!(dt.validate().is_ok(), "{:?}", dt.validate());
}

// =============================================================================
// MOVE AND REMOVE
// =============================================================================

#[test]
fn test_move_sequence_matches_fresh_construction() {
    let mut points = random_points(15, 33);
    let mut dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    let mut rng = StdRng::seed_from_u64(34);

    for _ in 0..10 {
        let index = rng.random_range(0..points.len());
        let target = Point::new([rng.random(), rng.random(), rng.random()]);
        let key = dt
            .vertices()
            .find(|(_, v)| v.point() == &points[index])
            .map(|(k, _)| k)
            .unwrap();
        dt.move_point(key, target).unwrap();
        points[index] = target;
        assert!(dt.is_valid());
    }

    let fresh = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    assert!(dt == fresh);
}

#[test]
fn test_remove_then_reinsert_restores_triangulation() {
    init_tracing();
    let points = random_points(20, 8);
    let original = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    let mut dt = original.clone();

    let (key, vertex) = dt.vertices().nth(7).map(|(k, v)| (k, *v.point())).unwrap();
    dt.remove(key).unwrap();
    assert_eq!(dt.number_of_vertices(), 19);
    assert!(dt.is_valid());

    dt.insert(vertex).unwrap();
    assert!(dt == original);
}

#[test]
fn test_remove_unknown_vertex_fails() {
    let mut dt = PeriodicDelaunayTriangulation::from_points(&random_points(4, 2), Domain::unit_cube())
        .unwrap();
    let (key, _) = dt.vertices().next().unwrap();
    dt.remove(key).unwrap();
    assert!(matches!(
        dt.remove(key),
        Err(RemovalError::VertexNotFound { .. })
    ));
    assert_eq!(dt.remove_range([key]).unwrap(), 0);
}

// =============================================================================
// QUERIES
// =============================================================================

#[test]
fn test_locate_reports_vertex_hits() {
    let points = random_points(9, 4);
    let dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    for point in &points {
        let location = dt.locate(*point).unwrap();
        assert!(matches!(location.locate_type, LocateType::Vertex(_)));
        let key = location.vertex(dt.tds()).unwrap();
        assert_eq!(dt.tds().vertex(key).unwrap().point(), point);
    }

    let shifted = Point::new([points[0].x() + 1.0, points[0].y() - 2.0, points[0].z()]);
    let location = dt.locate(shifted).unwrap();
    assert!(matches!(location.locate_type, LocateType::Vertex(_)));
}

#[test]
fn test_gabriel_edges_exist_in_every_triangulation() {
    let dt = PeriodicDelaunayTriangulation::from_points(&jittered_lattice(19), Domain::unit_cube())
        .unwrap();
    // The shortest edge is always Gabriel.
    let shortest = dt
        .edges()
        .min_by(|a, b| {
            let la = dt.segment(*a).unwrap().squared_length();
            let lb = dt.segment(*b).unwrap().squared_length();
            la.total_cmp(&lb)
        })
        .unwrap();
    assert!(dt.is_gabriel_edge(shortest));
}

#[test]
fn test_dual_points_are_equidistant_from_cell_vertices() {
    let dt = PeriodicDelaunayTriangulation::from_points(&random_points(12, 14), Domain::unit_cube())
        .unwrap();
    for (cell, _) in dt.cells() {
        let center = dt.dual(cell).unwrap();
        assert!(dt.domain().contains(&center));
        let tetrahedron = dt.tetrahedron(cell).unwrap();
        let lifted_center = tetrahedron.circumcenter().unwrap();
        let r0 = lifted_center.squared_distance(&tetrahedron.vertices[0]);
        for vertex in &tetrahedron.vertices[1..] {
            approx::assert_relative_eq!(
                lifted_center.squared_distance(vertex),
                r0,
                epsilon = 1e-9,
                max_relative = 1e-9
            );
        }
    }
}

// =============================================================================
// DETERMINISM
// =============================================================================

#[test]
fn test_draw_dual_is_identical_for_equal_triangulations() {
    let points = random_points(25, 99);
    let forward = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();

    let mut reversed_points = points.clone();
    reversed_points.reverse();
    let mut backward = PeriodicDelaunayTriangulation::new();
    for point in &reversed_points {
        backward.insert(*point).unwrap();
    }

    assert!(forward == backward);
    assert_eq!(dual_dump(&forward), dual_dump(&backward));

    let dump = dual_dump(&forward);
    let header = dump.lines().next().unwrap();
    assert_eq!(
        header,
        format!("VORONOI {} {}", forward.number_of_cells(), forward.number_of_facets())
    );
    assert_eq!(
        dump.lines().filter(|l| l.starts_with("v ")).count(),
        forward.number_of_cells()
    );
}

#[test]
fn test_hilbert_sorted_construction_matches_plain_insertion() {
    let points = random_points(40, 123);
    let mut sorted = PeriodicDelaunayTriangulation::new();
    sorted.insert_range(points.iter().copied(), true).unwrap();
    let plain = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    assert!(sorted == plain);
}
