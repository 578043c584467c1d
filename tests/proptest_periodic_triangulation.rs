//! Property-based tests for periodic Delaunay triangulations.
//!
//! This module uses proptest to verify properties that must hold for every
//! point set on the flat torus:
//! - Structural, orientation and Delaunay validity
//! - The torus Euler relation and facet/cell count relation
//! - Independence from insertion order and from the copy a point is given in
//! - Nearest-vertex queries agreeing with brute force
//! - Removal undoing insertion
//! - Points a few ulps away from existing vertices

use approx::relative_eq;
use periodic_delaunay::prelude::*;
use proptest::prelude::*;

// =============================================================================
// TEST CONFIGURATION
// =============================================================================

/// Strategy for coordinates inside the unit cube.
fn unit_coordinate() -> impl Strategy<Value = f64> {
    (0.0..1.0).prop_filter("must be finite", |x: &f64| x.is_finite())
}

fn unit_point() -> impl Strategy<Value = Point> {
    prop::array::uniform3(unit_coordinate()).prop_map(Point::new)
}

fn unit_points(max: usize) -> impl Strategy<Value = Vec<Point>> {
    prop::collection::vec(unit_point(), 1..=max)
}

/// Lattice shifts applied to a point to produce another copy of it.
fn lattice_shift() -> impl Strategy<Value = [i32; 3]> {
    prop::array::uniform3(-3_i32..=3)
}

/// Move a coordinate by `steps` units in the last place.
fn nudge(x: f64, steps: i32) -> f64 {
    let mut x = x;
    for _ in 0..steps.unsigned_abs() {
        x = if steps > 0 { x.next_up() } else { x.next_down() };
    }
    x
}

/// Strategy for a point set followed by copies of some of its points moved
/// by one or two ulps along one axis.
fn points_with_ulp_neighbors(max: usize) -> impl Strategy<Value = Vec<Point>> {
    let nudges = prop::collection::vec(
        (any::<prop::sample::Index>(), 0_usize..3, prop_oneof![Just(-2), Just(-1), Just(1), Just(2)]),
        1..=4,
    );
    (unit_points(max), nudges).prop_map(|(mut points, nudges)| {
        let originals = points.clone();
        for (index, axis, steps) in nudges {
            let mut coords = index.get(&originals).to_array();
            coords[axis] = nudge(coords[axis], steps);
            if (0.0..1.0).contains(&coords[axis]) {
                points.push(Point::new(coords));
            }
        }
        points
    })
}

/// Squared distance on the unit torus.
fn torus_squared_distance(p: &Point, q: &Point) -> f64 {
    p.to_array()
        .iter()
        .zip(q.to_array())
        .map(|(a, b)| {
            let d = (a - b).abs();
            let d = d.min(1.0 - d);
            d * d
        })
        .sum()
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: every constructed triangulation validates.
    #[test]
    fn prop_triangulation_is_valid(points in unit_points(16)) {
        let dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
        prop_assert!(dt.validate().is_ok(), "{:?}", dt.validate());
        for (_, vertex) in dt.vertices() {
            prop_assert!(dt.domain().contains(vertex.point()));
        }
    }

    /// Property: V - E + F - C = 0 and every cell has four facets shared by two.
    #[test]
    fn prop_torus_euler_relation(points in unit_points(16)) {
        let dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
        prop_assert_eq!(
            dt.number_of_vertices() + dt.number_of_facets(),
            dt.number_of_edges() + dt.number_of_cells()
        );
        prop_assert_eq!(dt.number_of_facets(), 2 * dt.number_of_cells());
        let copies = dt.sheets().copies();
        prop_assert_eq!(dt.number_of_stored_cells(), copies * dt.number_of_cells());
    }

    /// Property: insertion order does not change the triangulation.
    #[test]
    fn prop_insertion_order_independent(points in unit_points(12)) {
        let forward = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
        let mut reversed = points.clone();
        reversed.reverse();
        let backward = PeriodicDelaunayTriangulation::from_points(&reversed, Domain::unit_cube()).unwrap();
        prop_assert!(forward == backward);
    }

    /// Property: a point given in any lattice copy lands on the same vertex.
    #[test]
    fn prop_shifted_copy_is_duplicate(points in unit_points(8), shift in lattice_shift()) {
        let mut dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
        let count = dt.number_of_vertices();
        let original = points[0];
        let shifted = Point::new([
            original.x() + f64::from(shift[0]),
            original.y() + f64::from(shift[1]),
            original.z() + f64::from(shift[2]),
        ]);
        // Adding an integer may round; only exact copies must coincide.
        let wrapped = dt.domain().wrap(&shifted).unwrap();
        let key = dt.insert(shifted).unwrap();
        if wrapped == original {
            prop_assert_eq!(dt.number_of_vertices(), count);
            prop_assert_eq!(dt.tds().vertex(key).unwrap().point(), &original);
        } else {
            prop_assert_eq!(dt.tds().vertex(key).unwrap().point(), &wrapped);
        }
        prop_assert!(dt.validate().is_ok(), "{:?}", dt.validate());
    }

    /// Property: points one or two ulps from existing vertices are inserted
    /// as distinct vertices and every cell stays positively oriented.
    #[test]
    fn prop_ulp_neighbors_keep_triangulation_valid(points in points_with_ulp_neighbors(12)) {
        let dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
        prop_assert!(dt.validate().is_ok(), "{:?}", dt.validate());
        let mut distinct: Vec<[u64; 3]> =
            points.iter().map(|p| p.to_array().map(f64::to_bits)).collect();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(dt.number_of_vertices(), distinct.len());
    }

    /// Property: the nearest vertex is at the minimal torus distance.
    #[test]
    fn prop_nearest_vertex_matches_brute_force(points in unit_points(12), query in unit_point()) {
        let dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
        let found = dt.nearest_vertex(query).unwrap().unwrap();
        let found_distance = torus_squared_distance(dt.tds().vertex(found).unwrap().point(), &query);
        let best = dt
            .vertices()
            .map(|(_, v)| torus_squared_distance(v.point(), &query))
            .fold(f64::INFINITY, f64::min);
        prop_assert!(
            relative_eq!(found_distance, best, epsilon = 1e-12, max_relative = 1e-12),
            "found {} but best is {}",
            found_distance,
            best
        );
    }

    /// Property: inserting then removing a point restores the triangulation.
    #[test]
    fn prop_remove_undoes_insert(points in unit_points(10), extra in unit_point()) {
        let original = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
        prop_assume!(original.vertices().all(|(_, v)| v.point() != &extra));

        let mut dt = original.clone();
        let key = dt.insert(extra).unwrap();
        prop_assert_eq!(dt.number_of_vertices(), original.number_of_vertices() + 1);
        dt.remove(key).unwrap();
        prop_assert!(dt.is_valid());
        prop_assert!(dt == original);
    }

    /// Property: a point strictly inside the circumsphere of its located cell
    /// has a conflict region containing that cell and a closed boundary.
    #[test]
    fn prop_conflict_region_is_closed(points in unit_points(10), query in unit_point()) {
        let dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
        let location = dt.locate(query).unwrap();
        prop_assume!(matches!(location.locate_type, LocateType::Cell));
        let start = location.cell.unwrap();

        let mut boundary: Vec<ConflictFacet> = Vec::new();
        let mut cells: Vec<ConflictCell> = Vec::new();
        let mut internal: Vec<ConflictFacet> = Vec::new();
        dt.find_conflicts(query, start, &mut boundary, &mut cells, &mut internal).unwrap();

        prop_assert!(cells.iter().any(|c| c.cell == start));
        // Each conflict cell has four facets, each boundary or shared by two.
        prop_assert_eq!(4 * cells.len(), boundary.len() + 2 * internal.len());
        // A closed triangulated surface has an even number of triangles.
        prop_assert_eq!(boundary.len() % 2, 0);
    }
}

// =============================================================================
// PINNED CASES
// =============================================================================

/// Shrunk input of `prop_shifted_copy_is_duplicate`: `x + 1` rounds, so the
/// wrapped point lands two ulps below the stored one.
#[test]
fn shifted_copy_that_rounds_becomes_a_new_vertex() {
    let points = [
        Point::new([0.584_463_925_280_558_5, 0.0, 0.0]),
        Point::new([0.0, 0.240_353_237_728_603_5, 0.408_023_583_879_581_9]),
    ];
    let mut dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    let shifted = Point::new([points[0].x() + 1.0, 0.0, 0.0]);
    let wrapped = dt.domain().wrap(&shifted).unwrap();
    assert_ne!(wrapped, points[0]);

    let key = dt.insert(shifted).unwrap();
    assert_eq!(dt.number_of_vertices(), 3);
    assert_eq!(dt.tds().vertex(key).unwrap().point(), &wrapped);
    assert!(dt.validate().is_ok(), "{:?}", dt.validate());
}

/// Exact copies in other lattice cells still coincide.
#[test]
fn shifted_copy_that_is_exact_is_a_duplicate() {
    let points = [Point::new([0.25, 0.5, 0.75]), Point::new([0.625, 0.125, 0.375])];
    let mut dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    let first = dt
        .vertices()
        .find(|(_, v)| v.point() == &points[0])
        .map(|(k, _)| k)
        .unwrap();
    assert_eq!(dt.insert(Point::new([-2.75, 1.5, 3.75])).unwrap(), first);
    assert_eq!(dt.number_of_vertices(), 2);
}
