//! Degenerate and boundary configurations for periodic triangulations.
//!
//! These tests cover:
//! - Exact cubic lattices (eight co-spherical points per cube)
//! - Coplanar and collinear point sets
//! - Points on the lower domain boundary and at the upper bound
//! - Duplicates modulo the period
//! - Non-cubic domains
//!
//! Every configuration must construct, validate, satisfy the torus Euler
//! relation and be independent of insertion order.

use periodic_delaunay::prelude::*;

// =============================================================================
// POINT SET GENERATORS
// =============================================================================

/// `n³` points of the exact lattice with spacing `1 / n` in the unit cube.
fn exact_lattice(n: u32) -> Vec<Point> {
    let step = 1.0 / f64::from(n);
    let mut points = Vec::new();
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                points.push(Point::new([
                    f64::from(i) * step,
                    f64::from(j) * step,
                    f64::from(k) * step,
                ]));
            }
        }
    }
    points
}

fn plane_points() -> Vec<Point> {
    vec![
        Point::new([0.1, 0.2, 0.5]),
        Point::new([0.7, 0.1, 0.5]),
        Point::new([0.4, 0.6, 0.5]),
        Point::new([0.9, 0.8, 0.5]),
        Point::new([0.2, 0.9, 0.5]),
    ]
}

fn line_points() -> Vec<Point> {
    vec![
        Point::new([0.1, 0.5, 0.5]),
        Point::new([0.35, 0.5, 0.5]),
        Point::new([0.6, 0.5, 0.5]),
        Point::new([0.85, 0.5, 0.5]),
    ]
}

// =============================================================================
// CONFIGURATION TEST GENERATION
// =============================================================================

/// Generate a test that builds `$points` in `$domain`, checks structural and
/// Delaunay validity and compares against the reversed insertion order.
macro_rules! test_degenerate_config {
    (@body $name:ident, $domain:expr, $points:expr, $expected_vertices:expr, $extra:expr) => {
        pastey::paste! {
            #[test]
            fn [<test_ $name>]() {
                let domain: Domain = $domain;
                let points: Vec<Point> = $points;

                let dt = PeriodicDelaunayTriangulation::from_points(&points, domain)
                    .unwrap_or_else(|err| {
                        panic!("{} failed to construct: {err}", stringify!($name))
                    });
                assert_eq!(dt.number_of_vertices(), $expected_vertices);
                if let Err(err) = dt.validate() {
                    panic!("{} is invalid: {err}", stringify!($name));
                }
                assert_eq!(
                    dt.number_of_vertices() + dt.number_of_facets(),
                    dt.number_of_edges() + dt.number_of_cells()
                );

                let mut reversed = points.clone();
                reversed.reverse();
                let other = PeriodicDelaunayTriangulation::from_points(&reversed, domain).unwrap();
                assert!(dt == other, "{} depends on insertion order", stringify!($name));

                let check: fn(&PeriodicDelaunayTriangulation) = $extra;
                check(&dt);
            }
        }
    };
    ($name:ident, $domain:expr, $points:expr, $expected_vertices:expr, sheets = $sheets:expr) => {
        test_degenerate_config!(
            @body $name,
            $domain,
            $points,
            $expected_vertices,
            |dt: &PeriodicDelaunayTriangulation| assert_eq!(dt.sheets(), $sheets)
        );
    };
    ($name:ident, $domain:expr, $points:expr, $expected_vertices:expr) => {
        test_degenerate_config!(@body $name, $domain, $points, $expected_vertices, |_dt| {});
    };
}

// =============================================================================
// LATTICES
// =============================================================================

test_degenerate_config!(
    lattice_2,
    Domain::unit_cube(),
    exact_lattice(2),
    8,
    sheets = CoveringSheets::Three
);

test_degenerate_config!(lattice_3, Domain::unit_cube(), exact_lattice(3), 27);

// Cube circumradius 0.25·√3/2 is below a quarter of the side.
test_degenerate_config!(
    lattice_4,
    Domain::unit_cube(),
    exact_lattice(4),
    64,
    sheets = CoveringSheets::One
);

test_degenerate_config!(
    lattice_4_shifted_domain,
    Domain::new([-0.5; 3], [0.5; 3]).unwrap(),
    exact_lattice(4)
        .into_iter()
        .map(|p| Point::new(p.to_array().map(|c| c - 0.5)))
        .collect(),
    64,
    sheets = CoveringSheets::One
);

// =============================================================================
// FLAT CONFIGURATIONS
// =============================================================================

test_degenerate_config!(coplanar, Domain::unit_cube(), plane_points(), 5);

test_degenerate_config!(collinear, Domain::unit_cube(), line_points(), 4);

test_degenerate_config!(
    two_points_same_axis,
    Domain::unit_cube(),
    vec![Point::new([0.25, 0.5, 0.5]), Point::new([0.75, 0.5, 0.5])],
    2,
    sheets = CoveringSheets::Three
);

// =============================================================================
// BOUNDARIES AND DUPLICATES
// =============================================================================

test_degenerate_config!(
    lower_boundary,
    Domain::unit_cube(),
    vec![
        Point::new([0.0, 0.0, 0.0]),
        Point::new([0.0, 0.5, 0.25]),
        Point::new([0.5, 0.0, 0.75]),
        Point::new([0.3, 0.7, 0.0]),
    ],
    4
);

// The upper bound wraps onto the lower bound.
test_degenerate_config!(
    upper_bound_wraps,
    Domain::unit_cube(),
    vec![
        Point::new([0.0, 0.0, 0.0]),
        Point::new([1.0, 1.0, 1.0]),
        Point::new([0.5, 0.5, 0.5]),
        Point::new([1.0, 0.2, 0.6]),
    ],
    3
);

test_degenerate_config!(
    duplicates_modulo_period,
    Domain::unit_cube(),
    vec![
        Point::new([0.25, 0.5, 0.75]),
        Point::new([1.25, 0.5, 0.75]),
        Point::new([0.25, -0.5, 0.75]),
        Point::new([0.25, 0.5, 3.75]),
        Point::new([0.6, 0.1, 0.3]),
        Point::new([0.6, 0.1, 0.3]),
    ],
    2
);

// =============================================================================
// NON-CUBIC DOMAINS
// =============================================================================

test_degenerate_config!(
    elongated_domain,
    Domain::new([0.0; 3], [1.6, 1.0, 1.0]).unwrap(),
    vec![
        Point::new([0.2, 0.5, 0.5]),
        Point::new([0.6, 0.25, 0.75]),
        Point::new([1.0, 0.75, 0.25]),
        Point::new([1.4, 0.1, 0.9]),
        Point::new([0.8, 0.9, 0.1]),
    ],
    5,
    sheets = CoveringSheets::Three
);

test_degenerate_config!(
    negative_domain,
    Domain::new([-3.0, -2.0, -1.0], [-1.0, 0.0, 1.0]).unwrap(),
    vec![
        Point::new([-2.5, -1.5, -0.5]),
        Point::new([-1.5, -0.5, 0.5]),
        Point::new([-2.0, -1.0, 0.0]),
        Point::new([-1.2, -1.8, 0.9]),
    ],
    4
);

// =============================================================================
// LATTICE REMOVAL
// =============================================================================

#[test]
fn test_lattice_removal_keeps_triangulation_valid() {
    let points = exact_lattice(4);
    let mut dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
    assert_eq!(dt.sheets(), CoveringSheets::One);

    // Removing a lattice point opens an empty sphere of radius 0.25.
    let (key, _) = dt
        .vertices()
        .find(|(_, v)| v.point() == &Point::new([0.5, 0.5, 0.5]))
        .unwrap();
    dt.remove(key).unwrap();
    assert_eq!(dt.number_of_vertices(), 63);
    assert_eq!(dt.sheets(), CoveringSheets::Three);
    assert!(dt.is_valid());

    dt.insert(Point::new([0.5, 0.5, 0.5])).unwrap();
    assert_eq!(dt.sheets(), CoveringSheets::One);
    assert!(dt == PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap());
}
