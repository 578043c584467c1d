//! Property-based tests for serialization/deserialization roundtrips.
//!
//! This module uses proptest to verify that JSON persistence preserves:
//! - The domain, the covering and every vertex UUID
//! - Logical and stored counts
//! - Validity of the rebuilt triangulation
//! - The exact data transfer object on a second roundtrip

use approx::relative_eq;
use periodic_delaunay::prelude::*;
use proptest::prelude::*;

/// Check if two points are approximately equal (coordinate-wise)
fn points_approx_equal(p1: &Point, p2: &Point) -> bool {
    p1.coords()
        .iter()
        .zip(p2.coords().iter())
        .all(|(a, b)| relative_eq!(a, b, epsilon = 1e-14, max_relative = 1e-14))
}

// =============================================================================
// TEST CONFIGURATION
// =============================================================================

/// Strategy for coordinates spanning a few periods of the domain.
fn finite_coordinate() -> impl Strategy<Value = f64> {
    (-3.0..3.0).prop_filter("must be finite", |x: &f64| x.is_finite())
}

fn points(max: usize) -> impl Strategy<Value = Vec<Point>> {
    prop::collection::vec(
        prop::array::uniform3(finite_coordinate()).prop_map(Point::new),
        0..=max,
    )
}

fn domain() -> impl Strategy<Value = Domain> {
    (
        prop::array::uniform3(-2.0_f64..2.0),
        prop::array::uniform3(1.0_f64..1.5),
    )
        .prop_map(|(lo, extent)| {
            Domain::new(lo, [lo[0] + extent[0], lo[1] + extent[1], lo[2] + extent[2]]).unwrap()
        })
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: triangulation structure preserved after JSON roundtrip
    #[test]
    fn prop_triangulation_json_roundtrip(points in points(12), domain in domain()) {
        let dt = PeriodicDelaunayTriangulation::from_points(&points, domain).unwrap();
        let json = serde_json::to_string(&dt).expect("Serialization failed");
        let restored: PeriodicDelaunayTriangulation =
            serde_json::from_str(&json).expect("Deserialization failed");

        prop_assert_eq!(restored.domain(), dt.domain());
        prop_assert_eq!(restored.sheets(), dt.sheets());
        prop_assert_eq!(restored.number_of_vertices(), dt.number_of_vertices());
        prop_assert_eq!(restored.number_of_cells(), dt.number_of_cells());
        prop_assert_eq!(restored.number_of_edges(), dt.number_of_edges());
        prop_assert_eq!(restored.number_of_stored_cells(), dt.number_of_stored_cells());
        prop_assert!(restored == dt);
    }

    /// Property: deserialized triangulation remains valid and keeps identities
    #[test]
    fn prop_deserialized_triangulation_is_valid(points in points(12), domain in domain()) {
        let dt = PeriodicDelaunayTriangulation::from_points(&points, domain).unwrap();
        let mut buffer = Vec::new();
        dt.write_to(&mut buffer).unwrap();
        let restored = PeriodicDelaunayTriangulation::<RobustKernel>::read_from(buffer.as_slice()).unwrap();

        prop_assert!(restored.validate().is_ok(), "{:?}", restored.validate());
        for (_, vertex) in dt.vertices() {
            let twin = restored
                .vertices()
                .find(|(_, v)| v.uuid() == vertex.uuid())
                .map(|(_, v)| *v.point());
            prop_assert!(twin.is_some(), "UUID {} lost", vertex.uuid());
            prop_assert!(points_approx_equal(&twin.unwrap(), vertex.point()));
        }
    }

    /// Property: a second roundtrip reproduces the data transfer object
    #[test]
    fn prop_dto_is_stable(points in points(10)) {
        let dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
        let dto = dt.to_dto().unwrap();
        let restored =
            PeriodicDelaunayTriangulation::from_dto(&dto, RobustKernel::new(), ConstructionOptions::default())
                .unwrap();
        prop_assert_eq!(restored.to_dto().unwrap(), dto);
    }

    /// Property: the restored triangulation accepts further edits
    #[test]
    fn prop_restored_triangulation_is_editable(points in points(10), extra in prop::array::uniform3(0.0_f64..1.0)) {
        let dt = PeriodicDelaunayTriangulation::from_points(&points, Domain::unit_cube()).unwrap();
        let json = serde_json::to_string(&dt).unwrap();
        let mut restored: PeriodicDelaunayTriangulation = serde_json::from_str(&json).unwrap();
        let mut original = dt.clone();

        restored.insert(Point::new(extra)).unwrap();
        original.insert(Point::new(extra)).unwrap();
        prop_assert!(restored == original);
        prop_assert!(restored.is_valid());
    }
}
