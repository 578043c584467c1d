//! Data and operations on 3D points.
//!
//! # Floating-Point Equality Semantics
//!
//! `Point` equality, hashing and ordering use the total order of
//! [`OrderedFloat`], so points can be used as keys in hash-based collections and
//! sorted deterministically. Points stored in a triangulation are always finite;
//! the relaxed semantics only matter for user-constructed points.

#![forbid(unsafe_code)]

use ordered_float::OrderedFloat;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

// =============================================================================
// POINT STRUCT DEFINITION
// =============================================================================

/// A point in three-dimensional Euclidean space.
///
/// Points are intended to be immutable once created, so the `coords` field is
/// private.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::geometry::point::Point;
///
/// let p = Point::new([1.0, 2.0, 3.0]);
/// assert_eq!(p.coords(), &[1.0, 2.0, 3.0]);
/// assert_eq!(p.x(), 1.0);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Point {
    /// The coordinates of the point.
    coords: [f64; 3],
}

// =============================================================================
// PUBLIC API
// =============================================================================

impl Point {
    /// Create a new point from its coordinates.
    #[inline]
    #[must_use]
    pub const fn new(coords: [f64; 3]) -> Self {
        Self { coords }
    }

    /// Returns a reference to the point's coordinates.
    #[inline]
    #[must_use]
    pub const fn coords(&self) -> &[f64; 3] {
        &self.coords
    }

    /// Returns the coordinates by value.
    #[inline]
    #[must_use]
    pub const fn to_array(&self) -> [f64; 3] {
        self.coords
    }

    /// The x coordinate.
    #[inline]
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.coords[0]
    }

    /// The y coordinate.
    #[inline]
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.coords[1]
    }

    /// The z coordinate.
    #[inline]
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.coords[2]
    }

    /// Returns `true` if every coordinate is finite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.coords.iter().all(|c| c.is_finite())
    }

    /// Squared Euclidean distance to `other`.
    ///
    /// ```rust
    /// use periodic_delaunay::geometry::point::Point;
    ///
    /// let a = Point::new([0.0, 0.0, 0.0]);
    /// let b = Point::new([1.0, 2.0, 2.0]);
    /// assert_eq!(a.squared_distance(&b), 9.0);
    /// ```
    #[must_use]
    pub fn squared_distance(&self, other: &Self) -> f64 {
        self.coords
            .iter()
            .zip(other.coords.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Lexicographic comparison using the total order of `f64`.
    #[must_use]
    pub fn lexicographic_cmp(&self, other: &Self) -> Ordering {
        self.ordered().cmp(&other.ordered())
    }

    /// The coordinates wrapped in [`OrderedFloat`].
    #[inline]
    #[must_use]
    pub fn ordered(&self) -> [OrderedFloat<f64>; 3] {
        self.coords.map(OrderedFloat)
    }
}

// =============================================================================
// STANDARD TRAIT IMPLEMENTATIONS
// =============================================================================

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordered().hash(state);
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.ordered() == other.ordered()
    }
}

impl Eq for Point {}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lexicographic_cmp(other)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.coords[0], self.coords[1], self.coords[2])
    }
}

impl From<[f64; 3]> for Point {
    fn from(coords: [f64; 3]) -> Self {
        Self::new(coords)
    }
}

impl From<Point> for [f64; 3] {
    fn from(point: Point) -> Self {
        point.coords
    }
}

impl From<&Point> for [f64; 3] {
    fn from(point: &Point) -> Self {
        point.coords
    }
}

// Points serialize as a plain 3-tuple; only finite coordinates round-trip.
impl Serialize for Point {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeTuple;
        let mut tuple = serializer.serialize_tuple(3)?;
        for coord in &self.coords {
            tuple.serialize_element(coord)?;
        }
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let coords = <[f64; 3]>::deserialize(deserializer)?;
        if let Some(index) = coords.iter().position(|c| !c.is_finite()) {
            return Err(D::Error::custom(format!(
                "coordinate {index} of point {coords:?} is not finite"
            )));
        }
        Ok(Self::new(coords))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collections::FastHashSet;

    #[test]
    fn point_accessors() {
        let p = Point::new([1.5, -2.0, 3.25]);
        assert_eq!(p.x(), 1.5);
        assert_eq!(p.y(), -2.0);
        assert_eq!(p.z(), 3.25);
        assert_eq!(p.to_array(), [1.5, -2.0, 3.25]);
        let arr: [f64; 3] = p.into();
        assert_eq!(arr, [1.5, -2.0, 3.25]);
    }

    #[test]
    fn point_hash_and_eq_are_consistent() {
        let mut set = FastHashSet::default();
        set.insert(Point::new([0.0, 1.0, 2.0]));
        set.insert(Point::new([0.0, 1.0, 2.0]));
        set.insert(Point::new([0.0, 1.0, 2.5]));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn point_ordering_is_lexicographic() {
        let a = Point::new([0.0, 5.0, 5.0]);
        let b = Point::new([0.0, 6.0, 0.0]);
        let c = Point::new([1.0, 0.0, 0.0]);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.lexicographic_cmp(&a), Ordering::Equal);
    }

    #[test]
    fn point_serde_round_trip() {
        let p = Point::new([0.125, -7.5, 1e-3]);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "[0.125,-7.5,0.001]");
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn point_deserialize_rejects_wrong_arity() {
        assert!(serde_json::from_str::<Point>("[1.0, 2.0]").is_err());
        assert!(serde_json::from_str::<Point>("[1.0, 2.0, null]").is_err());
    }

    #[test]
    fn point_is_finite() {
        assert!(Point::new([1.0, 2.0, 3.0]).is_finite());
        assert!(!Point::new([f64::NAN, 2.0, 3.0]).is_finite());
        assert!(!Point::new([1.0, f64::INFINITY, 3.0]).is_finite());
    }
}
