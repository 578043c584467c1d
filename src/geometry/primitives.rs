//! Lifted geometric primitives.
//!
//! Segments, triangles and tetrahedra built from periodic points once their
//! offsets have been applied. They are plain value types used by the query
//! layer (duals, Gabriel tests) and handed out to callers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::point::Point;
use crate::geometry::util::{circumcenter, midpoint, signed_volume, triangle_circumcenter};

/// A straight segment between two points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    /// Source point.
    pub source: Point,
    /// Target point.
    pub target: Point,
}

impl Segment {
    /// Create a new segment.
    #[must_use]
    pub const fn new(source: Point, target: Point) -> Self {
        Self { source, target }
    }

    /// Squared length of the segment.
    #[must_use]
    pub fn squared_length(&self) -> f64 {
        self.source.squared_distance(&self.target)
    }

    /// Midpoint of the segment.
    #[must_use]
    pub fn midpoint(&self) -> Point {
        midpoint(&self.source, &self.target)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} -> {}]", self.source, self.target)
    }
}

/// A triangle given by its three corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    /// Corners in order.
    pub vertices: [Point; 3],
}

impl Triangle {
    /// Create a new triangle.
    #[must_use]
    pub const fn new(vertices: [Point; 3]) -> Self {
        Self { vertices }
    }

    /// Center of the smallest sphere through the three corners.
    #[must_use]
    pub fn circumcenter(&self) -> Option<Point> {
        triangle_circumcenter(&self.vertices)
    }
}

/// A tetrahedron given by its four corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tetrahedron {
    /// Corners in order.
    pub vertices: [Point; 4],
}

impl Tetrahedron {
    /// Create a new tetrahedron.
    #[must_use]
    pub const fn new(vertices: [Point; 4]) -> Self {
        Self { vertices }
    }

    /// Circumcenter, or `None` when flat.
    #[must_use]
    pub fn circumcenter(&self) -> Option<Point> {
        circumcenter(&self.vertices)
    }

    /// Signed volume; positive for positively oriented corners.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        signed_volume(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn segment_measures() {
        let s = Segment::new(Point::new([0.0, 0.0, 0.0]), Point::new([2.0, 0.0, 0.0]));
        assert_relative_eq!(s.squared_length(), 4.0);
        assert_eq!(s.midpoint(), Point::new([1.0, 0.0, 0.0]));
        assert_eq!(s.to_string(), "[(0, 0, 0) -> (2, 0, 0)]");
    }

    #[test]
    fn tetrahedron_volume_sign_follows_orientation() {
        let t = Tetrahedron::new([
            Point::new([0.0, 0.0, 0.0]),
            Point::new([1.0, 0.0, 0.0]),
            Point::new([0.0, 1.0, 0.0]),
            Point::new([0.0, 0.0, 1.0]),
        ]);
        assert!(t.signed_volume() > 0.0);
        let [a, b, c, d] = t.vertices;
        assert!(Tetrahedron::new([b, a, c, d]).signed_volume() < 0.0);
        assert!(t.circumcenter().is_some());
        assert!(Triangle::new([a, b, c]).circumcenter().is_some());
    }
}
