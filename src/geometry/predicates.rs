//! Geometric predicates for 3D points.
//!
//! Orientation is reported with the convention that `(p0, p1, p2, p3)` is
//! [`Orientation::POSITIVE`] when `det[p1 - p0, p2 - p0, p3 - p0] > 0`.
//! In-sphere tests are normalized by orientation: [`InSphere::INSIDE`] always
//! means the query lies strictly inside the circumscribed sphere, whatever
//! the vertex order.
//!
//! Two families are provided: adaptive exact predicates backed by the
//! [`robust`] crate (Shewchuk's arithmetic) and plain floating-point
//! determinants evaluated with [`nalgebra`].

use nalgebra::{Matrix3, Matrix4};
use robust::Coord3D;

use crate::geometry::point::Point;

/// Represents the position of a point relative to a circumsphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InSphere {
    /// The point is outside the circumsphere
    OUTSIDE,
    /// The point is on the circumsphere
    BOUNDARY,
    /// The point is inside the circumsphere
    INSIDE,
}

impl std::fmt::Display for InSphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OUTSIDE => write!(f, "OUTSIDE"),
            Self::BOUNDARY => write!(f, "BOUNDARY"),
            Self::INSIDE => write!(f, "INSIDE"),
        }
    }
}

impl InSphere {
    /// Classify from the sign of a determinant where positive means inside.
    #[inline]
    #[must_use]
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Self::INSIDE
        } else if value < 0.0 {
            Self::OUTSIDE
        } else {
            Self::BOUNDARY
        }
    }
}

/// Represents the orientation of a simplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// The simplex has negative orientation (determinant < 0)
    NEGATIVE,
    /// The simplex is degenerate (points are coplanar)
    DEGENERATE,
    /// The simplex has positive orientation (determinant > 0)
    POSITIVE,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NEGATIVE => write!(f, "NEGATIVE"),
            Self::DEGENERATE => write!(f, "DEGENERATE"),
            Self::POSITIVE => write!(f, "POSITIVE"),
        }
    }
}

impl Orientation {
    /// Classify from the sign of a determinant.
    #[inline]
    #[must_use]
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Self::POSITIVE
        } else if value < 0.0 {
            Self::NEGATIVE
        } else {
            Self::DEGENERATE
        }
    }

    /// `-1`, `0` or `+1`.
    #[inline]
    #[must_use]
    pub const fn sign(self) -> i32 {
        match self {
            Self::NEGATIVE => -1,
            Self::DEGENERATE => 0,
            Self::POSITIVE => 1,
        }
    }

    /// The orientation of the simplex with two vertices swapped.
    #[inline]
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::NEGATIVE => Self::POSITIVE,
            Self::DEGENERATE => Self::DEGENERATE,
            Self::POSITIVE => Self::NEGATIVE,
        }
    }
}

#[inline]
fn coord(p: &Point) -> Coord3D<f64> {
    Coord3D {
        x: p.x(),
        y: p.y(),
        z: p.z(),
    }
}

// `robust::orient3d` is positive when the fourth point lies below the plane of
// the first three seen counter-clockwise, i.e. the opposite of our sign.
#[inline]
fn shewchuk_orient3d(points: &[Point; 4]) -> f64 {
    robust::orient3d(
        coord(&points[0]),
        coord(&points[1]),
        coord(&points[2]),
        coord(&points[3]),
    )
}

/// Exact orientation of a tetrahedron.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::geometry::point::Point;
/// use periodic_delaunay::geometry::predicates::{exact_orientation, Orientation};
///
/// let tet = [
///     Point::new([0.0, 0.0, 0.0]),
///     Point::new([1.0, 0.0, 0.0]),
///     Point::new([0.0, 1.0, 0.0]),
///     Point::new([0.0, 0.0, 1.0]),
/// ];
/// assert_eq!(exact_orientation(&tet), Orientation::POSITIVE);
/// ```
#[must_use]
pub fn exact_orientation(points: &[Point; 4]) -> Orientation {
    Orientation::from_sign(shewchuk_orient3d(points)).reversed()
}

/// Exact in-sphere test, independent of the simplex orientation.
///
/// A flat simplex has no circumsphere; every query is reported as
/// [`InSphere::BOUNDARY`].
#[must_use]
pub fn exact_insphere(simplex: &[Point; 4], query: &Point) -> InSphere {
    let orient = shewchuk_orient3d(simplex);
    if orient == 0.0 {
        return InSphere::BOUNDARY;
    }
    let det = robust::insphere(
        coord(&simplex[0]),
        coord(&simplex[1]),
        coord(&simplex[2]),
        coord(&simplex[3]),
        coord(query),
    );
    InSphere::from_sign(det * orient.signum())
}

/// Floating-point orientation of a tetrahedron.
#[must_use]
pub fn fast_orientation(points: &[Point; 4]) -> Orientation {
    let p0 = points[0].coords();
    let row = |p: &Point| {
        let c = p.coords();
        [c[0] - p0[0], c[1] - p0[1], c[2] - p0[2]]
    };
    let (a, b, c) = (row(&points[1]), row(&points[2]), row(&points[3]));
    let m = Matrix3::new(a[0], a[1], a[2], b[0], b[1], b[2], c[0], c[1], c[2]);
    Orientation::from_sign(m.determinant())
}

/// Floating-point in-sphere test, independent of the simplex orientation.
#[must_use]
pub fn fast_insphere(simplex: &[Point; 4], query: &Point) -> InSphere {
    let orientation = fast_orientation(simplex);
    if orientation == Orientation::DEGENERATE {
        return InSphere::BOUNDARY;
    }
    let q = query.coords();
    let mut m = Matrix4::zeros();
    for (i, p) in simplex.iter().enumerate() {
        let c = p.coords();
        let (dx, dy, dz) = (c[0] - q[0], c[1] - q[1], c[2] - q[2]);
        m[(i, 0)] = dx;
        m[(i, 1)] = dy;
        m[(i, 2)] = dz;
        m[(i, 3)] = dx * dx + dy * dy + dz * dz;
    }
    // The lifted determinant is negative for inside queries on positive simplices.
    let det = m.determinant() * f64::from(-orientation.sign());
    InSphere::from_sign(det)
}
