//! Circumsphere and distance computations.
//!
//! These are constructions, not predicates: they run in plain `f64` through
//! [`nalgebra`] and are used for duals, Gabriel tests and the covering
//! criterion, never for combinatorial decisions that need exact signs.

use nalgebra::{Matrix3, Vector3};

use crate::geometry::point::Point;

#[inline]
fn vector(p: &Point) -> Vector3<f64> {
    Vector3::new(p.x(), p.y(), p.z())
}

#[inline]
fn point(v: &Vector3<f64>) -> Point {
    Point::new([v.x, v.y, v.z])
}

/// Circumcenter of a tetrahedron, or `None` if it is flat.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::geometry::point::Point;
/// use periodic_delaunay::geometry::util::circumcenter;
///
/// let tet = [
///     Point::new([0.0, 0.0, 0.0]),
///     Point::new([2.0, 0.0, 0.0]),
///     Point::new([0.0, 2.0, 0.0]),
///     Point::new([0.0, 0.0, 2.0]),
/// ];
/// assert_eq!(circumcenter(&tet), Some(Point::new([1.0, 1.0, 1.0])));
/// ```
#[must_use]
pub fn circumcenter(points: &[Point; 4]) -> Option<Point> {
    let origin = vector(&points[0]);
    let mut rows = [Vector3::zeros(); 3];
    let mut rhs = Vector3::zeros();
    for i in 0..3 {
        let d = vector(&points[i + 1]) - origin;
        rows[i] = d * 2.0;
        rhs[i] = d.norm_squared();
    }
    let a = Matrix3::from_rows(&[rows[0].transpose(), rows[1].transpose(), rows[2].transpose()]);
    let relative = a.lu().solve(&rhs)?;
    if !relative.iter().all(|c| c.is_finite()) {
        return None;
    }
    Some(point(&(origin + relative)))
}

/// Squared circumradius of a tetrahedron; infinite if it is flat.
#[must_use]
pub fn squared_circumradius(points: &[Point; 4]) -> f64 {
    circumcenter(points).map_or(f64::INFINITY, |c| c.squared_distance(&points[0]))
}

/// Center of the circle through three points, or `None` if they are collinear.
///
/// This is also the center of the smallest sphere through the three points.
#[must_use]
pub fn triangle_circumcenter(points: &[Point; 3]) -> Option<Point> {
    let a = vector(&points[0]);
    let u = vector(&points[1]) - a;
    let v = vector(&points[2]) - a;
    let w = u.cross(&v);
    let denom = 2.0 * w.norm_squared();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let relative = (v.cross(&w) * u.norm_squared() + w.cross(&u) * v.norm_squared()) / denom;
    Some(point(&(a + relative)))
}

/// Midpoint of two points.
#[must_use]
pub fn midpoint(a: &Point, b: &Point) -> Point {
    point(&((vector(a) + vector(b)) * 0.5))
}

/// Signed volume of a tetrahedron (positive for positive orientation).
#[must_use]
pub fn signed_volume(points: &[Point; 4]) -> f64 {
    let origin = vector(&points[0]);
    let a = vector(&points[1]) - origin;
    let b = vector(&points[2]) - origin;
    let c = vector(&points[3]) - origin;
    a.dot(&b.cross(&c)) / 6.0
}
