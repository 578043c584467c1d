//! Periodic predicate adapter.
//!
//! [`PeriodicKernel`] evaluates a [`Kernel`] on *periodic points*: canonical
//! in-domain points tagged with a lattice [`Offset`]. Every predicate first
//! subtracts the per-axis minimum offset of its arguments, so the answer only
//! depends on relative offsets and offset-zero calls reach the kernel with the
//! original coordinates bit-for-bit.
//!
//! # Symbolic perturbation
//!
//! [`PeriodicKernel::in_sphere_perturbed`] never reports
//! [`InSphere::BOUNDARY`]. When the exact test is zero, each lifted point is
//! treated as if its paraboloid lift were lowered by an infinitesimal that is
//! larger for points that come first in [`PeriodicKernel::compare_lexicographic`].
//! The answer is then decided by the first point in that order whose
//! perturbation is visible:
//!
//! - the query itself: the query drops below the sphere, so it is inside;
//! - vertex `k`: decided by the barycentric sign of the query with respect to
//!   `k`, i.e. the orientation of the simplex with `k` replaced by the query.
//!
//! The order is translation invariant, so every periodic copy of a
//! configuration resolves the same way.
//!
//! # Exactness
//!
//! A lifted coordinate `p + k·L` is usually not a double. With an exact
//! kernel, lifts that round exactly go to the kernel unchanged; any other
//! configuration is decided by [`exact`](crate::geometry::exact) on the
//! unrounded values. A non-exact kernel always sees the rounded lifts.

use std::cmp::Ordering;

use crate::geometry::domain::Domain;
use crate::geometry::exact::{self, LiftedPoint};
use crate::geometry::kernel::{Kernel, RobustKernel};
use crate::geometry::offset::Offset;
use crate::geometry::point::Point;
use crate::geometry::predicates::{InSphere, Orientation};
use crate::geometry::primitives::{Segment, Tetrahedron, Triangle};
use crate::geometry::util;

/// A canonical point together with the lattice copy it is referenced in.
pub type PeriodicPoint = (Point, Offset);

/// Geometric predicates and constructions on periodic points.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::geometry::domain::Domain;
/// use periodic_delaunay::geometry::kernel::RobustKernel;
/// use periodic_delaunay::geometry::offset::Offset;
/// use periodic_delaunay::geometry::periodic::PeriodicKernel;
/// use periodic_delaunay::geometry::point::Point;
/// use periodic_delaunay::geometry::predicates::Orientation;
///
/// let pk = PeriodicKernel::new(Domain::unit_cube(), RobustKernel::new());
/// let o = Offset::ZERO;
/// let x = Offset::new(1, 0, 0);
/// // (0.5,0,0) shifted one period right sits at (1.5,0,0).
/// let tet = [
///     (Point::new([0.9, 0.0, 0.0]), o),
///     (Point::new([0.5, 0.0, 0.0]), x),
///     (Point::new([0.9, 0.5, 0.0]), o),
///     (Point::new([0.9, 0.0, 0.5]), o),
/// ];
/// assert_eq!(pk.orientation(&tet), Orientation::POSITIVE);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodicKernel<K: Kernel = RobustKernel> {
    domain: Domain,
    kernel: K,
}

impl<K: Kernel> PeriodicKernel<K> {
    /// Create an adapter over `domain` evaluating with `kernel`.
    #[must_use]
    pub const fn new(domain: Domain, kernel: K) -> Self {
        Self { domain, kernel }
    }

    /// The fundamental domain.
    #[must_use]
    pub const fn domain(&self) -> &Domain {
        &self.domain
    }

    /// The underlying kernel.
    #[must_use]
    pub const fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Lift periodic points after removing their common minimum offset.
    fn lift_relative<const N: usize>(&self, points: &[PeriodicPoint; N]) -> [Point; N] {
        let base = Offset::component_min(points.iter().map(|(_, o)| *o));
        points.map(|(p, o)| self.domain.lift(&p, o - base))
    }

    /// Unrounded lifts after removing the common minimum offset.
    fn lift_exact<const N: usize>(&self, points: &[PeriodicPoint; N]) -> [LiftedPoint; N] {
        let base = Offset::component_min(points.iter().map(|(_, o)| *o));
        let period = self.domain.extent();
        points.map(|(p, o)| LiftedPoint::new(&p, (o - base).to_array(), period))
    }

    /// Rounded lifts, if the kernel may be evaluated on them.
    fn rounded_if_safe<const N: usize>(&self, lifted: &[LiftedPoint; N]) -> Option<[Point; N]> {
        let mut exact = true;
        let points = lifted.map(|l| {
            let (p, e) = l.rounded();
            exact &= e;
            p
        });
        (exact || !self.kernel.is_exact()).then_some(points)
    }

    /// The position of a periodic point: `p + o ⊙ extent`.
    #[must_use]
    pub fn construct_point(&self, point: &PeriodicPoint) -> Point {
        self.domain.lift(&point.0, point.1)
    }

    /// Lifted segment between two periodic points.
    #[must_use]
    pub fn construct_segment(&self, points: &[PeriodicPoint; 2]) -> Segment {
        Segment::new(
            self.construct_point(&points[0]),
            self.construct_point(&points[1]),
        )
    }

    /// Lifted triangle.
    #[must_use]
    pub fn construct_triangle(&self, points: &[PeriodicPoint; 3]) -> Triangle {
        Triangle::new(points.map(|p| self.construct_point(&p)))
    }

    /// Lifted tetrahedron.
    #[must_use]
    pub fn construct_tetrahedron(&self, points: &[PeriodicPoint; 4]) -> Tetrahedron {
        Tetrahedron::new(points.map(|p| self.construct_point(&p)))
    }

    /// Orientation of four periodic points.
    #[must_use]
    pub fn orientation(&self, points: &[PeriodicPoint; 4]) -> Orientation {
        let lifted = self.lift_exact(points);
        match self.rounded_if_safe(&lifted) {
            Some(rounded) => self.kernel.orientation(&rounded),
            None => Orientation::from_sign(f64::from(exact::orientation_sign(&lifted))),
        }
    }

    /// Exact position of `query` relative to the circumsphere of `simplex`.
    ///
    /// May return [`InSphere::BOUNDARY`] for co-spherical configurations.
    #[must_use]
    pub fn in_sphere(&self, simplex: &[PeriodicPoint; 4], query: &PeriodicPoint) -> InSphere {
        let all = [simplex[0], simplex[1], simplex[2], simplex[3], *query];
        let lifted = self.lift_exact(&all);
        if let Some(r) = self.rounded_if_safe(&lifted) {
            return self.kernel.in_sphere(&[r[0], r[1], r[2], r[3]], &r[4]);
        }
        let [a, b, c, d, q] = lifted;
        let orientation = exact::orientation_sign(&[a, b, c, d]);
        if orientation == 0 {
            return InSphere::BOUNDARY;
        }
        // The lifted determinant is positive inside for negatively oriented
        // simplices.
        let sign = -exact::insphere_sign(&[a, b, c, d], &q) * orientation;
        InSphere::from_sign(f64::from(sign))
    }

    /// Position of `query` relative to the sphere with diameter `segment`.
    ///
    /// An edge is Gabriel when no vertex is [`InSphere::INSIDE`].
    #[must_use]
    pub fn side_of_diametral_sphere(
        &self,
        segment: &[PeriodicPoint; 2],
        query: &PeriodicPoint,
    ) -> InSphere {
        let [a, b, q] = self.lift_exact(&[segment[0], segment[1], *query]);
        let sign = if self.kernel.is_exact() {
            exact::diametral_segment_sign(&a, &b, &q)
        } else {
            exact::float_sign(exact::diametral_segment_polynomial(
                &a.floats(),
                &b.floats(),
                &q.floats(),
            ))
        };
        InSphere::from_sign(f64::from(-sign))
    }

    /// Position of `query` relative to the smallest sphere through
    /// `triangle`.
    ///
    /// Returns `None` for a degenerate (collinear) triangle.
    #[must_use]
    pub fn side_of_diametral_sphere_of_triangle(
        &self,
        triangle: &[PeriodicPoint; 3],
        query: &PeriodicPoint,
    ) -> Option<InSphere> {
        let [a, b, c, q] = self.lift_exact(&[triangle[0], triangle[1], triangle[2], *query]);
        let (area, sign) = if self.kernel.is_exact() {
            (
                exact::triangle_area_sign(&[a, b, c]),
                exact::diametral_triangle_sign(&[a, b, c], &q),
            )
        } else {
            let [fa, fb, fc, fq] = [a, b, c, q].map(|l| l.floats());
            (
                exact::float_sign(exact::triangle_area_polynomial(&fa, &fb, &fc)),
                exact::float_sign(exact::diametral_triangle_polynomial(&fa, &fb, &fc, &fq)),
            )
        };
        (area != 0).then(|| InSphere::from_sign(f64::from(-sign)))
    }

    /// In-sphere test with a deterministic symbolic tie-break.
    ///
    /// Returns [`InSphere::INSIDE`] or [`InSphere::OUTSIDE`], never
    /// [`InSphere::BOUNDARY`], unless the simplex itself is flat.
    #[must_use]
    pub fn in_sphere_perturbed(
        &self,
        simplex: &[PeriodicPoint; 4],
        query: &PeriodicPoint,
    ) -> InSphere {
        let exact = self.in_sphere(simplex, query);
        if exact != InSphere::BOUNDARY {
            return exact;
        }
        let simplex_sign = self.orientation(simplex).sign();
        if simplex_sign == 0 {
            return InSphere::BOUNDARY;
        }

        // Slot 4 stands for the query.
        let at = |i: usize| if i == 4 { query } else { &simplex[i] };
        let mut order = [0_usize, 1, 2, 3, 4];
        order.sort_by(|&a, &b| self.compare_lexicographic(at(a), at(b)).then(b.cmp(&a)));

        for index in order {
            if index == 4 {
                return InSphere::INSIDE;
            }
            let mut replaced = *simplex;
            replaced[index] = *query;
            match self.orientation(&replaced).sign() * simplex_sign {
                s if s > 0 => return InSphere::OUTSIDE,
                s if s < 0 => return InSphere::INSIDE,
                _ => {}
            }
        }
        InSphere::INSIDE
    }

    /// Translation-invariant lexicographic order of lifted points.
    ///
    /// Compares `(offset_x, x)`, then `(offset_y, y)`, then `(offset_z, z)`.
    /// Canonical coordinates lie in `[lo, hi)`, so this is the order of the
    /// exact lifted coordinates.
    #[must_use]
    pub fn compare_lexicographic(&self, a: &PeriodicPoint, b: &PeriodicPoint) -> Ordering {
        let (pa, oa) = a;
        let (pb, ob) = b;
        let (ca, cb) = (pa.ordered(), pb.ordered());
        (0..3)
            .map(|axis| {
                oa.get(axis)
                    .cmp(&ob.get(axis))
                    .then(ca[axis].cmp(&cb[axis]))
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Squared distance between `p + op ⊙ extent` and `q + oq ⊙ extent`.
    #[must_use]
    pub fn squared_distance(&self, p: &Point, q: &Point, op: Offset, oq: Offset) -> f64 {
        let [a, b] = self.lift_relative(&[(*p, op), (*q, oq)]);
        a.squared_distance(&b)
    }

    /// Circumcenter of four periodic points, expressed in their own frame.
    ///
    /// The center is computed on offset-normalized coordinates and then moved
    /// back, so it is independent of the common translation of the arguments.
    #[must_use]
    pub fn circumcenter(&self, points: &[PeriodicPoint; 4]) -> Option<Point> {
        let base = Offset::component_min(points.iter().map(|(_, o)| *o));
        let center = util::circumcenter(&self.lift_relative(points))?;
        Some(self.domain.lift(&center, base))
    }

    /// Squared circumradius of four periodic points; infinite if flat.
    #[must_use]
    pub fn squared_circumradius(&self, points: &[PeriodicPoint; 4]) -> f64 {
        util::squared_circumradius(&self.lift_relative(points))
    }
}

impl Default for PeriodicKernel<RobustKernel> {
    fn default() -> Self {
        Self::new(Domain::default(), RobustKernel::new())
    }
}
