//! Geometric kernel abstraction following CGAL's design.
//!
//! The Kernel trait defines the interface for geometric predicates used by
//! the triangulation algorithms. This separation allows swapping between
//! fast floating-point and robust exact-arithmetic implementations. Periodic
//! behaviour (lattice offsets) is layered on top by
//! [`PeriodicKernel`](crate::geometry::periodic::PeriodicKernel); a kernel
//! only ever sees plain points.

use std::fmt::Debug;

use crate::geometry::point::Point;
use crate::geometry::predicates::{
    InSphere, Orientation, exact_insphere, exact_orientation, fast_insphere, fast_orientation,
};

/// Geometric kernel trait defining predicates for triangulation algorithms.
///
/// # Examples
///
/// ```
/// use periodic_delaunay::geometry::kernel::{Kernel, RobustKernel};
/// use periodic_delaunay::geometry::point::Point;
/// use periodic_delaunay::geometry::predicates::{InSphere, Orientation};
///
/// let kernel = RobustKernel::new();
/// let tet = [
///     Point::new([0.0, 0.0, 0.0]),
///     Point::new([1.0, 0.0, 0.0]),
///     Point::new([0.0, 1.0, 0.0]),
///     Point::new([0.0, 0.0, 1.0]),
/// ];
/// assert_eq!(kernel.orientation(&tet), Orientation::POSITIVE);
/// assert_eq!(
///     kernel.in_sphere(&tet, &Point::new([0.25, 0.25, 0.25])),
///     InSphere::INSIDE
/// );
/// ```
pub trait Kernel: Clone + Debug + Send + Sync {
    /// Orientation of the tetrahedron `points`.
    fn orientation(&self, points: &[Point; 4]) -> Orientation;

    /// Position of `test_point` relative to the circumsphere of `simplex`.
    ///
    /// Implementations normalize by the simplex orientation and report
    /// [`InSphere::BOUNDARY`] for flat simplices.
    fn in_sphere(&self, simplex: &[Point; 4], test_point: &Point) -> InSphere;

    /// Whether predicate results are exact.
    ///
    /// Symbolic perturbation is only guaranteed to be consistent with an exact
    /// kernel.
    fn is_exact(&self) -> bool {
        false
    }
}

/// Robust kernel backed by adaptive exact predicates.
///
/// Every sign is certified, which makes the symbolic tie-break of the
/// periodic adapter deterministic. This is the default kernel.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct RobustKernel;

impl RobustKernel {
    /// Create a new robust kernel.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Kernel for RobustKernel {
    #[inline]
    fn orientation(&self, points: &[Point; 4]) -> Orientation {
        exact_orientation(points)
    }

    #[inline]
    fn in_sphere(&self, simplex: &[Point; 4], test_point: &Point) -> InSphere {
        exact_insphere(simplex, test_point)
    }

    fn is_exact(&self) -> bool {
        true
    }
}

/// Fast floating-point kernel.
///
/// Uses plain `f64` determinants. May produce inconsistent answers for
/// degenerate or near-degenerate input; use [`RobustKernel`] when correctness
/// on such input matters.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct FastKernel;

impl FastKernel {
    /// Create a new fast kernel.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Kernel for FastKernel {
    #[inline]
    fn orientation(&self, points: &[Point; 4]) -> Orientation {
        fast_orientation(points)
    }

    #[inline]
    fn in_sphere(&self, simplex: &[Point; 4], test_point: &Point) -> InSphere {
        fast_insphere(simplex, test_point)
    }
}
