//! The periodic fundamental domain.
//!
//! A [`Domain`] is an axis-aligned, half-open cuboid `[lo, hi)` whose periodic
//! replication tiles space. Points outside the domain are wrapped back into it
//! (Euclidean remainder per axis) and periodic copies are addressed with integer
//! [`Offset`]s in units of the domain extent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::offset::Offset;
use crate::geometry::point::Point;

/// Errors raised when building a [`Domain`].
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum DomainError {
    /// A bound is NaN or infinite.
    #[error("Non-finite domain bound on axis {axis}: lo = {lo}, hi = {hi}")]
    NonFiniteBound {
        /// Axis index.
        axis: usize,
        /// Lower bound on that axis.
        lo: f64,
        /// Upper bound on that axis.
        hi: f64,
    },
    /// The extent along an axis is not strictly positive.
    #[error("Empty domain extent on axis {axis}: lo = {lo} must be < hi = {hi}")]
    EmptyExtent {
        /// Axis index.
        axis: usize,
        /// Lower bound on that axis.
        lo: f64,
        /// Upper bound on that axis.
        hi: f64,
    },
    /// The longest side is too long relative to the shortest side for the
    /// 27-sheet covering to be a triangulation.
    #[error(
        "Domain is too anisotropic: longest side {longest} must be shorter than sqrt(3) times the shortest side {shortest}"
    )]
    TooAnisotropic {
        /// Longest extent.
        longest: f64,
        /// Shortest extent.
        shortest: f64,
    },
    /// A point with a NaN or infinite coordinate cannot be wrapped.
    #[error("Non-finite coordinate on axis {axis}: {value}")]
    NonFiniteCoordinate {
        /// Axis index.
        axis: usize,
        /// Offending value.
        value: f64,
    },
}

/// Axis-aligned half-open cuboid `[lo, hi)` used as the fundamental domain.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::geometry::domain::Domain;
/// use periodic_delaunay::geometry::point::Point;
///
/// let domain = Domain::new([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]).unwrap();
/// assert_eq!(domain.extent(), [2.0, 2.0, 2.0]);
///
/// let wrapped = domain.wrap(&Point::new([1.5, -1.0, 3.0])).unwrap();
/// assert_eq!(wrapped, Point::new([-0.5, -1.0, -1.0]));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DomainBounds", into = "DomainBounds")]
pub struct Domain {
    lo: [f64; 3],
    hi: [f64; 3],
    extent: [f64; 3],
}

#[derive(Serialize, Deserialize)]
struct DomainBounds {
    lo: [f64; 3],
    hi: [f64; 3],
}

impl TryFrom<DomainBounds> for Domain {
    type Error = DomainError;

    fn try_from(bounds: DomainBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.lo, bounds.hi)
    }
}

impl From<Domain> for DomainBounds {
    fn from(domain: Domain) -> Self {
        Self {
            lo: domain.lo,
            hi: domain.hi,
        }
    }
}

impl Default for Domain {
    /// The unit cube `[0, 1)^3`.
    fn default() -> Self {
        Self::unit_cube()
    }
}

impl Domain {
    /// Create a domain from its lower and upper corners.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if a bound is not finite, an extent is not
    /// strictly positive, or the longest side is not shorter than `√3` times the
    /// shortest side.
    pub fn new(lo: [f64; 3], hi: [f64; 3]) -> Result<Self, DomainError> {
        let mut extent = [0.0; 3];
        for axis in 0..3 {
            if !lo[axis].is_finite() || !hi[axis].is_finite() {
                return Err(DomainError::NonFiniteBound {
                    axis,
                    lo: lo[axis],
                    hi: hi[axis],
                });
            }
            if lo[axis] >= hi[axis] {
                return Err(DomainError::EmptyExtent {
                    axis,
                    lo: lo[axis],
                    hi: hi[axis],
                });
            }
            extent[axis] = hi[axis] - lo[axis];
        }
        let longest = extent.iter().copied().fold(f64::MIN, f64::max);
        let shortest = extent.iter().copied().fold(f64::MAX, f64::min);
        if longest * longest >= 3.0 * shortest * shortest {
            return Err(DomainError::TooAnisotropic { longest, shortest });
        }
        Ok(Self { lo, hi, extent })
    }

    /// Create a domain from six scalar bounds, in the order
    /// `xmin, ymin, zmin, xmax, ymax, zmax`.
    ///
    /// # Errors
    ///
    /// See [`Domain::new`].
    pub fn from_bounds(
        xmin: f64,
        ymin: f64,
        zmin: f64,
        xmax: f64,
        ymax: f64,
        zmax: f64,
    ) -> Result<Self, DomainError> {
        Self::new([xmin, ymin, zmin], [xmax, ymax, zmax])
    }

    /// The unit cube `[0, 1)^3`.
    #[must_use]
    pub const fn unit_cube() -> Self {
        Self {
            lo: [0.0; 3],
            hi: [1.0; 3],
            extent: [1.0; 3],
        }
    }

    /// Lower corner (inclusive).
    #[must_use]
    pub const fn lo(&self) -> [f64; 3] {
        self.lo
    }

    /// Upper corner (exclusive).
    #[must_use]
    pub const fn hi(&self) -> [f64; 3] {
        self.hi
    }

    /// Side lengths.
    #[must_use]
    pub const fn extent(&self) -> [f64; 3] {
        self.extent
    }

    /// Shortest side length.
    #[must_use]
    pub fn min_extent(&self) -> f64 {
        self.extent.iter().copied().fold(f64::MAX, f64::min)
    }

    /// Returns `true` if `point` lies in the half-open domain.
    #[must_use]
    pub fn contains(&self, point: &Point) -> bool {
        point
            .coords()
            .iter()
            .enumerate()
            .all(|(axis, &c)| c >= self.lo[axis] && c < self.hi[axis])
    }

    /// Wrap a point into the half-open domain.
    ///
    /// Coordinates already inside the domain are returned bit-for-bit; others
    /// are reduced with the Euclidean remainder of the extent. The result is
    /// never equal to the upper bound.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NonFiniteCoordinate`] for NaN or infinite
    /// coordinates.
    pub fn wrap(&self, point: &Point) -> Result<Point, DomainError> {
        Ok(self.wrap_with_offset(point)?.0)
    }

    /// Wrap a point and also return the lattice offset `o` such that
    /// `point ≈ wrapped + o ⊙ extent`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NonFiniteCoordinate`] for NaN or infinite
    /// coordinates.
    pub fn wrap_with_offset(&self, point: &Point) -> Result<(Point, Offset), DomainError> {
        let mut coords = point.to_array();
        let mut offset = [0_i32; 3];
        for axis in 0..3 {
            let value = coords[axis];
            if !value.is_finite() {
                return Err(DomainError::NonFiniteCoordinate { axis, value });
            }
            if value >= self.lo[axis] && value < self.hi[axis] {
                continue;
            }
            let shifted = value - self.lo[axis];
            let period = self.extent[axis];
            let mut wrapped = self.lo[axis] + shifted.rem_euclid(period);
            if wrapped >= self.hi[axis] || wrapped < self.lo[axis] {
                wrapped = self.lo[axis];
            }
            coords[axis] = wrapped;
            #[expect(clippy::cast_possible_truncation)]
            let turns = (shifted / period).floor() as i32;
            offset[axis] = turns;
        }
        Ok((Point::new(coords), Offset::from_array(offset)))
    }

    /// Position of `point` translated by `offset ⊙ extent`.
    ///
    /// Axes with a zero offset component are returned bit-for-bit.
    #[must_use]
    pub fn lift(&self, point: &Point, offset: Offset) -> Point {
        let mut coords = point.to_array();
        for (axis, c) in coords.iter_mut().enumerate() {
            let turns = offset.get(axis);
            if turns != 0 {
                *c += f64::from(turns) * self.extent[axis];
            }
        }
        Point::new(coords)
    }
}
