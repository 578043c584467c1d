//! Integer lattice offsets.
//!
//! An [`Offset`] names a periodic copy of the fundamental domain. A vertex
//! referenced with offset `o` sits at `point + o ⊙ extent`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A lattice translation in units of the domain extent.
///
/// Offsets order lexicographically, which makes them usable as sort keys in
/// facet and cell signatures.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::geometry::offset::Offset;
///
/// let a = Offset::new(1, -1, 0);
/// let b = Offset::new(0, 2, 3);
/// assert_eq!(a + b, Offset::new(1, 1, 3));
/// assert_eq!((a - b).rem_euclid(3), Offset::new(1, 0, 0));
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Offset([i32; 3]);

impl Offset {
    /// The zero offset.
    pub const ZERO: Self = Self([0, 0, 0]);

    /// Create a new offset.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self([x, y, z])
    }

    /// Create an offset from an array.
    #[inline]
    #[must_use]
    pub const fn from_array(components: [i32; 3]) -> Self {
        Self(components)
    }

    /// The components as an array.
    #[inline]
    #[must_use]
    pub const fn to_array(self) -> [i32; 3] {
        self.0
    }

    /// Component along `axis` (0, 1 or 2).
    #[inline]
    #[must_use]
    pub const fn get(self, axis: usize) -> i32 {
        self.0[axis]
    }

    /// Returns `true` for the zero offset.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0[0] == 0 && self.0[1] == 0 && self.0[2] == 0
    }

    /// Component-wise Euclidean remainder.
    #[inline]
    #[must_use]
    pub const fn rem_euclid(self, modulus: i32) -> Self {
        Self([
            self.0[0].rem_euclid(modulus),
            self.0[1].rem_euclid(modulus),
            self.0[2].rem_euclid(modulus),
        ])
    }

    /// Component-wise Euclidean division.
    #[inline]
    #[must_use]
    pub const fn div_euclid(self, modulus: i32) -> Self {
        Self([
            self.0[0].div_euclid(modulus),
            self.0[1].div_euclid(modulus),
            self.0[2].div_euclid(modulus),
        ])
    }

    /// Component-wise minimum.
    #[inline]
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self([
            self.0[0].min(other.0[0]),
            self.0[1].min(other.0[1]),
            self.0[2].min(other.0[2]),
        ])
    }

    /// Component-wise minimum over a non-empty sequence; zero for an empty one.
    #[must_use]
    pub fn component_min<I: IntoIterator<Item = Self>>(offsets: I) -> Self {
        offsets.into_iter().reduce(Self::min).unwrap_or(Self::ZERO)
    }

    /// Index of this offset's copy inside an `s × s × s` block of sheets.
    ///
    /// The offset is reduced modulo `s` first, so any offset maps to
    /// `0..s³`.
    #[inline]
    #[must_use]
    pub fn copy_index(self, sheets: i32) -> usize {
        let r = self.rem_euclid(sheets);
        let index = (r.0[0] * sheets + r.0[1]) * sheets + r.0[2];
        usize::try_from(index).unwrap_or(0)
    }

    /// Inverse of [`copy_index`](Self::copy_index) for indices in `0..s³`.
    #[inline]
    #[must_use]
    pub const fn from_copy_index(index: usize, sheets: i32) -> Self {
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let index = index as i32;
        Self([index / (sheets * sheets), (index / sheets) % sheets, index % sheets])
    }

    /// All offsets of an `s × s × s` block, in copy-index order.
    pub fn block(sheets: i32) -> impl Iterator<Item = Self> {
        (0..sheets).flat_map(move |x| {
            (0..sheets).flat_map(move |y| (0..sheets).map(move |z| Self([x, y, z])))
        })
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}

impl From<[i32; 3]> for Offset {
    fn from(components: [i32; 3]) -> Self {
        Self(components)
    }
}

impl Add for Offset {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self([self.0[0] + rhs.0[0], self.0[1] + rhs.0[1], self.0[2] + rhs.0[2]])
    }
}

impl AddAssign for Offset {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Offset {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self([self.0[0] - rhs.0[0], self.0[1] - rhs.0[1], self.0[2] - rhs.0[2]])
    }
}

impl SubAssign for Offset {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Offset {
    type Output = Self;

    fn neg(self) -> Self {
        Self([-self.0[0], -self.0[1], -self.0[2]])
    }
}

impl Mul<i32> for Offset {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self {
        Self([self.0[0] * rhs, self.0[1] * rhs, self.0[2] * rhs])
    }
}
