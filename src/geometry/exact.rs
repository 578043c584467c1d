//! Exact signs of polynomials in lifted coordinates.
//!
//! A lifted coordinate is `p + k·L` with `p` and `L` doubles and `k` an
//! integer. The sum is generally not a double, so predicates on lifted points
//! cannot be handed to [`robust`] after rounding. Each sign here is decided
//! in two stages:
//!
//! 1. ball arithmetic: a midpoint with a rigorous error radius, carried
//!    through the polynomial with error-free `two_sum` / `two_prod`;
//! 2. if the ball straddles zero, the polynomial is evaluated again over
//!    [`BigRational`], from which every double converts exactly.
//!
//! The polynomials are written once, generically over [`Ring`], and
//! evaluated in `f64`, [`Ball`] or [`BigRational`].

use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

use crate::geometry::point::Point;

/// Relative inflation applied to every computed radius.
const RADIUS_INFLATION: f64 = 1.0 + 8.0 * f64::EPSILON;

/// Arithmetic needed by the predicate polynomials.
pub trait Ring:
    Clone + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Neg<Output = Self>
{
}

impl<T> Ring for T where
    T: Clone + Add<Output = T> + Sub<Output = T> + Mul<Output = T> + Neg<Output = T>
{
}

#[inline]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    (s, err)
}

#[inline]
fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    let err = f64::mul_add(a, b, -p);
    (p, err)
}

/// A value known to lie in `[m - r, m + r]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ball {
    m: f64,
    r: f64,
}

impl Ball {
    /// An exactly known value.
    #[inline]
    #[must_use]
    pub const fn exact(value: f64) -> Self {
        Self { m: value, r: 0.0 }
    }

    /// Sign of every value in the ball, or `None` if it contains zero.
    #[inline]
    #[must_use]
    pub fn sign_if_certain(self) -> Option<i32> {
        if !self.r.is_finite() || !self.m.is_finite() {
            None
        } else if self.m > self.r {
            Some(1)
        } else if self.m < -self.r {
            Some(-1)
        } else {
            None
        }
    }
}

impl Add for Ball {
    type Output = Self;

    #[inline]
    fn add(self, o: Self) -> Self {
        let (s, e) = two_sum(self.m, o.m);
        Self {
            m: s,
            r: (self.r + o.r + e.abs()) * RADIUS_INFLATION,
        }
    }
}

impl Sub for Ball {
    type Output = Self;

    #[inline]
    fn sub(self, o: Self) -> Self {
        self + (-o)
    }
}

impl Neg for Ball {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            m: -self.m,
            r: self.r,
        }
    }
}

impl Mul for Ball {
    type Output = Self;

    #[inline]
    fn mul(self, o: Self) -> Self {
        let (p, e) = two_prod(self.m, o.m);
        let spread = self.m.abs() * o.r + o.m.abs() * self.r + self.r * o.r;
        Self {
            m: p,
            // The absolute term covers a product error lost to underflow.
            r: (spread + e.abs()) * RADIUS_INFLATION + f64::MIN_POSITIVE,
        }
    }
}

/// A point lifted by whole periods: `point + turns ⊙ period`, kept exact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiftedPoint {
    point: [f64; 3],
    turns: [i32; 3],
    period: [f64; 3],
}

impl LiftedPoint {
    /// Lift `point` by `turns` periods per axis.
    #[must_use]
    pub const fn new(point: &Point, turns: [i32; 3], period: [f64; 3]) -> Self {
        Self {
            point: point.to_array(),
            turns,
            period,
        }
    }

    /// Rounded coordinates and whether the rounding was exact.
    #[must_use]
    pub fn rounded(&self) -> (Point, bool) {
        let mut exact = true;
        let coords = std::array::from_fn(|axis| {
            if self.turns[axis] == 0 {
                return self.point[axis];
            }
            let (shift, e1) = two_prod(f64::from(self.turns[axis]), self.period[axis]);
            let (sum, e2) = two_sum(self.point[axis], shift);
            exact &= e1 == 0.0 && e2 == 0.0;
            sum
        });
        (Point::new(coords), exact)
    }

    /// Enclosing balls of the coordinates.
    #[must_use]
    pub fn balls(&self) -> [Ball; 3] {
        std::array::from_fn(|axis| {
            if self.turns[axis] == 0 {
                return Ball::exact(self.point[axis]);
            }
            let (shift, e1) = two_prod(f64::from(self.turns[axis]), self.period[axis]);
            let (sum, e2) = two_sum(self.point[axis], shift);
            Ball {
                m: sum,
                r: (e1.abs() + e2.abs()) * RADIUS_INFLATION,
            }
        })
    }

    /// Exact coordinates.
    #[must_use]
    pub fn rationals(&self) -> [BigRational; 3] {
        std::array::from_fn(|axis| {
            let base = rational(self.point[axis]);
            if self.turns[axis] == 0 {
                return base;
            }
            base + BigRational::from_integer(BigInt::from(self.turns[axis]))
                * rational(self.period[axis])
        })
    }

    /// Coordinates as plain doubles (rounded).
    #[must_use]
    pub fn floats(&self) -> [f64; 3] {
        self.rounded().0.to_array()
    }
}

/// Domain coordinates and periods are finite, so the conversion is total.
fn rational(value: f64) -> BigRational {
    BigRational::from_float(value).unwrap_or_else(BigRational::zero)
}

fn rational_sign(value: &BigRational) -> i32 {
    if value.is_positive() {
        1
    } else if value.is_negative() {
        -1
    } else {
        0
    }
}

/// Sign of a polynomial evaluated in plain `f64`.
#[must_use]
pub fn float_sign(value: f64) -> i32 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

// =============================================================================
// POLYNOMIALS
// =============================================================================

fn diff<T: Ring>(a: &[T; 3], b: &[T; 3]) -> [T; 3] {
    std::array::from_fn(|i| a[i].clone() - b[i].clone())
}

fn dot<T: Ring>(a: &[T; 3], b: &[T; 3]) -> T {
    a[0].clone() * b[0].clone() + a[1].clone() * b[1].clone() + a[2].clone() * b[2].clone()
}

fn cross<T: Ring>(a: &[T; 3], b: &[T; 3]) -> [T; 3] {
    [
        a[1].clone() * b[2].clone() - a[2].clone() * b[1].clone(),
        a[2].clone() * b[0].clone() - a[0].clone() * b[2].clone(),
        a[0].clone() * b[1].clone() - a[1].clone() * b[0].clone(),
    ]
}

fn scale<T: Ring>(v: &[T; 3], s: &T) -> [T; 3] {
    std::array::from_fn(|i| v[i].clone() * s.clone())
}

/// `det[p1 - p0, p2 - p0, p3 - p0]`.
pub fn orientation_polynomial<T: Ring>(p: &[[T; 3]; 4]) -> T {
    let (a, b, c) = (diff(&p[1], &p[0]), diff(&p[2], &p[0]), diff(&p[3], &p[0]));
    dot(&a, &cross(&b, &c))
}

/// Lifted 4×4 in-sphere determinant in Shewchuk's arrangement.
///
/// Positive when `q` is inside the sphere through `p` and
/// `orientation_polynomial(p)` is negative.
pub fn insphere_polynomial<T: Ring>(p: &[[T; 3]; 4], q: &[T; 3]) -> T {
    let [ae, be, ce, de] = [0, 1, 2, 3].map(|i| diff(&p[i], q));
    let xy = |u: &[T; 3], v: &[T; 3]| u[0].clone() * v[1].clone() - v[0].clone() * u[1].clone();
    let ab = xy(&ae, &be);
    let bc = xy(&be, &ce);
    let cd = xy(&ce, &de);
    let da = xy(&de, &ae);
    let ac = xy(&ae, &ce);
    let bd = xy(&be, &de);

    let abc = ae[2].clone() * bc.clone() - be[2].clone() * ac.clone() + ce[2].clone() * ab.clone();
    let bcd = be[2].clone() * cd.clone() - ce[2].clone() * bd.clone() + de[2].clone() * bc;
    let cda = ce[2].clone() * da.clone() + de[2].clone() * ac + ae[2].clone() * cd;
    let dab = de[2].clone() * ab + ae[2].clone() * bd + be[2].clone() * da;

    let lift = |v: &[T; 3]| dot(v, v);
    (lift(&de) * abc - lift(&ce) * dab) + (lift(&be) * cda - lift(&ae) * bcd)
}

/// `(r - a)·(r - b)`: negative when `r` is inside the sphere with diameter
/// `ab`.
pub fn diametral_segment_polynomial<T: Ring>(a: &[T; 3], b: &[T; 3], r: &[T; 3]) -> T {
    dot(&diff(r, a), &diff(r, b))
}

/// Negative when `r` is inside the smallest sphere through `a`, `b`, `c`;
/// zero for collinear triangles.
///
/// With `u = b - a`, `v = c - a`, `w = u × v` the center is
/// `a + N / D` for `N = (|u|² v - |v|² u) × w` and `D = 2|w|²`, so the test
/// `|s - N/D|² < |N/D|²` with `s = r - a` becomes `D|s|² - 2 s·N < 0`.
pub fn diametral_triangle_polynomial<T: Ring>(
    a: &[T; 3],
    b: &[T; 3],
    c: &[T; 3],
    r: &[T; 3],
) -> T {
    let (u, v, s) = (diff(b, a), diff(c, a), diff(r, a));
    let w = cross(&u, &v);
    let ww = dot(&w, &w);
    let d = ww.clone() + ww;
    let m = diff(&scale(&v, &dot(&u, &u)), &scale(&u, &dot(&v, &v)));
    let n = cross(&m, &w);
    let sn = dot(&s, &n);
    d * dot(&s, &s) - (sn.clone() + sn)
}

/// `|w|²` for `w = (b - a) × (c - a)`: zero iff the triangle is degenerate.
pub fn triangle_area_polynomial<T: Ring>(a: &[T; 3], b: &[T; 3], c: &[T; 3]) -> T {
    let w = cross(&diff(b, a), &diff(c, a));
    dot(&w, &w)
}

// =============================================================================
// CERTIFIED SIGNS
// =============================================================================

/// Certified sign of a polynomial of `N` lifted points.
///
/// `$poly` is applied to balls first and to rationals only when the ball
/// contains zero.
macro_rules! certified_sign {
    ($points:expr, |$p:ident| $poly:expr) => {{
        let $p = $points.map(|x: &LiftedPoint| x.balls());
        match $poly.sign_if_certain() {
            Some(sign) => sign,
            None => {
                let $p = $points.map(|x: &LiftedPoint| x.rationals());
                rational_sign(&$poly)
            }
        }
    }};
}

/// Exact sign of [`orientation_polynomial`].
#[must_use]
pub fn orientation_sign(points: &[LiftedPoint; 4]) -> i32 {
    certified_sign!(points.each_ref(), |p| orientation_polynomial(&p))
}

/// Exact sign of [`insphere_polynomial`].
#[must_use]
pub fn insphere_sign(simplex: &[LiftedPoint; 4], query: &LiftedPoint) -> i32 {
    let all = [&simplex[0], &simplex[1], &simplex[2], &simplex[3], query];
    certified_sign!(all, |p| insphere_polynomial(&[
        p[0].clone(),
        p[1].clone(),
        p[2].clone(),
        p[3].clone()
    ], &p[4]))
}

/// Exact sign of [`diametral_segment_polynomial`].
#[must_use]
pub fn diametral_segment_sign(a: &LiftedPoint, b: &LiftedPoint, r: &LiftedPoint) -> i32 {
    certified_sign!([a, b, r], |p| diametral_segment_polynomial(&p[0], &p[1], &p[2]))
}

/// Exact sign of [`diametral_triangle_polynomial`].
#[must_use]
pub fn diametral_triangle_sign(triangle: &[LiftedPoint; 3], r: &LiftedPoint) -> i32 {
    let all = [&triangle[0], &triangle[1], &triangle[2], r];
    certified_sign!(all, |p| diametral_triangle_polynomial(&p[0], &p[1], &p[2], &p[3]))
}

/// Exact sign of [`triangle_area_polynomial`].
#[must_use]
pub fn triangle_area_sign(triangle: &[LiftedPoint; 3]) -> i32 {
    certified_sign!(triangle.each_ref(), |p| triangle_area_polynomial(&p[0], &p[1], &p[2]))
}
