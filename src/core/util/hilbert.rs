//! Hilbert space-filling curve ordering for points of a periodic domain.
//!
//! Range insertion sorts its input along a Hilbert curve so that consecutive
//! insertions land near each other and each point location walk stays short.
//!
//! ## Scope
//! - No triangulation types (no `Vertex`, no keys, no TDS access)
//! - Pure ordering primitives; coordinates are normalized per axis by the
//!   domain bounds

use num_traits::cast;

use crate::geometry::domain::Domain;
use crate::geometry::point::Point;

/// Largest supported number of bits per axis.
pub const MAX_HILBERT_BITS: u32 = 31;

#[inline]
fn clamp_bits(bits: u32) -> u32 {
    bits.clamp(1, MAX_HILBERT_BITS)
}

/// Quantize a point into integer grid coordinates in `[0, 2^bits)` per axis.
///
/// Each axis is normalized by the domain bounds on that axis and clamped to
/// `[0, 1]`. `bits` is clamped to `1..=31`.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::core::util::hilbert::hilbert_quantize;
/// use periodic_delaunay::geometry::domain::Domain;
/// use periodic_delaunay::geometry::point::Point;
///
/// let q = hilbert_quantize(&Point::new([0.5, 0.25, 1.0]), &Domain::unit_cube(), 2);
/// assert_eq!(q, [1, 0, 3]);
/// ```
#[must_use]
pub fn hilbert_quantize(point: &Point, domain: &Domain, bits: u32) -> [u32; 3] {
    let bits = clamp_bits(bits);
    let max_val = (1_u32 << bits) - 1;
    let (lo, extent) = (domain.lo(), domain.extent());

    let mut quantized = [0_u32; 3];
    for (axis, q) in quantized.iter_mut().enumerate() {
        let t = (point.coords()[axis] - lo[axis]) / extent[axis];
        let normalized = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        *q = cast::<f64, u32>((normalized * f64::from(max_val)).floor())
            .unwrap_or(0)
            .min(max_val);
    }
    quantized
}

/// Hilbert index of pre-quantized grid coordinates.
///
/// Skilling's transpose algorithm (J. Skilling, "Programming the Hilbert
/// curve", AIP Conf. Proc. 707, 2004). Successive indices move between
/// face-adjacent grid cells.
#[must_use]
fn hilbert_index_from_quantized(coords: [u32; 3], bits: u32) -> u128 {
    let mut x = coords;

    // Inverse undo of excess work.
    let highest = 1_u32 << (bits - 1);
    let mut q = highest;
    while q > 1 {
        let p = q - 1;
        for i in 0..3 {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // Gray encode.
    x[1] ^= x[0];
    x[2] ^= x[1];
    let mut t = 0_u32;
    q = highest;
    while q > 1 {
        if x[2] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for c in &mut x {
        *c ^= t;
    }

    // Interleave the transposed bits.
    let mut index = 0_u128;
    for bit in (0..bits).rev() {
        for c in x {
            index = (index << 1) | u128::from((c >> bit) & 1);
        }
    }
    index
}

/// Hilbert curve index of a point of `domain`.
///
/// ```rust
/// use periodic_delaunay::core::util::hilbert::hilbert_index;
/// use periodic_delaunay::geometry::domain::Domain;
/// use periodic_delaunay::geometry::point::Point;
///
/// let d = Domain::unit_cube();
/// assert_eq!(hilbert_index(&Point::new([0.0, 0.0, 0.0]), &d, 4), 0);
/// ```
#[must_use]
pub fn hilbert_index(point: &Point, domain: &Domain, bits: u32) -> u128 {
    let bits = clamp_bits(bits);
    hilbert_index_from_quantized(hilbert_quantize(point, domain, bits), bits)
}

/// Stable sort of arbitrary items by the Hilbert index of their point.
///
/// Ties (points in the same grid cell) keep their input order.
pub fn hilbert_sort_by<Item, F>(items: &mut [Item], domain: &Domain, bits: u32, point_of: F)
where
    F: Fn(&Item) -> Point,
{
    let bits = clamp_bits(bits);
    items.sort_by_cached_key(|item| {
        let q = hilbert_quantize(&point_of(item), domain, bits);
        (hilbert_index_from_quantized(q, bits), q)
    });
}

/// Return the indices that would sort `points` by Hilbert order.
#[must_use]
pub fn hilbert_sorted_indices(points: &[Point], domain: &Domain, bits: u32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    hilbert_sort_by(&mut order, domain, bits, |&i| points[i]);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collections::FastHashSet;

    #[test]
    fn hilbert_index_is_a_bijection_on_small_grid() {
        let bits = 2;
        let mut seen = FastHashSet::default();
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    let idx = hilbert_index_from_quantized([x, y, z], bits);
                    assert!(idx < 64);
                    assert!(seen.insert(idx), "duplicate index {idx}");
                }
            }
        }
        assert_eq!(seen.len(), 64);
    }

    #[test]
    fn hilbert_curve_is_continuous_on_3d_grid() {
        let bits = 2;
        let mut by_index = vec![[0_u32; 3]; 64];
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    let idx = hilbert_index_from_quantized([x, y, z], bits);
                    by_index[usize::try_from(idx).unwrap()] = [x, y, z];
                }
            }
        }
        for pair in by_index.windows(2) {
            let step: u32 = (0..3).map(|a| pair[0][a].abs_diff(pair[1][a])).sum();
            assert_eq!(step, 1, "{:?} -> {:?} is not a unit step", pair[0], pair[1]);
        }
    }

    #[test]
    fn quantize_clamps_out_of_range() {
        let d = Domain::new([-1.0; 3], [1.0; 3]).unwrap();
        assert_eq!(hilbert_quantize(&Point::new([-5.0, 5.0, 0.0]), &d, 3), [0, 7, 3]);
    }

    #[test]
    fn sorted_indices_are_a_permutation() {
        let d = Domain::unit_cube();
        let pts = [
            Point::new([0.9, 0.9, 0.9]),
            Point::new([0.1, 0.1, 0.1]),
            Point::new([0.5, 0.5, 0.5]),
            Point::new([0.0, 0.0, 0.0]),
        ];
        let order = hilbert_sorted_indices(&pts, &d, 8);
        assert_eq!(order[0], 3);
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
    }

    #[test]
    fn bits_are_clamped() {
        let d = Domain::unit_cube();
        let p = Point::new([0.3, 0.6, 0.9]);
        assert_eq!(hilbert_index(&p, &d, 0), hilbert_index(&p, &d, 1));
        assert_eq!(hilbert_index(&p, &d, 64), hilbert_index(&p, &d, 31));
    }
}
