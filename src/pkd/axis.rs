//! The split axis of an inner node, stored in the two low mantissa bits of its x coordinate.
//!
//! Overwriting those bits changes the coordinate by at most three units in the last place, and
//! the axis travels with the point whenever the point is moved.

use crate::geometry::{Axis, Point3};

const AXIS_BITS: u32 = 2;
const AXIS_MASK: u32 = (1 << AXIS_BITS) - 1;

/// `value` with its low bits replaced by `axis`.
#[inline]
pub fn encode_axis(value: f32, axis: Axis) -> f32 {
    f32::from_bits((value.to_bits() & !AXIS_MASK) | axis as u32)
}

/// The axis stored in the low bits of `value`.
///
/// Only meaningful for inner nodes; a leaf's low bits are whatever its coordinate happened to be.
/// Returns `None` for the unused code `3`.
#[inline]
pub fn decode_axis(value: f32) -> Option<Axis> {
    Axis::from_index(axis_bits(value) as usize)
}

/// The raw two-bit code of `value`.
#[inline]
pub fn axis_bits(value: f32) -> u32 {
    value.to_bits() & AXIS_MASK
}

/// `value` with the axis bits cleared.
///
/// This map is monotone: it may make two values equal but never reorders them.
#[inline]
pub fn strip_axis(value: f32) -> f32 {
    f32::from_bits(value.to_bits() & !AXIS_MASK)
}

/// The coordinate of `p` used to order points along `axis`.
///
/// x values are compared with their axis bits stripped, so packing a node's axis never moves
/// it across one of its ancestors' split planes.
#[inline]
pub fn split_key(p: &Point3, axis: Axis) -> f32 {
    match axis {
        Axis::X => strip_axis(p.x),
        _ => p.get(axis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_axes() {
        for value in [0.0f32, 1.0, -1.0, 3.25, -273.15, 1.0e-20, 6.02e23] {
            for axis in Axis::ALL {
                let packed = encode_axis(value, axis);
                assert_eq!(decode_axis(packed), Some(axis));
                assert_eq!(strip_axis(packed), strip_axis(value));

                let ulp = f32::from_bits(value.abs().to_bits() + 1) - value.abs();
                assert!(
                    (packed - value).abs() <= 3.0 * ulp,
                    "{} packed to {}",
                    value,
                    packed
                );
            }
        }
    }

    #[test]
    fn keeps_three_decimals() {
        let packed = encode_axis(1234.567, Axis::Z);
        assert!((packed - 1234.567).abs() < 5e-4);
    }

    #[test]
    fn repacking_overwrites() {
        let packed = encode_axis(encode_axis(2.5, Axis::Z), Axis::Y);
        assert_eq!(decode_axis(packed), Some(Axis::Y));
    }

    #[test]
    fn strip_is_monotone() {
        let values = [-5.0f32, -1.0000001, -1.0, 0.0, 1.0, 1.0000001, 1.0000002, 7.5];
        for w in values.windows(2) {
            assert!(strip_axis(w[0]) <= strip_axis(w[1]));
        }
    }
}
