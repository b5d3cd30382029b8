//! 64-bit quantized positions.
//!
//! Each coordinate is mapped linearly onto `[0, 2^20 - 1]` relative to a bounding box and the
//! three cells are packed as `(ix << 2) | (iy << 22) | (iz << 42) | axis`, where `axis` is the
//! same two-bit split axis code stored in the x bits of unquantized positions.

use num_traits::ToPrimitive;

use crate::geometry::{Axis, Box3, Point3};

/// Bits per quantized coordinate.
pub const QUANTIZE_BITS: u32 = 20;

const CELLS: u64 = 1 << QUANTIZE_BITS;
const CELL_MASK: u64 = CELLS - 1;
const AXIS_MASK: u64 = 0b11;
const SHIFTS: [u32; 3] = [2, 22, 42];

/// Quantize `p` against `bounds`, storing `axis_bits` in the two low bits.
pub fn encode(p: &Point3, axis_bits: u32, bounds: &Box3) -> u64 {
    let mut packed = u64::from(axis_bits) & AXIS_MASK;
    for axis in Axis::ALL {
        let cell = to_cell(
            p.get(axis),
            bounds.lower.get(axis),
            bounds.extent(axis),
        );
        packed |= cell << SHIFTS[axis.index()];
    }
    packed
}

/// Recover the position and axis bits of a quantized value.
///
/// Each coordinate comes back as the lower edge of its cell, within `extent / 2^20` of the
/// original.
pub fn decode(packed: u64, bounds: &Box3) -> (Point3, u32) {
    let mut p = Point3::default();
    for axis in Axis::ALL {
        let cell = (packed >> SHIFTS[axis.index()]) & CELL_MASK;
        let value = f64::from(bounds.lower.get(axis))
            + (cell as f64 / CELLS as f64) * f64::from(bounds.extent(axis));
        p.set(axis, value as f32);
    }
    (p, (packed & AXIS_MASK) as u32)
}

fn to_cell(value: f32, lower: f32, extent: f32) -> u64 {
    if extent <= 0.0 {
        return 0;
    }
    let t = (f64::from(value) - f64::from(lower)) / f64::from(extent) * CELLS as f64;
    num_traits::clamp(t.floor(), 0.0, CELL_MASK as f64)
        .to_u64()
        .unwrap_or(0)
}
