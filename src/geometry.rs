//! Points, axes and axis-aligned boxes in three dimensions.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use geo_traits::{CoordTrait, Dimensions};

/// One of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    /// All axes in order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// The axis as an index into a coordinate triple.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The axis with the given index, if there is one.
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// A single particle position.
///
/// The layout is three packed `f32`s, so a slice of points can be written out as raw `vec3f`
/// data with [`bytemuck::cast_slice`].
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Build a point from any coordinate. Two-dimensional coordinates get `z = 0`.
    pub fn from_coord(coord: &impl CoordTrait<T = f32>) -> Self {
        let z = match coord.dim() {
            Dimensions::Xyz | Dimensions::Xyzm => coord.nth_or_panic(2),
            Dimensions::Unknown(n) if n >= 3 => coord.nth_or_panic(2),
            _ => 0.0,
        };
        Self::new(coord.x(), coord.y(), z)
    }

    /// The coordinate along `axis`.
    #[inline]
    pub fn get(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    #[inline]
    pub fn set(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for Point3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl CoordTrait for Point3 {
    type T = f32;

    fn dim(&self) -> Dimensions {
        Dimensions::Xyz
    }

    fn x(&self) -> Self::T {
        self.x
    }

    fn y(&self) -> Self::T {
        self.y
    }

    fn nth_or_panic(&self, n: usize) -> Self::T {
        match Axis::from_index(n) {
            Some(axis) => self.get(axis),
            None => panic!("Invalid index of coord"),
        }
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box3 {
    pub lower: Point3,
    pub upper: Point3,
}

impl Box3 {
    /// A box containing nothing. Extending it by a point yields that point's box.
    pub fn empty() -> Self {
        Self {
            lower: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            upper: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn new(lower: Point3, upper: Point3) -> Self {
        Self { lower, upper }
    }

    pub fn is_empty(&self) -> bool {
        Axis::ALL
            .iter()
            .any(|&axis| self.lower.get(axis) > self.upper.get(axis))
    }

    pub fn extend(&mut self, p: &Point3) {
        for axis in Axis::ALL {
            let v = p.get(axis);
            if v < self.lower.get(axis) {
                self.lower.set(axis, v);
            }
            if v > self.upper.get(axis) {
                self.upper.set(axis, v);
            }
        }
    }

    /// Extent along `axis`; zero for an empty box.
    #[inline]
    pub fn extent(&self, axis: Axis) -> f32 {
        (self.upper.get(axis) - self.lower.get(axis)).max(0.0)
    }

    /// The axis of greatest extent. Ties go to the lower axis.
    pub fn max_extent_axis(&self) -> Axis {
        let mut best = Axis::X;
        for axis in [Axis::Y, Axis::Z] {
            if self.extent(axis) > self.extent(best) {
                best = axis;
            }
        }
        best
    }

    pub fn contains(&self, p: &Point3) -> bool {
        Axis::ALL.iter().all(|&axis| {
            let v = p.get(axis);
            self.lower.get(axis) <= v && v <= self.upper.get(axis)
        })
    }

    /// Split this box at `value` along `axis` into its lower and upper halves.
    pub fn split(&self, axis: Axis, value: f32) -> (Self, Self) {
        let mut lower = *self;
        let mut upper = *self;
        lower.upper.set(axis, value);
        upper.lower.set(axis, value);
        (lower, upper)
    }
}

impl Default for Box3 {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> FromIterator<&'a Point3> for Box3 {
    fn from_iter<I: IntoIterator<Item = &'a Point3>>(iter: I) -> Self {
        let mut bounds = Box3::empty();
        for p in iter {
            bounds.extend(p);
        }
        bounds
    }
}
