//! Mutable views over the parallel particle arrays.
//!
//! The nodes of a subtree are not contiguous in the array, but on each level they are: the
//! subtree of node `r` owns indices `[(r + 1) * 2^k - 1, (r + 1) * 2^k - 1 + 2^k)` on its `k`-th
//! level below `r`. A [`SubtreeView`] holds one borrowed run per level, and the left and right
//! child subtrees get the two halves of every run. The two halves are disjoint borrows, so
//! sibling subtrees can be rearranged from different threads without any locking.

use std::mem;

use tinyvec::TinyVec;

use crate::geometry::{Axis, Point3};
use crate::particles::ParticleSet;
use crate::pkd::axis::{encode_axis, split_key};
use crate::pkd::node::{first_descendant, left_child, level_of, right_child};

/// One contiguous run of particles, borrowed from every parallel array.
#[derive(Debug, Default)]
pub(crate) struct Columns<'a> {
    positions: &'a mut [Point3],
    types: Option<&'a mut [i32]>,
    attributes: Vec<&'a mut [f32]>,
}

impl<'a> Columns<'a> {
    /// Borrow all arrays of `particles`. The arrays must have equal lengths.
    pub(crate) fn from_particles(particles: &'a mut ParticleSet) -> Self {
        let len = particles.positions.len();
        let types = if particles.types.is_empty() {
            None
        } else {
            debug_assert_eq!(particles.types.len(), len);
            Some(particles.types.as_mut_slice())
        };
        let attributes = particles
            .attributes
            .iter_mut()
            .map(|attribute| {
                debug_assert_eq!(attribute.values.len(), len);
                attribute.values.as_mut_slice()
            })
            .collect();
        Self {
            positions: particles.positions.as_mut_slice(),
            types,
            attributes,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Split into `[0, mid)` and `[mid, len)`.
    pub(crate) fn split_at(self, mid: usize) -> (Columns<'a>, Columns<'a>) {
        let Columns {
            positions,
            types,
            attributes,
        } = self;

        let (left_positions, right_positions) = positions.split_at_mut(mid);
        let (left_types, right_types) = match types {
            Some(types) => {
                let (left, right) = types.split_at_mut(mid);
                (Some(left), Some(right))
            }
            None => (None, None),
        };
        let mut left_attributes = Vec::with_capacity(attributes.len());
        let mut right_attributes = Vec::with_capacity(attributes.len());
        for values in attributes {
            let (left, right) = values.split_at_mut(mid);
            left_attributes.push(left);
            right_attributes.push(right);
        }

        (
            Columns {
                positions: left_positions,
                types: left_types,
                attributes: left_attributes,
            },
            Columns {
                positions: right_positions,
                types: right_types,
                attributes: right_attributes,
            },
        )
    }

    /// Swap particles `a` and `b` in every array.
    #[inline]
    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        self.positions.swap(a, b);
        if let Some(types) = self.types.as_deref_mut() {
            types.swap(a, b);
        }
        for values in self.attributes.iter_mut() {
            values.swap(a, b);
        }
    }

    /// Swap particle `a` of this run with particle `b` of `other`, in every array.
    #[inline]
    pub(crate) fn swap_with(&mut self, a: usize, other: &mut Columns<'_>, b: usize) {
        mem::swap(&mut self.positions[a], &mut other.positions[b]);
        if let (Some(types), Some(other_types)) =
            (self.types.as_deref_mut(), other.types.as_deref_mut())
        {
            mem::swap(&mut types[a], &mut other_types[b]);
        }
        for (values, other_values) in self.attributes.iter_mut().zip(other.attributes.iter_mut()) {
            mem::swap(&mut values[a], &mut other_values[b]);
        }
    }
}

/// All particles of the subtree rooted at one node, addressed by global node index.
#[derive(Debug)]
pub(crate) struct SubtreeView<'a> {
    root: usize,
    root_level: usize,
    // Use TinyVec to avoid heap allocations
    levels: TinyVec<[Columns<'a>; 32]>,
}

impl<'a> SubtreeView<'a> {
    /// View the whole tree, rooted at node 0.
    pub(crate) fn new(columns: Columns<'a>) -> Self {
        let mut levels = TinyVec::new();
        let mut rest = columns;
        let mut width = 1;
        while !rest.is_empty() {
            let mid = width.min(rest.len());
            let (level, tail) = rest.split_at(mid);
            levels.push(level);
            rest = tail;
            width *= 2;
        }
        Self {
            root: 0,
            root_level: 0,
            levels,
        }
    }

    pub(crate) fn root(&self) -> usize {
        self.root
    }

    /// Level and offset of global node `node` within this view.
    #[inline]
    fn locate(&self, node: usize) -> (usize, usize) {
        let depth = level_of(node) - self.root_level;
        let offset = node - first_descendant(self.root, depth);
        debug_assert!(offset < self.levels[depth].len(), "node {node} outside subtree");
        (depth, offset)
    }

    #[inline]
    pub(crate) fn position(&self, node: usize) -> &Point3 {
        let (depth, offset) = self.locate(node);
        &self.levels[depth].positions[offset]
    }

    /// The ordering key of `node` along `axis`.
    #[inline]
    pub(crate) fn key(&self, node: usize, axis: Axis) -> f32 {
        split_key(self.position(node), axis)
    }

    /// Store `axis` in the position of `node`.
    #[inline]
    pub(crate) fn set_axis(&mut self, node: usize, axis: Axis) {
        let (depth, offset) = self.locate(node);
        let p = &mut self.levels[depth].positions[offset];
        p.x = encode_axis(p.x, axis);
    }

    /// Swap the particles at global nodes `a` and `b`.
    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let (depth_a, offset_a) = self.locate(a);
        let (depth_b, offset_b) = self.locate(b);
        if depth_a == depth_b {
            self.levels[depth_a].swap(offset_a, offset_b);
        } else if depth_a < depth_b {
            let (upper, lower) = self.levels.split_at_mut(depth_b);
            upper[depth_a].swap_with(offset_a, &mut lower[0], offset_b);
        } else {
            let (upper, lower) = self.levels.split_at_mut(depth_a);
            upper[depth_b].swap_with(offset_b, &mut lower[0], offset_a);
        }
    }

    /// Give up the root and split the rest into the views of its two child subtrees.
    pub(crate) fn into_children(self) -> (SubtreeView<'a>, SubtreeView<'a>) {
        let mut left_levels = TinyVec::new();
        let mut right_levels = TinyVec::new();
        for (depth, level) in self.levels.into_iter().enumerate().skip(1) {
            let mid = level.len().min(1 << (depth - 1));
            let (left, right) = level.split_at(mid);
            left_levels.push(left);
            if !right.is_empty() {
                right_levels.push(right);
            }
        }
        let child_level = self.root_level + 1;
        (
            SubtreeView {
                root: left_child(self.root),
                root_level: child_level,
                levels: left_levels,
            },
            SubtreeView {
                root: right_child(self.root),
                root_level: child_level,
                levels: right_levels,
            },
        )
    }
}
