use tinyvec::TinyVec;

use crate::error::{PkdError, Result};
use crate::geometry::{Axis, Box3, Point3};
use crate::particles::ParticleSet;
use crate::pkd::axis::{decode_axis, split_key, strip_axis};
use crate::pkd::cursor::SubtreeCursor;
use crate::pkd::node::{left_child, num_inner_nodes, num_levels, right_child, subtree_size};

/// A particle set whose order forms an implicit balanced k-d tree.
///
/// Node `i` is particle `i`; its children are particles `2i + 1` and `2i + 2`. The split axis of
/// every inner node is stored in the low bits of its x coordinate, so the tree needs no storage
/// beyond the particles themselves.
///
/// Usually this will be created via [`PkdBuilder`][crate::PkdBuilder].
#[derive(Debug, Clone)]
pub struct PkdTree {
    particles: ParticleSet,
    bounds: Box3,
}

impl PkdTree {
    pub(crate) fn new(particles: ParticleSet, bounds: Box3) -> Self {
        Self { particles, bounds }
    }

    /// The reordered particles.
    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn into_inner(self) -> ParticleSet {
        self.particles
    }

    /// Bounds of all positions, taken before any axis was stored.
    pub fn bounds(&self) -> Box3 {
        self.bounds
    }

    /// The number of nodes, which is the number of particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn num_inner_nodes(&self) -> usize {
        num_inner_nodes(self.len())
    }

    pub fn num_levels(&self) -> usize {
        num_levels(self.len())
    }

    #[inline]
    pub fn is_valid(&self, node: usize) -> bool {
        node < self.len()
    }

    #[inline]
    pub fn is_inner(&self, node: usize) -> bool {
        node < self.num_inner_nodes()
    }

    #[inline]
    pub fn is_leaf(&self, node: usize) -> bool {
        self.is_valid(node) && !self.is_inner(node)
    }

    /// The stored position of `node`, including its axis bits.
    #[inline]
    pub fn position(&self, node: usize) -> &Point3 {
        &self.particles.positions[node]
    }

    /// The split axis of an inner node; `None` for leaves.
    pub fn axis(&self, node: usize) -> Option<Axis> {
        if self.is_inner(node) {
            decode_axis(self.particles.positions[node].x)
        } else {
            None
        }
    }

    /// The coordinate an inner node splits its subtree at; `None` for leaves.
    pub fn split_value(&self, node: usize) -> Option<f32> {
        self.axis(node)
            .map(|axis| split_key(&self.particles.positions[node], axis))
    }

    /// Check the k-d property for every inner node of the tree.
    pub fn check(&self) -> Result<()> {
        let n = self.len();
        for node in 0..self.num_inner_nodes() {
            let Some(axis) = self.axis(node) else {
                return Err(self.violation(node, 0, node));
            };
            let split = split_key(self.position(node), axis);

            let mut left = SubtreeCursor::new(left_child(node));
            while left.is_valid(n) {
                if split_key(self.position(left.node()), axis) > split {
                    return Err(self.violation(node, axis.index(), left.node()));
                }
                left.advance();
            }
            let mut right = SubtreeCursor::new(right_child(node));
            while right.is_valid(n) {
                if split_key(self.position(right.node()), axis) < split {
                    return Err(self.violation(node, axis.index(), right.node()));
                }
                right.advance();
            }
        }
        Ok(())
    }

    fn violation(&self, node: usize, axis: usize, index: usize) -> PkdError {
        PkdError::InvariantViolation {
            node,
            axis,
            left_size: subtree_size(left_child(node), self.len()),
            right_size: subtree_size(right_child(node), self.len()),
            index,
        }
    }

    /// Search the tree for particles inside `query`.
    ///
    /// x coordinates, including those of the query, are compared without their axis bits.
    /// Returns node indices.
    pub fn range(&self, query: &Box3) -> Vec<usize> {
        let n = self.len();
        let mut query = *query;
        query.lower.x = strip_axis(query.lower.x);
        query.upper.x = strip_axis(query.upper.x);
        let mut result = vec![];

        // Use TinyVec to avoid heap allocations
        let mut stack: TinyVec<[usize; 33]> = TinyVec::new();
        stack.push(0);

        while let Some(node) = stack.pop() {
            let p = self.position(node);
            let key = Point3::new(split_key(p, Axis::X), p.y, p.z);
            if query.contains(&key) {
                result.push(node);
            }

            let Some(axis) = self.axis(node) else {
                continue;
            };
            let split = key.get(axis);

            // queue search in halves that intersect the query
            let left = left_child(node);
            if left < n && query.lower.get(axis) <= split {
                stack.push(left);
            }
            let right = right_child(node);
            if right < n && query.upper.get(axis) >= split {
                stack.push(right);
            }
        }
        result
    }
}
