use std::time::Instant;

use crate::error::{PkdError, Result};
use crate::geometry::{Axis, Box3};
use crate::particles::ParticleSet;
use crate::pkd::columns::{Columns, SubtreeView};
use crate::pkd::cursor::SubtreeCursor;
use crate::pkd::node::{left_child, num_levels, right_child, subtree_size};
use crate::pkd::PkdTree;

/// The default number of levels below which recursion stops spawning parallel tasks.
pub const DEFAULT_PARALLEL_LEVELS: usize = 20;

/// How the split axis of each inner node is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AxisPolicy {
    /// Split along the longest side of the node's bounds.
    #[default]
    GreatestExtent,
    /// Cycle x, y, z by depth.
    RoundRobin,
}

/// Options for [`PkdBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// How split axes are chosen.
    pub axis_policy: AxisPolicy,
    /// Re-check both subtrees of every node after its split value is selected.
    pub validate: bool,
    /// Sibling subtrees are built in parallel while more than this many levels remain below
    /// them. Only has an effect with the `rayon` feature.
    pub parallel_levels: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            axis_policy: AxisPolicy::default(),
            validate: true,
            parallel_levels: DEFAULT_PARALLEL_LEVELS,
        }
    }
}

impl BuildOptions {
    pub fn with_axis_policy(mut self, axis_policy: AxisPolicy) -> Self {
        self.axis_policy = axis_policy;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_parallel_levels(mut self, parallel_levels: usize) -> Self {
        self.parallel_levels = parallel_levels;
        self
    }
}

/// Builds a [`PkdTree`] by reordering a [`ParticleSet`] in place.
///
/// ```
/// use particle_kd::{ParticleSet, Point3, PkdBuilder};
///
/// let mut particles = ParticleSet::new();
/// for x in [3., 0., 6., 1., 5., 2., 4.] {
///     particles.push(Point3::new(x, 0., 0.));
/// }
/// let tree = PkdBuilder::new().build(particles).unwrap();
/// assert_eq!(tree.split_value(0), Some(3.));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PkdBuilder {
    options: BuildOptions,
}

impl PkdBuilder {
    /// Create a new builder with the default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BuildOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Consume `particles`, reordering all of its arrays into an implicit balanced k-d tree.
    ///
    /// Input problems are reported before anything is moved. An error after that point means
    /// the selection produced an invalid tree, and nothing of the build is returned.
    ///
    /// `particles` is dropped on any error, unmodified if the input was rejected. To keep the
    /// set when it may be invalid, call [`ParticleSet::validate`] first; `build` runs the
    /// same checks.
    pub fn build(&self, mut particles: ParticleSet) -> Result<PkdTree> {
        particles.validate()?;

        let num_items = particles.len();
        let num_levels = num_levels(num_items);
        let bounds = particles.bounds();
        log::info!(
            "building tree over {} particles ({} levels, bounds {:?} to {:?})",
            num_items,
            num_levels,
            bounds.lower,
            bounds.upper
        );

        let start = Instant::now();
        let partitioner = Partitioner {
            num_items,
            num_levels,
            options: self.options,
        };
        let view = SubtreeView::new(Columns::from_particles(&mut particles));
        partitioner.build(view, bounds)?;
        log::info!("tree built ({:.3?})", start.elapsed());

        Ok(PkdTree::new(particles, bounds))
    }
}

/// What remains to be done below a node once its own particle is in place.
enum Split {
    Done,
    Children { left: Box3, right: Box3 },
}

/// Which child subtree a selection step is working on.
#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Side {
    /// Whether a particle with `key` may stay on this side of `pivot`.
    #[inline]
    fn fits(self, key: f32, pivot: f32) -> bool {
        match self {
            Side::Left => key <= pivot,
            Side::Right => key >= pivot,
        }
    }

    /// Whether `a` is nearer the split plane than `b`, for two particles that do not fit.
    #[inline]
    fn nearer(self, a: f32, b: f32) -> bool {
        match self {
            Side::Left => a < b,
            Side::Right => a > b,
        }
    }
}

struct Partitioner {
    num_items: usize,
    num_levels: usize,
    options: BuildOptions,
}

impl Partitioner {
    #[cfg(feature = "rayon")]
    fn build(&self, view: SubtreeView<'_>, bounds: Box3) -> Result<()> {
        self.partition_parallel(view, bounds, 0)
    }

    #[cfg(not(feature = "rayon"))]
    fn build(&self, mut view: SubtreeView<'_>, bounds: Box3) -> Result<()> {
        self.partition(&mut view, 0, &bounds, 0)
    }

    /// Build the subtree at the root of `view`, handing the two child subtrees to separate
    /// tasks while enough levels remain below.
    #[cfg(feature = "rayon")]
    fn partition_parallel(
        &self,
        mut view: SubtreeView<'_>,
        bounds: Box3,
        depth: usize,
    ) -> Result<()> {
        let node = view.root();
        if self.num_levels.saturating_sub(depth) <= self.options.parallel_levels {
            return self.partition(&mut view, node, &bounds, depth);
        }

        match self.select(&mut view, node, &bounds, depth)? {
            Split::Done => Ok(()),
            Split::Children { left, right } => {
                log::debug!("splitting subtree {} across tasks", node);
                let (left_view, right_view) = view.into_children();
                let (left_result, right_result) = rayon::join(
                    || self.partition_parallel(left_view, left, depth + 1),
                    || self.partition_parallel(right_view, right, depth + 1),
                );
                left_result.and(right_result)
            }
        }
    }

    fn partition(
        &self,
        view: &mut SubtreeView<'_>,
        node: usize,
        bounds: &Box3,
        depth: usize,
    ) -> Result<()> {
        match self.select(view, node, bounds, depth)? {
            Split::Done => Ok(()),
            Split::Children { left, right } => {
                self.partition(view, left_child(node), &left, depth + 1)?;
                self.partition(view, right_child(node), &right, depth + 1)
            }
        }
    }

    fn split_axis(&self, bounds: &Box3, depth: usize) -> Axis {
        match self.options.axis_policy {
            AxisPolicy::GreatestExtent => bounds.max_extent_axis(),
            AxisPolicy::RoundRobin => Axis::ALL[depth % 3],
        }
    }

    /// Put the right particle at `node` and sort the rest of its subtree to either side.
    fn select(
        &self,
        view: &mut SubtreeView<'_>,
        node: usize,
        bounds: &Box3,
        depth: usize,
    ) -> Result<Split> {
        let left = left_child(node);
        if left >= self.num_items {
            // a single particle is a valid kd-tree already
            return Ok(Split::Done);
        }

        let axis = self.split_axis(bounds, depth);

        if right_child(node) >= self.num_items {
            // exactly one child, which is a leaf
            if view.key(left, axis) > view.key(node, axis) {
                view.swap(node, left);
            }
            view.set_axis(node, axis);
            return Ok(Split::Done);
        }

        self.select_dual(view, node, axis);
        if self.options.validate {
            self.check_node(view, node, axis)?;
        }

        let split = view.key(node, axis);
        view.set_axis(node, axis);
        let (left, right) = bounds.split(axis, split);
        Ok(Split::Children { left, right })
    }

    /// Rearrange the subtree of `node` so that every particle in its left subtree is `<=` and
    /// every particle in its right subtree `>=` the particle at `node`, along `axis`.
    ///
    /// Both subtrees are walked in level order. Misplaced particles are traded across while both
    /// sides have some. When only one side has misplaced particles left, one of them moves into
    /// `node` instead and the walk restarts against the new pivot. Particles before `left_start`
    /// (or `right_start`) are known to be on the right side of every later pivot, so the walks
    /// resume from there.
    fn select_dual(&self, view: &mut SubtreeView<'_>, node: usize, axis: Axis) {
        let n = self.num_items;
        let mut left_start = SubtreeCursor::new(left_child(node));
        let mut right_start = SubtreeCursor::new(right_child(node));
        let mut l = left_start;
        let mut r = right_start;
        let mut pivot = view.key(node, axis);

        loop {
            while l.is_valid(n) && view.key(l.node(), axis) <= pivot {
                l.advance();
            }
            while r.is_valid(n) && view.key(r.node(), axis) >= pivot {
                r.advance();
            }

            match (l.is_valid(n), r.is_valid(n)) {
                (true, true) => {
                    view.swap(l.node(), r.node());
                    l.advance();
                    r.advance();
                }
                (true, false) => {
                    left_start = self.promote(view, node, l, axis, pivot, Side::Left);
                    pivot = view.key(node, axis);
                    l = left_start;
                    r = right_start;
                }
                (false, true) => {
                    right_start = self.promote(view, node, r, axis, pivot, Side::Right);
                    pivot = view.key(node, axis);
                    l = left_start;
                    r = right_start;
                }
                (false, false) => break,
            }
        }
    }

    /// Move one misplaced particle of `side` into `node`, starting from the first misplaced
    /// particle at `first`.
    ///
    /// The particles from `first` on are compacted so that those that fit come first. Of the
    /// ones that do not fit, the one nearest the pivot trades places with `node`. Returns the
    /// cursor just past the old pivot particle, which now sits where the promoted one was.
    fn promote(
        &self,
        view: &mut SubtreeView<'_>,
        node: usize,
        first: SubtreeCursor,
        axis: Axis,
        pivot: f32,
        side: Side,
    ) -> SubtreeCursor {
        let n = self.num_items;

        let mut boundary = first;
        let mut scan = first;
        scan.advance();
        while scan.is_valid(n) {
            if side.fits(view.key(scan.node(), axis), pivot) {
                view.swap(boundary.node(), scan.node());
                boundary.advance();
            }
            scan.advance();
        }

        let mut nearest = boundary;
        let mut scan = boundary;
        scan.advance();
        while scan.is_valid(n) {
            if side.nearer(view.key(scan.node(), axis), view.key(nearest.node(), axis)) {
                nearest = scan;
            }
            scan.advance();
        }

        view.swap(boundary.node(), nearest.node());
        view.swap(node, boundary.node());
        boundary.advance();
        boundary
    }

    /// Verify the k-d property between `node` and both of its subtrees.
    fn check_node(&self, view: &SubtreeView<'_>, node: usize, axis: Axis) -> Result<()> {
        let n = self.num_items;
        let split = view.key(node, axis);
        for (root, side) in [(left_child(node), Side::Left), (right_child(node), Side::Right)] {
            let mut cursor = SubtreeCursor::new(root);
            while cursor.is_valid(n) {
                if !side.fits(view.key(cursor.node(), axis), split) {
                    return Err(PkdError::InvariantViolation {
                        node,
                        axis: axis.index(),
                        left_size: subtree_size(left_child(node), n),
                        right_size: subtree_size(right_child(node), n),
                        index: cursor.node(),
                    });
                }
                cursor.advance();
            }
        }
        Ok(())
    }
}
