//! Index arithmetic for a complete binary tree stored in an array.

#[inline]
pub fn left_child(node: usize) -> usize {
    2 * node + 1
}

#[inline]
pub fn right_child(node: usize) -> usize {
    2 * node + 2
}

/// Parent of a non-root node.
#[inline]
pub fn parent(node: usize) -> usize {
    debug_assert!(node > 0);
    (node - 1) / 2
}

/// Number of nodes that have at least one child in a tree of `num_items` nodes.
#[inline]
pub fn num_inner_nodes(num_items: usize) -> usize {
    num_items / 2
}

/// Depth of `node` below the root (the root is level 0).
#[inline]
pub fn level_of(node: usize) -> usize {
    (usize::BITS - 1 - (node + 1).leading_zeros()) as usize
}

/// Number of levels of a tree with `num_items` nodes.
#[inline]
pub fn num_levels(num_items: usize) -> usize {
    if num_items == 0 {
        0
    } else {
        level_of(num_items - 1) + 1
    }
}

/// Index of the first node `depth` levels below `root` in the subtree of `root`.
#[inline]
pub fn first_descendant(root: usize, depth: usize) -> usize {
    ((root + 1) << depth) - 1
}

/// Number of nodes in the subtree of `root`, for a tree of `num_items` nodes.
pub fn subtree_size(root: usize, num_items: usize) -> usize {
    let mut size = 0;
    let mut depth = 0;
    loop {
        let first = first_descendant(root, depth);
        if first >= num_items {
            return size;
        }
        size += (num_items - first).min(1 << depth);
        depth += 1;
    }
}
