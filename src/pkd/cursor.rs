use crate::pkd::node::left_child;

/// Visits the nodes of a subtree level by level, left to right.
///
/// Node indices grow strictly along the walk, so once the cursor passes the end of the array
/// every later position would too: a cursor at an index `>= num_items` is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtreeCursor {
    current: usize,
    pos_in_level: usize,
    level_width: usize,
}

impl SubtreeCursor {
    pub fn new(root: usize) -> Self {
        Self {
            current: root,
            pos_in_level: 0,
            level_width: 1,
        }
    }

    /// The node the cursor is on.
    #[inline]
    pub fn node(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn is_valid(&self, num_items: usize) -> bool {
        self.current < num_items
    }

    #[inline]
    pub fn advance(&mut self) {
        self.current += 1;
        self.pos_in_level += 1;
        if self.pos_in_level == self.level_width {
            // wrap to the first node of the next level
            self.current = left_child(self.current - self.level_width);
            self.level_width *= 2;
            self.pos_in_level = 0;
        }
    }
}
