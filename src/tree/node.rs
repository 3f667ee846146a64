//! Explicit binary tree node
//!
//! Node = (value, level, left?, right?)
//! Values are handed out in pre-order by a [`NodeCounter`], so a complete
//! tree of height H carries exactly the values 1..=2^(H+1)-1.

use std::fmt;

/// Counter for consecutive node numbering
///
/// Threaded through generation by `&mut` instead of living in global state.
/// After generation it holds the number of nodes produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeCounter {
    last: u64,
}

impl NodeCounter {
    /// Fresh counter; the first value issued is 1
    pub fn new() -> Self {
        Self { last: 0 }
    }

    /// Issue the next value
    #[inline]
    pub fn next_value(&mut self) -> u64 {
        self.last += 1;
        self.last
    }

    /// Number of values issued so far
    #[inline]
    pub fn issued(&self) -> u64 {
        self.last
    }
}

/// Immutable binary tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    /// Node value (pre-order number)
    pub value: u64,

    /// Depth from the root (root = 0)
    pub level: u32,

    /// Left subtree
    pub left: Option<Box<Tree>>,

    /// Right subtree
    pub right: Option<Box<Tree>>,
}

impl Tree {
    /// Single node without children
    pub fn leaf(value: u64, level: u32) -> Self {
        Self {
            value,
            level,
            left: None,
            right: None,
        }
    }

    /// Generate a complete binary tree of the given height
    ///
    /// Height 0 is a single node. Numbering starts at 1.
    pub fn generate(height: u32) -> Self {
        let mut counter = NodeCounter::new();
        Self::generate_with(height, &mut counter)
    }

    /// Generate a complete binary tree, drawing values from `counter`
    pub fn generate_with(height: u32, counter: &mut NodeCounter) -> Self {
        Self::grow(0, height, counter)
    }

    fn grow(level: u32, height: u32, counter: &mut NodeCounter) -> Self {
        // Pre-order: parent takes its number before either child
        let value = counter.next_value();
        if level == height {
            return Self::leaf(value, level);
        }

        let left = Self::grow(level + 1, height, counter);
        let right = Self::grow(level + 1, height, counter);

        Self {
            value,
            level,
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    /// Check if leaf
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Present children, left first
    pub fn children(&self) -> impl Iterator<Item = &Tree> {
        self.left.as_deref().into_iter().chain(self.right.as_deref())
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> u64 {
        1 + self.children().map(Tree::node_count).sum::<u64>()
    }

    /// Height of this subtree (a leaf has height 0)
    pub fn height(&self) -> u32 {
        self.children()
            .map(|child| child.height() + 1)
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.value, self.level)
    }
}

/// Node count of a complete binary tree: 2^(height+1) - 1
pub fn expected_node_count(height: u32) -> u64 {
    (1u64 << (height + 1)) - 1
}

/// Sum of 1..=node_count (consecutive numbering)
pub fn reference_sum(node_count: u64) -> u64 {
    node_count * (node_count + 1) / 2
}
