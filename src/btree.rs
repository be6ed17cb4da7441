//! B-tree with sibling links.
//!
//! All values are stored in leaves, and every leaf sits at the same depth: the
//! tree only grows by splitting its root and only shrinks by collapsing it.
//! Internal nodes hold one separator per child. With a branching factor `r`,
//! every node other than the root holds between `r` and `2r - 1` entries.
//!
//! On top of the parent/child edges, every node links to the next node at the
//! same depth, even when that node has a different parent:
//!
//! ```text
//!                 [1 5]
//!              /        \
//!        [1 3]    ->     [5 7]
//!       /     \         /     \
//!   [1 2] -> [3 4] -> [5 6] -> [7 8 9]
//! ```
//!
//! These links are what [`BTree::iter`] follows, and they are kept exact by
//! every split and join.
//!
//! Both mutations first walk from the root to a leaf, remembering the
//! `(node, branch)` pair taken at every depth. The structural repair then
//! replays that path bottom-up, so no node is searched twice.

mod node;

use std::{fmt, iter::FusedIterator, mem};

use slab::Slab;
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    config::{Config, ConfigError},
    ordered_set::OrderedSet,
};
use node::{Node, NodeId};

/// Raised when an insertion would need more levels than configured.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CapacityError {
    /// Splitting the root would grow the tree beyond its maximum depth.
    #[error("root split would grow the tree beyond the maximum depth of {max_depth}.")]
    DepthExceeded {
        /// The configured maximum depth.
        max_depth: usize,
    },
}

/// One step of a root-to-leaf descent.
#[derive(Debug, Clone, Copy)]
struct PathStep {
    node: NodeId,
    branch: usize,
}

// ////////////////////////////////////////////////////////////////////////////
// BTree
// ////////////////////////////////////////////////////////////////////////////

/// An ordered set backed by a B-tree whose nodes are linked to their right
/// neighbour at every depth.
///
/// ```
/// use ordset_engines::{BTree, Config, OrderedSet};
///
/// let mut tree = BTree::with_config(Config::default().with_branching_factor(2))?;
/// tree.extend(1..=7);
/// assert_eq!(tree.depth(), 2);
/// assert_eq!(tree.check_right_relation(), Some(7));
/// assert!(tree.iter().copied().eq(1..=7));
/// # Ok::<(), ordset_engines::ConfigError>(())
/// ```
#[derive(Clone)]
pub struct BTree<T> {
    nodes: Slab<Node<T>>,
    root: NodeId,
    /// Number of levels, counting the root and the leaves.
    depth: usize,
    len: usize,
    config: Config,
}

// ///////////////////////////////////////////////
// Inherent methods
// ///////////////////////////////////////////////

impl<T> BTree<T> {
    /// Create an empty tree with the default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::build(Config::default())
    }

    /// Create an empty tree. Uses the branching factor, the maximum depth and
    /// the debug flag of `config`; the skip-list fields are not checked.
    ///
    /// # Errors
    ///
    /// Fails if the fields used here are invalid.
    #[inline]
    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate_tree()?;
        Ok(Self::build(config))
    }

    fn build(config: Config) -> Self {
        let mut nodes = Slab::new();
        let root = nodes.insert(Node::leaf(2 * config.branching_factor));
        BTree {
            nodes,
            root,
            depth: 1,
            len: 0,
            config,
        }
    }

    /// Number of levels, a lone root leaf counting as one.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Removes every value.
    #[inline]
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = self.nodes.insert(Node::leaf(self.capacity()));
        self.depth = 1;
        self.len = 0;
    }

    /// Iterate over the values in ascending order by walking the leaves
    /// through their sibling links.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        let mut leaf = &self.nodes[self.root];
        while let Some(&first) = leaf.children.first() {
            leaf = &self.nodes[first];
        }
        Iter {
            nodes: &self.nodes,
            leaf: Some(leaf),
            index: 0,
            remaining: self.len,
        }
    }

    /// Verify the sibling links level by level.
    ///
    /// At every depth, each node must link to exactly the next node of that
    /// depth, whether or not both share a parent, and the last node must not
    /// link anywhere. Returns the number of values stored in the leaves if the
    /// relation holds, and `None` otherwise.
    #[must_use]
    pub fn check_right_relation(&self) -> Option<usize> {
        let mut level = vec![self.root];
        loop {
            for (index, &id) in level.iter().enumerate() {
                if self.nodes.get(id)?.right != level.get(index + 1).copied() {
                    if self.config.debug {
                        debug!(node = id, "btree: broken right link");
                    }
                    return None;
                }
            }
            let leaves = level
                .iter()
                .filter(|&&id| self.nodes[id].is_leaf())
                .count();
            if leaves == level.len() {
                return Some(level.iter().map(|&id| self.nodes[id].len()).sum());
            }
            if leaves != 0 {
                return None;
            }
            level = level
                .iter()
                .flat_map(|&id| self.nodes[id].children.iter().copied())
                .collect();
        }
    }

    /// A node holding this many entries must split.
    fn capacity(&self) -> usize {
        2 * self.config.branching_factor
    }

    fn min_entries(&self) -> usize {
        self.config.branching_factor
    }
}

impl<T: Ord> BTree<T> {
    /// Walk from the root to the leaf that may hold `value`.
    fn descend(&self, value: &T) -> (Vec<PathStep>, NodeId) {
        let mut path = Vec::with_capacity(self.depth);
        let mut id = self.root;
        loop {
            let node = &self.nodes[id];
            if node.is_leaf() {
                return (path, id);
            }
            let branch = node.branch(value);
            path.push(PathStep { node: id, branch });
            id = node.children[branch];
        }
    }

    /// Recursively validate the subtree at `id`, whose values must lie in
    /// `[lower, upper)`.
    fn check_node(
        &self,
        id: NodeId,
        lower: Option<&T>,
        upper: Option<&T>,
        depth: usize,
        visited: &mut usize,
    ) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        *visited += 1;

        let len = node.len();
        let count_ok = if id == self.root {
            len < self.capacity() && (len > 0 || self.len == 0)
        } else {
            (self.min_entries()..self.capacity()).contains(&len)
        };
        if !count_ok || !node.keys.windows(2).all(|pair| pair[0] < pair[1]) {
            return false;
        }
        let within = |key: &T| {
            lower.is_none_or(|lower| lower <= key) && upper.is_none_or(|upper| key < upper)
        };

        if node.is_leaf() {
            return depth == self.depth && node.keys.iter().all(within);
        }
        if node.children.len() != len || depth >= self.depth || (id == self.root && len < 2) {
            return false;
        }
        for (index, (key, &child)) in node.keys.iter().zip(&node.children).enumerate() {
            if index > 0 && !within(key) {
                return false;
            }
            let child_lower = match lower {
                Some(lower) if lower > key => lower,
                _ => key,
            };
            let child_upper = node.keys.get(index + 1).or(upper);
            if !self.check_node(child, Some(child_lower), child_upper, depth + 1, visited) {
                return false;
            }
        }
        true
    }
}

impl<T: Ord + Clone> BTree<T> {
    /// Insert `value`, reporting a capacity overflow instead of panicking.
    ///
    /// Returns `Ok(true)` if the value was inserted and `Ok(false)` if it was
    /// already present.
    ///
    /// # Errors
    ///
    /// If every node on the path is full and the tree already has
    /// `max_depth` levels, the root would have to split. The tree is left
    /// untouched and [`CapacityError::DepthExceeded`] is returned.
    #[inline]
    pub fn try_insert(&mut self, value: T) -> Result<bool, CapacityError> {
        let (path, leaf) = self.descend(&value);
        let Err(position) = self.nodes[leaf].keys.binary_search(&value) else {
            return Ok(false);
        };

        let full = self.capacity() - 1;
        if self.depth >= self.config.max_depth
            && self.nodes[leaf].len() == full
            && path.iter().all(|step| self.nodes[step.node].len() == full)
        {
            return Err(CapacityError::DepthExceeded {
                max_depth: self.config.max_depth,
            });
        }

        for step in &path {
            let node = &mut self.nodes[step.node];
            if step.branch == 0 && value < node.keys[0] {
                node.keys[0] = value.clone();
            }
        }
        self.nodes[leaf].keys.insert(position, value);
        self.len += 1;
        self.recurse_split(&path, leaf);
        Ok(true)
    }

    /// Split every over-full node on the path, from the leaf up.
    fn recurse_split(&mut self, path: &[PathStep], leaf: NodeId) {
        let capacity = self.capacity();
        let mut child = leaf;
        for step in path.iter().rev() {
            if self.nodes[child].len() < capacity {
                return;
            }
            let sibling = self.split(child);
            let separator = self.nodes[sibling].keys[0].clone();
            let parent = &mut self.nodes[step.node];
            parent.keys.insert(step.branch + 1, separator);
            parent.children.insert(step.branch + 1, sibling);
            child = step.node;
        }
        if self.nodes[child].len() >= capacity {
            self.split_root();
        }
    }

    /// Move the upper half of `id` into a new right neighbour and return it.
    fn split(&mut self, id: NodeId) -> NodeId {
        let (min, capacity) = (self.min_entries(), self.capacity());
        let upper = self.nodes[id].split_off(min, capacity);
        let sibling = self.nodes.insert(upper);
        self.nodes[id].right = Some(sibling);
        if self.config.debug {
            trace!(node = id, sibling, "btree split");
        }
        sibling
    }

    fn split_root(&mut self) {
        let old = self.root;
        let sibling = self.split(old);
        let mut keys = Vec::with_capacity(self.capacity());
        keys.push(self.nodes[old].keys[0].clone());
        keys.push(self.nodes[sibling].keys[0].clone());
        let mut children = Vec::with_capacity(self.capacity());
        children.extend([old, sibling]);
        self.root = self.nodes.insert(Node::internal(keys, children));
        self.depth += 1;
        if self.config.debug {
            debug!(depth = self.depth, "btree root split");
        }
    }

    /// Repair every under-full node on the path, from the leaf up.
    fn recurse_join(&mut self, path: &[PathStep], leaf: NodeId) {
        let mut child = leaf;
        for step in path.iter().rev() {
            if self.nodes[child].len() >= self.min_entries() {
                break;
            }
            self.rebalance_or_join(step.node, step.branch);
            child = step.node;
        }
        self.collapse_root();
    }

    /// Restore the entry count of `children[branch]` of `parent`, borrowing
    /// from a sibling with a surplus or merging with one.
    fn rebalance_or_join(&mut self, parent: NodeId, branch: usize) {
        let min = self.min_entries();
        let (left, right) = {
            let node = &self.nodes[parent];
            (
                branch.checked_sub(1).map(|index| node.children[index]),
                node.children.get(branch + 1).copied(),
            )
        };
        if let Some(left) = left.filter(|&id| self.nodes[id].len() > min) {
            self.borrow_from_left(parent, branch, left);
        } else if let Some(right) = right.filter(|&id| self.nodes[id].len() > min) {
            self.borrow_from_right(parent, branch, right);
        } else if left.is_some() {
            self.join(parent, branch - 1);
        } else if right.is_some() {
            self.join(parent, branch);
        } else {
            unreachable!("a node below the root always has a sibling");
        }
    }

    /// Move the last entry of the left sibling to the front of
    /// `children[branch]`.
    fn borrow_from_left(&mut self, parent: NodeId, branch: usize, left: NodeId) {
        let Some((key, child)) = self.nodes[left].pop_back() else {
            unreachable!("left sibling holds a surplus entry");
        };
        let id = self.nodes[parent].children[branch];
        let separator = mem::replace(&mut self.nodes[parent].keys[branch], key.clone());
        let node = &mut self.nodes[id];
        if let Some(child) = child {
            // The old separator bounds the node's former first branch.
            node.keys[0] = separator;
            node.children.insert(0, child);
        }
        node.keys.insert(0, key);
        if self.config.debug {
            trace!(node = id, from = left, "btree borrow from left");
        }
    }

    /// Move the first entry of the right sibling to the back of
    /// `children[branch]`.
    fn borrow_from_right(&mut self, parent: NodeId, branch: usize, right: NodeId) {
        let Some((key, child)) = self.nodes[right].pop_front() else {
            unreachable!("right sibling holds a surplus entry");
        };
        let new_separator = self.nodes[right].keys[0].clone();
        let id = self.nodes[parent].children[branch];
        let separator = mem::replace(&mut self.nodes[parent].keys[branch + 1], new_separator);
        let node = &mut self.nodes[id];
        match child {
            Some(child) => {
                node.keys.push(separator);
                node.children.push(child);
            }
            None => node.keys.push(key),
        }
        if self.config.debug {
            trace!(node = id, from = right, "btree borrow from right");
        }
    }

    /// Merge `children[index + 1]` of `parent` into `children[index]`.
    fn join(&mut self, parent: NodeId, index: usize) {
        let (separator, left, right) = {
            let node = &mut self.nodes[parent];
            let separator = node.keys.remove(index + 1);
            let right = node.children.remove(index + 1);
            (separator, node.children[index], right)
        };
        let mut absorbed = self.nodes.remove(right);
        if !absorbed.is_leaf() {
            absorbed.keys[0] = separator;
        }
        self.nodes[left].append(absorbed);
        if self.config.debug {
            trace!(node = left, absorbed = right, "btree join");
        }
    }

    /// Replace an internal root that has a single child by that child.
    fn collapse_root(&mut self) {
        let root = &self.nodes[self.root];
        if root.is_leaf() || root.len() > 1 {
            return;
        }
        let child = root.children[0];
        self.nodes.remove(self.root);
        self.root = child;
        self.depth -= 1;
        if self.config.debug {
            debug!(depth = self.depth, "btree root collapse");
        }
    }
}

// ///////////////////////////////////////////////
// Trait implementation
// ///////////////////////////////////////////////

impl<T> Default for BTree<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> OrderedSet<T> for BTree<T> {
    /// # Panics
    ///
    /// Panics if the root would have to split beyond the configured maximum
    /// depth; use [`BTree::try_insert`] to handle that case.
    #[inline]
    fn insert(&mut self, value: T) -> bool {
        match self.try_insert(value) {
            Ok(inserted) => inserted,
            Err(err) => panic!("{err}"),
        }
    }

    #[inline]
    fn remove(&mut self, value: &T) -> bool {
        let (path, leaf) = self.descend(value);
        let Ok(position) = self.nodes[leaf].keys.binary_search(value) else {
            return false;
        };
        self.nodes[leaf].keys.remove(position);
        self.len -= 1;
        self.recurse_join(&path, leaf);
        true
    }

    #[inline]
    fn contains(&self, value: &T) -> bool {
        let (_, leaf) = self.descend(value);
        self.nodes[leaf].keys.binary_search(value).is_ok()
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    /// Checks entry counts, key order and separator bounds, uniform leaf
    /// depth, the sibling links, the stored length, and that the arena holds
    /// no unreachable node.
    #[inline]
    fn check(&self) -> bool {
        let Some(stored) = self.check_right_relation() else {
            return false;
        };
        if stored != self.len {
            if self.config.debug {
                debug!(stored, len = self.len, "btree: length mismatch");
            }
            return false;
        }
        let mut visited = 0;
        if !self.check_node(self.root, None, None, 1, &mut visited) {
            if self.config.debug {
                debug!("btree: node invariant violated");
            }
            return false;
        }
        if visited != self.nodes.len() {
            if self.config.debug {
                debug!(visited, allocated = self.nodes.len(), "btree: leaked nodes");
            }
            return false;
        }
        true
    }

    #[inline]
    fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    #[inline]
    fn name(&self) -> &'static str {
        "btree"
    }
}

impl<T: Ord + Clone> Extend<T> for BTree<T> {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iterable: I) {
        for value in iterable {
            self.insert(value);
        }
    }
}

impl<T: Ord + Clone> FromIterator<T> for BTree<T> {
    #[inline]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = BTree::new();
        tree.extend(iter);
        tree
    }
}

impl<T: fmt::Debug> fmt::Debug for BTree<T> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Prints one line per depth, following the sibling links from the leftmost
/// node of each depth.
impl<T: fmt::Display> fmt::Display for BTree<T> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = Some(self.root);
        while let Some(leftmost) = first {
            if leftmost != self.root {
                writeln!(f)?;
            }
            let mut cursor = Some(leftmost);
            while let Some(id) = cursor {
                let node = &self.nodes[id];
                if id != leftmost {
                    write!(f, " ")?;
                }
                write!(f, "[")?;
                for (index, key) in node.keys.iter().enumerate() {
                    if index > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{key}")?;
                }
                write!(f, "]")?;
                cursor = node.right;
            }
            first = self.nodes[leftmost].children.first().copied();
        }
        Ok(())
    }
}

impl<'a, T> IntoIterator for &'a BTree<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

// /////////////////////////////////
// Iterators
// /////////////////////////////////

/// Ascending iterator over a [`BTree`], hopping from leaf to leaf.
pub struct Iter<'a, T> {
    nodes: &'a Slab<Node<T>>,
    leaf: Option<&'a Node<T>>,
    index: usize,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        loop {
            let leaf = self.leaf?;
            if let Some(value) = leaf.keys.get(self.index) {
                self.index += 1;
                self.remaining = self.remaining.saturating_sub(1);
                return Some(value);
            }
            let nodes = self.nodes;
            self.leaf = leaf.right.and_then(|id| nodes.get(id));
            self.index = 0;
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use rstest::rstest;

    use super::{BTree, CapacityError};
    use crate::{config::Config, ordered_set::OrderedSet};

    fn tree(r: usize, values: impl IntoIterator<Item = i32>) -> Result<BTree<i32>> {
        let mut tree = BTree::with_config(Config::default().with_branching_factor(r))?;
        for value in values {
            assert!(tree.insert(value));
            assert!(tree.check(), "invalid after inserting {value}:\n{tree}");
        }
        Ok(tree)
    }

    #[test]
    fn empty() -> Result<()> {
        let mut tree = tree(2, [])?;
        assert!(tree.check());
        assert_eq!(tree.check_right_relation(), Some(0));
        assert!(!tree.remove(&3));
        assert!(!tree.contains(&3));
        assert_eq!(tree.iter().next(), None);
        assert_eq!(tree.to_string(), "[]");
        Ok(())
    }

    #[test]
    fn single_root_split() -> Result<()> {
        let mut tree = tree(2, [])?;
        let mut root_splits = 0;
        for value in 1..=7 {
            let depth = tree.depth();
            assert!(tree.insert(value));
            if tree.depth() > depth {
                root_splits += 1;
                assert_eq!(value, 4);
            }
        }
        assert_eq!(root_splits, 1);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.check_right_relation(), Some(7));
        assert_snapshot!(tree.to_string(), @r"
        [1 3 5]
        [1 2] [3 4] [5 6 7]
        ");
        Ok(())
    }

    #[rstest]
    fn duplicate_insert_keeps_shape(#[values(2, 3)] r: usize) -> Result<()> {
        let mut tree = tree(r, (1..=30).rev())?;
        let shape = tree.to_string();
        let allocated = tree.nodes.len();
        for value in 1..=30 {
            assert!(!tree.insert(value));
            assert_eq!(tree.try_insert(value), Ok(false));
        }
        assert_eq!(tree.to_string(), shape);
        assert_eq!(tree.nodes.len(), allocated);
        assert_eq!(tree.len(), 30);
        assert!(tree.check());
        Ok(())
    }

    #[rstest]
    fn root_split_on_full_leaf(#[values(2, 3, 8)] r: usize) -> Result<()> {
        let mut tree = tree(r, (0..).take(2 * r - 1).map(|v| v * 10))?;
        assert_eq!(tree.depth(), 1);
        assert!(tree.insert(5));
        assert_eq!(tree.depth(), 2);
        assert!(tree.check());
        Ok(())
    }

    #[test]
    fn root_collapse() -> Result<()> {
        let mut tree = tree(2, 1..=7)?;
        for value in [7, 6, 5] {
            assert!(tree.remove(&value));
            assert!(tree.check());
        }
        assert_snapshot!(tree.to_string(), @r"
        [1 3]
        [1 2] [3 4]
        ");
        assert!(tree.remove(&4));
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.to_string(), "[1 2 3]");
        assert!(tree.check());
        Ok(())
    }

    #[test]
    fn borrow_and_join() -> Result<()> {
        let mut tree = tree(2, 1..=7)?;

        assert!(tree.remove(&1));
        assert_snapshot!(tree.to_string(), @r"
        [1 5]
        [2 3 4] [5 6 7]
        ");

        assert!(tree.remove(&5));
        assert!(tree.remove(&6));
        assert_snapshot!(tree.to_string(), @r"
        [1 4]
        [2 3] [4 7]
        ");

        assert!(tree.insert(8));
        assert!(tree.remove(&2));
        assert_snapshot!(tree.to_string(), @r"
        [1 7]
        [3 4] [7 8]
        ");
        assert!(tree.check());
        Ok(())
    }

    #[test]
    fn depth_limit() -> Result<()> {
        let config = Config::default().with_branching_factor(2).with_max_depth(1);
        let mut tree = BTree::with_config(config)?;
        for value in 1..=3 {
            assert_eq!(tree.try_insert(value), Ok(true));
        }
        assert_eq!(tree.try_insert(2), Ok(false));
        assert_eq!(
            tree.try_insert(4),
            Err(CapacityError::DepthExceeded { max_depth: 1 })
        );
        assert_eq!(tree.len(), 3);
        assert!(!tree.contains(&4));
        assert!(tree.check());
        assert_eq!(tree.to_string(), "[1 2 3]");
        Ok(())
    }

    #[test]
    #[should_panic(expected = "maximum depth of 1")]
    fn depth_limit_panics() {
        let config = Config::default().with_branching_factor(2).with_max_depth(1);
        let mut tree = BTree::with_config(config).unwrap();
        tree.extend(1..=4);
    }

    #[test]
    fn depth_limit_allows_non_root_splits() -> Result<()> {
        let config = Config::default().with_branching_factor(2).with_max_depth(2);
        let mut tree = BTree::with_config(config)?;
        // Inserting 6 splits a leaf while the tree is already at its limit.
        for value in 1..=7 {
            assert_eq!(tree.try_insert(value), Ok(true));
        }
        assert_eq!(tree.depth(), 2);
        assert_eq!(
            tree.try_insert(8),
            Err(CapacityError::DepthExceeded { max_depth: 2 })
        );
        assert_eq!(tree.try_insert(0), Ok(true));
        assert!(tree.check());
        assert_eq!(tree.len(), 8);
        Ok(())
    }

    #[rstest]
    fn random_against_model(#[values(2, 3, 5)] r: usize) -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0x1234_abcd);
        let config = Config::default().with_branching_factor(r).with_debug(true);
        let mut tree = BTree::with_config(config)?;
        let mut model = std::collections::BTreeSet::new();
        for _ in 0..4000 {
            let value: u16 = rng.random_range(0..600);
            if rng.random_bool(0.55) {
                assert_eq!(tree.insert(value), model.insert(value));
            } else {
                assert_eq!(tree.remove(&value), model.remove(&value));
            }
            assert!(tree.check());
        }
        assert!(tree.iter().eq(model.iter()));
        assert_eq!(tree.check_right_relation(), Some(model.len()));

        for value in model.iter() {
            assert!(tree.remove(value));
        }
        assert!(tree.is_empty());
        assert_eq!(tree.depth(), 1);
        assert!(tree.check());
        Ok(())
    }

    #[test]
    fn descending_inserts_lower_separators() -> Result<()> {
        let tree = tree(2, (0..100).rev())?;
        assert!(tree.check());
        assert!(tree.iter().copied().eq(0..100));
        Ok(())
    }

    #[test]
    fn broken_link_is_detected() -> Result<()> {
        let mut tree = tree(2, 1..=7)?;
        let first_leaf = tree.nodes[tree.root].children[0];
        tree.nodes[first_leaf].right = None;
        assert_eq!(tree.check_right_relation(), None);
        assert!(!tree.check());
        Ok(())
    }

    #[test]
    fn cross_parent_link_is_checked() -> Result<()> {
        let mut tree = tree(2, 1..=30)?;
        assert!(tree.depth() >= 3);
        let first_internal = tree.nodes[tree.root].children[0];
        let last_child = *tree.nodes[first_internal].children.last().unwrap();
        tree.nodes[last_child].right = None;
        assert_eq!(tree.check_right_relation(), None);
        Ok(())
    }

    #[test]
    fn misplaced_value_is_detected() -> Result<()> {
        let mut tree = tree(2, 1..=7)?;
        let first_leaf = tree.nodes[tree.root].children[0];
        tree.nodes[first_leaf].keys[1] = 4;
        assert!(!tree.check());
        Ok(())
    }

    #[test]
    fn clear() -> Result<()> {
        let mut tree = tree(2, 1..=20)?;
        tree.clear();
        assert!(tree.check());
        assert_eq!(tree.depth(), 1);
        assert!(tree.insert(1));
        Ok(())
    }
}
