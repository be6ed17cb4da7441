//! Height-balanced binary search tree.
//!
//! Every node records the height of its subtree (a leaf has height 0 and a
//! missing child counts as -1). After each mutation the heights of the two
//! subtrees of any node differ by at most one, which is restored by at most
//! one single or double rotation per ancestor on the way back up.
//!
//! ```text
//!         4                      6
//!       /   \    rotate left   /   \
//!      2     6   ---------->  4     7
//!     / \   / \              / \
//!    1   3 5   7            2   5
//!                          / \
//!                         1   3
//! ```

use std::{cmp::Ordering, fmt, iter::FusedIterator};

use tracing::{debug, trace};

use crate::{
    config::{Config, ConfigError},
    ordered_set::OrderedSet,
};

type Link<T> = Option<Box<Node<T>>>;

// ////////////////////////////////////////////////////////////////////////////
// Node
// ////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    height: i32,
    left: Link<T>,
    right: Link<T>,
}

impl<T> Node<T> {
    fn leaf(value: T) -> Box<Self> {
        Box::new(Node {
            value,
            height: 0,
            left: None,
            right: None,
        })
    }

    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    /// Balance factor: `height(right) - height(left)`.
    fn balance(&self) -> i32 {
        height(&self.right) - height(&self.left)
    }
}

fn height<T>(link: &Link<T>) -> i32 {
    link.as_ref().map_or(-1, |node| node.height)
}

/// What a recursive step did to the subtree it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Delta {
    /// A value was inserted or removed.
    mutated: bool,
    /// The subtree's height differs from before the step.
    height_changed: bool,
}

impl Delta {
    const UNCHANGED: Self = Self {
        mutated: false,
        height_changed: false,
    };
}

// ///////////////////////////////////////////////
// Rotations
// ///////////////////////////////////////////////

/// `a(x, b(y, z))` becomes `b(a(x, y), z)`.
///
/// A node without a right child is returned as is.
fn rotate_left<T>(mut node: Box<Node<T>>) -> Box<Node<T>> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };
    node.right = pivot.left.take();
    node.update_height();
    pivot.left = Some(node);
    pivot.update_height();
    pivot
}

/// `a(b(x, y), z)` becomes `b(x, a(y, z))`.
///
/// A node without a left child is returned as is.
fn rotate_right<T>(mut node: Box<Node<T>>) -> Box<Node<T>> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };
    node.left = pivot.right.take();
    node.update_height();
    pivot.right = Some(node);
    pivot.update_height();
    pivot
}

/// Recompute the height of `node` and rotate if it is out of balance.
///
/// Children must already be balanced, and the imbalance at `node` must be at
/// most two.
fn rebalance<T>(mut node: Box<Node<T>>, debug: bool) -> Box<Node<T>> {
    node.update_height();
    let balance = node.balance();
    if balance > 1 {
        if node.right.as_ref().is_some_and(|right| right.balance() < 0) {
            if debug {
                trace!(balance, height = node.height, "double rotation right-left");
            }
            node.right = node.right.take().map(rotate_right);
        } else if debug {
            trace!(balance, height = node.height, "single rotation left");
        }
        rotate_left(node)
    } else if balance < -1 {
        if node.left.as_ref().is_some_and(|left| left.balance() > 0) {
            if debug {
                trace!(balance, height = node.height, "double rotation left-right");
            }
            node.left = node.left.take().map(rotate_left);
        } else if debug {
            trace!(balance, height = node.height, "single rotation right");
        }
        rotate_right(node)
    } else {
        node
    }
}

/// Rebalance `node` and report whether its height moved.
fn settle<T>(node: Box<Node<T>>, debug: bool) -> (Box<Node<T>>, bool) {
    let before = node.height;
    let node = rebalance(node, debug);
    let changed = node.height != before;
    (node, changed)
}

// ///////////////////////////////////////////////
// Recursive mutations
// ///////////////////////////////////////////////

fn insert_into<T: Ord>(link: Link<T>, value: T, debug: bool) -> (Box<Node<T>>, Delta) {
    let Some(mut node) = link else {
        return (
            Node::leaf(value),
            Delta {
                mutated: true,
                height_changed: true,
            },
        );
    };
    let delta = match value.cmp(&node.value) {
        Ordering::Equal => return (node, Delta::UNCHANGED),
        Ordering::Less => {
            let (child, delta) = insert_into(node.left.take(), value, debug);
            node.left = Some(child);
            delta
        }
        Ordering::Greater => {
            let (child, delta) = insert_into(node.right.take(), value, debug);
            node.right = Some(child);
            delta
        }
    };
    if !delta.height_changed {
        return (node, delta);
    }
    let (node, height_changed) = settle(node, debug);
    (
        node,
        Delta {
            mutated: delta.mutated,
            height_changed,
        },
    )
}

fn remove_from<T: Ord>(link: Link<T>, value: &T, debug: bool) -> (Link<T>, Delta) {
    let Some(mut node) = link else {
        return (None, Delta::UNCHANGED);
    };
    let delta = match value.cmp(&node.value) {
        Ordering::Equal => {
            let before = node.height;
            let replacement = unlink(node, debug);
            let height_changed = height(&replacement) != before;
            return (
                replacement,
                Delta {
                    mutated: true,
                    height_changed,
                },
            );
        }
        Ordering::Less => {
            let (child, delta) = remove_from(node.left.take(), value, debug);
            node.left = child;
            delta
        }
        Ordering::Greater => {
            let (child, delta) = remove_from(node.right.take(), value, debug);
            node.right = child;
            delta
        }
    };
    if !delta.height_changed {
        return (Some(node), delta);
    }
    let (node, height_changed) = settle(node, debug);
    (
        Some(node),
        Delta {
            mutated: delta.mutated,
            height_changed,
        },
    )
}

/// Detach `node` from its children and return the subtree taking its place.
///
/// With two children, the extreme node of the taller side is moved (as a
/// node, not as a value) into the vacated slot.
fn unlink<T>(mut node: Box<Node<T>>, debug: bool) -> Link<T> {
    match (node.left.take(), node.right.take()) {
        (None, right) => right,
        (left, None) => left,
        (Some(left), Some(right)) => {
            let heir = if right.height >= left.height {
                let (rest, mut heir, _) = take_min(right, debug);
                heir.left = Some(left);
                heir.right = rest;
                heir
            } else {
                let (rest, mut heir, _) = take_max(left, debug);
                heir.left = rest;
                heir.right = Some(right);
                heir
            };
            Some(rebalance(heir, debug))
        }
    }
}

/// Detach the leftmost node of the subtree.
///
/// Returns the remaining subtree, the detached node (childless) and whether
/// the remaining subtree's height changed.
fn take_min<T>(mut node: Box<Node<T>>, debug: bool) -> (Link<T>, Box<Node<T>>, bool) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            (rest, node, true)
        }
        Some(left) => {
            let (rest, min, changed) = take_min(left, debug);
            node.left = rest;
            if changed {
                let (node, changed) = settle(node, debug);
                (Some(node), min, changed)
            } else {
                (Some(node), min, false)
            }
        }
    }
}

/// Mirror image of [`take_min`].
fn take_max<T>(mut node: Box<Node<T>>, debug: bool) -> (Link<T>, Box<Node<T>>, bool) {
    match node.right.take() {
        None => {
            let rest = node.left.take();
            (rest, node, true)
        }
        Some(right) => {
            let (rest, max, changed) = take_max(right, debug);
            node.right = rest;
            if changed {
                let (node, changed) = settle(node, debug);
                (Some(node), max, changed)
            } else {
                (Some(node), max, false)
            }
        }
    }
}

// ///////////////////////////////////////////////
// Validation
// ///////////////////////////////////////////////

/// Recomputes subtree heights, returning `None` if a stored one is wrong.
fn verified_height<T>(link: &Link<T>) -> Option<i32> {
    match link {
        None => Some(-1),
        Some(node) => {
            let left = verified_height(&node.left)?;
            let right = verified_height(&node.right)?;
            let actual = 1 + left.max(right);
            (actual == node.height).then_some(actual)
        }
    }
}

fn is_balanced<T>(link: &Link<T>) -> bool {
    link.as_ref().is_none_or(|node| {
        node.balance().abs() <= 1 && is_balanced(&node.left) && is_balanced(&node.right)
    })
}

// ////////////////////////////////////////////////////////////////////////////
// AvlTree
// ////////////////////////////////////////////////////////////////////////////

/// An ordered set backed by an AVL tree.
///
/// Each node exclusively owns its children; rotations move ownership between
/// nodes and never alias them.
///
/// ```
/// use ordset_engines::{AvlTree, OrderedSet};
///
/// let mut tree: AvlTree<i32> = (0..100).collect();
/// assert_eq!(tree.len(), 100);
/// assert!(tree.height() <= 7);
/// assert!(tree.remove(&50));
/// assert!(tree.check());
/// ```
#[derive(Clone)]
pub struct AvlTree<T> {
    root: Link<T>,
    len: usize,
    config: Config,
}

impl<T> AvlTree<T> {
    /// Create an empty tree with the default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        AvlTree {
            root: None,
            len: 0,
            config: Config::default(),
        }
    }

    /// Create an empty tree. Only the debug flag of `config` is used, so no
    /// field is checked.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other engines.
    #[inline]
    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        Ok(AvlTree {
            root: None,
            len: 0,
            config,
        })
    }

    /// Height of the tree: -1 when empty, 0 for a single node.
    #[inline]
    #[must_use]
    pub fn height(&self) -> i32 {
        height(&self.root)
    }

    /// Removes every value.
    #[inline]
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Iterate over the values in ascending order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        let mut iter = Iter {
            stack: Vec::new(),
            remaining: self.len,
        };
        iter.push_left_spine(self.root.as_deref());
        iter
    }
}

impl<T: Ord> AvlTree<T> {
    fn check_order(&self) -> bool {
        let mut count = 0;
        let mut previous: Option<&T> = None;
        for value in self.iter() {
            if previous.is_some_and(|previous| previous >= value) {
                return false;
            }
            previous = Some(value);
            count += 1;
        }
        count == self.len
    }
}

impl<T> Default for AvlTree<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> OrderedSet<T> for AvlTree<T> {
    #[inline]
    fn insert(&mut self, value: T) -> bool {
        let (root, delta) = insert_into(self.root.take(), value, self.config.debug);
        self.root = Some(root);
        if delta.mutated {
            self.len += 1;
            if self.config.debug {
                debug!(len = self.len, height = self.height(), "avl insert");
            }
        }
        delta.mutated
    }

    #[inline]
    fn remove(&mut self, value: &T) -> bool {
        let (root, delta) = remove_from(self.root.take(), value, self.config.debug);
        self.root = root;
        if delta.mutated {
            self.len -= 1;
            if self.config.debug {
                debug!(len = self.len, height = self.height(), "avl remove");
            }
        }
        delta.mutated
    }

    #[inline]
    fn contains(&self, value: &T) -> bool {
        let mut link = self.root.as_deref();
        while let Some(node) = link {
            link = match value.cmp(&node.value) {
                Ordering::Equal => return true,
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
            };
        }
        false
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    /// Three independent passes: stored heights, balance factors, and the
    /// in-order key sequence.
    #[inline]
    fn check(&self) -> bool {
        if verified_height(&self.root).is_none() {
            if self.config.debug {
                debug!("avl: stored heights are inconsistent");
            }
            return false;
        }
        if !is_balanced(&self.root) {
            if self.config.debug {
                debug!("avl: balance factor out of range");
            }
            return false;
        }
        if !self.check_order() {
            if self.config.debug {
                debug!("avl: keys out of order or length mismatch");
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
        "avl"
    }
}

impl<T: Ord> Extend<T> for AvlTree<T> {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iterable: I) {
        for value in iterable {
            self.insert(value);
        }
    }
}

impl<T: Ord> FromIterator<T> for AvlTree<T> {
    #[inline]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = AvlTree::new();
        tree.extend(iter);
        tree
    }
}

impl<T: fmt::Debug> fmt::Debug for AvlTree<T> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Prints the shape of the tree as `value(left right)`, with `-` standing in
/// for a missing child.
impl<T: fmt::Display> fmt::Display for AvlTree<T> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_link<T: fmt::Display>(f: &mut fmt::Formatter<'_>, link: &Link<T>) -> fmt::Result {
            match link {
                None => write!(f, "-"),
                Some(node) => {
                    write!(f, "{}", node.value)?;
                    if node.left.is_some() || node.right.is_some() {
                        write!(f, "(")?;
                        write_link(f, &node.left)?;
                        write!(f, " ")?;
                        write_link(f, &node.right)?;
                        write!(f, ")")?;
                    }
                    Ok(())
                }
            }
        }
        write_link(f, &self.root)
    }
}

impl<'a, T> IntoIterator for &'a AvlTree<T> {
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

/// In-order iterator over an [`AvlTree`].
pub struct Iter<'a, T> {
    stack: Vec<&'a Node<T>>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    fn push_left_spine(&mut self, mut node: Option<&'a Node<T>>) {
        while let Some(current) = node {
            self.stack.push(current);
            node = current.left.as_deref();
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        self.remaining = self.remaining.saturating_sub(1);
        Some(&node.value)
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
    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use rstest::rstest;

    use super::{AvlTree, rotate_left, rotate_right};
    use crate::{config::Config, ordered_set::OrderedSet};

    fn tree_of(values: &[i32]) -> AvlTree<i32> {
        let mut tree = AvlTree::new();
        for &value in values {
            assert!(tree.insert(value));
            assert!(tree.check());
        }
        tree
    }

    #[test]
    fn empty() {
        let mut tree: AvlTree<i32> = AvlTree::new();
        assert!(tree.check());
        assert!(tree.is_empty());
        assert_eq!(tree.height(), -1);
        assert!(!tree.remove(&1));
        assert!(!tree.contains(&1));
        assert_eq!(tree.to_string(), "-");
    }

    #[test]
    fn balanced_scenario() {
        let tree = tree_of(&[4, 2, 1, 3, 6, 5, 7]);
        assert_eq!(tree.to_string(), "4(2(1 3) 6(5 7))");
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.len(), 7);
    }

    #[test]
    fn rotation_round_trip() {
        let mut tree = tree_of(&[4, 2, 1, 3, 6, 5, 7]);

        let root = tree.root.take().map(rotate_left);
        tree.root = root;
        assert_eq!(tree.to_string(), "6(4(2(1 3) 5) 7)");

        let root = tree.root.take().map(rotate_right);
        tree.root = root;
        assert_eq!(tree.to_string(), "4(2(1 3) 6(5 7))");
        assert!(tree.check());
    }

    #[rstest]
    #[case::single_left(&[1, 2, 3])]
    #[case::single_right(&[3, 2, 1])]
    #[case::double_right_left(&[1, 3, 2])]
    #[case::double_left_right(&[3, 1, 2])]
    fn rotations(#[case] values: &[i32]) {
        let tree = tree_of(values);
        assert_eq!(tree.to_string(), "2(1 3)");
    }

    #[test]
    fn idempotent_insert() {
        let mut tree = tree_of(&[4, 2, 6]);
        assert!(!tree.insert(2));
        assert_eq!(tree.to_string(), "4(2 6)");
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn remove_leaf_and_single_child() {
        let mut tree = tree_of(&[4, 2, 6, 7]);
        assert!(tree.remove(&6));
        assert_eq!(tree.to_string(), "4(2 7)");
        assert!(tree.remove(&2));
        assert_eq!(tree.to_string(), "4(- 7)");
        assert!(tree.check());
    }

    #[test]
    fn remove_relocates_successor() {
        let mut tree = tree_of(&[4, 2, 1, 3, 6, 5, 7]);
        assert!(tree.remove(&4));
        assert_eq!(tree.to_string(), "5(2(1 3) 6(- 7))");
        assert!(tree.check());
    }

    #[test]
    fn remove_relocates_predecessor_from_taller_side() {
        let mut tree = tree_of(&[4, 2, 6, 1, 3, 5]);
        assert!(tree.remove(&6));
        assert_eq!(tree.to_string(), "4(2(1 3) 5)");
        // The left side is now taller, so the predecessor takes the root.
        assert!(tree.remove(&4));
        assert_eq!(tree.to_string(), "3(2(1 -) 5)");
        assert!(tree.check());
    }

    #[test]
    fn remove_rebalances() {
        let mut tree = tree_of(&[2, 1, 3, 4]);
        assert!(tree.remove(&1));
        assert_eq!(tree.to_string(), "3(2 4)");
        assert!(tree.check());
    }

    #[test]
    fn sequential_height() {
        let tree: AvlTree<u32> = (0..1023).collect();
        assert!(tree.check());
        assert_eq!(tree.height(), 9);
        assert!(tree.iter().copied().eq(0..1023));
    }

    #[test]
    fn random_against_model() {
        let mut rng = StdRng::seed_from_u64(0x1234_abcd);
        let mut tree = AvlTree::with_config(Config::default().with_debug(true)).unwrap();
        let mut model = std::collections::BTreeSet::new();
        for _ in 0..5000 {
            let value: u16 = rng.random_range(0..500);
            if rng.random_bool(0.6) {
                assert_eq!(tree.insert(value), model.insert(value));
            } else {
                assert_eq!(tree.remove(&value), model.remove(&value));
            }
        }
        assert!(tree.check());
        assert!(tree.iter().eq(model.iter()));
        assert_eq!(tree.iter().len(), model.len());
    }

    #[test]
    fn check_detects_corruption() {
        let mut tree = tree_of(&[4, 2, 1, 3, 6, 5, 7]);
        if let Some(root) = tree.root.as_mut() {
            root.height = 5;
        }
        assert!(!tree.check());

        let mut tree = tree_of(&[2, 1, 3]);
        if let Some(root) = tree.root.as_mut() {
            root.value = 0;
        }
        assert!(!tree.check());
    }

    #[test]
    fn clear() {
        let mut tree: AvlTree<_> = (0..10).collect();
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.check());
        assert!(tree.insert(3));
    }

    #[test]
    fn debug_format() {
        let tree: AvlTree<_> = [3, 1, 2].into_iter().collect();
        assert_eq!(format!("{tree:?}"), "{1, 2, 3}");
    }

    #[test]
    fn unused_config_fields_are_accepted() {
        let config = Config::default()
            .with_branching_factor(1)
            .with_max_depth(0)
            .with_level_probability_denominator(0);
        let Ok(mut tree) = AvlTree::with_config(config) else {
            panic!("the AVL tree reads no size parameter");
        };
        assert!(tree.insert(1));
        assert!(tree.check());
    }
}
