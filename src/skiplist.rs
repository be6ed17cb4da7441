//! A skiplist stores its values in a stack of sorted, singly linked lists.
//! Level 0 holds every value and each level above holds a random subset of
//! the level below, so a search can skip ahead on the sparse levels before
//! dropping down:
//!
//! ```text
//! <head> ----------> [2] --------------------------------------------------> [9]
//! <head> ----------> [2] ------------------------------------[7] ----------> [9]
//! <head> ----------> [2] ----------> [4] ------------------> [7] ----------> [9] --> [10]
//! <head> --> [1] --> [2] --> [3] --> [4] --> [5] --> [6] --> [7] --> [8] --> [9] --> [10]
//! ```
//!
//! In this variant every box of the picture is its own node: a value promoted
//! to level 3 is stored in four nodes, each pointing right within its level
//! and down to its copy on the level below. No rebalancing ever happens; the
//! expected search cost of `O(log n)` comes from the level distribution alone.

use std::{cmp::Ordering, fmt, iter::FusedIterator};

use slab::Slab;
use tracing::{debug, trace};

use crate::{
    config::{Config, ConfigError},
    level_generator::{Geometric, LevelGenerator},
    ordered_set::OrderedSet,
};

type NodeId = usize;

/// One value on one level.
#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    /// Next node on the same level.
    right: Option<NodeId>,
    /// The same value one level below; `None` on level 0.
    down: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Level {
    head: Option<NodeId>,
    len: usize,
}

// ////////////////////////////////////////////////////////////////////////////
// SkipList
// ////////////////////////////////////////////////////////////////////////////

/// An ordered set backed by a skiplist with one node per value and level.
///
/// ```
/// use ordset_engines::{Config, OrderedSet, SkipList};
///
/// let config = Config::default()
///     .with_max_depth(10)
///     .with_level_probability_denominator(4)
///     .with_seed(7);
/// let mut list = SkipList::with_config(config)?;
/// list.extend([5, 1, 3]);
/// assert!(list.iter().copied().eq([1, 3, 5]));
/// assert_eq!(list.level_counts()[0], 3);
/// # Ok::<(), ordset_engines::ConfigError>(())
/// ```
#[derive(Clone)]
pub struct SkipList<T> {
    nodes: Slab<Node<T>>,
    levels: Vec<Level>,
    len: usize,
    /// Last node before the search target on every level, filled by
    /// [`SkipList::insert`].
    path: Vec<Option<NodeId>>,
    level_generator: Geometric,
    config: Config,
}

// ///////////////////////////////////////////////
// Inherent methods
// ///////////////////////////////////////////////

impl<T> SkipList<T> {
    /// Create an empty skiplist with the default configuration.
    #[inline]
    #[must_use]
    #[expect(
        clippy::expect_used,
        reason = "The default configuration always validates"
    )]
    pub fn new() -> Self {
        Self::with_config(Config::default()).expect("default configuration is valid")
    }

    /// Create an empty skiplist. Uses the maximum depth, the promotion odds,
    /// the seed and the debug flag of `config`.
    ///
    /// # Errors
    ///
    /// Fails if the fields used here are invalid.
    #[inline]
    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate_levels()?;
        let level_generator = Geometric::from_config(&config)?;
        Ok(SkipList {
            nodes: Slab::new(),
            levels: vec![Level::default(); config.max_depth],
            len: 0,
            path: vec![None; config.max_depth],
            level_generator,
            config,
        })
    }

    /// Number of nodes on each level, from level 0 upwards.
    #[inline]
    #[must_use]
    pub fn level_counts(&self) -> Vec<usize> {
        self.levels.iter().map(|level| level.len).collect()
    }

    /// Removes every value. The level generator keeps its state.
    #[inline]
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.levels.fill(Level::default());
        self.len = 0;
    }

    /// Iterate over the values in ascending order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: &self.nodes,
            cursor: self.levels.first().and_then(|level| level.head),
            remaining: self.len,
        }
    }

    /// The node following `pred` on `level`, `None` standing for the head.
    fn next(&self, level: usize, pred: Option<NodeId>) -> Option<NodeId> {
        match pred {
            Some(id) => self.nodes[id].right,
            None => self.levels[level].head,
        }
    }

    /// Point `pred` (or the head) of `level` at `target`.
    fn link(&mut self, level: usize, pred: Option<NodeId>, target: Option<NodeId>) {
        match pred {
            Some(id) => self.nodes[id].right = target,
            None => self.levels[level].head = target,
        }
    }

    /// Insert a node after `pred` on `level`.
    fn splice(
        &mut self,
        level: usize,
        pred: Option<NodeId>,
        value: T,
        down: Option<NodeId>,
    ) -> NodeId {
        let right = self.next(level, pred);
        let id = self.nodes.insert(Node { value, right, down });
        self.link(level, pred, Some(id));
        self.levels[level].len += 1;
        id
    }
}

impl<T: Ord> SkipList<T> {
    /// Walk one level, verifying its order, its counter and how it sits on
    /// the level below. Returns the number of nodes walked.
    fn check_level(&self, index: usize) -> Result<usize, &'static str> {
        let level = self.levels[index];
        let mut below = index
            .checked_sub(1)
            .and_then(|lower| self.levels[lower].head);
        let mut previous: Option<&T> = None;
        let mut count = 0;
        let mut cursor = level.head;
        while let Some(id) = cursor {
            let node = self.nodes.get(id).ok_or("dangling right link")?;
            if previous.is_some_and(|previous| previous >= &node.value) {
                return Err("values not strictly increasing");
            }
            if index == 0 {
                if node.down.is_some() {
                    return Err("level-0 node links down");
                }
            } else {
                let down = node.down.ok_or("upper node without down link")?;
                // The level below must contain `down` after the previous match.
                loop {
                    let candidate = below.ok_or("down link not on the level below")?;
                    below = self.nodes.get(candidate).ok_or("dangling right link")?.right;
                    if candidate == down {
                        break;
                    }
                }
                if self.nodes[down].value != node.value {
                    return Err("down link to a different value");
                }
            }
            previous = Some(&node.value);
            count += 1;
            cursor = node.right;
        }
        if count == level.len {
            Ok(count)
        } else {
            Err("level counter does not match chain length")
        }
    }
}

impl<T: fmt::Display> SkipList<T> {
    /// Prints out the internal structure of the skiplist (for debugging
    /// purposes), one line per non-empty level, top level first.
    #[inline]
    pub fn debug_structure(&self) -> String {
        let mut rows = Vec::new();
        for (index, level) in self.levels.iter().enumerate().rev() {
            if level.head.is_none() {
                continue;
            }
            let mut values = Vec::with_capacity(level.len);
            let mut cursor = level.head;
            while let Some(id) = cursor {
                let node = &self.nodes[id];
                values.push(node.value.to_string());
                cursor = node.right;
            }
            rows.push(format!("{index} | {}", values.join(" ")));
        }
        rows.join("\n")
    }
}

// ///////////////////////////////////////////////
// Trait implementation
// ///////////////////////////////////////////////

impl<T> Default for SkipList<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> OrderedSet<T> for SkipList<T> {
    #[inline]
    fn insert(&mut self, value: T) -> bool {
        let mut pred = None;
        for level in (0..self.levels.len()).rev() {
            while let Some(id) = self.next(level, pred) {
                match self.nodes[id].value.cmp(&value) {
                    Ordering::Less => pred = Some(id),
                    Ordering::Equal => return false,
                    Ordering::Greater => break,
                }
            }
            self.path[level] = pred;
            pred = pred.and_then(|id| self.nodes[id].down);
        }

        let top = self.level_generator.level();
        let mut down = None;
        for level in 0..top {
            down = Some(self.splice(level, self.path[level], value.clone(), down));
        }
        self.splice(top, self.path[top], value, down);
        self.len += 1;
        if self.config.debug {
            trace!(level = top, len = self.len, "skiplist insert");
        }
        true
    }

    #[inline]
    fn remove(&mut self, value: &T) -> bool {
        let mut found = false;
        let mut pred = None;
        for level in (0..self.levels.len()).rev() {
            while let Some(id) = self.next(level, pred) {
                match self.nodes[id].value.cmp(value) {
                    Ordering::Less => pred = Some(id),
                    Ordering::Equal => {
                        let right = self.nodes[id].right;
                        self.link(level, pred, right);
                        self.nodes.remove(id);
                        self.levels[level].len -= 1;
                        found = true;
                        break;
                    }
                    Ordering::Greater => break,
                }
            }
            pred = pred.and_then(|id| self.nodes[id].down);
        }
        if found {
            self.len -= 1;
            if self.config.debug {
                trace!(len = self.len, "skiplist remove");
            }
        }
        found
    }

    #[inline]
    fn contains(&self, value: &T) -> bool {
        let mut pred = None;
        for level in (0..self.levels.len()).rev() {
            while let Some(id) = self.next(level, pred) {
                match self.nodes[id].value.cmp(value) {
                    Ordering::Less => pred = Some(id),
                    Ordering::Equal => return true,
                    Ordering::Greater => break,
                }
            }
            pred = pred.and_then(|id| self.nodes[id].down);
        }
        false
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    /// Walks every level, checking order and counters, and that each level
    /// sits on the one below through its down links.
    #[inline]
    fn check(&self) -> bool {
        let mut total = 0;
        for index in 0..self.levels.len() {
            match self.check_level(index) {
                Ok(count) => total += count,
                Err(reason) => {
                    if self.config.debug {
                        debug!(level = index, reason, "skiplist: invariant violated");
                    }
                    return false;
                }
            }
        }
        let consistent = self.levels.first().is_some_and(|level| level.len == self.len)
            && total == self.nodes.len();
        if !consistent && self.config.debug {
            debug!(total, allocated = self.nodes.len(), "skiplist: node count mismatch");
        }
        consistent
    }

    #[inline]
    fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    #[inline]
    fn name(&self) -> &'static str {
        "skiplist"
    }
}

impl<T: Ord + Clone> Extend<T> for SkipList<T> {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iterable: I) {
        for value in iterable {
            self.insert(value);
        }
    }
}

impl<T: Ord + Clone> FromIterator<T> for SkipList<T> {
    #[inline]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = SkipList::new();
        list.extend(iter);
        list
    }
}

impl<T: fmt::Debug> fmt::Debug for SkipList<T> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a SkipList<T> {
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

/// Ascending iterator over a [`SkipList`], walking level 0.
pub struct Iter<'a, T> {
    nodes: &'a Slab<Node<T>>,
    cursor: Option<NodeId>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        let node = self.nodes.get(self.cursor?)?;
        self.cursor = node.right;
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
