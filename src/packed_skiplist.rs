//! A skiplist storing one node per value.
//!
//! Where [`SkipList`](crate::SkipList) keeps a separate node for every level
//! a value reaches, this variant packs them: each node owns a tower of `right`
//! links, one per level it occupies. Values are never cloned and a search
//! stays on the same node while it drops down a level.

use std::{cmp::Ordering, fmt, iter::FusedIterator};

use slab::Slab;
use tracing::{debug, trace};

use crate::{
    config::{Config, ConfigError},
    level_generator::{Geometric, LevelGenerator},
    ordered_set::OrderedSet,
};

type NodeId = usize;

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    /// `links[l]` is the next node on level `l`; the tower height is
    /// `links.len()`.
    links: Vec<Option<NodeId>>,
}

/// An ordered set backed by a skiplist with towers of links packed into one
/// node per value.
///
/// ```
/// use ordset_engines::{OrderedSet, PackedSkipList};
///
/// let mut list: PackedSkipList<_> = ["b", "c", "a"].into_iter().collect();
/// assert!(list.remove(&"b"));
/// assert!(list.check());
/// assert!(list.iter().copied().eq(["a", "c"]));
/// ```
#[derive(Clone)]
pub struct PackedSkipList<T> {
    nodes: Slab<Node<T>>,
    head: Vec<Option<NodeId>>,
    counts: Vec<usize>,
    len: usize,
    path: Vec<Option<NodeId>>,
    level_generator: Geometric,
    config: Config,
}

impl<T> PackedSkipList<T> {
    /// Create an empty list with the default configuration.
    #[inline]
    #[must_use]
    #[expect(
        clippy::expect_used,
        reason = "The default configuration always validates"
    )]
    pub fn new() -> Self {
        Self::with_config(Config::default()).expect("default configuration is valid")
    }

    /// Create an empty list using the skiplist fields of `config`.
    ///
    /// # Errors
    ///
    /// Fails if the fields used here are invalid.
    #[inline]
    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate_levels()?;
        let level_generator = Geometric::from_config(&config)?;
        Ok(PackedSkipList {
            nodes: Slab::new(),
            head: vec![None; config.max_depth],
            counts: vec![0; config.max_depth],
            len: 0,
            path: vec![None; config.max_depth],
            level_generator,
            config,
        })
    }

    /// Number of values reaching each level, from level 0 upwards.
    #[inline]
    #[must_use]
    pub fn level_counts(&self) -> Vec<usize> {
        self.counts.clone()
    }

    /// Removes every value.
    #[inline]
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head.fill(None);
        self.counts.fill(0);
        self.len = 0;
    }

    /// Iterate over the values in ascending order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: &self.nodes,
            cursor: self.head.first().copied().flatten(),
            remaining: self.len,
        }
    }

    fn next(&self, level: usize, pred: Option<NodeId>) -> Option<NodeId> {
        match pred {
            Some(id) => self.nodes[id].links[level],
            None => self.head[level],
        }
    }

    fn link(&mut self, level: usize, pred: Option<NodeId>, target: Option<NodeId>) {
        match pred {
            Some(id) => self.nodes[id].links[level] = target,
            None => self.head[level] = target,
        }
    }
}

impl<T: Ord> PackedSkipList<T> {
    /// Fill `path` with the last node before `value` on every level. Returns
    /// the node holding `value`, if any.
    fn search(&mut self, value: &T) -> Option<NodeId> {
        let mut pred = None;
        let mut found = None;
        for level in (0..self.head.len()).rev() {
            while let Some(id) = self.next(level, pred) {
                match self.nodes[id].value.cmp(value) {
                    Ordering::Less => pred = Some(id),
                    Ordering::Equal => {
                        found = Some(id);
                        break;
                    }
                    Ordering::Greater => break,
                }
            }
            self.path[level] = pred;
        }
        found
    }

    /// Walk one level and verify it against its counter, the towers of its
    /// nodes and the level below.
    fn check_level(&self, level: usize) -> Result<(), &'static str> {
        let mut below = level.checked_sub(1).and_then(|lower| self.head[lower]);
        let mut previous: Option<&T> = None;
        let mut count = 0;
        let mut cursor = self.head[level];
        while let Some(id) = cursor {
            let node = self.nodes.get(id).ok_or("dangling link")?;
            if node.links.len() <= level {
                return Err("node reached above its tower");
            }
            if previous.is_some_and(|previous| previous >= &node.value) {
                return Err("values not strictly increasing");
            }
            if level > 0 {
                loop {
                    let candidate = below.ok_or("node missing from the level below")?;
                    below = self.nodes[candidate].links[level - 1];
                    if candidate == id {
                        break;
                    }
                }
            }
            previous = Some(&node.value);
            count += 1;
            cursor = node.links[level];
        }
        if count != self.counts[level] {
            return Err("level counter does not match chain length");
        }
        let covering = self
            .nodes
            .iter()
            .filter(|(_, node)| node.links.len() > level)
            .count();
        if count == covering {
            Ok(())
        } else {
            Err("tower not linked on every level it covers")
        }
    }
}

impl<T: fmt::Display> PackedSkipList<T> {
    /// Prints out the internal structure of the list, one line per non-empty
    /// level, top level first.
    #[inline]
    pub fn debug_structure(&self) -> String {
        let mut rows = Vec::new();
        for (level, head) in self.head.iter().enumerate().rev() {
            let mut cursor = *head;
            if cursor.is_none() {
                continue;
            }
            let mut values = Vec::with_capacity(self.counts[level]);
            while let Some(id) = cursor {
                let node = &self.nodes[id];
                values.push(node.value.to_string());
                cursor = node.links[level];
            }
            rows.push(format!("{level} | {}", values.join(" ")));
        }
        rows.join("\n")
    }
}

impl<T> Default for PackedSkipList<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> OrderedSet<T> for PackedSkipList<T> {
    #[inline]
    fn insert(&mut self, value: T) -> bool {
        if self.search(&value).is_some() {
            return false;
        }
        let height = self.level_generator.level() + 1;
        let links = (0..height)
            .map(|level| self.next(level, self.path[level]))
            .collect();
        let id = self.nodes.insert(Node { value, links });
        for level in 0..height {
            self.link(level, self.path[level], Some(id));
            self.counts[level] += 1;
        }
        self.len += 1;
        if self.config.debug {
            trace!(height, len = self.len, "packed skiplist insert");
        }
        true
    }

    #[inline]
    fn remove(&mut self, value: &T) -> bool {
        let Some(id) = self.search(value) else {
            return false;
        };
        let node = self.nodes.remove(id);
        for (level, next) in node.links.into_iter().enumerate() {
            self.link(level, self.path[level], next);
            self.counts[level] -= 1;
        }
        self.len -= 1;
        if self.config.debug {
            trace!(len = self.len, "packed skiplist remove");
        }
        true
    }

    #[inline]
    fn contains(&self, value: &T) -> bool {
        let mut pred = None;
        for level in (0..self.head.len()).rev() {
            while let Some(id) = self.next(level, pred) {
                match self.nodes[id].value.cmp(value) {
                    Ordering::Less => pred = Some(id),
                    Ordering::Equal => return true,
                    Ordering::Greater => break,
                }
            }
        }
        false
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn check(&self) -> bool {
        for level in 0..self.head.len() {
            if let Err(reason) = self.check_level(level) {
                if self.config.debug {
                    debug!(level, reason, "packed skiplist: invariant violated");
                }
                return false;
            }
        }
        let consistent = self.counts.first() == Some(&self.len)
            && self.nodes.len() == self.len
            && self
                .nodes
                .iter()
                .all(|(_, node)| (1..=self.head.len()).contains(&node.links.len()));
        if !consistent && self.config.debug {
            debug!(
                len = self.len,
                allocated = self.nodes.len(),
                "packed skiplist: unreachable or malformed nodes"
            );
        }
        consistent
    }

    #[inline]
    fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    #[inline]
    fn name(&self) -> &'static str {
        "packed-skiplist"
    }
}

impl<T: Ord> Extend<T> for PackedSkipList<T> {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iterable: I) {
        for value in iterable {
            self.insert(value);
        }
    }
}

impl<T: Ord> FromIterator<T> for PackedSkipList<T> {
    #[inline]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = PackedSkipList::new();
        list.extend(iter);
        list
    }
}

impl<T: fmt::Debug> fmt::Debug for PackedSkipList<T> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a PackedSkipList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Ascending iterator over a [`PackedSkipList`].
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
        self.cursor = node.links.first().copied().flatten();
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
