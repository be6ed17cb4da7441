//! Unordered baseline used to put the ordered engines' timings in context.

use std::{fmt, hash::Hash};

use rustc_hash::FxHashSet;

use crate::ordered_set::OrderedSet;

/// A hash set behind the [`OrderedSet`] interface.
///
/// It keeps no order, so it has no invariants for [`OrderedSet::check`] to
/// verify and no ascending iterator.
#[derive(Clone, Default)]
pub struct HashSetBaseline<T> {
    set: FxHashSet<T>,
}

impl<T> HashSetBaseline<T> {
    /// Create an empty set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        HashSetBaseline {
            set: FxHashSet::default(),
        }
    }

    /// Removes every value.
    #[inline]
    pub fn clear(&mut self) {
        self.set.clear();
    }
}

impl<T: Hash + Eq> OrderedSet<T> for HashSetBaseline<T> {
    #[inline]
    fn insert(&mut self, value: T) -> bool {
        self.set.insert(value)
    }

    #[inline]
    fn remove(&mut self, value: &T) -> bool {
        self.set.remove(value)
    }

    #[inline]
    fn contains(&self, value: &T) -> bool {
        self.set.contains(value)
    }

    #[inline]
    fn len(&self) -> usize {
        self.set.len()
    }

    #[inline]
    fn check(&self) -> bool {
        true
    }

    #[inline]
    fn set_debug(&mut self, _debug: bool) {}

    #[inline]
    fn name(&self) -> &'static str {
        "hashset"
    }
}

impl<T: Hash + Eq> Extend<T> for HashSetBaseline<T> {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iterable: I) {
        self.set.extend(iterable);
    }
}

impl<T: Hash + Eq> FromIterator<T> for HashSetBaseline<T> {
    #[inline]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        HashSetBaseline {
            set: iter.into_iter().collect(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for HashSetBaseline<T> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.set.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::HashSetBaseline;
    use crate::ordered_set::OrderedSet;

    #[test]
    fn contract() {
        let mut set: HashSetBaseline<_> = [1, 2, 3].into_iter().collect();
        assert!(!set.insert(2));
        assert!(set.remove(&2));
        assert!(!set.remove(&2));
        assert!(set.contains(&3));
        assert_eq!(set.len(), 2);
        assert!(set.check());
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.name(), "hashset");
    }
}
