//! The capability contract shared by every engine.

/// A set of unique, totally-ordered keys.
///
/// Every engine of this crate implements this trait so that the same workload
/// can be replayed against each of them and the results compared. Return
/// values report whether the set changed; they are never errors.
///
/// ```
/// use ordset_engines::{AvlTree, OrderedSet};
///
/// let mut set = AvlTree::new();
/// assert!(set.insert(3));
/// assert!(!set.insert(3));
/// assert!(set.contains(&3));
/// assert!(set.remove(&3));
/// assert!(!set.remove(&3));
/// assert!(set.check());
/// ```
pub trait OrderedSet<T> {
    /// Insert `value`.
    ///
    /// Returns `true` if the value was absent and is now present, and `false`
    /// (leaving the set untouched) if it was already present.
    fn insert(&mut self, value: T) -> bool;

    /// Remove `value`.
    ///
    /// Returns `true` if the value was present and is now absent, and `false`
    /// otherwise.
    fn remove(&mut self, value: &T) -> bool;

    /// Returns `true` if `value` is in the set.
    #[must_use]
    fn contains(&self, value: &T) -> bool;

    /// Number of values stored.
    #[must_use]
    fn len(&self) -> usize;

    /// Returns `true` if the set holds no value.
    #[must_use]
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-derive every structural invariant from scratch.
    ///
    /// This never mutates the set and is never needed for correctness; it is
    /// a diagnostic for tests and benchmarks.
    #[must_use]
    fn check(&self) -> bool;

    /// Toggle verbose tracing of structural changes for this instance only.
    fn set_debug(&mut self, debug: bool);

    /// Short human-readable name of the engine.
    #[must_use]
    fn name(&self) -> &'static str;
}
