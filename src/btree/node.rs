//! B-tree nodes.
//!
//! Nodes live in the tree's slab and refer to each other by [`NodeId`]. The
//! `children` handles are owning: a node is freed only when it is removed from
//! its parent. The `right` handle is a plain cross-reference to the next node
//! at the same depth and never keeps anything alive.

/// Stable handle of a node inside the tree's arena.
pub(crate) type NodeId = usize;

/// A B-tree node.
///
/// Leaves have no children and store values. Internal nodes store one
/// separator per child: `keys[i]` is a lower bound of `children[i]`, and
/// everything below `children[i]` is strictly smaller than `keys[i + 1]`.
#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    pub(crate) keys: Vec<T>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) right: Option<NodeId>,
}

impl<T> Node<T> {
    /// An empty leaf able to hold `capacity` entries without reallocating.
    pub(crate) fn leaf(capacity: usize) -> Self {
        Node {
            keys: Vec::with_capacity(capacity),
            children: Vec::new(),
            right: None,
        }
    }

    /// An internal node with the given separators and children.
    pub(crate) fn internal(keys: Vec<T>, children: Vec<NodeId>) -> Self {
        debug_assert_eq!(keys.len(), children.len());
        Node {
            keys,
            children,
            right: None,
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of entries (values in a leaf, branches in an internal node).
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    /// Index of the branch that may contain `value`.
    ///
    /// Values below the first separator go to the first branch.
    #[inline]
    pub(crate) fn branch(&self, value: &T) -> usize
    where
        T: Ord,
    {
        match self.keys.binary_search(value) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        }
    }

    /// Move the entries from `at` onwards into a new node.
    ///
    /// The new node takes over this node's right link; the caller is
    /// responsible for pointing this node at the new one once it has a handle.
    pub(crate) fn split_off(&mut self, at: usize, capacity: usize) -> Self {
        let mut keys = Vec::with_capacity(capacity);
        keys.extend(self.keys.drain(at..));
        let children = if self.is_leaf() {
            Vec::new()
        } else {
            let mut children = Vec::with_capacity(capacity);
            children.extend(self.children.drain(at..));
            children
        };
        Node {
            keys,
            children,
            right: self.right,
        }
    }

    /// Append every entry of the right neighbour `other`, taking over its
    /// right link.
    pub(crate) fn append(&mut self, other: Self) {
        self.keys.extend(other.keys);
        self.children.extend(other.children);
        self.right = other.right;
    }

    /// Remove the last entry.
    pub(crate) fn pop_back(&mut self) -> Option<(T, Option<NodeId>)> {
        let key = self.keys.pop()?;
        Some((key, self.children.pop()))
    }

    /// Remove the first entry.
    pub(crate) fn pop_front(&mut self) -> Option<(T, Option<NodeId>)> {
        if self.keys.is_empty() {
            return None;
        }
        let key = self.keys.remove(0);
        let child = (!self.children.is_empty()).then(|| self.children.remove(0));
        Some((key, child))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::Node;

    fn leaf(keys: &[i32]) -> Node<i32> {
        let mut node = Node::leaf(4);
        node.keys.extend_from_slice(keys);
        node
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 0)]
    #[case(10, 0)]
    #[case(15, 0)]
    #[case(20, 1)]
    #[case(25, 1)]
    #[case(30, 2)]
    #[case(99, 2)]
    fn branch(#[case] value: i32, #[case] expected: usize) {
        let node = Node::internal(vec![10, 20, 30], vec![0, 1, 2]);
        assert_eq!(node.branch(&value), expected);
    }

    #[test]
    fn split_and_append() {
        let mut node = leaf(&[1, 2, 3, 4]);
        node.right = Some(9);
        let upper = node.split_off(2, 4);
        assert_eq!(node.keys, vec![1, 2]);
        assert_eq!(upper.keys, vec![3, 4]);
        assert_eq!(upper.right, Some(9));
        assert!(upper.children.is_empty());

        node.append(upper);
        assert_eq!(node.keys, vec![1, 2, 3, 4]);
        assert_eq!(node.right, Some(9));
    }

    #[test]
    fn split_internal() {
        let mut node = Node::internal(vec![1, 5, 9, 13], vec![10, 11, 12, 13]);
        let upper = node.split_off(2, 4);
        assert_eq!(node.children, vec![10, 11]);
        assert_eq!(upper.keys, vec![9, 13]);
        assert_eq!(upper.children, vec![12, 13]);
    }

    #[test]
    fn pop() {
        let mut node = Node::internal(vec![1, 5, 9], vec![10, 11, 12]);
        assert_eq!(node.pop_front(), Some((1, Some(10))));
        assert_eq!(node.pop_back(), Some((9, Some(12))));
        assert_eq!(node.keys, vec![5]);

        let mut node = leaf(&[7]);
        assert_eq!(node.pop_front(), Some((7, None)));
        assert_eq!(node.pop_front(), None);
        assert_eq!(node.pop_back(), None);
    }
}
