//! # avl-kv
//!
//! An ordered key/value store backed by an AVL (height-balanced) binary
//! search tree. Lookup, insertion and deletion are O(log n): every mutation
//! restores `|height(left) - height(right)| <= 1` at each node on its path.
//!
//! The tree is available at two levels. [`node`] holds the recursive
//! operations over owned subtree slots, where each call consumes a subtree and
//! returns its replacement. [`AvlTree`] owns a root and threads it through
//! those operations behind a map-shaped API.
//!
//! ## Example
//!
//! ```rust
//! use avl_kv::AvlTree;
//!
//! let mut tree: AvlTree<u32, &str> = AvlTree::new();
//! tree.insert(10, "ten");
//! tree.insert(20, "twenty");
//! tree.insert(30, "thirty");
//!
//! assert_eq!(tree.get(&20), Some(&"twenty"));
//! assert_eq!(tree.height(), 2);
//!
//! assert_eq!(tree.insert(20, "TWENTY"), Some("twenty"));
//! assert_eq!(tree.remove(&10), Some("ten"));
//! assert_eq!(tree.keys().copied().collect::<Vec<_>>(), vec![20, 30]);
//! ```

#![deny(unsafe_code)]

mod error;
pub mod node;

pub use error::InvariantViolation;
pub use node::{Iter, Link, Node};

use std::borrow::Borrow;
use std::fmt;

use tracing::debug;

/// An ordered map from `K` to `V` kept as an AVL tree.
///
/// Mutation needs `&mut self`; callers sharing a tree across threads must
/// serialize access themselves.
#[derive(Clone)]
pub struct AvlTree<K, V> {
    root: Link<K, V>,
    len: usize,
}

impl<K, V> AvlTree<K, V> {
    pub const fn new() -> Self {
        Self { root: None, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes on the longest root-to-leaf path; 0 when empty.
    #[inline]
    pub fn height(&self) -> u8 {
        node::height(&self.root)
    }

    /// The root node, for inspecting the tree's shape.
    pub fn root(&self) -> Option<&Node<K, V>> {
        self.root.as_deref()
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        node::inorder(&self.root)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Drop every entry, releasing nodes children-first.
    pub fn clear(&mut self) {
        let len = std::mem::take(&mut self.len);
        debug!(len, "tearing down tree");
        node::delete_tree(self.root.take());
    }
}

impl<K: Ord, V> AvlTree<K, V> {
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        node::search(&self.root, key).map(Node::value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        node::search_mut(&mut self.root, key).map(Node::value_mut)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        node::search(&self.root, key).is_some()
    }

    /// Insert an entry. If `key` was already present its value is replaced in
    /// place and the old value returned; the tree's shape does not change.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (root, displaced) = node::insert_entry(self.root.take(), key, value);
        self.root = Some(root);
        if displaced.is_none() {
            self.len += 1;
        }
        displaced
    }

    /// Remove `key`, returning its value. Removing an absent key leaves the
    /// tree untouched.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (root, removed) = node::remove_entry(self.root.take(), key);
        self.root = root;
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Check ordering, balance and cached heights of every node, and that the
    /// node count matches [`AvlTree::len`].
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let counted = node::validate(&self.root)?;
        if counted != self.len {
            return Err(InvariantViolation::LengthMismatch {
                counted,
                recorded: self.len,
            });
        }
        Ok(())
    }
}

impl<K: fmt::Display, V> AvlTree<K, V> {
    /// Print the tree sideways to stdout; see [`node::write_tree_inorder`].
    pub fn print_tree_inorder(&self) {
        node::print_tree_inorder(&self.root);
    }
}

impl<K, V> Default for AvlTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// The sideways layout of [`node::write_tree_inorder`].
impl<K: fmt::Display, V> fmt::Display for AvlTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        node::write_tree_inorder(&self.root, f)
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}


#[cfg(test)]
mod proptests;
