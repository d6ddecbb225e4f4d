//! Node-level AVL operations.
//!
//! Every mutating operation consumes the subtree slot it is given and returns
//! the subtree that replaces it. The caller stores the result back into the
//! parent's `left`/`right` slot, or keeps it as the new root:
//!
//! ```rust
//! use avl_kv::node::{self, Link};
//!
//! let mut root: Link<i32, &str> = None;
//! for (k, v) in [(10, "a"), (20, "b"), (30, "c")] {
//!     root = Some(node::insert(root, k, v));
//! }
//! assert_eq!(root.as_ref().map(|n| *n.key()), Some(20));
//!
//! root = node::delete(root, &10);
//! assert!(node::search(&root, &10).is_none());
//! node::delete_tree(root);
//! ```

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;

use tracing::trace;

// =============================================================================
// Configuration
// =============================================================================

/// Largest tolerated `|height(left) - height(right)|` at any node.
pub const MAX_IMBALANCE: i16 = 1;

// =============================================================================
// Node
// =============================================================================

/// An owned subtree slot. `None` is the empty subtree.
pub type Link<K, V> = Option<Box<Node<K, V>>>;

#[derive(Clone)]
pub struct Node<K, V> {
    key: K,
    value: V,
    /// Nodes on the longest downward path starting here (a leaf is 1).
    height: u8,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, value: V) -> Box<Self> {
        Box::new(Self {
            key,
            value,
            height: 1,
            left: None,
            right: None,
        })
    }

    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    #[inline]
    pub fn height(&self) -> u8 {
        self.height
    }

    #[inline]
    pub fn left(&self) -> Option<&Node<K, V>> {
        self.left.as_deref()
    }

    #[inline]
    pub fn right(&self) -> Option<&Node<K, V>> {
        self.right.as_deref()
    }

    /// `height(left) - height(right)`, read from the cached child heights.
    #[inline]
    pub fn balance_factor(&self) -> i16 {
        i16::from(height(&self.left)) - i16::from(height(&self.right))
    }

    /// Recompute the cached height from the children's cached heights.
    ///
    /// Children must already carry correct heights.
    #[inline]
    pub(crate) fn update_height(&mut self) {
        self.height = height(&self.left)
            .max(height(&self.right))
            .saturating_add(1);
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Node<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Height of a subtree; 0 when empty.
#[inline]
pub fn height<K, V>(link: &Link<K, V>) -> u8 {
    link.as_ref().map_or(0, |node| node.height)
}

/// Balance factor of a subtree's root; 0 when empty.
#[inline]
pub fn balance_factor<K, V>(link: &Link<K, V>) -> i16 {
    link.as_ref().map_or(0, |node| node.balance_factor())
}

// =============================================================================
// Rotations
// =============================================================================

/// Promote the left child. Returns `node` untouched if it has no left child.
fn rotate_right<K, V>(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };
    trace!(height = node.height, "right rotation");
    node.left = pivot.right.take();
    node.update_height();
    pivot.right = Some(node);
    pivot.update_height();
    pivot
}

/// Promote the right child. Returns `node` untouched if it has no right child.
fn rotate_left<K, V>(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };
    trace!(height = node.height, "left rotation");
    node.right = pivot.left.take();
    node.update_height();
    pivot.left = Some(node);
    pivot.update_height();
    pivot
}

fn rotate_left_right<K, V>(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    node.left = node.left.take().map(rotate_left);
    rotate_right(node)
}

fn rotate_right_left<K, V>(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    node.right = node.right.take().map(rotate_right);
    rotate_left(node)
}

/// Refresh `node`'s height and restore its balance with at most one single or
/// double rotation. Both subtrees must already be valid AVL trees.
fn rebalance<K, V>(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    node.update_height();
    let balance = node.balance_factor();
    if balance < -MAX_IMBALANCE {
        if balance_factor(&node.right) > 0 {
            rotate_right_left(node)
        } else {
            rotate_left(node)
        }
    } else if balance > MAX_IMBALANCE {
        if balance_factor(&node.left) < 0 {
            rotate_left_right(node)
        } else {
            rotate_right(node)
        }
    } else {
        node
    }
}

// =============================================================================
// Search
// =============================================================================

/// Find the node holding `key`, or `None` if it is not in the subtree.
pub fn search<'a, K, V, Q>(link: &'a Link<K, V>, key: &Q) -> Option<&'a Node<K, V>>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let node = link.as_deref()?;
    match key.cmp(node.key.borrow()) {
        Ordering::Less => search(&node.left, key),
        Ordering::Greater => search(&node.right, key),
        Ordering::Equal => Some(node),
    }
}

pub fn search_mut<'a, K, V, Q>(link: &'a mut Link<K, V>, key: &Q) -> Option<&'a mut Node<K, V>>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let node = link.as_deref_mut()?;
    match key.cmp(node.key.borrow()) {
        Ordering::Less => search_mut(&mut node.left, key),
        Ordering::Greater => search_mut(&mut node.right, key),
        Ordering::Equal => Some(node),
    }
}

// =============================================================================
// Insert
// =============================================================================

/// Insert `key`/`value`, or overwrite the value if `key` is already present.
/// Returns the new subtree root.
pub fn insert<K: Ord, V>(link: Link<K, V>, key: K, value: V) -> Box<Node<K, V>> {
    insert_entry(link, key, value).0
}

/// Like [`insert`], also handing back the value displaced by an overwrite.
pub(crate) fn insert_entry<K: Ord, V>(
    link: Link<K, V>,
    key: K,
    value: V,
) -> (Box<Node<K, V>>, Option<V>) {
    let Some(mut node) = link else {
        return (Node::leaf(key, value), None);
    };

    let displaced = match key.cmp(&node.key) {
        Ordering::Less => {
            let (child, displaced) = insert_entry(node.left.take(), key, value);
            node.left = Some(child);
            displaced
        }
        Ordering::Greater => {
            let (child, displaced) = insert_entry(node.right.take(), key, value);
            node.right = Some(child);
            displaced
        }
        Ordering::Equal => Some(std::mem::replace(&mut node.value, value)),
    };

    // An overwrite leaves shape and heights untouched.
    if displaced.is_some() {
        return (node, displaced);
    }
    (rebalance(node), None)
}

// =============================================================================
// Delete
// =============================================================================

/// Remove `key` from the subtree. An absent key leaves the subtree exactly as
/// it was. Returns the new subtree root.
pub fn delete<K, V, Q>(link: Link<K, V>, key: &Q) -> Link<K, V>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    remove_entry(link, key).0
}

/// Like [`delete`], also handing back the removed value.
pub(crate) fn remove_entry<K, V, Q>(link: Link<K, V>, key: &Q) -> (Link<K, V>, Option<V>)
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    let Some(mut node) = link else {
        return (None, None);
    };

    let removed = match key.cmp(node.key.borrow()) {
        Ordering::Less => {
            let (child, removed) = remove_entry(node.left.take(), key);
            node.left = child;
            removed
        }
        Ordering::Greater => {
            let (child, removed) = remove_entry(node.right.take(), key);
            node.right = child;
            removed
        }
        Ordering::Equal => match (node.left.take(), node.right.take()) {
            (None, None) => {
                trace!("removing leaf");
                let Node { value, .. } = *node;
                return (None, Some(value));
            }
            (Some(child), None) | (None, Some(child)) => {
                trace!(child_height = child.height, "splicing out single-child node");
                let Node { value, .. } = *node;
                return (Some(child), Some(value));
            }
            (Some(left), Some(right)) => {
                // The successor's entry moves up into this node; the
                // successor node itself is what leaves the tree.
                let (right, (succ_key, succ_value)) = remove_min(right);
                node.left = Some(left);
                node.right = right;
                node.key = succ_key;
                Some(std::mem::replace(&mut node.value, succ_value))
            }
        },
    };

    if removed.is_none() {
        return (Some(node), None);
    }
    (Some(rebalance(node)), removed)
}

/// Detach the leftmost node of a non-empty subtree, rebalancing every node on
/// the way back up. Returns the remaining subtree and the detached entry.
fn remove_min<K, V>(mut node: Box<Node<K, V>>) -> (Link<K, V>, (K, V)) {
    match node.left.take() {
        None => {
            let Node {
                key, value, right, ..
            } = *node;
            (right, (key, value))
        }
        Some(left) => {
            let (left, min) = remove_min(left);
            node.left = left;
            (Some(rebalance(node)), min)
        }
    }
}

// =============================================================================
// Traversal & teardown
// =============================================================================

/// Write the subtree sideways: right subtree first, one `key [height]` line
/// per node, indented by depth.
pub fn write_tree_inorder<K, V, W>(link: &Link<K, V>, out: &mut W) -> fmt::Result
where
    K: fmt::Display,
    W: fmt::Write + ?Sized,
{
    write_sideways(link.as_deref(), 0, out)
}

fn write_sideways<K, V, W>(node: Option<&Node<K, V>>, depth: usize, out: &mut W) -> fmt::Result
where
    K: fmt::Display,
    W: fmt::Write + ?Sized,
{
    let Some(node) = node else {
        return Ok(());
    };
    write_sideways(node.right(), depth + 1, out)?;
    writeln!(out, "{:depth$} {} [{}]", "", node.key, node.height)?;
    write_sideways(node.left(), depth + 1, out)
}

/// Print the subtree to stdout in the layout of [`write_tree_inorder`].
pub fn print_tree_inorder<K: fmt::Display, V>(link: &Link<K, V>) {
    let mut out = String::new();
    // Formatting into a `String` only fails if a `Display` impl does.
    if write_tree_inorder(link, &mut out).is_ok() {
        print!("{out}");
    }
}

/// Left-to-right iterator over the entries of a subtree.
pub fn inorder<K, V>(link: &Link<K, V>) -> Iter<'_, K, V> {
    Iter::new(link)
}

/// Release every node of the subtree, children before parents.
pub fn delete_tree<K, V>(link: Link<K, V>) {
    let Some(mut node) = link else {
        return;
    };
    delete_tree(node.left.take());
    delete_tree(node.right.take());
    drop(node);
}

pub struct Iter<'a, K, V> {
    /// Nodes whose left subtree has been visited but which have not been
    /// yielded yet; the top is the next entry.
    stack: Vec<&'a Node<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(link: &'a Link<K, V>) -> Self {
        let mut iter = Self {
            stack: Vec::with_capacity(usize::from(height(link))),
        };
        iter.push_left_spine(link.as_deref());
        iter
    }

    fn push_left_spine(&mut self, mut node: Option<&'a Node<K, V>>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right());
        Some((&node.key, &node.value))
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Check BST order, balance and cached heights of the whole subtree.
/// Returns the number of nodes on success.
pub fn validate<K: Ord, V>(link: &Link<K, V>) -> Result<usize, crate::InvariantViolation> {
    check_subtree(link.as_deref(), None, None).map(|(count, _)| count)
}

/// Returns `(node count, recomputed height)`.
fn check_subtree<'a, K: Ord, V>(
    node: Option<&'a Node<K, V>>,
    lower: Option<&'a K>,
    upper: Option<&'a K>,
) -> Result<(usize, u8), crate::InvariantViolation> {
    use crate::InvariantViolation;

    let Some(node) = node else {
        return Ok((0, 0));
    };
    if lower.is_some_and(|lo| node.key <= *lo) || upper.is_some_and(|hi| node.key >= *hi) {
        return Err(InvariantViolation::OutOfOrder);
    }

    let (left_count, left_height) = check_subtree(node.left(), lower, Some(&node.key))?;
    let (right_count, right_height) = check_subtree(node.right(), Some(&node.key), upper)?;

    let actual = left_height.max(right_height).saturating_add(1);
    if node.height != actual {
        return Err(InvariantViolation::StaleHeight {
            cached: node.height,
            actual,
        });
    }
    let balance = i16::from(left_height) - i16::from(right_height);
    if balance.abs() > MAX_IMBALANCE {
        return Err(InvariantViolation::Unbalanced { balance });
    }

    Ok((left_count + right_count + 1, actual))
}
