use std::cmp::{self, Ordering};
use std::fmt;
use std::mem;

use log::{debug, trace};

use crate::error::{Error, Result};

/// An ordered map implemented with an AVL tree.
///
/// Inserting never overwrites: a key that is already present keeps its value,
/// and the stored value is changed only through a lookup such as [`find_mut`].
///
/// ```
/// use balanced_tree::{BalancedTree, Error};
/// let mut tree = BalancedTree::new();
/// assert!(tree.insert(1, "one"));
/// assert!(!tree.insert(1, "uno"));
/// assert_eq!(tree.find(&1), Ok(&"one"));
/// assert!(tree.remove(&1));
/// assert_eq!(tree.find(&1), Err(Error::KeyNotFound));
/// ```
///
/// [`find_mut`]: BalancedTree::find_mut
pub struct BalancedTree<K, V> {
    root: Link<K, V>,
}

struct Node<K, V> {
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
    height: isize,
}

type Link<K, V> = Option<Box<Node<K, V>>>;

/// An iterator over the entries of a tree, in ascending key order.
pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
}

/// A mutable iterator over the entries of a tree, in ascending key order.
pub struct IterMut<'a, K, V> {
    stack: Vec<(&'a K, &'a mut V, Option<&'a mut Node<K, V>>)>,
}

impl<K, V> BalancedTree<K, V> {
    /// Creates an empty tree.
    /// No memory is allocated until the first item is inserted.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Returns true if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of elements in the tree.
    ///
    /// The count is not cached, every call visits all nodes.
    pub fn count(&self) -> usize {
        let mut num_nodes = 0;
        Self::preorder(&self.root, &mut |_| num_nodes += 1);
        num_nodes
    }

    /// Returns the height of the tree, `-1` for an empty tree and `0` for a single node.
    pub fn height(&self) -> isize {
        link_height(&self.root)
    }

    /// Clears the tree, deallocating all memory.
    pub fn clear(&mut self) {
        if let Some(root) = self.root.take() {
            debug!("clearing tree of height {}", root.height);
            root.destroy();
        }
    }

    /// Gets an iterator over the entries of the tree, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.root)
    }

    /// Gets a mutable iterator over the entries of the tree, sorted by key.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.root)
    }

    /// Returns clones of all entries of the tree, sorted by key.
    pub fn elements(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Draws the tree sideways, one key per line in preorder.
    ///
    /// Each line is indented by its depth and tagged `L----` for a left child
    /// or `R----` for a right child (the root is tagged as a right child).
    ///
    /// ```
    /// use balanced_tree::BalancedTree;
    /// let tree: BalancedTree<_, _> = [(2, ()), (1, ()), (3, ())].into_iter().collect();
    /// assert_eq!(tree.render(), "R----2\n   L----1\n   R----3\n");
    /// ```
    pub fn render(&self) -> String
    where
        K: fmt::Display,
    {
        let mut out = String::new();
        Self::render_node(&self.root, &mut out, String::new(), true);
        out
    }

    fn render_node(link: &Link<K, V>, out: &mut String, mut indent: String, last: bool)
    where
        K: fmt::Display,
    {
        if let Some(node) = link {
            out.push_str(&indent);
            if last {
                out.push_str("R----");
                indent.push_str("   ");
            } else {
                out.push_str("L----");
                indent.push_str("|  ");
            }
            out.push_str(&node.key.to_string());
            out.push('\n');
            Self::render_node(&node.left, out, indent.clone(), false);
            Self::render_node(&node.right, out, indent, true);
        }
    }

    fn preorder<F: FnMut(&Node<K, V>)>(link: &Link<K, V>, f: &mut F) {
        if let Some(node) = link {
            f(node);
            Self::preorder(&node.left, f);
            Self::preorder(&node.right, f);
        }
    }
}

impl<K: Ord, V> BalancedTree<K, V> {
    /// Returns true if the tree contains the key.
    pub fn exists(&self, key: &K) -> bool {
        self.find_node(key).is_some()
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find_node(key).map(|node| &node.value)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.find_node_mut(key).map(|node| &mut node.value)
    }

    /// Returns references to the key-value pair corresponding to the key.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.find_node(key).map(|node| (&node.key, &node.value))
    }

    /// Returns a reference to the value corresponding to the key,
    /// or [`Error::KeyNotFound`] if the key is absent.
    pub fn find(&self, key: &K) -> Result<&V> {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Returns a mutable reference to the value corresponding to the key,
    /// or [`Error::KeyNotFound`] if the key is absent. Never inserts.
    pub fn find_mut(&mut self, key: &K) -> Result<&mut V> {
        self.get_mut(key).ok_or(Error::KeyNotFound)
    }

    /// Returns a mutable reference to the value corresponding to the key,
    /// inserting `default` first if the key is absent.
    ///
    /// ```
    /// use balanced_tree::BalancedTree;
    /// let mut counts = BalancedTree::new();
    /// for word in "a b a".split_whitespace() {
    ///     *counts.find_or_insert(word, 0) += 1;
    /// }
    /// assert_eq!(counts.elements(), vec![("a", 2), ("b", 1)]);
    /// ```
    pub fn find_or_insert(&mut self, key: K, default: V) -> &mut V
    where
        K: Clone,
    {
        if !self.exists(&key) {
            self.insert(key.clone(), default);
        }
        match self.find_node_mut(&key) {
            Some(node) => &mut node.value,
            None => unreachable!("key is present after insertion"),
        }
    }

    /// Inserts a key-value pair into the tree.
    /// Returns false and leaves the tree unchanged if the key is already present.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        Self::insert_into(&mut self.root, key, value)
    }

    /// Removes a key from the tree.
    /// Returns whether the key was previously in the tree.
    pub fn remove(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    /// Removes a key from the tree.
    /// Returns the stored key-value pair if the key was previously in the tree.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        Self::remove_from(&mut self.root, key)
    }

    /// Asserts that the internal tree structure is consistent.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        assert_eq!(self.is_empty(), self.height() == -1);

        Self::preorder(&self.root, &mut |node| {
            let left_height = link_height(&node.left);
            let right_height = link_height(&node.right);

            // Check height
            assert_eq!(node.height, 1 + cmp::max(left_height, right_height));

            // Check AVL condition (nearly balance)
            assert!(left_height <= right_height + 1);
            assert!(right_height <= left_height + 1);
        });

        // Check ordering, inorder keys must be strictly ascending
        let mut keys = self.iter().map(|(key, _)| key);
        if let Some(mut prev) = keys.next() {
            for key in keys {
                assert!(prev < key);
                prev = key;
            }
        }
    }

    fn find_node(&self, key: &K) -> Option<&Node<K, V>> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            current = match key.cmp(&node.key) {
                Ordering::Equal => break,
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
            }
        }
        current
    }

    fn find_node_mut(&mut self, key: &K) -> Option<&mut Node<K, V>> {
        let mut current = self.root.as_deref_mut();
        while let Some(node) = current {
            match key.cmp(&node.key) {
                Ordering::Equal => return Some(node),
                Ordering::Less => current = node.left.as_deref_mut(),
                Ordering::Greater => current = node.right.as_deref_mut(),
            }
        }
        None
    }

    fn insert_into(link: &mut Link<K, V>, key: K, value: V) -> bool {
        let node = match link {
            None => {
                *link = Some(Node::create(key, value));
                return true;
            }
            Some(node) => node,
        };
        let inserted = match key.cmp(&node.key) {
            Ordering::Equal => false,
            Ordering::Less => Self::insert_into(&mut node.left, key, value),
            Ordering::Greater => Self::insert_into(&mut node.right, key, value),
        };
        // Nodes on the insertion path might be out of balance now
        if inserted {
            rebalance_link(link);
        }
        inserted
    }

    fn remove_from(link: &mut Link<K, V>, key: &K) -> Option<(K, V)> {
        let node = link.as_mut()?;
        let removed = match key.cmp(&node.key) {
            Ordering::Equal => return Self::unlink(link),
            Ordering::Less => Self::remove_from(&mut node.left, key),
            Ordering::Greater => Self::remove_from(&mut node.right, key),
        };
        if removed.is_some() {
            rebalance_link(link);
        }
        removed
    }

    /// Unlinks the root node of the given subtree and returns its entry.
    fn unlink(link: &mut Link<K, V>) -> Option<(K, V)> {
        let mut node = link.take()?;
        match (node.left.take(), node.right.take()) {
            (Some(left), Some(right)) => {
                // Replace entry by the smallest entry of the right subtree
                let (rest, mut successor) = right.take_min();
                mem::swap(&mut node.key, &mut successor.key);
                mem::swap(&mut node.value, &mut successor.value);
                node.left = Some(left);
                node.right = rest;
                *link = Some(node.rebalance());
                Some(successor.into_entry())
            }
            (child, None) | (None, child) => {
                // Node is stem or leaf, splice its child into its place
                *link = child;
                Some(node.into_entry())
            }
        }
    }
}

fn link_height<K, V>(link: &Link<K, V>) -> isize {
    link.as_ref().map_or(-1, |node| node.height)
}

fn rebalance_link<K, V>(link: &mut Link<K, V>) {
    if let Some(node) = link.take() {
        *link = Some(node.rebalance());
    }
}

impl<K, V> Node<K, V> {
    fn create(key: K, value: V) -> Box<Self> {
        Box::new(Node {
            key,
            value,
            left: None,
            right: None,
            height: 0,
        })
    }

    /// Tears down the subtree in post order.
    fn destroy(mut self: Box<Self>) {
        if let Some(left) = self.left.take() {
            left.destroy();
        }
        if let Some(right) = self.right.take() {
            right.destroy();
        }
    }

    /// Consumes a node whose children have been detached.
    fn into_entry(self: Box<Self>) -> (K, V) {
        debug_assert!(self.left.is_none() && self.right.is_none());
        let node = *self;
        (node.key, node.value)
    }

    fn adjust_height(&mut self) {
        self.height = 1 + cmp::max(link_height(&self.left), link_height(&self.right));
    }

    fn balance_factor(&self) -> isize {
        link_height(&self.left) - link_height(&self.right)
    }

    fn rotate_left(mut self: Box<Self>) -> Box<Self> {
        match self.right.take() {
            None => self,
            Some(mut right) => {
                self.right = right.left.take();
                self.adjust_height();
                right.left = Some(self);
                right.adjust_height();
                right
            }
        }
    }

    fn rotate_right(mut self: Box<Self>) -> Box<Self> {
        match self.left.take() {
            None => self,
            Some(mut left) => {
                self.left = left.right.take();
                self.adjust_height();
                left.right = Some(self);
                left.adjust_height();
                left
            }
        }
    }

    /// Restores AVL condition (balance) at this node if necessary and adjusts height.
    /// Both subtrees must be balanced and their heights must not differ by more than 2,
    /// which always holds after a single insert or remove below this node.
    /// Returns the new root of the subtree.
    fn rebalance(mut self: Box<Self>) -> Box<Self> {
        self.adjust_height();
        let balance = self.balance_factor();
        debug_assert!((-2..=2).contains(&balance));
        if balance > 1 {
            // Left heavy, rotate right
            if let Some(left) = self.left.take() {
                self.left = Some(if left.balance_factor() < 0 {
                    trace!("rebalance: left-right rotation");
                    left.rotate_left()
                } else {
                    trace!("rebalance: right rotation");
                    left
                });
            }
            self.rotate_right()
        } else if balance < -1 {
            // Right heavy, rotate left
            if let Some(right) = self.right.take() {
                self.right = Some(if right.balance_factor() > 0 {
                    trace!("rebalance: right-left rotation");
                    right.rotate_right()
                } else {
                    trace!("rebalance: left rotation");
                    right
                });
            }
            self.rotate_left()
        } else {
            self
        }
    }

    /// Detaches the leftmost node of the subtree.
    /// Returns the rebalanced rest of the subtree and the detached node.
    fn take_min(mut self: Box<Self>) -> (Link<K, V>, Box<Self>) {
        match self.left.take() {
            None => (self.right.take(), self),
            Some(left) => {
                let (rest, min) = left.take_min();
                self.left = rest;
                (Some(self.rebalance()), min)
            }
        }
    }
}

impl<K, V> Drop for BalancedTree<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> Default for BalancedTree<K, V> {
    /// Creates an empty tree.
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V: Clone> Clone for BalancedTree<K, V> {
    /// Copies the tree by inserting the entries of `self` in preorder into an empty tree.
    /// The copy holds the same entries but does not necessarily have the same shape.
    fn clone(&self) -> Self {
        let mut tree = Self::new();
        tree.insert_copies(self);
        tree
    }

    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.insert_copies(source);
    }
}

impl<K: Ord + Clone, V: Clone> BalancedTree<K, V> {
    fn insert_copies(&mut self, source: &Self) {
        debug!("copying tree of height {}", source.height());
        Self::preorder(&source.root, &mut |node| {
            self.insert(node.key.clone(), node.value.clone());
        });
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for BalancedTree<K, V> {
    /// Trees are equal if they hold equal entries, regardless of their shape.
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for BalancedTree<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BalancedTree<K, V> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for BalancedTree<K, V> {
    /// Builds a tree from key-value pairs; the first value given for a key is kept.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, V> Extend<(K, V)> for BalancedTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a BalancedTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut BalancedTree<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(root: &'a Link<K, V>) -> Self {
        let mut iter = Self { stack: Vec::new() };
        iter.push_left_spine(root.as_deref());
        iter
    }

    fn push_left_spine(&mut self, mut current: Option<&'a Node<K, V>>) {
        while let Some(node) = current {
            self.stack.push(node);
            current = node.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> IterMut<'a, K, V> {
    fn new(root: &'a mut Link<K, V>) -> Self {
        let mut iter = Self { stack: Vec::new() };
        iter.push_left_spine(root.as_deref_mut());
        iter
    }

    // Splits each node into its entry and right subtree before descending left.
    fn push_left_spine(&mut self, mut current: Option<&'a mut Node<K, V>>) {
        while let Some(node) = current {
            let Node {
                key,
                value,
                left,
                right,
                ..
            } = node;
            let key: &'a K = key;
            self.stack.push((key, value, right.as_deref_mut()));
            current = left.as_deref_mut();
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value, right) = self.stack.pop()?;
        self.push_left_spine(right);
        Some((key, value))
    }
}
