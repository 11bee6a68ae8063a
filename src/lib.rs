//! An ordered key-value map implemented with an AVL tree.
//!
//! [`BalancedTree`] keeps the heights of the two subtrees of every node within one of each
//! other, rotating nodes after every insert and remove, so lookup, insertion and deletion
//! take O(log n) time even for sorted insertion orders.
//!
//! ```
//! use balanced_tree::BalancedTree;
//! let mut tree = BalancedTree::new();
//! for key in 0..10 {
//!     tree.insert(key, key * key);
//! }
//! assert_eq!(tree.count(), 10);
//! assert_eq!(tree.height(), 3);
//! assert_eq!(tree.find(&7), Ok(&49));
//! ```
//!
//! Enable the `consistency_check` feature to get `BalancedTree::check_consistency`
//! outside of this crate's own tests.

mod error;
mod tree;

pub use error::{Error, Result};
pub use tree::{BalancedTree, Iter, IterMut};
