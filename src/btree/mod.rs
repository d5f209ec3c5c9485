//! # B-Tree
//!
//! An ordered map that stays balanced by splitting full nodes on the way down
//! during insert. Every node ever descended into has room for one more key,
//! so an insert never has to walk back up the tree.
//!
//! Usable as a standalone ordered index or as the backing store of a
//! [`MemTable`](crate::memtable::MemTable).

pub mod cursor;

use std::borrow::Borrow;
use std::mem;

use crate::error::{Error, Result};

pub use cursor::{BTreeCursor, IntoIter, Iter};

/// Smallest order that leaves room for a median plus one key on a side.
pub const MIN_ORDER: usize = 3;

/// Default order used when a B-tree backs a memtable.
pub const DEFAULT_ORDER: usize = 32;

/// A node holds up to `order - 1` keys. Leaves have no children; an internal
/// node with `n` keys has `n + 1` children.
///
/// For keys `k_0 < k_1 < ... < k_{n-1}`, every key in `children[i]` lies
/// strictly between `k_{i-1}` and `k_i`.
pub(crate) struct Node<K, V> {
    pub(crate) keys: Vec<K>,
    pub(crate) values: Vec<V>,
    pub(crate) children: Vec<Box<Node<K, V>>>,
}

impl<K, V> Node<K, V> {
    fn new() -> Self {
        Node {
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Split the full child at `idx`.
    ///
    /// The child keeps its lower keys, a new right sibling takes the upper
    /// keys (and children), and the median moves up into `self` at `idx`.
    /// The sibling lands at `idx + 1`.
    ///
    /// At order 3 the child holds two keys and `mid` is 1, so the sibling
    /// starts out empty (an internal sibling keeps a single child). Key order
    /// and leaf depth still hold; later inserts into that range fill it.
    fn split_child(&mut self, idx: usize, max_keys: usize) {
        let mid = max_keys / 2;
        let child = &mut self.children[idx];

        let mut right_keys = child.keys.split_off(mid);
        let mut right_values = child.values.split_off(mid);
        let median_key = right_keys.remove(0);
        let median_value = right_values.remove(0);
        let right_children = if child.is_leaf() {
            Vec::new()
        } else {
            child.children.split_off(mid + 1)
        };

        self.keys.insert(idx, median_key);
        self.values.insert(idx, median_value);
        self.children.insert(
            idx + 1,
            Box::new(Node {
                keys: right_keys,
                values: right_values,
                children: right_children,
            }),
        );
    }
}

/// A B-tree map of a fixed order.
///
/// ```
/// use memlsm::btree::BTree;
///
/// let mut tree = BTree::new(3).unwrap();
/// for k in [5, 10, 15, 20] {
///     tree.insert(k, k * 100);
/// }
/// assert_eq!(tree.search(&15), Some(&1500));
/// assert_eq!(tree.search(&99), None);
/// assert_eq!(tree.height(), 2);
/// ```
pub struct BTree<K, V> {
    root: Box<Node<K, V>>,
    order: usize,
    len: usize,
    /// Levels from root to leaves; 1 for a lone leaf root.
    height: usize,
}

impl<K: Ord, V> BTree<K, V> {
    /// Create an empty tree. `order` is the maximum number of children per
    /// node and must be at least [`MIN_ORDER`].
    pub fn new(order: usize) -> Result<Self> {
        if order < MIN_ORDER {
            return Err(Error::InvalidConfiguration(format!(
                "b-tree order must be >= {MIN_ORDER}, got {order}"
            )));
        }
        Ok(BTree {
            root: Box::new(Node::new()),
            order,
            len: 0,
            height: 1,
        })
    }

    /// Insert a key-value pair, returning the previous value for the key.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let max_keys = self.order - 1;

        if self.root.keys.len() == max_keys {
            let old_root = mem::replace(&mut self.root, Box::new(Node::new()));
            self.root.children.push(old_root);
            self.root.split_child(0, max_keys);
            self.height += 1;
        }

        let mut node = &mut *self.root;
        loop {
            let mut idx = match node.keys.binary_search(&key) {
                Ok(i) => return Some(mem::replace(&mut node.values[i], value)),
                Err(i) => i,
            };

            if node.is_leaf() {
                node.keys.insert(idx, key);
                node.values.insert(idx, value);
                self.len += 1;
                return None;
            }

            if node.children[idx].keys.len() == max_keys {
                node.split_child(idx, max_keys);
                match key.cmp(&node.keys[idx]) {
                    std::cmp::Ordering::Equal => {
                        return Some(mem::replace(&mut node.values[idx], value));
                    }
                    std::cmp::Ordering::Greater => idx += 1,
                    std::cmp::Ordering::Less => {}
                }
            }
            node = &mut *node.children[idx];
        }
    }

    /// Look up a key.
    pub fn search<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = &*self.root;
        loop {
            match node.keys.binary_search_by(|k| k.borrow().cmp(key)) {
                Ok(i) => return Some(&node.values[i]),
                Err(_) if node.is_leaf() => return None,
                Err(i) => node = &*node.children[i],
            }
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.search(key).is_some()
    }

    /// In-order iterator over `(key, value)` pairs.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.cursor())
    }

    /// Seekable cursor positioned at the smallest key.
    pub fn cursor(&self) -> BTreeCursor<'_, K, V> {
        BTreeCursor::new(&self.root)
    }

    /// Consume the tree, yielding its entries in ascending key order.
    pub fn into_sorted(self) -> IntoIter<K, V> {
        IntoIter::new(*self.root)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of levels; grows by one each time the root splits.
    pub fn height(&self) -> usize {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Walk the tree and check node sizes, key bounds, and leaf depth.
    /// Returns the depth shared by every leaf.
    fn check_node<K: Ord + Copy + std::fmt::Debug, V>(
        node: &Node<K, V>,
        lower: Option<K>,
        upper: Option<K>,
        max_keys: usize,
    ) -> usize {
        assert!(node.keys.len() <= max_keys);
        assert_eq!(node.keys.len(), node.values.len());
        assert!(node.keys.windows(2).all(|w| w[0] < w[1]), "{:?}", node.keys);
        for k in &node.keys {
            assert!(lower.is_none_or(|l| l < *k));
            assert!(upper.is_none_or(|u| *k < u));
        }
        if node.is_leaf() {
            return 1;
        }
        assert_eq!(node.children.len(), node.keys.len() + 1);
        let depths: Vec<usize> = node
            .children
            .iter()
            .enumerate()
            .map(|(i, child)| {
                let lo = if i == 0 { lower } else { Some(node.keys[i - 1]) };
                let hi = node.keys.get(i).copied().or(upper);
                check_node(child, lo, hi, max_keys)
            })
            .collect();
        assert!(depths.windows(2).all(|w| w[0] == w[1]), "leaf depths {depths:?}");
        depths[0] + 1
    }

    fn check<V>(tree: &BTree<u32, V>) {
        let depth = check_node(&tree.root, None, None, tree.order - 1);
        assert_eq!(depth, tree.height());
    }

    #[test]
    fn sequential_inserts_split_root_once() {
        let mut tree = BTree::new(3).unwrap();
        for k in [5u32, 10, 15, 20] {
            tree.insert(k, k);
        }
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.root.keys, vec![10]);
        check(&tree);
    }

    #[test]
    fn random_inserts_keep_invariants() {
        for order in [3, 4, 5, 8, 33] {
            let mut tree = BTree::new(order).unwrap();
            let mut rng = StdRng::seed_from_u64(order as u64);
            for _ in 0..3000 {
                let k: u32 = rng.gen_range(0..1000);
                tree.insert(k, k * 2);
            }
            check(&tree);
            let keys: Vec<u32> = tree.iter().map(|(k, _)| *k).collect();
            assert_eq!(keys.len(), tree.len());
            assert!(keys.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn order_three_sequential_inserts_leave_empty_siblings() {
        let mut tree = BTree::new(3).unwrap();
        for k in 0..50u32 {
            tree.insert(k, k);
        }
        check(&tree);
        assert!(tree.height() > 2);
        let keys: Vec<u32> = tree.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, (0..50).collect::<Vec<_>>());
        assert!((0..50u32).all(|k| tree.search(&k) == Some(&k)));
    }

    #[test]
    fn into_sorted_matches_iter() {
        let mut tree = BTree::new(4).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let k: u32 = rng.gen_range(0..300);
            tree.insert(k, k + 1);
        }
        let borrowed: Vec<(u32, u32)> = tree.iter().map(|(k, v)| (*k, *v)).collect();
        let owned: Vec<(u32, u32)> = tree.into_sorted().collect();
        assert_eq!(borrowed, owned);
    }

    #[test]
    fn seek_lands_on_first_key_not_less() {
        let mut tree = BTree::new(3).unwrap();
        for k in (0..100u32).map(|k| k * 10) {
            tree.insert(k, ());
        }
        let mut cursor = tree.cursor();
        cursor.seek_to(&255);
        assert_eq!(cursor.entry().map(|(k, _)| *k), Some(260));
        cursor.seek_to(&500);
        assert_eq!(cursor.entry().map(|(k, _)| *k), Some(500));
        cursor.advance();
        assert_eq!(cursor.entry().map(|(k, _)| *k), Some(510));
        cursor.seek_to(&991);
        assert!(cursor.entry().is_none());
    }
}
