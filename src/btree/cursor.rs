use std::borrow::Borrow;
use std::iter::Zip;
use std::vec;

use super::Node;
use crate::iterator::StorageIterator;

/// Seekable in-order cursor over a [`BTree`](super::BTree).
///
/// The stack holds the path from the root to the current entry. A frame
/// `(node, i)` means key `i` of `node` is the next one that node yields;
/// the top frame is the current entry.
pub struct BTreeCursor<'a, K, V> {
    root: &'a Node<K, V>,
    stack: Vec<(&'a Node<K, V>, usize)>,
}

impl<'a, K: Ord, V> BTreeCursor<'a, K, V> {
    pub(crate) fn new(root: &'a Node<K, V>) -> Self {
        let mut cursor = BTreeCursor {
            root,
            stack: Vec::new(),
        };
        cursor.descend_left(root);
        cursor.settle();
        cursor
    }

    /// The entry under the cursor.
    pub fn entry(&self) -> Option<(&'a K, &'a V)> {
        let &(node, i) = self.stack.last()?;
        Some((node.keys.get(i)?, node.values.get(i)?))
    }

    /// Step to the next key in order.
    pub fn advance(&mut self) {
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        let (node, i) = *top;
        top.1 = i + 1;
        if !node.is_leaf() {
            // Everything in children[i + 1] sits between keys i and i + 1.
            self.descend_left(&*node.children[i + 1]);
        }
        self.settle();
    }

    /// Position at the first key >= `key`.
    pub fn seek_to<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.stack.clear();
        let mut node = self.root;
        loop {
            let (i, found) = match node.keys.binary_search_by(|k| k.borrow().cmp(key)) {
                Ok(i) => (i, true),
                Err(i) => (i, false),
            };
            self.stack.push((node, i));
            if found || node.is_leaf() {
                break;
            }
            node = &*node.children[i];
        }
        self.settle();
    }

    fn descend_left(&mut self, mut node: &'a Node<K, V>) {
        loop {
            self.stack.push((node, 0));
            match node.children.first() {
                Some(child) => node = &**child,
                None => break,
            }
        }
    }

    /// Pop frames whose node has no keys left to yield.
    fn settle(&mut self) {
        while let Some(&(node, i)) = self.stack.last() {
            if i < node.keys.len() {
                break;
            }
            self.stack.pop();
        }
    }
}

impl<'a, V> StorageIterator<'a, V> for BTreeCursor<'a, String, V> {
    fn current(&self) -> Option<(&'a str, &'a V)> {
        self.entry().map(|(k, v)| (k.as_str(), v))
    }

    fn next(&mut self) {
        self.advance();
    }

    fn seek(&mut self, key: &str) {
        self.seek_to(key);
    }
}

/// Borrowing in-order iterator, see [`BTree::iter`](super::BTree::iter).
pub struct Iter<'a, K, V> {
    cursor: BTreeCursor<'a, K, V>,
}

impl<'a, K: Ord, V> Iter<'a, K, V> {
    pub(crate) fn new(cursor: BTreeCursor<'a, K, V>) -> Self {
        Iter { cursor }
    }
}

impl<'a, K: Ord, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.cursor.entry()?;
        self.cursor.advance();
        Some(entry)
    }
}

type Frame<K, V> = (
    Zip<vec::IntoIter<K>, vec::IntoIter<V>>,
    vec::IntoIter<Box<Node<K, V>>>,
);

/// Consuming in-order iterator, see [`BTree::into_sorted`](super::BTree::into_sorted).
///
/// A frame's leftmost pending child is always already on the stack above it,
/// so the top frame's next key is the next key in order.
pub struct IntoIter<K, V> {
    stack: Vec<Frame<K, V>>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(root: Node<K, V>) -> Self {
        let mut iter = IntoIter { stack: Vec::new() };
        iter.descend_left(root);
        iter
    }

    fn descend_left(&mut self, mut node: Node<K, V>) {
        loop {
            let entries = node.keys.into_iter().zip(node.values);
            let mut children = node.children.into_iter();
            let first = children.next();
            self.stack.push((entries, children));
            match first {
                Some(child) => node = *child,
                None => break,
            }
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (entries, children) = self.stack.last_mut()?;
            match entries.next() {
                Some(entry) => {
                    if let Some(child) = children.next() {
                        self.descend_left(*child);
                    }
                    return Some(entry);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
