use std::mem;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::error::{Error, Result};
use crate::iterator::StorageIterator;

/// Default maximum height of the skip list.
pub const MAX_HEIGHT: usize = 16;

/// Default chance that a node is promoted one level higher.
pub const PROMOTION_PROBABILITY: f64 = 0.5;

/// Random source for tower heights. Boxed so any seeded or entropy-backed
/// generator can be injected without a type parameter leaking into the engine.
pub type LevelRng = Box<dyn RngCore + Send + Sync>;

/// A single node in the skip list.
///
/// Each node has `height` forward pointers. Level 0 contains all nodes
/// (a regular linked list). Higher levels skip over nodes, enabling
/// O(log n) average-case search.
///
/// ```text
/// Level 3:  HEAD ──────────────────────────────► 50 ──────────► NIL
/// Level 2:  HEAD ──────────► 20 ────────────────► 50 ──────────► NIL
/// Level 1:  HEAD ──► 10 ──► 20 ────► 35 ────────► 50 ──► 60 ──► NIL
/// Level 0:  HEAD ──► 10 ──► 20 ──► 25 ──► 35 ──► 50 ──► 60 ──► 70 ► NIL
/// ```
struct SkipNode<V> {
    key: String,
    value: V,
    /// Indices into `SkipList::nodes`, one per level this node occupies.
    forward: Vec<Option<usize>>,
}

/// A probabilistic sorted map over string keys.
///
/// Nodes live in an arena and link to each other by index, so there is no
/// unsafe code and no `Rc<RefCell<_>>` chains. Nodes are never removed:
/// overwriting a key replaces the value in place.
///
/// Average case: O(log n) insert, O(log n) lookup, O(n) iteration.
/// Worst case: O(n), when the level draws are unlucky.
pub struct SkipList<V> {
    nodes: Vec<SkipNode<V>>,
    /// Forward pointers of the head sentinel, `max_height` long.
    head: Vec<Option<usize>>,
    /// Number of levels currently in use.
    height: usize,
    size_bytes: usize,
    max_height: usize,
    promotion_probability: f64,
    rng: LevelRng,
}

/// Check skip list parameters. Shared with `Options::validate`.
pub(crate) fn validate_levels(max_height: usize, promotion_probability: f64) -> Result<()> {
    if max_height == 0 {
        return Err(Error::InvalidConfiguration(
            "skip list max level must be > 0".into(),
        ));
    }
    if !(promotion_probability > 0.0 && promotion_probability < 1.0) {
        return Err(Error::InvalidConfiguration(format!(
            "skip list promotion probability must be in (0, 1), got {promotion_probability}"
        )));
    }
    Ok(())
}

impl<V> SkipList<V> {
    /// Create an empty skip list with default parameters and an entropy-seeded
    /// level generator.
    pub fn new() -> Self {
        Self::from_parts(MAX_HEIGHT, PROMOTION_PROBABILITY, Box::new(StdRng::from_entropy()))
    }

    /// Create an empty skip list whose level draws are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_parts(
            MAX_HEIGHT,
            PROMOTION_PROBABILITY,
            Box::new(StdRng::seed_from_u64(seed)),
        )
    }

    /// Create an empty skip list with explicit parameters and random source.
    ///
    /// Fails if `max_height` is zero or `promotion_probability` is outside (0, 1).
    pub fn with_rng<R>(max_height: usize, promotion_probability: f64, rng: R) -> Result<Self>
    where
        R: RngCore + Send + Sync + 'static,
    {
        validate_levels(max_height, promotion_probability)?;
        Ok(Self::from_parts(max_height, promotion_probability, Box::new(rng)))
    }

    pub(crate) fn from_parts(max_height: usize, promotion_probability: f64, rng: LevelRng) -> Self {
        SkipList {
            nodes: Vec::new(),
            head: vec![None; max_height],
            height: 0,
            size_bytes: 0,
            max_height,
            promotion_probability,
            rng,
        }
    }

    /// Insert a key-value pair. Overwrites if the key already exists and
    /// returns the previous value.
    ///
    /// Algorithm:
    ///   1. Find the insertion point at each level (track predecessors)
    ///   2. Generate a random height for the new node (coin flip per level)
    ///   3. Create node with that height
    ///   4. Splice into the list at each level up to the node's height
    pub fn insert(&mut self, key: String, value: V) -> Option<V> {
        // update[level] = predecessor at that level; None is the head sentinel.
        let mut update: Vec<Option<usize>> = vec![None; self.max_height];
        let mut current = None;
        for level in (0..self.height).rev() {
            while let Some(next) = self.next_of(current, level) {
                if self.nodes[next].key < key {
                    current = Some(next);
                } else {
                    break;
                }
            }
            update[level] = current;
        }

        if let Some(idx) = self.next_of(current, 0) {
            if self.nodes[idx].key == key {
                return Some(mem::replace(&mut self.nodes[idx].value, value));
            }
        }

        let height = self.random_height();
        // Levels above the old height have no predecessor but the head,
        // which `update` already says.
        self.height = self.height.max(height);

        let idx = self.nodes.len();
        let forward = (0..height)
            .map(|level| self.next_of(update[level], level))
            .collect::<Vec<_>>();
        self.size_bytes += key.len()
            + mem::size_of::<SkipNode<V>>()
            + forward.len() * mem::size_of::<Option<usize>>();
        self.nodes.push(SkipNode {
            key,
            value,
            forward,
        });
        for (level, pred) in update.iter().take(height).enumerate() {
            self.set_next(*pred, level, Some(idx));
        }
        None
    }

    /// Look up a key. Returns the value if found.
    ///
    /// Algorithm:
    ///   1. Start at head, highest level
    ///   2. Move forward while next key < target
    ///   3. Drop down one level
    ///   4. Repeat until level 0
    ///   5. Check if the node at level 0 matches
    pub fn get(&self, key: &str) -> Option<&V> {
        let node = &self.nodes[self.find_greater_or_equal(key)?];
        (node.key == key).then_some(&node.value)
    }

    /// Number of entries in the skip list.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Approximate memory usage in bytes. Never decreases: an overwrite reuses
    /// the node it replaces.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Number of levels currently in use (the tallest tower).
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn max_height(&self) -> usize {
        self.max_height
    }

    /// Create an iterator over all entries in sorted order.
    /// Traverses level 0 (the bottom level contains all entries).
    pub fn iter(&self) -> SkipListIterator<'_, V> {
        SkipListIterator {
            list: self,
            current: self.first(),
        }
    }

    /// Consume the list, yielding its entries in ascending key order.
    pub fn into_sorted(self) -> IntoIter<V> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut current = self.first();
        while let Some(idx) = current {
            order.push(idx);
            current = self.nodes[idx].forward[0];
        }
        IntoIter {
            order: order.into_iter(),
            slots: self.nodes.into_iter().map(Some).collect(),
        }
    }

    fn first(&self) -> Option<usize> {
        self.head.first().copied().flatten()
    }

    /// First node whose key is >= `key`.
    fn find_greater_or_equal(&self, key: &str) -> Option<usize> {
        let mut current = None;
        for level in (0..self.height).rev() {
            while let Some(next) = self.next_of(current, level) {
                if self.nodes[next].key.as_str() < key {
                    current = Some(next);
                } else {
                    break;
                }
            }
        }
        self.next_of(current, 0)
    }

    fn next_of(&self, node: Option<usize>, level: usize) -> Option<usize> {
        match node {
            None => self.head[level],
            Some(idx) => self.nodes[idx].forward[level],
        }
    }

    fn set_next(&mut self, node: Option<usize>, level: usize, next: Option<usize>) {
        match node {
            None => self.head[level] = next,
            Some(idx) => self.nodes[idx].forward[level] = next,
        }
    }

    /// Generate a random height for a new node: 1, plus one per successful
    /// coin flip, capped at `max_height`.
    fn random_height(&mut self) -> usize {
        let mut height = 1;
        while height < self.max_height && self.rng.gen_bool(self.promotion_probability) {
            height += 1;
        }
        height
    }
}

impl<V> Default for SkipList<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over skip list entries in sorted order.
///
/// Simply follows level 0 forward pointers: level 0 is a sorted linked list
/// containing every entry.
pub struct SkipListIterator<'a, V> {
    list: &'a SkipList<V>,
    current: Option<usize>,
}

impl<'a, V> StorageIterator<'a, V> for SkipListIterator<'a, V> {
    fn current(&self) -> Option<(&'a str, &'a V)> {
        let list = self.list;
        self.current.map(|idx| {
            let node = &list.nodes[idx];
            (node.key.as_str(), &node.value)
        })
    }

    fn next(&mut self) {
        self.current = self.current.and_then(|idx| self.list.nodes[idx].forward[0]);
    }

    fn seek(&mut self, key: &str) {
        self.current = self.list.find_greater_or_equal(key);
    }
}

/// Consuming iterator in key order, see [`SkipList::into_sorted`].
pub struct IntoIter<V> {
    order: std::vec::IntoIter<usize>,
    slots: Vec<Option<SkipNode<V>>>,
}

impl<V> Iterator for IntoIter<V> {
    type Item = (String, V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.order.next()?;
        self.slots[idx].take().map(|node| (node.key, node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}
