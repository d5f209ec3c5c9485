pub mod skiplist;

use std::mem;

use crate::btree::{self, BTree, BTreeCursor};
use crate::error::Result;
use crate::iterator::StorageIterator;
use crate::types::Record;

use skiplist::{LevelRng, SkipList, SkipListIterator};

/// Which ordered structure backs a memtable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemTableKind {
    /// Probabilistic skip list. The default.
    #[default]
    SkipList,
    /// B-tree of a fixed order.
    BTree,
}

enum Store<V> {
    SkipList(SkipList<Record<V>>),
    BTree(BTree<String, Record<V>>),
}

impl<V> Store<V> {
    fn insert(&mut self, key: String, record: Record<V>) -> Option<Record<V>> {
        match self {
            Store::SkipList(sl) => sl.insert(key, record),
            Store::BTree(bt) => bt.insert(key, record),
        }
    }

    fn get(&self, key: &str) -> Option<&Record<V>> {
        match self {
            Store::SkipList(sl) => sl.get(key),
            Store::BTree(bt) => bt.search(key),
        }
    }

    fn len(&self) -> usize {
        match self {
            Store::SkipList(sl) => sl.len(),
            Store::BTree(bt) => bt.len(),
        }
    }
}

/// In-memory sorted buffer for writes.
///
/// Every write goes here first. When the key count reaches the flush
/// threshold, the memtable is frozen and moved into an SSTable.
///
/// Deletes are handled via tombstones, a marker that means
/// "this key is deleted." You can't just remove the key because older
/// versions may exist in SSTables.
pub struct MemTable<V> {
    store: Store<V>,
    approx_size: usize,
}

impl<V> MemTable<V> {
    /// Create a new empty memtable backed by a default skip list.
    pub fn new() -> Self {
        Self::from_store(Store::SkipList(SkipList::new()))
    }

    /// Create a skip list memtable with explicit level parameters.
    pub fn with_skiplist(max_height: usize, promotion_probability: f64, rng: LevelRng) -> Result<Self> {
        skiplist::validate_levels(max_height, promotion_probability)?;
        Ok(Self::from_store(Store::SkipList(SkipList::from_parts(
            max_height,
            promotion_probability,
            rng,
        ))))
    }

    /// Create a B-tree memtable of the given order.
    pub fn with_btree(order: usize) -> Result<Self> {
        Ok(Self::from_store(Store::BTree(BTree::new(order)?)))
    }

    fn from_store(store: Store<V>) -> Self {
        MemTable {
            store,
            approx_size: 0,
        }
    }

    /// Insert or update a key-value pair.
    pub fn put(&mut self, key: String, value: V) {
        self.write(key, Record::Put(value));
    }

    /// Mark a key as deleted by writing a tombstone.
    pub fn delete(&mut self, key: String) {
        self.write(key, Record::Tombstone);
    }

    fn write(&mut self, key: String, record: Record<V>) {
        let key_len = key.len();
        if self.store.insert(key, record).is_none() {
            // Only a genuinely new key grows the table.
            self.approx_size += key_len + mem::size_of::<Record<V>>();
        }
    }

    /// Look up a key. Returns None if not found OR if tombstoned.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.store.get(key).and_then(Record::value)
    }

    /// The raw record for a key, tombstones included. `None` means this
    /// memtable knows nothing about the key.
    pub fn get_record(&self, key: &str) -> Option<&Record<V>> {
        self.store.get(key)
    }

    /// Return a sorted iterator over all entries (including tombstones).
    pub fn iter(&self) -> MemTableIterator<'_, V> {
        match &self.store {
            Store::SkipList(sl) => MemTableIterator::SkipList(sl.iter()),
            Store::BTree(bt) => MemTableIterator::BTree(bt.cursor()),
        }
    }

    /// Number of distinct keys, tombstones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate memory usage in bytes.
    pub fn size_bytes(&self) -> usize {
        self.approx_size
    }

    /// Check if the memtable has reached the flush threshold.
    pub fn is_full(&self, threshold: usize) -> bool {
        self.len() >= threshold
    }

    pub fn kind(&self) -> MemTableKind {
        match self.store {
            Store::SkipList(_) => MemTableKind::SkipList,
            Store::BTree(_) => MemTableKind::BTree,
        }
    }

    /// Seal the memtable. It can no longer be written; its entries can only
    /// be read or moved out.
    pub fn freeze(self) -> FrozenMemTable<V> {
        FrozenMemTable {
            store: self.store,
            approx_size: self.approx_size,
        }
    }
}

impl<V> Default for MemTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A sealed memtable waiting to become an SSTable.
pub struct FrozenMemTable<V> {
    store: Store<V>,
    approx_size: usize,
}

impl<V> FrozenMemTable<V> {
    pub fn get_record(&self, key: &str) -> Option<&Record<V>> {
        self.store.get(key)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size_bytes(&self) -> usize {
        self.approx_size
    }

    /// Move the entries out in ascending key order.
    pub fn into_sorted(self) -> FrozenEntries<V> {
        match self.store {
            Store::SkipList(sl) => FrozenEntries::SkipList(sl.into_sorted()),
            Store::BTree(bt) => FrozenEntries::BTree(bt.into_sorted()),
        }
    }
}

/// Entries of a frozen memtable, see [`FrozenMemTable::into_sorted`].
pub enum FrozenEntries<V> {
    SkipList(skiplist::IntoIter<Record<V>>),
    BTree(btree::IntoIter<String, Record<V>>),
}

impl<V> Iterator for FrozenEntries<V> {
    type Item = (String, Record<V>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            FrozenEntries::SkipList(it) => it.next(),
            FrozenEntries::BTree(it) => it.next(),
        }
    }
}

/// Sorted cursor over a memtable, whichever structure backs it.
pub enum MemTableIterator<'a, V> {
    SkipList(SkipListIterator<'a, Record<V>>),
    BTree(BTreeCursor<'a, String, Record<V>>),
}

impl<'a, V> StorageIterator<'a, Record<V>> for MemTableIterator<'a, V> {
    fn current(&self) -> Option<(&'a str, &'a Record<V>)> {
        match self {
            MemTableIterator::SkipList(it) => it.current(),
            MemTableIterator::BTree(it) => it.current(),
        }
    }

    fn next(&mut self) {
        match self {
            MemTableIterator::SkipList(it) => it.next(),
            MemTableIterator::BTree(it) => it.next(),
        }
    }

    fn seek(&mut self, key: &str) {
        match self {
            MemTableIterator::SkipList(it) => it.seek(key),
            MemTableIterator::BTree(it) => it.seek(key),
        }
    }
}
