use crate::bloom::BloomFilter;
use crate::iterator::StorageIterator;
use crate::sstable::SSTableMeta;
use crate::types::Record;

/// An immutable sorted run. Supports point lookups and range scans.
///
/// Built only by [`SSTableBuilder`](crate::sstable::SSTableBuilder). There is
/// no `&mut self` method: once built, a table can only be read or dropped.
pub struct SSTable<V> {
    /// Sorted by key, no duplicates.
    entries: Vec<(String, Record<V>)>,
    bloom: BloomFilter,
    meta: SSTableMeta,
}

impl<V> SSTable<V> {
    pub(crate) fn new(entries: Vec<(String, Record<V>)>, bloom: BloomFilter, meta: SSTableMeta) -> Self {
        SSTable {
            entries,
            bloom,
            meta,
        }
    }

    /// Point lookup. Returns the raw record, so a tombstone here is
    /// distinguishable from the key being absent.
    ///
    /// Algorithm:
    /// 1. Key outside [min_key, max_key] → None
    /// 2. Bloom filter says definitely absent → None
    /// 3. Binary search the entries
    pub fn get(&self, key: &str) -> Option<&Record<V>> {
        if self.entries.is_empty()
            || key < self.meta.min_key.as_str()
            || key > self.meta.max_key.as_str()
        {
            return None;
        }
        if !self.bloom.may_contain(key) {
            return None;
        }
        self.entries
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    /// Create an iterator over all entries in the SSTable.
    pub fn iter(&self) -> SSTableIterator<'_, V> {
        SSTableIterator {
            entries: &self.entries,
            pos: 0,
        }
    }

    /// Get metadata about this SSTable.
    pub fn meta(&self) -> &SSTableMeta {
        &self.meta
    }

    pub fn id(&self) -> u64 {
        self.meta.id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cursor over an SSTable's entries in key order.
pub struct SSTableIterator<'a, V> {
    entries: &'a [(String, Record<V>)],
    pos: usize,
}

impl<'a, V> StorageIterator<'a, Record<V>> for SSTableIterator<'a, V> {
    fn current(&self) -> Option<(&'a str, &'a Record<V>)> {
        let entries = self.entries;
        entries.get(self.pos).map(|(k, r)| (k.as_str(), r))
    }

    fn next(&mut self) {
        if self.pos < self.entries.len() {
            self.pos += 1;
        }
    }

    fn seek(&mut self, key: &str) {
        self.pos = self.entries.partition_point(|(k, _)| k.as_str() < key);
    }
}
