use crate::bloom::BloomFilter;
use crate::error::Result;
use crate::sstable::{SSTable, SSTableMeta};
use crate::types::Record;

/// Builds an SSTable from a sorted stream of entries.
///
/// Used during:
/// - Memtable flush (frozen memtable → SSTable)
/// - Compaction (merged iterators → one new SSTable)
///
/// Build process:
/// 1. `new` reserves room for every expected entry up front; this is the
///    only step that can fail, so callers create the builder before
///    giving up anything they would need to roll back
/// 2. Add entries one by one (must be in sorted order)
/// 3. `finish` seals the entries, filter, and metadata into an SSTable
pub struct SSTableBuilder<V> {
    id: u64,
    entries: Vec<(String, Record<V>)>,
    bloom: BloomFilter,
    tombstone_count: usize,
}

impl<V> SSTableBuilder<V> {
    /// Create a builder for table `id` expecting about `expected_entries`.
    ///
    /// Fails with `ResourceExhaustion` if the entry storage cannot be
    /// reserved, or `InvalidConfiguration` for a bad false positive rate.
    pub fn new(id: u64, expected_entries: usize, false_positive_rate: f64) -> Result<Self> {
        let mut entries = Vec::new();
        entries.try_reserve_exact(expected_entries)?;
        let bloom = BloomFilter::new(expected_entries, false_positive_rate)?;
        Ok(SSTableBuilder {
            id,
            entries,
            bloom,
            tombstone_count: 0,
        })
    }

    /// Add an entry. MUST be called in strictly ascending key order.
    pub fn add(&mut self, key: String, record: Record<V>) {
        debug_assert!(
            self.entries.last().is_none_or(|(last, _)| *last < key),
            "SSTable keys must be added in ascending order"
        );
        self.bloom.insert(&key);
        if record.is_tombstone() {
            self.tombstone_count += 1;
        }
        self.entries.push((key, record));
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finalize the SSTable.
    pub fn finish(self) -> SSTable<V> {
        let (min_key, max_key) = match (self.entries.first(), self.entries.last()) {
            (Some((first, _)), Some((last, _))) => (first.clone(), last.clone()),
            _ => (String::new(), String::new()),
        };
        let meta = SSTableMeta {
            id: self.id,
            min_key,
            max_key,
            entry_count: self.entries.len(),
            tombstone_count: self.tombstone_count,
        };
        SSTable::new(self.entries, self.bloom, meta)
    }
}

impl<V> Extend<(String, Record<V>)> for SSTableBuilder<V> {
    fn extend<I: IntoIterator<Item = (String, Record<V>)>>(&mut self, iter: I) {
        for (key, record) in iter {
            self.add(key, record);
        }
    }
}
