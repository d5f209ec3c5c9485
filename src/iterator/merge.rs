use crate::iterator::StorageIterator;
use crate::types::Record;

/// A boxed source cursor yielding memtable or SSTable records.
pub type BoxedRecordIterator<'a, V> = Box<dyn StorageIterator<'a, Record<V>> + 'a>;

/// Merges multiple sorted iterators into a single sorted stream.
///
/// Used for:
/// - Range scans across the memtable + all SSTables
/// - Compaction (merging SSTables)
///
/// Ordering guarantee: entries are yielded in ascending key order.
/// Deduplication: only the newest version of each key is yielded, where
/// newest means the source with the lowest index.
/// Tombstones win deduplication like any other record, then are skipped.
///
/// Sources are few (one memtable plus the SSTables), so picking the
/// smallest key is a linear scan over the sources rather than a heap.
pub struct MergeIterator<'a, V> {
    iters: Vec<BoxedRecordIterator<'a, V>>,
    current: Option<(&'a str, &'a Record<V>)>,
}

impl<'a, V> MergeIterator<'a, V> {
    /// Create a new MergeIterator from multiple sorted sources.
    /// Sources are ordered by priority: index 0 = newest (memtable),
    /// higher indices = older SSTables.
    pub fn new(iters: Vec<BoxedRecordIterator<'a, V>>) -> Self {
        let mut merged = MergeIterator {
            iters,
            current: None,
        };
        merged.settle();
        merged
    }

    /// Pick the next live entry, advancing every source past the chosen key.
    fn settle(&mut self) {
        loop {
            let mut winner: Option<(&'a str, &'a Record<V>)> = None;
            for iter in &self.iters {
                if let Some((key, record)) = iter.current() {
                    // Strictly less: on ties the earlier (newer) source keeps the win.
                    if winner.is_none_or(|(best, _)| key < best) {
                        winner = Some((key, record));
                    }
                }
            }

            let Some((key, record)) = winner else {
                self.current = None;
                return;
            };

            for iter in &mut self.iters {
                if iter.current().is_some_and(|(k, _)| k == key) {
                    iter.next();
                }
            }

            if !record.is_tombstone() {
                self.current = Some((key, record));
                return;
            }
        }
    }
}

impl<'a, V> StorageIterator<'a, Record<V>> for MergeIterator<'a, V> {
    fn current(&self) -> Option<(&'a str, &'a Record<V>)> {
        self.current
    }

    fn next(&mut self) {
        if self.current.is_some() {
            self.settle();
        }
    }

    fn seek(&mut self, key: &str) {
        for iter in &mut self.iters {
            iter.seek(key);
        }
        self.settle();
    }
}
