pub mod merge;

pub use merge::MergeIterator;

/// The central iteration abstraction for the storage engine.
///
/// Every sorted data source (skip list, B-tree, memtable, SSTable, merged view)
/// implements this trait, so MergeIterator can take
/// `Vec<Box<dyn StorageIterator>>` and merge them.
///
/// Entries borrow from the underlying structure for `'a`, so a caller can keep
/// a key or value after advancing the cursor.
pub trait StorageIterator<'a, T: 'a> {
    /// The entry the cursor is positioned at, or `None` once exhausted.
    fn current(&self) -> Option<(&'a str, &'a T)>;

    /// Returns true if the iterator is positioned at a valid entry.
    fn is_valid(&self) -> bool {
        self.current().is_some()
    }

    /// Advances to the next entry. No-op once exhausted.
    fn next(&mut self);

    /// Positions the iterator at the first entry with key >= target.
    fn seek(&mut self, key: &str);
}

