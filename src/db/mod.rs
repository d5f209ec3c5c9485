//! # Engine
//!
//! Ties the memtable and the SSTables together.
//!
//! ## Write path
//! 1. Apply the put or delete to the active memtable.
//! 2. If the memtable now holds `flush_threshold` keys, seal it, move its
//!    entries into a new SSTable appended to the list, and install a fresh
//!    memtable.
//!
//! ## Read path
//! 1. Check the active memtable (freshest data, includes tombstones).
//! 2. Check SSTables from newest to oldest.
//! 3. First match wins; a tombstone means "not found".

pub mod options;
pub mod shared;

use std::mem;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::iterator::StorageIterator;
use crate::iterator::merge::{BoxedRecordIterator, MergeIterator};
use crate::memtable::{MemTable, MemTableKind};
use crate::sstable::{SSTable, SSTableBuilder};
use crate::types::Record;

pub use options::Options;
pub use shared::SharedDB;

/// Point-in-time counters, see [`DB::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Distinct keys in the active memtable, tombstones included.
    pub memtable_entries: usize,
    /// Approximate bytes held by the active memtable.
    pub memtable_bytes: usize,
    pub sstable_count: usize,
    /// Entries across all SSTables, tombstones and shadowed versions included.
    pub sstable_entries: usize,
    pub puts: u64,
    pub deletes: u64,
    pub flushes: u64,
    pub compactions: u64,
}

/// An in-memory LSM-tree key-value store.
///
/// ```
/// use memlsm::{DB, Options};
///
/// let mut db = DB::new(Options::default().flush_threshold(2)).unwrap();
/// db.put("a", 1).unwrap();
/// db.put("b", 2).unwrap(); // memtable reaches 2 keys and is flushed
/// db.put("a", 3).unwrap();
/// assert_eq!(db.get("a"), Some(&3));
/// assert_eq!(db.sstable_count(), 1);
/// ```
pub struct DB<V> {
    options: Options,
    active: MemTable<V>,
    /// Oldest first; ids strictly increase along the vector.
    sstables: Vec<SSTable<V>>,
    next_sstable_id: u64,
    /// Seeds the level generator of every new skip list memtable.
    level_seeds: StdRng,
    puts: u64,
    deletes: u64,
    flushes: u64,
    compactions: u64,
    /// Replaces the entry count reserved by every new SSTable builder.
    #[cfg(test)]
    reserve_override: Option<usize>,
}

impl<V> DB<V> {
    /// Create an empty engine. Fails fast on invalid options.
    pub fn new(options: Options) -> Result<Self> {
        options.validate()?;
        let mut level_seeds = match options.level_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let active = Self::new_memtable(&options, &mut level_seeds)?;
        info!(
            flush_threshold = options.flush_threshold,
            memtable = ?options.memtable_kind,
            "created engine"
        );
        Ok(DB {
            options,
            active,
            sstables: Vec::new(),
            next_sstable_id: 1,
            level_seeds,
            puts: 0,
            deletes: 0,
            flushes: 0,
            compactions: 0,
            #[cfg(test)]
            reserve_override: None,
        })
    }

    /// Entries a new SSTable builder reserves up front.
    #[cfg(not(test))]
    fn reservation(&self, entries: usize) -> usize {
        entries
    }

    #[cfg(test)]
    fn reservation(&self, entries: usize) -> usize {
        self.reserve_override.unwrap_or(entries)
    }

    fn new_memtable(options: &Options, level_seeds: &mut StdRng) -> Result<MemTable<V>> {
        match options.memtable_kind {
            MemTableKind::SkipList => MemTable::with_skiplist(
                options.skiplist_max_level,
                options.skiplist_promotion_probability,
                Box::new(StdRng::seed_from_u64(level_seeds.next_u64())),
            ),
            MemTableKind::BTree => MemTable::with_btree(options.btree_order),
        }
    }

    /// Write a value. Overwrites any older value for the key.
    ///
    /// The write lands in the memtable before the flush check, so it is
    /// visible even if the flush it triggers fails; the full memtable then
    /// stays active and the next write retries the flush.
    pub fn put(&mut self, key: impl Into<String>, value: V) -> Result<()> {
        self.active.put(key.into(), value);
        self.puts += 1;
        self.maybe_flush()
    }

    /// Delete a key by writing a tombstone that shadows older values.
    pub fn delete(&mut self, key: impl Into<String>) -> Result<()> {
        self.active.delete(key.into());
        self.deletes += 1;
        self.maybe_flush()
    }

    /// Newest live value for `key`.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.lookup(key).and_then(Record::value)
    }

    /// Newest record for `key` across all layers, tombstones included.
    fn lookup(&self, key: &str) -> Option<&Record<V>> {
        self.active
            .get_record(key)
            .or_else(|| self.sstables.iter().rev().find_map(|table| table.get(key)))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Live entries with `start <= key < end`, ascending.
    pub fn scan<'a>(&'a self, start: &str, end: &'a str) -> Scan<'a, V> {
        Scan::new(self.sources(), start, Some(end))
    }

    /// All live entries, ascending.
    pub fn iter(&self) -> Scan<'_, V> {
        Scan::new(self.sources(), "", None)
    }

    /// Cursors over every layer, newest first.
    fn sources(&self) -> Vec<BoxedRecordIterator<'_, V>> {
        let mut sources: Vec<BoxedRecordIterator<'_, V>> = Vec::with_capacity(self.sstables.len() + 1);
        sources.push(Box::new(self.active.iter()));
        for table in self.sstables.iter().rev() {
            sources.push(Box::new(table.iter()));
        }
        sources
    }

    /// Seal the active memtable now, if it holds anything.
    pub fn flush(&mut self) -> Result<()> {
        if self.active.is_empty() {
            return Ok(());
        }
        self.flush_active()
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if self.active.is_full(self.options.flush_threshold) {
            self.flush_active()?;
        }
        Ok(())
    }

    /// Seal, flush, rotate.
    ///
    /// Everything that can fail happens before the memtable is swapped out,
    /// so a failure leaves the full memtable active with nothing lost.
    fn flush_active(&mut self) -> Result<()> {
        let id = self.next_sstable_id;
        let mut builder = SSTableBuilder::new(
            id,
            self.reservation(self.active.len()),
            self.options.bloom_false_positive_rate,
        )
        .inspect_err(|e| warn!(id, error = %e, "memtable flush aborted"))?;
        let fresh = Self::new_memtable(&self.options, &mut self.level_seeds)?;

        let sealed = mem::replace(&mut self.active, fresh).freeze();
        builder.extend(sealed.into_sorted());
        let table = builder.finish();

        debug!(
            id,
            entries = table.len(),
            tombstones = table.meta().tombstone_count,
            "flushed memtable to sstable"
        );
        self.sstables.push(table);
        self.next_sstable_id += 1;
        self.flushes += 1;
        Ok(())
    }

    /// Number of SSTables.
    pub fn sstable_count(&self) -> usize {
        self.sstables.len()
    }

    /// SSTables, oldest first.
    pub fn sstables(&self) -> &[SSTable<V>] {
        &self.sstables
    }

    /// The active memtable.
    pub fn memtable(&self) -> &MemTable<V> {
        &self.active
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn stats(&self) -> Stats {
        Stats {
            memtable_entries: self.active.len(),
            memtable_bytes: self.active.size_bytes(),
            sstable_count: self.sstables.len(),
            sstable_entries: self.sstables.iter().map(SSTable::len).sum(),
            puts: self.puts,
            deletes: self.deletes,
            flushes: self.flushes,
            compactions: self.compactions,
        }
    }
}

impl<V: Clone> DB<V> {
    /// Merge every SSTable into one.
    ///
    /// Only the newest version of each key survives. Tombstones are dropped:
    /// the merged table is the oldest layer, so nothing older remains for
    /// them to shadow. Reads return the same results before and after.
    /// On failure the SSTable list is untouched.
    pub fn compact(&mut self) -> Result<()> {
        let needs_work = match self.sstables.as_slice() {
            [] => false,
            [only] => only.meta().tombstone_count > 0,
            _ => true,
        };
        if !needs_work {
            return Ok(());
        }

        let id = self.next_sstable_id;
        let expected = self.sstables.iter().map(SSTable::len).sum();
        let mut builder = SSTableBuilder::new(
            id,
            self.reservation(expected),
            self.options.bloom_false_positive_rate,
        )
            .inspect_err(|e| warn!(id, error = %e, "compaction aborted"))?;

        let sources: Vec<BoxedRecordIterator<'_, V>> = self
            .sstables
            .iter()
            .rev()
            .map(|table| Box::new(table.iter()) as BoxedRecordIterator<'_, V>)
            .collect();
        let mut merged = MergeIterator::new(sources);
        while let Some((key, record)) = merged.current() {
            builder.add(key.to_string(), record.clone());
            merged.next();
        }
        drop(merged);

        let table = builder.finish();
        let inputs = self.sstables.len();
        info!(
            id,
            inputs,
            entries = table.len(),
            "compacted sstables"
        );
        self.sstables.clear();
        if !table.is_empty() {
            self.sstables.push(table);
        }
        self.next_sstable_id += 1;
        self.compactions += 1;
        Ok(())
    }
}

/// Live entries of a [`DB`] in ascending key order, newest value per key.
pub struct Scan<'a, V> {
    merged: MergeIterator<'a, V>,
    end: Option<&'a str>,
}

impl<'a, V> Scan<'a, V> {
    fn new(sources: Vec<BoxedRecordIterator<'a, V>>, start: &str, end: Option<&'a str>) -> Self {
        let mut merged = MergeIterator::new(sources);
        if !start.is_empty() {
            merged.seek(start);
        }
        Scan { merged, end }
    }
}

impl<'a, V> Iterator for Scan<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, record) = self.merged.current()?;
            if self.end.is_some_and(|end| key >= end) {
                return None;
            }
            self.merged.next();
            if let Some(value) = record.value() {
                return Some((key, value));
            }
        }
    }
}
