use std::sync::Arc;

use parking_lot::RwLock;

use crate::db::{DB, Options, Stats};
use crate::error::Result;

/// A [`DB`] shared between threads.
///
/// Writers hold the write lock across the whole put, including any
/// seal/flush/rotate it triggers, so a reader sees either the full memtable
/// or the SSTable it became. Never neither, and never a half-spliced
/// skip list. Readers share the lock and get owned copies back.
pub struct SharedDB<V> {
    inner: Arc<RwLock<DB<V>>>,
}

impl<V> Clone for SharedDB<V> {
    fn clone(&self) -> Self {
        SharedDB {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> SharedDB<V> {
    pub fn new(options: Options) -> Result<Self> {
        Ok(Self::from_db(DB::new(options)?))
    }

    pub fn from_db(db: DB<V>) -> Self {
        SharedDB {
            inner: Arc::new(RwLock::new(db)),
        }
    }

    pub fn put(&self, key: impl Into<String>, value: V) -> Result<()> {
        self.inner.write().put(key, value)
    }

    pub fn delete(&self, key: impl Into<String>) -> Result<()> {
        self.inner.write().delete(key)
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.write().flush()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    pub fn stats(&self) -> Stats {
        self.inner.read().stats()
    }

    /// Run `f` against the engine under the read lock, for borrowing access
    /// without cloning values out.
    pub fn with_read<R>(&self, f: impl FnOnce(&DB<V>) -> R) -> R {
        let db = self.inner.read();
        f(&*db)
    }
}

impl<V: Clone> SharedDB<V> {
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    /// Owned copy of the live entries with `start <= key < end`.
    pub fn scan(&self, start: &str, end: &str) -> Vec<(String, V)> {
        self.inner
            .read()
            .scan(start, end)
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    pub fn compact(&self) -> Result<()> {
        self.inner.write().compact()
    }
}
