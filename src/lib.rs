//! # In-memory LSM-Tree Storage Engine
//!
//! A key-value storage engine using the Log-Structured Merge-Tree design,
//! held entirely in memory.
//!
//! ## Core idea
//! Writes land in a small sorted buffer (the memtable, a skip list or a
//! B-tree). When it fills up it is sealed into an immutable sorted run (an
//! SSTable) and a fresh buffer takes its place. Reads check the buffer first,
//! then the runs from newest to oldest, so the newest write for a key always
//! wins.

pub mod bloom;
pub mod btree;
pub mod db;
pub mod error;
pub mod iterator;
pub mod memtable;
pub mod sstable;
pub mod types;

// Public re-exports for the top-level API
pub use db::{DB, Options, Scan, SharedDB, Stats};
pub use error::{Error, Result};
pub use memtable::MemTableKind;
pub use types::Record;
