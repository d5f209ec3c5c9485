pub mod builder;
pub mod reader;

pub use builder::SSTableBuilder;
pub use reader::{SSTable, SSTableIterator};

/// Metadata about an SSTable, captured when it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SSTableMeta {
    /// Flush sequence number. Higher ids hold newer data.
    pub id: u64,
    /// Smallest key in the SSTable. Empty for an empty table.
    pub min_key: String,
    /// Largest key in the SSTable. Empty for an empty table.
    pub max_key: String,
    /// Number of entries (including tombstones).
    pub entry_count: usize,
    /// Number of tombstones among the entries.
    pub tombstone_count: usize,
}
