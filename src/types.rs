/// What a memtable or SSTable holds for a key.
///
/// A delete writes a tombstone: the key isn't removed, it's marked as deleted,
/// so that older versions in SSTables stay shadowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record<V> {
    /// A normal put.
    Put(V),
    /// A delete marker.
    Tombstone,
}

impl<V> Record<V> {
    /// The live value, or `None` for a tombstone.
    pub fn value(&self) -> Option<&V> {
        match self {
            Record::Put(v) => Some(v),
            Record::Tombstone => None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Record::Tombstone)
    }
}
