use crate::bloom::{self, DEFAULT_FALSE_POSITIVE_RATE};
use crate::btree::{self, DEFAULT_ORDER};
use crate::error::{Error, Result};
use crate::memtable::MemTableKind;
use crate::memtable::skiplist::{self, MAX_HEIGHT, PROMOTION_PROBABILITY};

/// Engine configuration.
///
/// ```
/// use memlsm::{DB, Options};
///
/// let opts = Options::default().flush_threshold(2).level_seed(7);
/// let db: DB<u32> = DB::new(opts).unwrap();
/// assert_eq!(db.options().flush_threshold, 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Number of distinct keys in the memtable that triggers a flush.
    pub flush_threshold: usize,
    /// Structure backing each memtable.
    pub memtable_kind: MemTableKind,
    /// Tallest tower a skip list node may get.
    pub skiplist_max_level: usize,
    /// Chance that a skip list node is promoted one more level.
    pub skiplist_promotion_probability: f64,
    /// Maximum children per node when memtables are B-trees.
    pub btree_order: usize,
    /// Target false positive rate of each SSTable's bloom filter.
    pub bloom_false_positive_rate: f64,
    /// Seed for skip list level draws. `None` seeds from entropy.
    pub level_seed: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            flush_threshold: 4096,
            memtable_kind: MemTableKind::SkipList,
            skiplist_max_level: MAX_HEIGHT,
            skiplist_promotion_probability: PROMOTION_PROBABILITY,
            btree_order: DEFAULT_ORDER,
            bloom_false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
            level_seed: None,
        }
    }
}

impl Options {
    pub fn flush_threshold(mut self, flush_threshold: usize) -> Self {
        self.flush_threshold = flush_threshold;
        self
    }

    pub fn memtable_kind(mut self, kind: MemTableKind) -> Self {
        self.memtable_kind = kind;
        self
    }

    pub fn skiplist_max_level(mut self, max_level: usize) -> Self {
        self.skiplist_max_level = max_level;
        self
    }

    pub fn skiplist_promotion_probability(mut self, p: f64) -> Self {
        self.skiplist_promotion_probability = p;
        self
    }

    pub fn btree_order(mut self, order: usize) -> Self {
        self.btree_order = order;
        self
    }

    pub fn bloom_false_positive_rate(mut self, rate: f64) -> Self {
        self.bloom_false_positive_rate = rate;
        self
    }

    pub fn level_seed(mut self, seed: u64) -> Self {
        self.level_seed = Some(seed);
        self
    }

    /// Reject out-of-range parameters. Every parameter is checked, whichever
    /// memtable kind is selected.
    pub fn validate(&self) -> Result<()> {
        if self.flush_threshold == 0 {
            return Err(Error::InvalidConfiguration(
                "flush threshold must be > 0".into(),
            ));
        }
        skiplist::validate_levels(self.skiplist_max_level, self.skiplist_promotion_probability)?;
        if self.btree_order < btree::MIN_ORDER {
            return Err(Error::InvalidConfiguration(format!(
                "b-tree order must be >= {}, got {}",
                btree::MIN_ORDER,
                self.btree_order
            )));
        }
        bloom::validate_false_positive_rate(self.bloom_false_positive_rate)
    }
}
