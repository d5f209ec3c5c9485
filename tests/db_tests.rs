// Engine: write path, flushes, newest-wins reads, scans and compaction.

use std::collections::BTreeMap;

use memlsm::{DB, Error, MemTableKind, Options, Record, Stats};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn db_with_threshold(threshold: usize) -> DB<i32> {
    DB::new(Options::default().flush_threshold(threshold).level_seed(42)).unwrap()
}

// =============================================================================
// Test 1: Three writes with a threshold of two
// =============================================================================
// "a" and "b" fill the memtable and are flushed; the newer "a" stays in the
// fresh memtable and shadows the flushed one.
#[test]
fn newer_memtable_value_shadows_flushed_value() {
    let mut db = db_with_threshold(2);
    db.put("a", 1).unwrap();
    db.put("b", 2).unwrap();
    db.put("a", 3).unwrap();

    assert_eq!(db.get("a"), Some(&3));
    assert_eq!(db.get("b"), Some(&2));
    assert_eq!(db.sstable_count(), 1);
    assert_eq!(db.memtable().len(), 1);
}

// =============================================================================
// Test 2: Three distinct keys with a threshold of two
// =============================================================================
// "a" and "b" land in the single SSTable; "c" stays in the fresh memtable.
#[test]
fn flush_splits_keys_between_sstable_and_memtable() {
    let mut db = db_with_threshold(2);
    db.put("a", 1).unwrap();
    db.put("b", 2).unwrap();
    db.put("c", 3).unwrap();

    assert_eq!(db.sstable_count(), 1);
    let table = &db.sstables()[0];
    assert_eq!(table.get("a"), Some(&Record::Put(1)));
    assert_eq!(table.get("b"), Some(&Record::Put(2)));
    assert_eq!(table.get("c"), None);

    assert_eq!(db.memtable().len(), 1);
    assert_eq!(db.memtable().get("c"), Some(&3));

    assert_eq!(db.get("a"), Some(&1));
    assert_eq!(db.get("c"), Some(&3));
    assert_eq!(db.get("z"), None);
}

// =============================================================================
// Test 3: 10,000 writes over 1,000 keys
// =============================================================================
// Threshold 100: many flushes, and every key must resolve to its last write.
#[test]
fn last_write_wins_across_many_flushes() {
    let mut db = db_with_threshold(100);
    let mut rng = StdRng::seed_from_u64(2024);
    let mut expected = BTreeMap::new();
    for round in 0..10_000 {
        let key = format!("key_{:05}", rng.gen_range(0..1000));
        db.put(key.clone(), round).unwrap();
        expected.insert(key, round);
    }

    assert!(db.sstable_count() > 1);
    for (key, value) in &expected {
        assert_eq!(db.get(key), Some(value), "wrong value for {key}");
    }
    assert_eq!(db.get("key_99999"), None);
}

// =============================================================================
// Test 4: Flush is invisible to readers
// =============================================================================
#[test]
fn reads_before_and_after_flush_agree() {
    let mut db = db_with_threshold(3);
    db.put("x", 1).unwrap();
    db.put("y", 2).unwrap();
    assert_eq!(db.sstable_count(), 0);
    assert_eq!(db.get("x"), Some(&1));

    // Third key triggers the flush
    db.put("z", 3).unwrap();
    assert_eq!(db.sstable_count(), 1);
    assert!(db.memtable().is_empty());
    assert_eq!(db.get("x"), Some(&1));
    assert_eq!(db.get("y"), Some(&2));
    assert_eq!(db.get("z"), Some(&3));
}

// =============================================================================
// Test 5: Overwrites do not count toward the threshold
// =============================================================================
#[test]
fn overwrite_same_key_does_not_flush() {
    let mut db = db_with_threshold(2);
    for _ in 0..10 {
        db.put("same", 7).unwrap();
    }
    assert_eq!(db.sstable_count(), 0);
    assert_eq!(db.get("same"), Some(&7));
    assert_eq!(db.memtable().len(), 1);
}

// =============================================================================
// Test 6: Threshold of one flushes every write
// =============================================================================
#[test]
fn threshold_one_flushes_each_put() {
    let mut db = db_with_threshold(1);
    db.put("a", 1).unwrap();
    db.put("b", 2).unwrap();
    db.put("a", 3).unwrap();
    assert_eq!(db.sstable_count(), 3);
    assert_eq!(db.get("a"), Some(&3));

    let ids: Vec<u64> = db.sstables().iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

// =============================================================================
// Test 7: Empty engine
// =============================================================================
#[test]
fn empty_engine_returns_none() {
    let db: DB<i32> = DB::new(Options::default()).unwrap();
    assert_eq!(db.get("anything"), None);
    assert_eq!(db.get(""), None);
    assert_eq!(db.sstable_count(), 0);
    assert_eq!(db.iter().count(), 0);
}

// =============================================================================
// Test 8: Invalid configuration fails fast
// =============================================================================
#[test]
fn invalid_options_rejected() {
    let result = DB::<i32>::new(Options::default().flush_threshold(0));
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));

    let result = DB::<i32>::new(Options::default().skiplist_promotion_probability(1.0));
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));

    let result = DB::<i32>::new(Options::default().btree_order(2));
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
}

// =============================================================================
// Test 9: Delete shadows a flushed value
// =============================================================================
#[test]
fn delete_hides_value_in_older_sstable() {
    let mut db = db_with_threshold(2);
    db.put("a", 1).unwrap();
    db.put("b", 2).unwrap();
    assert_eq!(db.sstable_count(), 1);

    db.delete("a").unwrap();
    assert_eq!(db.get("a"), None);
    assert!(!db.contains_key("a"));

    // The tombstone survives its own flush
    db.put("c", 3).unwrap();
    assert_eq!(db.sstable_count(), 2);
    assert_eq!(db.get("a"), None);

    // And a later put resurrects the key
    db.put("a", 4).unwrap();
    assert_eq!(db.get("a"), Some(&4));
}

// =============================================================================
// Test 10: Range scan across layers
// =============================================================================
#[test]
fn scan_merges_memtable_and_sstables() {
    let mut db = db_with_threshold(3);
    for (k, v) in [("a", 1), ("c", 3), ("e", 5)] {
        db.put(k, v).unwrap();
    }
    for (k, v) in [("b", 2), ("d", 4), ("c", 30)] {
        db.put(k, v).unwrap();
    }
    db.delete("e").unwrap();
    db.put("f", 6).unwrap();

    let all: Vec<(&str, &i32)> = db.iter().collect();
    assert_eq!(
        all,
        vec![("a", &1), ("b", &2), ("c", &30), ("d", &4), ("f", &6)]
    );

    // End bound is exclusive
    let range: Vec<&str> = db.scan("b", "e").map(|(k, _)| k).collect();
    assert_eq!(range, vec!["b", "c", "d"]);

    // Start between keys
    let range: Vec<&str> = db.scan("bb", "zz").map(|(k, _)| k).collect();
    assert_eq!(range, vec!["c", "d", "f"]);

    // Empty and inverted ranges
    assert_eq!(db.scan("c", "c").count(), 0);
    assert_eq!(db.scan("e", "a").count(), 0);
}

// =============================================================================
// Test 11: Manual flush
// =============================================================================
#[test]
fn manual_flush_seals_partial_memtable() {
    let mut db = db_with_threshold(100);
    db.flush().unwrap();
    assert_eq!(db.sstable_count(), 0, "flushing an empty memtable is a no-op");

    db.put("k", 1).unwrap();
    db.flush().unwrap();
    assert_eq!(db.sstable_count(), 1);
    assert!(db.memtable().is_empty());
    assert_eq!(db.get("k"), Some(&1));
}

// =============================================================================
// Test 12: Compaction keeps every read the same
// =============================================================================
#[test]
fn compaction_preserves_reads() {
    let mut db = db_with_threshold(50);
    let mut rng = StdRng::seed_from_u64(7);
    let mut expected = BTreeMap::new();
    for round in 0..2000 {
        let key = format!("key_{:04}", rng.gen_range(0..300));
        if round % 7 == 0 {
            db.delete(key.clone()).unwrap();
            expected.remove(&key);
        } else {
            db.put(key.clone(), round).unwrap();
            expected.insert(key, round);
        }
    }
    db.flush().unwrap();
    assert!(db.sstable_count() > 1);

    db.compact().unwrap();
    assert_eq!(db.sstable_count(), 1);
    let table = &db.sstables()[0];
    assert_eq!(table.meta().tombstone_count, 0);
    assert_eq!(table.len(), expected.len());

    let after: Vec<(String, i32)> = db.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    let expected: Vec<(String, i32)> = expected.into_iter().collect();
    assert_eq!(after, expected);
    for i in 0..300 {
        let key = format!("key_{:04}", i);
        let want = expected.iter().find(|(k, _)| *k == key).map(|(_, v)| v);
        assert_eq!(db.get(&key), want);
    }
}

// =============================================================================
// Test 13: Compaction of nothing, and of only deletes
// =============================================================================
#[test]
fn compaction_edge_cases() {
    let mut db = db_with_threshold(2);
    db.compact().unwrap();
    assert_eq!(db.sstable_count(), 0);
    assert_eq!(db.stats().compactions, 0);

    db.put("a", 1).unwrap();
    db.put("b", 2).unwrap();
    db.delete("a").unwrap();
    db.delete("b").unwrap();
    assert_eq!(db.sstable_count(), 2);

    // Every key is deleted, so the merged table would be empty
    db.compact().unwrap();
    assert_eq!(db.sstable_count(), 0);
    assert_eq!(db.get("a"), None);
    assert_eq!(db.iter().count(), 0);

    // Ids keep increasing after compaction
    db.put("c", 3).unwrap();
    db.put("d", 4).unwrap();
    assert!(db.sstables()[0].id() > 2);
}

// =============================================================================
// Test 14: B-tree memtables
// =============================================================================
#[test]
fn btree_memtable_behaves_the_same() {
    let opts = Options::default()
        .flush_threshold(16)
        .memtable_kind(MemTableKind::BTree)
        .btree_order(3);
    let mut db = DB::new(opts).unwrap();
    for i in 0..100 {
        db.put(format!("k{:03}", i), i).unwrap();
    }
    db.delete("k050").unwrap();
    for i in 0..100 {
        db.put(format!("k{:03}", i), i * 2).unwrap();
    }
    db.delete("k099").unwrap();

    assert_eq!(db.memtable().kind(), MemTableKind::BTree);
    assert_eq!(db.get("k050"), Some(&100));
    assert_eq!(db.get("k099"), None);
    assert_eq!(db.iter().count(), 99);
    let first: Vec<&str> = db.scan("k000", "k003").map(|(k, _)| k).collect();
    assert_eq!(first, vec!["k000", "k001", "k002"]);
}

// =============================================================================
// Test 15: Stats
// =============================================================================
#[test]
fn stats_track_operations() {
    let mut db = db_with_threshold(2);
    db.put("a", 1).unwrap();
    db.put("b", 2).unwrap();
    db.put("c", 3).unwrap();
    db.delete("a").unwrap();

    let stats = db.stats();
    assert_eq!(
        stats,
        Stats {
            memtable_entries: 0,
            memtable_bytes: 0,
            sstable_count: 2,
            sstable_entries: 4,
            puts: 3,
            deletes: 1,
            flushes: 2,
            compactions: 0,
        }
    );
}
