//! End-to-end storage engine tests.
//!
//! Exercises the full stack: file catalog, page manager, B+tree record
//! operations, leaf-chain scans, and transactional rollback/undo.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use tempfile::tempdir;

use wudb_common::config::StorageConfig;
use wudb_common::error::WudbError;
use wudb_common::record::{key_from_slice, value_from_slice, Key, Record};
use wudb_storage::{BTree, FileCatalog};
use wudb_txn::{IsolationLevel, TxnId, TxnStatus};

fn open_tree(name: &str) -> (BTree, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let catalog = FileCatalog::new(StorageConfig {
        data_dir: dir.path().to_path_buf(),
        fsync_enabled: false,
    });
    catalog.create(name).unwrap();
    let tree = BTree::open(&catalog, name).unwrap();
    (tree, dir)
}

/// Big-endian u32 key so numeric order matches byte order.
fn key(n: u32) -> Key {
    key_from_slice(&n.to_be_bytes())
}

fn record(n: u32) -> Record {
    Record::new(key(n), value_from_slice(&n.to_le_bytes()))
}

fn begin(tree: &BTree) -> TxnId {
    tree.begin_transaction(IsolationLevel::ReadCommitted)
}

// ============================================================================
// Empty-tree behavior
// ============================================================================

#[test]
fn empty_tree_find_and_range() {
    let (tree, _dir) = open_tree("empty");

    let probe = key_from_slice(&[0x01]);
    assert!(matches!(tree.find(&probe), Err(WudbError::KeyNotFound)));
    assert!(tree.range(&key(0), &key(u32::MAX)).unwrap().is_empty());
    assert_eq!(tree.tree_height(), 0);
}

// ============================================================================
// Single record
// ============================================================================

#[test]
fn single_insert_roundtrip() {
    let (mut tree, _dir) = open_tree("single");
    let txn = begin(&tree);

    let k = key_from_slice(&[1, 2, 3]);
    let v = value_from_slice(&[4, 5, 6]);
    tree.insert(&Record::new(k, v), txn).unwrap();

    let found = tree.find(&k).unwrap();
    assert_eq!(found.value, v);
    assert_eq!(tree.tree_height(), 1);

    let root = tree.pager().get_page(tree.pager().meta().root_page_id).unwrap();
    assert_eq!(root.record_count(), 1);
}

// ============================================================================
// Growth and lookup
// ============================================================================

#[test]
fn two_hundred_sequential_inserts_split_the_tree() {
    let (mut tree, _dir) = open_tree("growth");
    let txn = begin(&tree);

    for n in 0..200 {
        tree.insert(&record(n), txn).unwrap();
    }

    assert!(tree.tree_height() >= 2);
    for n in 0..200 {
        let found = tree.find(&key(n)).unwrap();
        assert_eq!(found.value[..4], n.to_le_bytes());
    }
}

#[test]
fn shuffled_inserts_stay_findable() {
    let (mut tree, _dir) = open_tree("shuffled");
    let txn = begin(&tree);

    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let mut keys: Vec<u32> = (0..500).collect();
    keys.shuffle(&mut rng);

    for &n in &keys {
        tree.insert(&record(n), txn).unwrap();
    }
    for n in 0..500 {
        assert!(tree.find(&key(n)).is_ok(), "key {} lost", n);
    }
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn delete_first_ten_of_twenty() {
    let (mut tree, _dir) = open_tree("delete");
    let txn = begin(&tree);

    for n in 0..20 {
        tree.insert(&record(n), txn).unwrap();
    }
    for n in 0..10 {
        tree.delete(&key(n), txn).unwrap();
    }

    for n in 0..10 {
        assert!(matches!(tree.find(&key(n)), Err(WudbError::KeyNotFound)));
    }
    for n in 10..20 {
        assert!(tree.find(&key(n)).is_ok());
    }
}

#[test]
fn random_deletes_keep_survivors() {
    let (mut tree, _dir) = open_tree("random-delete");
    let txn = begin(&tree);

    for n in 0..400 {
        tree.insert(&record(n), txn).unwrap();
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let mut doomed: Vec<u32> = (0..400).collect();
    doomed.shuffle(&mut rng);
    let doomed: Vec<u32> = doomed.into_iter().take(250).collect();

    for &n in &doomed {
        tree.delete(&key(n), txn).unwrap();
    }

    for n in 0..400 {
        let found = tree.find(&key(n));
        if doomed.contains(&n) {
            assert!(found.is_err(), "key {} should be gone", n);
        } else {
            assert!(found.is_ok(), "key {} should survive", n);
        }
    }
}

// ============================================================================
// Leaf chain (ascending order, no duplicates)
// ============================================================================

#[test]
fn leaf_chain_walk_yields_strictly_ascending_keys() {
    let (mut tree, _dir) = open_tree("chain");
    let txn = begin(&tree);

    for n in 0..300 {
        tree.insert(&record(n), txn).unwrap();
    }
    for n in (0..300).step_by(4) {
        tree.delete(&key(n), txn).unwrap();
    }
    tree.update(&Record::new(key(1), value_from_slice(&[0x77])), txn)
        .unwrap();

    let meta = tree.pager().meta();
    let mut page = tree.pager().get_page(meta.first_leaf_id).unwrap();
    assert_eq!(page.header.prev_page_id, 0);

    let mut previous: Option<Key> = None;
    let mut total = 0;
    loop {
        for r in page.all_records().unwrap() {
            if let Some(prev) = previous {
                assert!(r.key > prev, "leaf chain out of order or duplicated");
            }
            previous = Some(r.key);
            total += 1;
        }
        if page.header.next_page_id == 0 {
            break;
        }
        page = tree.pager().get_page(page.header.next_page_id).unwrap();
    }

    assert_eq!(page.id(), meta.last_leaf_id);
    assert_eq!(total, 300 - 75);
}

// ============================================================================
// Range queries
// ============================================================================

#[test]
fn range_20_to_50_returns_31_records_in_order() {
    let (mut tree, _dir) = open_tree("range");
    let txn = begin(&tree);

    for n in 0..100 {
        tree.insert(&record(n), txn).unwrap();
    }

    let results = tree.range(&key(20), &key(50)).unwrap();
    assert_eq!(results.len(), 31);
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.key, key(20 + i as u32), "range result out of order");
    }
}

#[test]
fn range_spanning_many_leaves() {
    let (mut tree, _dir) = open_tree("range-wide");
    let txn = begin(&tree);

    for n in 0..256 {
        tree.insert(&record(n), txn).unwrap();
    }

    let all = tree.range(&key(0), &key(255)).unwrap();
    assert_eq!(all.len(), 256);

    let none = tree.range(&key(300), &key(400)).unwrap();
    assert!(none.is_empty());
}

// ============================================================================
// Update
// ============================================================================

#[test]
fn update_changes_value_not_key() {
    let (mut tree, _dir) = open_tree("update");
    let txn = begin(&tree);

    for n in 0..50 {
        tree.insert(&record(n), txn).unwrap();
    }
    for n in 0..50 {
        let fresh = Record::new(key(n), value_from_slice(&[0xab, n as u8]));
        tree.update(&fresh, txn).unwrap();
    }
    for n in 0..50 {
        let found = tree.find(&key(n)).unwrap();
        assert_eq!(found.value[..2], [0xab, n as u8]);
    }

    assert!(matches!(
        tree.update(&record(99), txn),
        Err(WudbError::KeyNotFound)
    ));
}

// ============================================================================
// Transactions: rollback and undo
// ============================================================================

#[test]
fn rollback_restores_pre_transaction_state() {
    let (mut tree, _dir) = open_tree("rollback");

    let setup = begin(&tree);
    for n in 0..60 {
        tree.insert(&record(n), setup).unwrap();
    }
    tree.commit(setup).unwrap();

    let txn = begin(&tree);
    for n in 60..90 {
        tree.insert(&record(n), txn).unwrap();
    }
    for n in 0..10 {
        tree.delete(&key(n), txn).unwrap();
    }
    for n in 20..30 {
        tree.update(&Record::new(key(n), value_from_slice(&[0xee])), txn)
            .unwrap();
    }

    tree.rollback(txn).unwrap();
    assert_eq!(tree.transactions().status(txn).unwrap(), TxnStatus::Aborted);

    for n in 0..60 {
        let found = tree.find(&key(n)).unwrap();
        assert_eq!(found.value[..4], n.to_le_bytes(), "value {} not restored", n);
    }
    for n in 60..90 {
        assert!(tree.find(&key(n)).is_err(), "key {} should be rolled back", n);
    }
}

#[test]
fn undo_steps_back_one_operation_at_a_time() {
    let (mut tree, _dir) = open_tree("undo");
    let txn = begin(&tree);

    tree.insert(&record(1), txn).unwrap();
    tree.insert(&record(2), txn).unwrap();
    tree.delete(&key(1), txn).unwrap();

    // Undo the delete: key 1 comes back.
    tree.undo(txn).unwrap();
    assert!(tree.find(&key(1)).is_ok());

    // Undo the second insert.
    tree.undo(txn).unwrap();
    assert!(tree.find(&key(2)).is_err());

    // Undo the first insert; tree is logically empty again.
    tree.undo(txn).unwrap();
    assert!(tree.find(&key(1)).is_err());
}

#[test]
fn commit_writes_textual_log() {
    let dir = tempdir().unwrap();
    let catalog = FileCatalog::new(StorageConfig {
        data_dir: dir.path().to_path_buf(),
        fsync_enabled: false,
    });
    catalog.create("logged").unwrap();
    let mut tree = BTree::open(&catalog, "logged").unwrap();

    let txn = begin(&tree);
    tree.insert(&record(5), txn).unwrap();
    tree.delete(&key(5), txn).unwrap();
    tree.commit(txn).unwrap();

    let contents = std::fs::read_to_string(catalog.log_path("logged")).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains(&format!("TransactionID: {}", txn)));
    assert!(lines[1].contains("OperationType: 0"));
    assert!(lines[2].contains("OperationType: 1"));
    assert!(lines[2].contains("OldRecord: {key: "));
}

// ============================================================================
// Durability across reopen
// ============================================================================

#[test]
fn records_survive_reopen() {
    let dir = tempdir().unwrap();
    let catalog = FileCatalog::new(StorageConfig {
        data_dir: dir.path().to_path_buf(),
        fsync_enabled: true,
    });
    catalog.create("durable").unwrap();

    {
        let mut tree = BTree::open(&catalog, "durable").unwrap();
        let txn = begin(&tree);
        for n in 0..150 {
            tree.insert(&record(n), txn).unwrap();
        }
        tree.commit(txn).unwrap();
    }

    let tree = BTree::open(&catalog, "durable").unwrap();
    assert!(tree.tree_height() >= 2);
    for n in 0..150 {
        let found = tree.find(&key(n)).unwrap();
        assert_eq!(found.value[..4], n.to_le_bytes());
    }

    let results = tree.range(&key(100), &key(149)).unwrap();
    assert_eq!(results.len(), 50);
}

// ============================================================================
// Mixed workload
// ============================================================================

#[test]
fn mixed_workload_stays_consistent() {
    let (mut tree, _dir) = open_tree("mixed");
    let txn = begin(&tree);

    // Grow, shrink below the split point, grow again.
    for n in 0..200 {
        tree.insert(&record(n), txn).unwrap();
    }
    for n in 50..150 {
        tree.delete(&key(n), txn).unwrap();
    }
    for n in 50..150 {
        tree.insert(&record(n), txn).unwrap();
    }
    for n in (0..200).step_by(2) {
        tree.update(&Record::new(key(n), value_from_slice(&[0xcd])), txn)
            .unwrap();
    }

    for n in 0..200 {
        let found = tree.find(&key(n)).unwrap();
        if n % 2 == 0 {
            assert_eq!(found.value[0], 0xcd);
        }
    }

    let all = tree.range(&key(0), &key(199)).unwrap();
    assert_eq!(all.len(), 200);

    let dump = tree.tree_walk().unwrap();
    assert!(dump.contains("leaf"));
}
