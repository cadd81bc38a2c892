//! CRUD E2E tests: idempotent inserts, updates, deletes and batches.

use pretty_assertions::assert_eq;
use serde_json::json;

use e2e_tests::{metadata, random_entries, TestHarness};
use vecblock_types::{ElementType, Entry, ErrorKind, OpStatus};

#[test]
fn test_insert_is_idempotent() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float32, 3);
    let ops = books.operations().unwrap();

    let entry = Entry::new(7, "seven", vec![1.0, 2.0, 3.0]);
    assert_eq!(ops.insert(&entry).unwrap(), OpStatus::Inserted(7));
    assert_eq!(ops.insert(&entry).unwrap(), OpStatus::AlreadyPresent(7));

    // A present index wins over validation of the new vector
    let clash = Entry::new(7, "other", vec![1.0]);
    assert_eq!(ops.insert(&clash).unwrap(), OpStatus::AlreadyPresent(7));
    assert_eq!(ops.get_by_index(7).unwrap(), entry);
    assert_eq!(ops.count().unwrap(), 1);
}

#[test]
fn test_vector_is_checked_against_configuration() {
    let harness = TestHarness::new();
    let (_db, bytes) = harness.collection("library", "bytes", ElementType::Int8, 2);
    let ops = bytes.operations().unwrap();

    let err = ops.insert(&Entry::new(1, "short", vec![1.0])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Operations);

    let err = ops.insert(&Entry::new(2, "overflow", vec![1.0, 200.0])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Operations);

    let err = ops.insert(&Entry::new(3, "fraction", vec![1.0, 0.5])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Operations);

    assert_eq!(
        ops.insert(&Entry::new(4, "ok", vec![-128.0, 127.0])).unwrap(),
        OpStatus::Inserted(4)
    );
    assert_eq!(ops.get_by_index(4).unwrap().vector, vec![-128.0, 127.0]);
    assert_eq!(ops.count().unwrap(), 1);
}

#[test]
fn test_update_replaces_whole_entry() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float64, 2);
    let ops = books.operations().unwrap();

    let original = Entry::new(1, "first", vec![0.1, 0.2])
        .with_metadata(metadata(json!({"lang": "en", "pages": 120})));
    ops.insert(&original).unwrap();

    assert_eq!(ops.update(&original).unwrap(), OpStatus::Unchanged(1));

    let replacement = Entry::new(1, "first, revised", vec![0.3, 0.4])
        .with_metadata(metadata(json!({"lang": "fr"})));
    assert_eq!(ops.update(&replacement).unwrap(), OpStatus::Updated(1));
    assert_eq!(ops.get_by_index(1).unwrap(), replacement);

    let err = ops.update(&Entry::new(99, "ghost", vec![0.0, 0.0])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[test]
fn test_missing_index_errors() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float32, 2);
    let ops = books.operations().unwrap();

    assert_eq!(ops.get_by_index(5).unwrap_err().kind(), ErrorKind::Operations);
    assert_eq!(ops.delete_by_index(5).unwrap_err().kind(), ErrorKind::Input);
}

#[test]
fn test_extreme_indices_round_trip() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float32, 1);
    let ops = books.operations().unwrap();

    for index in [i64::MIN, -1, 0, 1, i64::MAX] {
        ops.insert(&Entry::new(index, index.to_string(), vec![1.0]))
            .unwrap();
    }
    assert_eq!(ops.count().unwrap(), 5);
    assert_eq!(ops.get_by_index(i64::MIN).unwrap().text, i64::MIN.to_string());

    assert_eq!(ops.delete_all().unwrap(), OpStatus::Cleared);
    assert_eq!(ops.count().unwrap(), 0);
    assert_eq!(ops.get_by_index(i64::MAX).unwrap_err().kind(), ErrorKind::Operations);
}

#[test]
fn test_batches_report_per_item() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float32, 4);
    let ops = books.operations().unwrap();

    let mut entries = random_entries(10, 5, 4);
    entries.push(Entry::new(10, "duplicate in batch", vec![0.0; 4]));
    entries.push(Entry::new(20, "wrong size", vec![0.0; 3]));

    let statuses: Vec<Option<OpStatus>> = ops
        .insert_many(&entries)
        .unwrap()
        .into_iter()
        .map(|r| r.ok())
        .collect();
    assert_eq!(
        statuses,
        vec![
            Some(OpStatus::Inserted(10)),
            Some(OpStatus::Inserted(11)),
            Some(OpStatus::Inserted(12)),
            Some(OpStatus::Inserted(13)),
            Some(OpStatus::Inserted(14)),
            Some(OpStatus::AlreadyPresent(10)),
            None,
        ]
    );
    assert_eq!(ops.count().unwrap(), 5);

    let fetched = ops.get_by_indices(&[14, 30, 10]).unwrap();
    assert_eq!(fetched[0].as_ref().unwrap(), &entries[4]);
    assert_eq!(fetched[1].as_ref().unwrap_err().kind(), ErrorKind::Operations);
    assert_eq!(fetched[2].as_ref().unwrap(), &entries[0]);

    let mut changed = entries[1].clone();
    changed.text = "changed".to_string();
    let updates = ops
        .update_many(&[changed.clone(), entries[2].clone(), Entry::new(99, "x", vec![0.0; 4])])
        .unwrap();
    assert_eq!(updates[0].as_ref().unwrap(), &OpStatus::Updated(11));
    assert_eq!(updates[1].as_ref().unwrap(), &OpStatus::Unchanged(12));
    assert_eq!(updates[2].as_ref().unwrap_err().kind(), ErrorKind::Input);
    assert_eq!(ops.get_by_index(11).unwrap(), changed);

    let deletes = ops.delete_by_indices(&[10, 10, 42]).unwrap();
    assert_eq!(deletes[0].as_ref().unwrap(), &OpStatus::Deleted(10));
    assert_eq!(deletes[1].as_ref().unwrap_err().kind(), ErrorKind::Input);
    assert_eq!(deletes[2].as_ref().unwrap_err().kind(), ErrorKind::Input);
    assert_eq!(ops.count().unwrap(), 4);
}

#[test]
fn test_columns_build_entries() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Uint8, 2);
    let ops = books.operations().unwrap();

    let entries = Entry::zip_columns(
        vec![1, 2],
        vec!["a".to_string(), "b".to_string()],
        vec![vec![0.0, 255.0], vec![3.0, 4.0]],
        Vec::new(),
    )
    .unwrap();
    let results = ops.insert_many(&entries).unwrap();
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(ops.get_by_index(1).unwrap().vector, vec![0.0, 255.0]);

    let err = Entry::zip_columns(vec![1], Vec::new(), vec![vec![0.0, 0.0]], Vec::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[test]
fn test_concurrent_inserts_of_one_index() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float32, 2);
    let ops = books.operations().unwrap();

    let statuses: Vec<OpStatus> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                scope.spawn(move || {
                    ops.insert(&Entry::new(42, format!("writer {}", i), vec![i as f64, 0.0]))
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let inserted = statuses
        .iter()
        .filter(|s| matches!(s, OpStatus::Inserted(42)))
        .count();
    assert_eq!(inserted, 1);
    assert_eq!(ops.count().unwrap(), 1);
}
