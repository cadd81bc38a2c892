//! Search E2E tests: ranking, metrics, filters and unfilled slots.

use pretty_assertions::assert_eq;
use serde_json::json;

use e2e_tests::{metadata, random_entries, TestHarness};
use vecblock_engine::{binarize, distance::distance, Filter, SearchQuery};
use vecblock_types::{ElementType, Entry, ErrorKind, Metric, SearchHit};

fn indices(hits: &[SearchHit]) -> Vec<Option<i64>> {
    hits.iter().map(|h| h.entry.as_ref().map(|e| e.index)).collect()
}

#[test]
fn test_cosine_ranking_with_tie() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float32, 3);
    let ops = books.operations().unwrap();

    ops.insert_many(&[
        Entry::new(1, "x", vec![1.0, 0.0, 0.0]),
        Entry::new(2, "y", vec![0.0, 1.0, 0.0]),
        Entry::new(3, "x again", vec![1.0, 0.0, 0.0]),
    ])
    .unwrap();

    let hits = ops
        .search(&SearchQuery::new(vec![1.0, 0.0, 0.0]).with_top_k(2))
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].distance, 0.0);
    assert_eq!(hits[1].distance, 0.0);
    let mut top: Vec<i64> = indices(&hits).into_iter().flatten().collect();
    top.sort();
    assert_eq!(top, vec![1, 3]);
}

#[test]
fn test_unfilled_slots_are_sentinels() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float64, 2);
    let ops = books.operations().unwrap();
    ops.insert(&Entry::new(1, "only", vec![3.0, 4.0])).unwrap();

    let hits = ops
        .search(
            &SearchQuery::new(vec![0.0, 0.0])
                .with_metric(Metric::L2)
                .with_top_k(3),
        )
        .unwrap();
    assert_eq!(indices(&hits), vec![Some(1), None, None]);
    assert_eq!(hits[0].distance, 5.0);
    assert!(hits[1].is_sentinel());
    assert_eq!(hits[2].distance, f64::INFINITY);
}

#[test]
fn test_query_vector_must_match_dimension() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float32, 3);
    let ops = books.operations().unwrap();

    let err = ops.search(&SearchQuery::new(vec![1.0, 0.0])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Operations);
}

#[test]
fn test_filter_conditions_are_anded() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float32, 2);
    let ops = books.operations().unwrap();

    ops.insert_many(&[
        Entry::new(1, "old english", vec![1.0, 0.0])
            .with_metadata(metadata(json!({"lang": "en", "year": 1990}))),
        Entry::new(2, "new english", vec![0.9, 0.1])
            .with_metadata(metadata(json!({"lang": "en", "year": 2020}))),
        Entry::new(3, "new french", vec![1.0, 0.0])
            .with_metadata(metadata(json!({"lang": "fr", "year": 2021}))),
        Entry::new(4, "no metadata", vec![1.0, 0.0]),
    ])
    .unwrap();

    let filter = Filter::from_json(&json!({
        "lang": {"$eq": "en"},
        "year": {"$gte": 2000}
    }))
    .unwrap();
    let hits = ops
        .search(
            &SearchQuery::new(vec![1.0, 0.0])
                .with_top_k(3)
                .with_filter(filter),
        )
        .unwrap();
    assert_eq!(indices(&hits), vec![Some(2), None, None]);

    // $in expects an array field in metadata; scalar "lang" fails the type check
    let filter = Filter::from_json(&json!({"lang": {"$in": "fr"}})).unwrap();
    let err = ops
        .search(&SearchQuery::new(vec![1.0, 0.0]).with_filter(filter))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[test]
fn test_array_membership_filter() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float32, 2);
    let ops = books.operations().unwrap();

    ops.insert_many(&[
        Entry::new(1, "a", vec![1.0, 0.0])
            .with_metadata(metadata(json!({"tags": ["rust", "db"]}))),
        Entry::new(2, "b", vec![1.0, 0.0])
            .with_metadata(metadata(json!({"tags": ["python"]}))),
        Entry::new(3, "c", vec![1.0, 0.0]).with_metadata(metadata(json!({"tags": []}))),
    ])
    .unwrap();

    let only = |filter: serde_json::Value| {
        let filter = Filter::from_json(&filter).unwrap();
        let hits = ops
            .search(&SearchQuery::new(vec![1.0, 0.0]).with_top_k(3).with_filter(filter))
            .unwrap();
        let mut found: Vec<i64> = indices(&hits).into_iter().flatten().collect();
        found.sort();
        found
    };

    assert_eq!(only(json!({"tags": {"$in": "rust"}})), vec![1]);
    assert_eq!(only(json!({"tags": {"$nin": "rust"}})), vec![2, 3]);
}

#[test]
fn test_unknown_operator_is_rejected() {
    let err = Filter::from_json(&json!({"lang": {"$like": "en"}})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[test]
fn test_hamming_on_binarized_vectors() {
    let harness = TestHarness::new();
    let (_db, bits) = harness.collection("library", "bits", ElementType::Uint8, 4);
    let ops = bits.operations().unwrap();

    ops.insert_many(&[
        Entry::new(1, "same", binarize(&[0.5, -0.2, 0.1, -0.9])),
        Entry::new(2, "one off", binarize(&[0.5, 0.2, 0.1, -0.9])),
        Entry::new(3, "opposite", binarize(&[-0.5, 0.2, -0.1, 0.9])),
    ])
    .unwrap();

    let query = binarize(&[0.7, -0.1, 0.3, -0.4]);
    let hits = ops
        .search(
            &SearchQuery::new(query.clone())
                .with_metric(Metric::Hamming)
                .with_top_k(3),
        )
        .unwrap();
    assert_eq!(indices(&hits), vec![Some(1), Some(2), Some(3)]);
    let distances: Vec<f64> = hits.iter().map(|h| h.distance).collect();
    assert_eq!(distances, vec![0.0, 1.0, 4.0]);

    let hits = ops
        .search(
            &SearchQuery::new(query)
                .with_metric(Metric::NormHamming)
                .with_top_k(1),
        )
        .unwrap();
    assert_eq!(hits[0].distance, 0.0);
}

#[test]
fn test_search_matches_brute_force() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float32, 16);
    let ops = books.operations().unwrap();

    let entries = random_entries(0, 200, 16);
    ops.insert_many(&entries).unwrap();
    let query = random_entries(1000, 1, 16).remove(0).vector;

    for metric in [Metric::Cosine, Metric::L2] {
        let mut expected: Vec<f64> = entries
            .iter()
            .map(|e| distance(metric, &query, &e.vector))
            .collect();
        expected.sort_by(|a, b| a.total_cmp(b));
        expected.truncate(10);

        let hits = ops
            .search(
                &SearchQuery::new(query.clone())
                    .with_metric(metric)
                    .with_top_k(10),
            )
            .unwrap();
        let got: Vec<f64> = hits.iter().map(|h| h.distance).collect();
        assert_eq!(got, expected, "metric {}", metric);
    }
}

#[test]
fn test_missing_field_excludes_entry() {
    let harness = TestHarness::new();
    let (_db, books) = harness.collection("library", "books", ElementType::Float32, 2);
    let ops = books.operations().unwrap();

    ops.insert(&Entry::new(0, "a only", vec![1.0, 0.0]).with_metadata(metadata(json!({"a": 1}))))
        .unwrap();

    let filter = Filter::from_json(&json!({"a": {"$eq": 1}, "b": {"$eq": 2}})).unwrap();
    let hits = ops
        .search(&SearchQuery::new(vec![1.0, 0.0]).with_top_k(1).with_filter(filter))
        .unwrap();
    assert!(hits[0].is_sentinel());

    let filter = Filter::from_json(&json!({"a": {"$eq": 1.0}})).unwrap();
    let hits = ops
        .search(&SearchQuery::new(vec![1.0, 0.0]).with_top_k(1).with_filter(filter))
        .unwrap();
    assert_eq!(indices(&hits), vec![Some(0)]);
}
