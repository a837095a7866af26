//! Query search against a stored vector table.

use crate::common::StaticProvider;
use embed_to_sqlite::commands::{SearchOptions, run_search};
use embed_to_sqlite::storage::open_database;
use embed_to_sqlite::{EmbedError, StoreError, VectorEntry, VectorStore};
use std::path::Path;
use tempfile::TempDir;

fn seed(db: &Path, table: &str, entries: &[(&str, Vec<f32>)]) {
    let conn = open_database(db).unwrap();
    let mut store = VectorStore::open(&conn, table).unwrap();
    let entries: Vec<VectorEntry> = entries
        .iter()
        .map(|(id, v)| VectorEntry::new(*id, v.clone()))
        .collect();
    store.upsert_many(&entries).unwrap();
}

#[test]
fn test_search_ranks_by_cosine() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    seed(
        &db,
        "embeddings",
        &[
            ("1", vec![1.0, 2.0, 3.0]),
            ("2", vec![-1.0, 0.0, 0.5]),
            ("3", vec![1.0, 2.0, 2.5]),
        ],
    );

    let provider = StaticProvider::new().with("hello world", vec![1.0, 2.0, 3.0]);
    let results = run_search(&SearchOptions::new(&db, "hello world"), &provider).unwrap();

    assert_eq!(provider.calls(), 1);
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3", "2"]);
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert!(results[1].score > results[2].score);
}

#[test]
fn test_search_respects_count_and_table() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    seed(
        &db,
        "docs",
        &[
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.7, 0.7]),
            ("c", vec![0.0, 1.0]),
        ],
    );

    let provider = StaticProvider::new().with_fallback(vec![1.0, 0.1]);
    let mut options = SearchOptions::new(&db, "query");
    options.table = "docs".to_string();
    options.count = 2;

    let results = run_search(&options, &provider).unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn test_empty_table_returns_nothing_without_request() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    seed(&db, "embeddings", &[]);

    let provider = StaticProvider::new().with_fallback(vec![1.0]);
    let results = run_search(&SearchOptions::new(&db, "anything"), &provider).unwrap();

    assert!(results.is_empty());
    assert_eq!(provider.calls(), 0);
}

#[test]
fn test_missing_table_fails_before_request() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    seed(&db, "embeddings", &[("1", vec![1.0])]);

    let provider = StaticProvider::new().with_fallback(vec![1.0]);
    let mut options = SearchOptions::new(&db, "anything");
    options.table = "nope".to_string();

    let err = run_search(&options, &provider).unwrap_err();
    assert!(matches!(err, EmbedError::Store(StoreError::TableNotFound { .. })));
    assert_eq!(provider.calls(), 0);
}

#[test]
fn test_missing_database_is_not_created() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("missing.db");

    let provider = StaticProvider::new().with_fallback(vec![1.0]);
    let err = run_search(&SearchOptions::new(&db, "anything"), &provider).unwrap_err();

    assert!(matches!(err, EmbedError::FileRead { .. }));
    assert!(!db.exists());
}

#[test]
fn test_query_dimension_mismatch_is_an_error() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    seed(&db, "embeddings", &[("1", vec![1.0, 0.0, 0.0])]);

    let provider = StaticProvider::new().with_fallback(vec![1.0, 0.0]);
    let err = run_search(&SearchOptions::new(&db, "q"), &provider).unwrap_err();

    assert!(err.to_string().contains("dimension mismatch"), "{err}");
}
