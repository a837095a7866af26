//! Neighbor computation and persisted similarity edges.

use embed_to_sqlite::commands::{SimilarMode, SimilarOptions, run_similar};
use embed_to_sqlite::storage::open_database;
use embed_to_sqlite::{EdgeStore, EmbedError, SelfPairs, VectorEntry, VectorStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn seeded_db(temp: &TempDir) -> PathBuf {
    let db = temp.path().join("embeddings.db");
    let conn = open_database(&db).unwrap();
    let mut store = VectorStore::open(&conn, "embeddings").unwrap();
    store
        .upsert_many(&[
            VectorEntry::new("1", vec![1.0, 0.0]),
            VectorEntry::new("2", vec![0.9, 0.1]),
            VectorEntry::new("3", vec![0.0, 1.0]),
            VectorEntry::new("4", vec![0.1, 0.9]),
        ])
        .unwrap();
    db
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn edge_targets(db: &Path, source: &str) -> Vec<String> {
    let conn = open_database(db).unwrap();
    let edges = EdgeStore::open_existing(&conn, "similarities").unwrap();
    edges
        .edges_for(source)
        .unwrap()
        .into_iter()
        .map(|e| e.target_id)
        .collect()
}

#[test]
fn test_similar_for_ids_excludes_self_by_default() {
    let temp = TempDir::new().unwrap();
    let db = seeded_db(&temp);

    let mut options = SimilarOptions::new(&db, SimilarMode::Ids(ids(&["1"])));
    options.count = 2;
    let outcome = run_similar(&options).unwrap();

    assert_eq!(outcome.saved_edges, None);
    assert_eq!(outcome.results.len(), 1);
    let neighbors: Vec<&str> = outcome.results[0]
        .neighbors
        .iter()
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(neighbors, vec!["2", "4"]);
}

#[test]
fn test_similar_can_include_self() {
    let temp = TempDir::new().unwrap();
    let db = seeded_db(&temp);

    let mut options = SimilarOptions::new(&db, SimilarMode::Ids(ids(&["3"])));
    options.count = 1;
    options.self_pairs = SelfPairs::Include;
    let outcome = run_similar(&options).unwrap();

    assert_eq!(outcome.results[0].neighbors[0].id, "3");
    assert!((outcome.results[0].neighbors[0].score - 1.0).abs() < 1e-6);
}

#[test]
fn test_unknown_id_names_table() {
    let temp = TempDir::new().unwrap();
    let db = seeded_db(&temp);

    let options = SimilarOptions::new(&db, SimilarMode::Ids(ids(&["1", "missing"])));
    let err = run_similar(&options).unwrap_err();

    match err {
        EmbedError::UnknownId { id, table } => {
            assert_eq!(id, "missing");
            assert_eq!(table, "embeddings");
        }
        other => panic!("expected unknown id, got {other:?}"),
    }
}

#[test]
fn test_empty_id_list_is_rejected() {
    let temp = TempDir::new().unwrap();
    let db = seeded_db(&temp);

    let err = run_similar(&SimilarOptions::new(&db, SimilarMode::Ids(Vec::new()))).unwrap_err();
    assert!(matches!(err, EmbedError::Config { .. }));
}

#[test]
fn test_all_pairs_saved_as_edges() {
    let temp = TempDir::new().unwrap();
    let db = seeded_db(&temp);

    let mut options = SimilarOptions::new(&db, SimilarMode::All);
    options.count = 2;
    options.save = true;
    let outcome = run_similar(&options).unwrap();

    assert_eq!(outcome.results.len(), 4);
    assert_eq!(outcome.saved_edges, Some(8));
    assert_eq!(edge_targets(&db, "1"), vec!["2", "4"]);
    assert_eq!(edge_targets(&db, "3"), vec!["4", "2"]);
}

#[test]
fn test_incremental_save_leaves_other_sources_untouched() {
    let temp = TempDir::new().unwrap();
    let db = seeded_db(&temp);

    let mut all = SimilarOptions::new(&db, SimilarMode::All);
    all.count = 1;
    all.save = true;
    run_similar(&all).unwrap();
    assert_eq!(edge_targets(&db, "3"), vec!["4"]);

    // Move "1" next to "3" and refresh only "1"
    {
        let conn = open_database(&db).unwrap();
        let mut store = VectorStore::open(&conn, "embeddings").unwrap();
        store.upsert(&VectorEntry::new("1", vec![0.0, 1.0])).unwrap();
    }
    let mut one = SimilarOptions::new(&db, SimilarMode::Ids(ids(&["1"])));
    one.count = 1;
    one.save = true;
    let outcome = run_similar(&one).unwrap();

    assert_eq!(outcome.saved_edges, Some(1));
    assert_eq!(edge_targets(&db, "1"), vec!["3"]);
    // "3" was not part of this run, so its stale edge stays
    assert_eq!(edge_targets(&db, "3"), vec!["4"]);
    assert_eq!(edge_targets(&db, "2"), vec!["1"]);
}

#[test]
fn test_recalculate_for_matches_refreshes_neighbors() {
    let temp = TempDir::new().unwrap();
    let db = seeded_db(&temp);

    let mut options = SimilarOptions::new(&db, SimilarMode::RecalculateForMatches(ids(&["1"])));
    options.count = 1;
    options.save = true;
    let outcome = run_similar(&options).unwrap();

    let sources: Vec<&str> = outcome
        .results
        .iter()
        .map(|r| r.source_id.as_str())
        .collect();
    assert_eq!(sources, vec!["1", "2"]);
    assert_eq!(edge_targets(&db, "2"), vec!["1"]);
    assert!(edge_targets(&db, "3").is_empty());
}
