//! End-to-end ingestion from files and SQL queries into a vector table.

use crate::common::StaticProvider;
use embed_to_sqlite::commands::{EmbeddingsOptions, IngestInput, run_embeddings};
use embed_to_sqlite::source::{InputFormat, InputSpec};
use embed_to_sqlite::{BatchSize, EmbedError, FailurePolicy, StoreError};
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// [1.0, 2.0, 3.0] as little-endian f32
const MOCK_EMBEDDING: &[u8] = b"\x00\x00\x80?\x00\x00\x00@\x00\x00@@";

fn file_input(path: &Path, format: Option<InputFormat>) -> IngestInput {
    IngestInput::File {
        input: InputSpec::from_arg(path),
        format,
    }
}

fn stored_rows(db: &Path, table: &str) -> Vec<(String, Vec<u8>)> {
    let conn = Connection::open(db).unwrap();
    let mut stmt = conn
        .prepare(&format!("SELECT id, embedding FROM \"{table}\" ORDER BY id"))
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn test_csv_ingest_one_request_per_row() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    let csv = temp.path().join("content.csv");
    fs::write(&csv, "id,content\n1,This is a test\n2,This is another test\n").unwrap();

    let provider = StaticProvider::new().with_fallback(vec![1.0, 2.0, 3.0]);
    let mut options = EmbeddingsOptions::new(&db, file_input(&csv, None));
    options.batch_size = BatchSize::new(1).unwrap();

    let report = run_embeddings(&options, &provider, &mut |_| {}).unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(
        provider.requests(),
        vec![
            vec!["This is a test".to_string()],
            vec!["This is another test".to_string()]
        ]
    );
    assert_eq!(report.stored, 2);
    assert_eq!(report.batches, 2);
    assert_eq!(report.total_tokens, 8);
    assert_eq!(
        stored_rows(&db, "embeddings"),
        vec![
            ("1".to_string(), MOCK_EMBEDDING.to_vec()),
            ("2".to_string(), MOCK_EMBEDDING.to_vec())
        ]
    );
}

#[test]
fn test_batches_cover_all_records() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    let tsv = temp.path().join("content.tsv");
    let mut body = String::from("id\ttitle\tbody\n");
    for i in 0..7 {
        body.push_str(&format!("{i}\ttitle {i}\tbody {i}\n"));
    }
    fs::write(&tsv, body).unwrap();

    let provider = StaticProvider::new().with_fallback(vec![0.5, 0.5]);
    let mut options = EmbeddingsOptions::new(&db, file_input(&tsv, Some(InputFormat::Tsv)));
    options.batch_size = BatchSize::new(3).unwrap();

    let report = run_embeddings(&options, &provider, &mut |_| {}).unwrap();

    // ceil(7 / 3)
    assert_eq!(provider.calls(), 3);
    let sizes: Vec<usize> = provider.requests().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
    assert_eq!(provider.requests()[0][0], "title 0 body 0");
    assert_eq!(report.stored, 7);
    assert_eq!(stored_rows(&db, "embeddings").len(), 7);
}

#[test]
fn test_json_ingest_with_custom_separator_and_table() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    let json = temp.path().join("items.json");
    fs::write(
        &json,
        r#"[{"id": "a", "title": "Hello", "n": 3}, {"id": "b", "title": "World", "n": null}]"#,
    )
    .unwrap();

    let provider = StaticProvider::new().with_fallback(vec![1.0, 0.0]);
    let mut options = EmbeddingsOptions::new(&db, file_input(&json, None));
    options.table = "items".to_string();
    options.text_separator = " | ".to_string();

    run_embeddings(&options, &provider, &mut |_| {}).unwrap();

    assert_eq!(
        provider.requests(),
        vec![vec!["Hello | 3".to_string(), "World | ".to_string()]]
    );
    assert_eq!(stored_rows(&db, "items").len(), 2);
}

#[test]
fn test_sql_ingest_from_attached_database() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    let other = temp.path().join("content.db");
    {
        let conn = Connection::open(&other).unwrap();
        conn.execute_batch(
            "CREATE TABLE content (id INTEGER PRIMARY KEY, title TEXT, body TEXT);
             INSERT INTO content VALUES (1, 'First', 'one');
             INSERT INTO content VALUES (2, 'Second', 'two');",
        )
        .unwrap();
    }

    let provider = StaticProvider::new().with_fallback(vec![1.0, 2.0, 3.0]);
    let mut options = EmbeddingsOptions::new(
        &db,
        IngestInput::Query {
            sql: "select id, title, body from other.content order by id".to_string(),
        },
    );
    options.attach = vec![("other".to_string(), other.clone())];
    options.table = "content_embeddings".to_string();

    let report = run_embeddings(&options, &provider, &mut |_| {}).unwrap();

    assert_eq!(report.stored, 2);
    assert_eq!(
        provider.requests(),
        vec![vec!["First one".to_string(), "Second two".to_string()]]
    );
    let rows = stored_rows(&db, "content_embeddings");
    assert_eq!(rows[0], ("1".to_string(), MOCK_EMBEDDING.to_vec()));
    assert_eq!(rows[1].0, "2");
}

#[test]
fn test_skip_existing_does_not_re_embed() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    let csv = temp.path().join("content.csv");
    fs::write(&csv, "id,content\n1,one\n2,two\n").unwrap();

    let provider = StaticProvider::new().with_fallback(vec![1.0, 1.0]);
    let options = EmbeddingsOptions::new(&db, file_input(&csv, None));
    run_embeddings(&options, &provider, &mut |_| {}).unwrap();

    fs::write(&csv, "id,content\n1,one\n2,two\n3,three\n").unwrap();
    let mut options = EmbeddingsOptions::new(&db, file_input(&csv, None));
    options.skip_existing = true;
    let report = run_embeddings(&options, &provider, &mut |_| {}).unwrap();

    assert_eq!(report.skipped, 2);
    assert_eq!(report.stored, 1);
    assert_eq!(provider.requests().last().unwrap(), &vec!["three".to_string()]);
    assert_eq!(stored_rows(&db, "embeddings").len(), 3);
}

#[test]
fn test_best_effort_reports_failed_batch_and_keeps_others() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    let csv = temp.path().join("content.csv");
    fs::write(&csv, "id,content\n1,known\n2,unknown\n3,known\n").unwrap();

    // No fallback: "unknown" is rejected by the provider
    let provider = StaticProvider::new().with("known", vec![1.0, 0.0]);
    let mut options = EmbeddingsOptions::new(&db, file_input(&csv, None));
    options.batch_size = BatchSize::new(1).unwrap();

    let report = run_embeddings(&options, &provider, &mut |_| {}).unwrap();

    assert_eq!(report.stored, 2);
    assert_eq!(report.failed_ids(), vec!["2"]);
    let ids: Vec<String> = stored_rows(&db, "embeddings")
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[test]
fn test_strict_aborts_after_committed_batches() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    let csv = temp.path().join("content.csv");
    fs::write(&csv, "id,content\n1,known\n2,unknown\n3,known\n").unwrap();

    let provider = StaticProvider::new().with("known", vec![1.0, 0.0]);
    let mut options = EmbeddingsOptions::new(&db, file_input(&csv, None));
    options.batch_size = BatchSize::new(1).unwrap();
    options.policy = FailurePolicy::Strict;

    let err = run_embeddings(&options, &provider, &mut |_| {}).unwrap_err();

    assert!(matches!(err, EmbedError::BatchFailed { ref ids, .. } if ids == &["2".to_string()]));
    assert_eq!(provider.calls(), 2);
    assert_eq!(stored_rows(&db, "embeddings").len(), 1);
}

#[test]
fn test_existing_table_with_wrong_columns_is_rejected() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    {
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch("CREATE TABLE embeddings (id TEXT PRIMARY KEY, embedding BLOB, extra TEXT)")
            .unwrap();
    }
    let csv = temp.path().join("content.csv");
    fs::write(&csv, "id,content\n1,one\n").unwrap();

    let provider = StaticProvider::new().with_fallback(vec![1.0]);
    let options = EmbeddingsOptions::new(&db, file_input(&csv, None));
    let err = run_embeddings(&options, &provider, &mut |_| {}).unwrap_err();

    match err {
        EmbedError::Store(StoreError::SchemaConflict { table, found, .. }) => {
            assert_eq!(table, "embeddings");
            assert_eq!(found, vec!["id", "embedding", "extra"]);
        }
        other => panic!("expected schema conflict, got {other:?}"),
    }
    assert_eq!(provider.calls(), 0);
}

#[test]
fn test_ragged_csv_names_the_row() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    let csv = temp.path().join("content.csv");
    fs::write(&csv, "id,content\n1,one\n2,two,three\n").unwrap();

    let provider = StaticProvider::new().with_fallback(vec![1.0]);
    let options = EmbeddingsOptions::new(&db, file_input(&csv, Some(InputFormat::Csv)));
    let err = run_embeddings(&options, &provider, &mut |_| {}).unwrap_err();

    assert!(err.to_string().contains("Row 2"), "{err}");
}
