//! Ingestion and search through the HTTP provider against a mock server.

use embed_to_sqlite::commands::{
    EmbeddingsOptions, IngestInput, SearchOptions, run_embeddings, run_search,
};
use embed_to_sqlite::embedding::DEFAULT_MODEL;
use embed_to_sqlite::source::InputSpec;
use embed_to_sqlite::{BatchSize, EmbedError, FailurePolicy, OpenAiProvider};
use mockito::Matcher;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn provider(server: &mockito::Server) -> OpenAiProvider {
    OpenAiProvider::new(
        "sk-test",
        &server.url(),
        DEFAULT_MODEL,
        Duration::from_secs(5),
        1,
    )
    .unwrap()
    .with_backoff(Duration::from_millis(1))
}

#[test]
fn test_ingest_then_search_over_http() {
    let mut server = mockito::Server::new();
    let ingest = server
        .mock("POST", "/embeddings")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "input": ["This is a test", "This is another test"]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"usage":{"total_tokens":9},"data":[
                {"index":0,"embedding":[1.0,2.0,3.0]},
                {"index":1,"embedding":[3.0,2.0,1.0]}
            ]}"#,
        )
        .expect(1)
        .create();
    let query = server
        .mock("POST", "/embeddings")
        .match_body(Matcher::PartialJson(serde_json::json!({ "input": ["test"] })))
        .with_status(200)
        .with_body(r#"{"usage":{"total_tokens":1},"data":[{"index":0,"embedding":[1.0,2.0,3.0]}]}"#)
        .expect(1)
        .create();

    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    let csv = temp.path().join("content.csv");
    fs::write(&csv, "id,content\n1,This is a test\n2,This is another test\n").unwrap();

    let provider = provider(&server);
    let options = EmbeddingsOptions::new(
        &db,
        IngestInput::File {
            input: InputSpec::from_arg(&csv),
            format: None,
        },
    );
    let report = run_embeddings(&options, &provider, &mut |_| {}).unwrap();
    ingest.assert();
    assert_eq!(report.stored, 2);
    assert_eq!(report.total_tokens, 9);

    let results = run_search(&SearchOptions::new(&db, "test"), &provider).unwrap();
    query.assert();
    assert_eq!(results[0].id, "1");
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert_eq!(results[1].id, "2");
}

#[test]
fn test_rate_limit_exhausts_retries_under_strict_policy() {
    let mut server = mockito::Server::new();
    let limited = server
        .mock("POST", "/embeddings")
        .with_status(429)
        .with_body(r#"{"error":{"message":"Rate limit reached"}}"#)
        .expect(2)
        .create();

    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    let csv = temp.path().join("content.csv");
    fs::write(&csv, "id,content\n1,one\n").unwrap();

    let mut options = EmbeddingsOptions::new(
        &db,
        IngestInput::File {
            input: InputSpec::from_arg(&csv),
            format: None,
        },
    );
    options.batch_size = BatchSize::new(10).unwrap();
    options.policy = FailurePolicy::Strict;

    let err = run_embeddings(&options, &provider(&server), &mut |_| {}).unwrap_err();
    limited.assert();
    assert!(matches!(err, EmbedError::BatchFailed { .. }));
    assert!(err.to_string().contains("Rate limit reached"), "{err}");
}

#[test]
fn test_short_response_aborts_even_best_effort() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_body(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#)
        .create();

    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    let csv = temp.path().join("content.csv");
    fs::write(&csv, "id,content\n1,one\n2,two\n").unwrap();

    let options = EmbeddingsOptions::new(
        &db,
        IngestInput::File {
            input: InputSpec::from_arg(&csv),
            format: None,
        },
    );
    let err = run_embeddings(&options, &provider(&server), &mut |_| {}).unwrap_err();
    assert!(matches!(err, EmbedError::Provider(ref e) if e.is_protocol()));
}

#[test]
fn test_duplicate_indices_abort_without_storing() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_body(r#"{"data":[{"index":0,"embedding":[1.0,0.0]},{"index":0,"embedding":[0.0,1.0]}]}"#)
        .create();

    let temp = TempDir::new().unwrap();
    let db = temp.path().join("embeddings.db");
    let csv = temp.path().join("content.csv");
    fs::write(&csv, "id,content\na,first\nb,second\n").unwrap();

    let options = EmbeddingsOptions::new(
        &db,
        IngestInput::File {
            input: InputSpec::from_arg(&csv),
            format: None,
        },
    );
    let err = run_embeddings(&options, &provider(&server), &mut |_| {}).unwrap_err();
    assert!(matches!(err, EmbedError::Provider(ref e) if e.is_protocol()));

    let conn = rusqlite::Connection::open(&db).unwrap();
    let stored: i64 = conn
        .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, 0);
}
