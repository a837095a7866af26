//! `embeddings`: read records, embed them in batches, store the vectors.

use std::path::PathBuf;

use tracing::debug;

use crate::embedding::{BatchSize, EmbeddingPipeline, EmbeddingProvider, FailurePolicy, IngestReport};
use crate::error::EmbedResult;
use crate::source::{InputFormat, InputSpec, QuerySource, RecordSource, joiner_for, records_from_text};
use crate::storage::{VectorStore, attach_database, open_database};

/// Where ingested records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestInput {
    /// A file or standard input, with an optional explicit format
    File {
        input: InputSpec,
        format: Option<InputFormat>,
    },
    /// An SQL query run against the target database
    Query { sql: String },
}

#[derive(Debug, Clone)]
pub struct EmbeddingsOptions {
    pub db_path: PathBuf,
    pub input: IngestInput,
    /// Databases attached as `(alias, path)` before the query runs
    pub attach: Vec<(String, PathBuf)>,
    pub table: String,
    pub batch_size: BatchSize,
    pub policy: FailurePolicy,
    pub skip_existing: bool,
    pub text_separator: String,
}

impl EmbeddingsOptions {
    pub fn new(db_path: impl Into<PathBuf>, input: IngestInput) -> Self {
        Self {
            db_path: db_path.into(),
            input,
            attach: Vec::new(),
            table: "embeddings".to_string(),
            batch_size: BatchSize::default(),
            policy: FailurePolicy::default(),
            skip_existing: false,
            text_separator: " ".to_string(),
        }
    }
}

/// Runs an ingestion and returns its report.
///
/// Batch failures under the best-effort policy are reported, not returned
/// as errors; callers decide how to surface them.
pub fn run_embeddings(
    options: &EmbeddingsOptions,
    provider: &dyn EmbeddingProvider,
    progress: &mut dyn FnMut(usize),
) -> EmbedResult<IngestReport> {
    let conn = open_database(&options.db_path)?;
    for (alias, path) in &options.attach {
        attach_database(&conn, alias, path)?;
    }

    let mut store = VectorStore::open(&conn, &options.table)?;
    let joiner = joiner_for(&options.text_separator);

    let records = match &options.input {
        IngestInput::File { input, format } => {
            debug!(input = %input.describe(), "reading records");
            let text = input.read_to_string()?;
            records_from_text(text, *format, joiner)?
        }
        IngestInput::Query { sql } => {
            debug!(sql, "running query");
            QuerySource::new(&conn, sql.as_str(), joiner).records()?
        }
    };

    EmbeddingPipeline::new(provider)
        .with_batch_size(options.batch_size)
        .with_policy(options.policy)
        .with_skip_existing(options.skip_existing)
        .run(records, &mut store, progress)
}
