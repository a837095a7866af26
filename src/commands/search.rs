//! `search`: embed a query string and rank every stored vector against it.

use std::path::PathBuf;

use crate::embedding::{EmbeddingProvider, ProviderError};
use crate::error::{EmbedError, EmbedResult};
use crate::similarity::{Corpus, DEFAULT_RESULT_COUNT, ScoredId, SimilarityEngine};
use crate::storage::VectorStore;

use super::open_existing_database;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub db_path: PathBuf,
    pub query: String,
    pub table: String,
    pub count: usize,
}

impl SearchOptions {
    pub fn new(db_path: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            query: query.into(),
            table: "embeddings".to_string(),
            count: DEFAULT_RESULT_COUNT,
        }
    }
}

/// Returns the best matches for the query, highest score first.
///
/// The table is checked before the provider is called, and an empty table
/// returns no results without a request.
pub fn run_search(
    options: &SearchOptions,
    provider: &dyn EmbeddingProvider,
) -> EmbedResult<Vec<ScoredId>> {
    let conn = open_existing_database(&options.db_path)?;
    let store = VectorStore::open_existing(&conn, &options.table)?;
    let corpus = Corpus::new(store.scan()?)?;
    if corpus.is_empty() {
        return Ok(Vec::new());
    }

    let embeddings = provider.embed(&[options.query.as_str()])?;
    if embeddings.vectors.len() != 1 {
        return Err(ProviderError::Protocol {
            expected: 1,
            actual: embeddings.vectors.len(),
        }
        .into());
    }

    SimilarityEngine::new(&corpus)
        .with_count(options.count)
        .search(&embeddings.vectors[0])
        .map_err(|e| EmbedError::from_similarity(e, &options.table))
}
