//! Store text embeddings in SQLite and query them by cosine similarity.
//!
//! Records flow from a [`source`] through the batch [`embedding`] pipeline
//! into a [`storage::VectorStore`]; the [`similarity`] engine reads them back
//! for search and pairwise neighbor computation.

pub mod commands;
pub mod config;
pub mod display;
pub mod embedding;
pub mod error;
pub mod io;
pub mod similarity;
pub mod source;
pub mod storage;
pub mod vector;

// Explicit exports for better API clarity
pub use config::Settings;
pub use embedding::{
    BatchSize, EmbeddingPipeline, EmbeddingProvider, FailurePolicy, IngestReport, OpenAiProvider,
    ProviderError,
};
pub use error::{EmbedError, EmbedResult};
pub use similarity::{Corpus, ScoredId, SelfPairs, SimilarityEngine, cosine_similarity};
pub use source::{ContentRecord, RecordSource, SourceError};
pub use storage::{EdgeStore, StoreError, VectorStore};
pub use vector::{VectorDimension, VectorEntry, VectorError};
