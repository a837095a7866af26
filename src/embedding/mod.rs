//! Embedding generation: providers and the batch ingestion pipeline.

pub mod openai;
mod pipeline;
mod provider;

pub use openai::{DEFAULT_API_BASE, DEFAULT_MODEL, OpenAiProvider};
pub use pipeline::{
    BatchFailure, BatchSink, BatchSize, DEFAULT_BATCH_SIZE, EmbeddingPipeline, FailurePolicy,
    IngestReport, MAX_BATCH_SIZE,
};
#[cfg(test)]
pub use provider::MockProvider;
pub use provider::{EmbeddingProvider, Embeddings, ProviderError};
