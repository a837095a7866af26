//! Embedding provider abstraction.

#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

/// Vectors returned for one request, in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Embeddings {
    pub vectors: Vec<Vec<f32>>,
    pub total_tokens: u64,
}

/// Errors from an embedding provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Embedding request failed with HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Embedding request could not be sent: {message}")]
    Transport { message: String },

    #[error("Provider returned {actual} embedding(s) for {expected} input(s)")]
    Protocol { expected: usize, actual: usize },

    #[error("Provider response could not be decoded: {reason}")]
    InvalidResponse { reason: String },
}

impl ProviderError {
    /// Protocol violations abort ingestion under every failure policy; a
    /// provider that miscounts its vectors cannot be paired safely.
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::InvalidResponse { .. })
    }
}

/// Trait for turning texts into embedding vectors.
///
/// Implementations must return exactly one vector per input, in input order.
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch of texts with a single request.
    fn embed(&self, texts: &[&str]) -> Result<Embeddings, ProviderError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Deterministic provider for unit tests.
///
/// Vectors are derived from the text bytes. Individual calls (1-based) can
/// be scripted to fail or to return a short response.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockProvider {
    dimension: usize,
    fail_calls: Vec<usize>,
    short_calls: Vec<usize>,
    calls: AtomicUsize,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_calls.push(call);
        self
    }

    pub fn short_on(mut self, call: usize) -> Self {
        self.short_calls.push(call);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let seed = text
            .bytes()
            .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
        (0..self.dimension)
            .map(|i| ((seed as usize + i * 7) % 97) as f32 / 97.0 + 0.01)
            .collect()
    }
}

#[cfg(test)]
impl EmbeddingProvider for MockProvider {
    fn embed(&self, texts: &[&str]) -> Result<Embeddings, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_calls.contains(&call) {
            return Err(ProviderError::Status {
                status: 500,
                body: format!("scripted failure on call {call}"),
            });
        }

        let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.vector_for(t)).collect();
        if self.short_calls.contains(&call) {
            vectors.pop();
        }
        Ok(Embeddings {
            vectors,
            total_tokens: texts.len() as u64,
        })
    }

    fn model(&self) -> &str {
        "mock"
    }
}
