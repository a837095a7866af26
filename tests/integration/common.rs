//! Shared helpers for integration tests.

use embed_to_sqlite::embedding::{EmbeddingProvider, Embeddings, ProviderError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provider backed by a fixed text → vector table.
///
/// Texts missing from the table fail the whole request with a 400 status,
/// the same way a remote provider rejects an invalid input. Every request is
/// recorded so callers can inspect how inputs were batched.
#[derive(Debug, Default)]
pub struct StaticProvider {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Option<Vec<f32>>,
    requests: Mutex<Vec<Vec<String>>>,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the vector returned for `text`.
    pub fn with(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    /// Vector returned for any text not in the table.
    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = Some(vector);
        self
    }

    /// Number of `embed` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts of every request so far, one entry per call.
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl EmbeddingProvider for StaticProvider {
    fn embed(&self, texts: &[&str]) -> Result<Embeddings, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(texts.iter().map(|t| (*t).to_string()).collect());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            match self.vectors.get(*text).or(self.fallback.as_ref()) {
                Some(vector) => vectors.push(vector.clone()),
                None => {
                    return Err(ProviderError::Status {
                        status: 400,
                        body: format!("no embedding configured for '{text}'"),
                    });
                }
            }
        }

        let total_tokens = texts
            .iter()
            .map(|t| t.split_whitespace().count() as u64)
            .sum();
        Ok(Embeddings {
            vectors,
            total_tokens,
        })
    }

    fn model(&self) -> &str {
        "static"
    }
}

#[test]
fn test_static_provider_lookup() {
    let provider = StaticProvider::new()
        .with("hello world", vec![1.0, 0.0])
        .with("bye", vec![0.0, 1.0]);

    let result = provider.embed(&["bye", "hello world"]).unwrap();
    assert_eq!(result.vectors, vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
    assert_eq!(result.total_tokens, 3);
    assert_eq!(provider.calls(), 1);
    assert_eq!(
        provider.requests(),
        vec![vec!["bye".to_string(), "hello world".to_string()]]
    );
}

#[test]
fn test_static_provider_unknown_text() {
    let provider = StaticProvider::new().with("a", vec![1.0]);
    assert!(matches!(
        provider.embed(&["a", "b"]),
        Err(ProviderError::Status { status: 400, .. })
    ));

    let provider = provider.with_fallback(vec![0.5]);
    assert_eq!(provider.embed(&["b"]).unwrap().vectors, vec![vec![0.5]]);
}
