//! Blocking client for OpenAI-compatible embedding endpoints.

use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider::{Embeddings, EmbeddingProvider, ProviderError};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "text-embedding-ada-002";

/// Embeddings client that sends one POST per batch.
///
/// Requests answered with 429 or a 5xx status, and transport failures, are
/// retried with exponential backoff up to `max_retries` times.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    model: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl OpenAiProvider {
    /// Builds a client for `{api_base}/embeddings` authenticated with `token`.
    pub fn new(
        token: &str,
        api_base: &str,
        model: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|_| {
            ProviderError::Transport {
                message: "API token contains characters not allowed in an HTTP header".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Transport {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", api_base.trim_end_matches('/')),
            model: model.to_string(),
            max_retries,
            backoff_base: Duration::from_millis(500),
        })
    }

    /// Overrides the first retry delay; later retries double it.
    #[must_use]
    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn retry_backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * (1u32 << attempt.min(5))
    }

    fn decode(response: reqwest::blocking::Response, expected: usize) -> Result<Embeddings, ProviderError> {
        let mut parsed: EmbeddingResponse =
            response
                .json()
                .map_err(|e| ProviderError::InvalidResponse {
                    reason: e.to_string(),
                })?;

        if parsed.data.len() != expected {
            return Err(ProviderError::Protocol {
                expected,
                actual: parsed.data.len(),
            });
        }
        check_indices(&parsed.data)?;

        // Entries without an index keep response order
        parsed.data.sort_by_key(|entry| entry.index);

        Ok(Embeddings {
            vectors: parsed.data.into_iter().map(|entry| entry.embedding).collect(),
            total_tokens: parsed.usage.map(|u| u.total_tokens).unwrap_or_default(),
        })
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn embed(&self, texts: &[&str]) -> Result<Embeddings, ProviderError> {
        if texts.is_empty() {
            return Ok(Embeddings::default());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut attempt = 0u32;
        loop {
            debug!(endpoint = %self.endpoint, inputs = texts.len(), attempt, "embedding request");
            match self.client.post(&self.endpoint).json(&request).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Self::decode(response, texts.len());
                    }

                    let body = response
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if Self::should_retry(status) && attempt < self.max_retries {
                        attempt += 1;
                        warn!(%status, attempt, "embedding request rejected, retrying");
                        thread::sleep(self.retry_backoff(attempt));
                        continue;
                    }
                    return Err(ProviderError::Status {
                        status: status.as_u16(),
                        body: error_message(&body),
                    });
                }
                Err(err) => {
                    if attempt < self.max_retries {
                        attempt += 1;
                        warn!(error = %err, attempt, "embedding request failed, retrying");
                        thread::sleep(self.retry_backoff(attempt));
                        continue;
                    }
                    return Err(ProviderError::Transport {
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Indices, when present, must be a permutation of `0..n`; otherwise
/// vectors cannot be paired with their inputs.
fn check_indices(data: &[EmbeddingData]) -> Result<(), ProviderError> {
    if data.iter().all(|entry| entry.index.is_none()) {
        return Ok(());
    }

    let mut seen = vec![false; data.len()];
    for entry in data {
        match entry.index {
            Some(index) if index < seen.len() && !seen[index] => seen[index] = true,
            other => {
                return Err(ProviderError::InvalidResponse {
                    reason: format!(
                        "embedding index {} is missing, duplicated or out of range for {} input(s)",
                        other.map_or_else(|| "none".to_string(), |i| i.to_string()),
                        data.len()
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Pulls `error.message` out of an OpenAI error body, falling back to the
/// raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error.message)
        .unwrap_or_else(|| body.to_string())
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}
