//! Batch embedding pipeline: records in, stored vectors out.
//!
//! Records are grouped into fixed-size batches. Each batch is one provider
//! request and, when it succeeds, one store transaction. Progress is
//! reported after every batch whether or not it succeeded.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::provider::{EmbeddingProvider, ProviderError};
use crate::error::{EmbedError, EmbedResult};
use crate::source::{ContentRecord, Records};
use crate::storage::StoreResult;
use crate::vector::VectorEntry;

/// Largest batch a single request may carry.
pub const MAX_BATCH_SIZE: usize = 2048;

/// Default number of records per request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Number of records sent per provider request, between 1 and 2048.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(usize);

impl BatchSize {
    pub fn new(size: usize) -> EmbedResult<Self> {
        if size == 0 || size > MAX_BATCH_SIZE {
            return Err(EmbedError::config(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {size}"
            )));
        }
        Ok(Self(size))
    }

    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self(DEFAULT_BATCH_SIZE)
    }
}

/// What to do when a provider request for a batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the run at the first failed batch.
    Strict,
    /// Record the failed ids and keep going.
    #[default]
    BestEffort,
}

impl FailurePolicy {
    #[must_use]
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::BestEffort }
    }
}

/// Destination for embedded batches.
pub trait BatchSink {
    /// Whether a vector is already stored for `id`.
    fn contains(&self, id: &str) -> StoreResult<bool>;

    /// Stores one batch atomically.
    fn write_batch(&mut self, entries: &[VectorEntry]) -> StoreResult<()>;
}

/// A batch whose provider request failed under the best-effort policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub ids: Vec<String>,
    pub reason: String,
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Records read from the source, including skipped ones
    pub processed: usize,
    /// Records whose vectors were written
    pub stored: usize,
    /// Records skipped because their id was already stored
    pub skipped: usize,
    /// Provider requests made
    pub batches: usize,
    pub total_tokens: u64,
    pub failures: Vec<BatchFailure>,
}

impl IngestReport {
    /// Every id whose batch failed, in input order.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures
            .iter()
            .flat_map(|f| f.ids.iter().map(String::as_str))
            .collect()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Drives records through a provider into a sink.
pub struct EmbeddingPipeline<'p> {
    provider: &'p dyn EmbeddingProvider,
    batch_size: BatchSize,
    policy: FailurePolicy,
    skip_existing: bool,
}

impl<'p> EmbeddingPipeline<'p> {
    pub fn new(provider: &'p dyn EmbeddingProvider) -> Self {
        Self {
            provider,
            batch_size: BatchSize::default(),
            policy: FailurePolicy::default(),
            skip_existing: false,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: BatchSize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Skip records whose id is already in the sink.
    #[must_use]
    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    /// Embeds and stores every record.
    ///
    /// `progress` receives the number of records processed so far after each
    /// batch. Source errors, store errors and provider protocol errors always
    /// abort the run; batches committed before the error stay committed.
    pub fn run<S>(
        &self,
        records: Records,
        sink: &mut S,
        progress: &mut dyn FnMut(usize),
    ) -> EmbedResult<IngestReport>
    where
        S: BatchSink + ?Sized,
    {
        let size = self.batch_size.get();
        let mut report = IngestReport::default();
        let mut batch: Vec<ContentRecord> = Vec::with_capacity(size);

        for record in records {
            let record = record?;
            report.processed += 1;

            if self.skip_existing && sink.contains(&record.id)? {
                debug!(id = %record.id, "already stored, skipping");
                report.skipped += 1;
                continue;
            }

            batch.push(record);
            if batch.len() == size {
                self.flush(&mut batch, sink, &mut report)?;
                progress(report.processed);
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch, sink, &mut report)?;
            progress(report.processed);
        }

        info!(
            model = self.provider.model(),
            processed = report.processed,
            stored = report.stored,
            skipped = report.skipped,
            failed = report.failed_ids().len(),
            tokens = report.total_tokens,
            "ingestion finished"
        );
        Ok(report)
    }

    fn flush<S>(
        &self,
        batch: &mut Vec<ContentRecord>,
        sink: &mut S,
        report: &mut IngestReport,
    ) -> EmbedResult<()>
    where
        S: BatchSink + ?Sized,
    {
        report.batches += 1;
        let expected = batch.len();
        let texts: Vec<&str> = batch.iter().map(|r| r.text.as_str()).collect();
        debug!(batch = report.batches, size = expected, "requesting embeddings");
        let outcome = self.provider.embed(&texts);

        match outcome {
            Ok(embeddings) => {
                if embeddings.vectors.len() != expected {
                    return Err(ProviderError::Protocol {
                        expected,
                        actual: embeddings.vectors.len(),
                    }
                    .into());
                }

                let entries: Vec<VectorEntry> = batch
                    .drain(..)
                    .zip(embeddings.vectors)
                    .map(|(record, vector)| VectorEntry::new(record.id, vector))
                    .collect();
                sink.write_batch(&entries)?;

                report.stored += entries.len();
                report.total_tokens += embeddings.total_tokens;
                Ok(())
            }
            Err(err) if err.is_protocol() => Err(err.into()),
            Err(err) => {
                let ids: Vec<String> = batch.drain(..).map(|r| r.id).collect();
                match self.policy {
                    FailurePolicy::Strict => Err(EmbedError::BatchFailed { ids, source: err }),
                    FailurePolicy::BestEffort => {
                        warn!(
                            batch = report.batches,
                            first_id = ids.first().map(String::as_str).unwrap_or_default(),
                            count = ids.len(),
                            error = %err,
                            "batch failed, continuing"
                        );
                        report.failures.push(BatchFailure {
                            ids,
                            reason: err.to_string(),
                        });
                        Ok(())
                    }
                }
            }
        }
    }
}
