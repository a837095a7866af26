//! Error types for the embedding store
//!
//! Each module has its own `thiserror` enum; `EmbedError` wraps them for the
//! command layer and adds stable status codes and recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

use crate::embedding::ProviderError;
use crate::similarity::SimilarityError;
use crate::source::SourceError;
use crate::storage::StoreError;
use crate::vector::VectorError;

/// Main error type for command workflows
#[derive(Error, Debug)]
pub enum EmbedError {
    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// Input errors
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Provider errors outside of batch ingestion
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A batch failed under the strict policy
    #[error(
        "Embedding request failed for a batch of {} record(s) starting at id '{}': {source}",
        .ids.len(),
        .ids.first().map(String::as_str).unwrap_or_default()
    )]
    BatchFailed {
        ids: Vec<String>,
        source: ProviderError,
    },

    /// Storage errors
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Vector(#[from] VectorError),

    /// Lookup errors
    #[error("Id '{id}' not found in table '{table}'")]
    UnknownId { id: String, table: String },

    /// File system errors
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl EmbedError {
    /// Shorthand for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Converts a similarity error, attaching the table the ids were looked
    /// up in.
    pub fn from_similarity(error: SimilarityError, table: &str) -> Self {
        match error {
            SimilarityError::UnknownId { id } => Self::UnknownId {
                id,
                table: table.to_string(),
            },
            SimilarityError::Vector(e) => Self::Vector(e),
        }
    }

    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Source(e) => match e {
                SourceError::Format { .. } => "FORMAT_ERROR",
                SourceError::Schema { .. } => "SCHEMA_ERROR",
                SourceError::Query { .. } => "QUERY_ERROR",
                SourceError::Json { .. } | SourceError::Csv { .. } => "INPUT_PARSE_ERROR",
                SourceError::Encoding { .. } => "INPUT_ENCODING_ERROR",
                SourceError::Read { .. } => "INPUT_READ_ERROR",
            },
            Self::Provider(e) => match e {
                ProviderError::Protocol { .. } | ProviderError::InvalidResponse { .. } => {
                    "PROVIDER_PROTOCOL_ERROR"
                }
                ProviderError::Status { .. } => "PROVIDER_STATUS_ERROR",
                ProviderError::Transport { .. } => "PROVIDER_TRANSPORT_ERROR",
            },
            Self::BatchFailed { .. } => "BATCH_FAILED",
            Self::Store(e) => match e {
                StoreError::SchemaConflict { .. } => "SCHEMA_CONFLICT",
                StoreError::TableNotFound { .. } => "TABLE_NOT_FOUND",
                StoreError::MalformedEntry { .. } => "MALFORMED_ENTRY",
                StoreError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
                StoreError::Attach { .. } => "ATTACH_ERROR",
                StoreError::Sqlite(_) => "DATABASE_ERROR",
            },
            Self::Vector(_) => "VECTOR_ERROR",
            Self::UnknownId { .. } => "UNKNOWN_ID",
            Self::FileRead { .. } => "FILE_READ_ERROR",
            Self::FileWrite { .. } => "FILE_WRITE_ERROR",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Config { .. } => vec![
                "Run 'embed-to-sqlite config' to see the effective settings",
                "Pass --token or set OPENAI_API_KEY if the API token is missing",
            ],
            Self::Source(SourceError::Format { .. }) => vec![
                "Pass --format csv, tsv, json or nl to skip detection",
                "Check that the input has a header row and a consistent delimiter",
            ],
            Self::Source(SourceError::Schema { .. }) => vec![
                "Every row needs an id column followed by at least one text column",
            ],
            Self::Source(SourceError::Query { .. }) => vec![
                "Check the SQL syntax and the table names",
                "Use --attach ALIAS PATH to query tables in another database",
            ],
            Self::BatchFailed { .. } => vec![
                "Batches committed before the failure are kept; re-run with --skip-existing to resume",
                "Drop --strict to skip failing batches and continue",
            ],
            Self::Provider(ProviderError::Protocol { .. }) => vec![
                "The embedding endpoint returned a different number of vectors than inputs",
                "Check provider.api_base points at an OpenAI-compatible endpoint",
            ],
            Self::Store(StoreError::SchemaConflict { .. }) => vec![
                "Choose another table with --table or --similarity-table",
            ],
            Self::Store(StoreError::TableNotFound { .. }) => vec![
                "Run 'embed-to-sqlite embeddings' first to create the table",
                "Check the --table name",
            ],
            Self::Store(StoreError::DimensionMismatch { .. } | StoreError::MalformedEntry { .. })
            | Self::Vector(_) => vec![
                "Keep vectors from different models in separate tables",
                "Delete the offending rows and embed them again",
            ],
            Self::UnknownId { .. } => vec![
                "Check the id spelling",
                "Embed the record first with 'embed-to-sqlite embeddings'",
            ],
            Self::FileRead { .. } | Self::Source(SourceError::Read { .. }) => vec![
                "Check that the file exists and you have read permissions",
            ],
            _ => vec![],
        }
    }
}

/// Result type alias for command workflows
pub type EmbedResult<T> = Result<T, EmbedError>;
