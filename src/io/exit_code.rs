//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success - operation completed
//! - `1`: General error - unspecified failure
//! - `2`: Blocking error - the provider broke its contract; automation should halt
//! - `3-125`: Specific recoverable errors
//! - `126-255`: Reserved by shell

use crate::embedding::ProviderError;
use crate::error::EmbedError;
use crate::source::SourceError;
use crate::storage::StoreError;

/// Standard exit codes for CLI operations.
///
/// These codes follow Unix conventions where 0 indicates success,
/// and non-zero values indicate various error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// Critical error that should halt automation (code 2)
    BlockingError = 2,

    /// Id or table not found (code 3)
    NotFound = 3,

    /// Input could not be read as records (code 4)
    InputError = 4,

    /// File I/O error (code 5)
    IoError = 5,

    /// Configuration error (code 6)
    ConfigError = 6,

    /// Stored data is inconsistent or unreadable (code 7)
    DataCorrupted = 7,

    /// A batch failed under the strict policy (code 9)
    BatchFailed = 9,

    /// Completed, but some batches failed and were skipped (code 10)
    PartialFailure = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl ExitCode {
    /// Convert an `EmbedError` to the appropriate exit code.
    ///
    /// Maps specific error types to semantic exit codes that scripts
    /// can use to determine appropriate recovery actions.
    pub fn from_error(error: &EmbedError) -> Self {
        match error {
            EmbedError::Config { .. } => ExitCode::ConfigError,

            EmbedError::Source(SourceError::Read { .. }) => ExitCode::IoError,
            EmbedError::Source(_) => ExitCode::InputError,

            // A provider that miscounts its vectors is a blocking error
            EmbedError::Provider(e) if e.is_protocol() => ExitCode::BlockingError,
            EmbedError::Provider(ProviderError::Status { .. } | ProviderError::Transport { .. }) => {
                ExitCode::GeneralError
            }
            EmbedError::Provider(_) => ExitCode::BlockingError,

            EmbedError::BatchFailed { .. } => ExitCode::BatchFailed,

            EmbedError::Store(
                StoreError::SchemaConflict { .. }
                | StoreError::MalformedEntry { .. }
                | StoreError::DimensionMismatch { .. },
            )
            | EmbedError::Vector(_) => ExitCode::DataCorrupted,
            EmbedError::Store(StoreError::TableNotFound { .. }) | EmbedError::UnknownId { .. } => {
                ExitCode::NotFound
            }
            EmbedError::Store(StoreError::Attach { .. })
            | EmbedError::FileRead { .. }
            | EmbedError::FileWrite { .. } => ExitCode::IoError,

            // Everything else is a general error
            EmbedError::Store(StoreError::Sqlite(_)) => ExitCode::GeneralError,
        }
    }

    /// Check if this exit code indicates a blocking error.
    ///
    /// Blocking errors should halt automation pipelines.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, ExitCode::BlockingError)
    }

    /// Check if this exit code indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Get a human-readable description of the exit code.
    pub fn description(&self) -> &str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::BlockingError => "Blocking error - automation should halt",
            ExitCode::NotFound => "Not found",
            ExitCode::InputError => "Input error",
            ExitCode::IoError => "I/O error",
            ExitCode::ConfigError => "Configuration error",
            ExitCode::DataCorrupted => "Stored data corrupted",
            ExitCode::BatchFailed => "Embedding batch failed",
            ExitCode::PartialFailure => "Completed with failed batches",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::VectorError;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success as u8, 0);
        assert_eq!(ExitCode::GeneralError as u8, 1);
        assert_eq!(ExitCode::BlockingError as u8, 2);
        assert_eq!(ExitCode::NotFound as u8, 3);
        assert_eq!(ExitCode::BatchFailed as u8, 9);
        assert_eq!(ExitCode::PartialFailure as u8, 10);
    }

    #[test]
    fn test_from_error() {
        assert_eq!(
            ExitCode::from_error(&EmbedError::config("x")),
            ExitCode::ConfigError
        );
        assert_eq!(
            ExitCode::from_error(&SourceError::Format { reason: "x".into() }.into()),
            ExitCode::InputError
        );
        assert_eq!(
            ExitCode::from_error(
                &ProviderError::Protocol {
                    expected: 2,
                    actual: 1
                }
                .into()
            ),
            ExitCode::BlockingError
        );
        assert_eq!(
            ExitCode::from_error(&EmbedError::BatchFailed {
                ids: vec!["1".into()],
                source: ProviderError::Status {
                    status: 500,
                    body: String::new()
                }
            }),
            ExitCode::BatchFailed
        );
        assert_eq!(
            ExitCode::from_error(
                &StoreError::SchemaConflict {
                    table: "t".into(),
                    found: vec![],
                    expected: vec![]
                }
                .into()
            ),
            ExitCode::DataCorrupted
        );
        assert_eq!(
            ExitCode::from_error(&VectorError::MalformedBlob { len: 3 }.into()),
            ExitCode::DataCorrupted
        );
        assert_eq!(
            ExitCode::from_error(&EmbedError::UnknownId {
                id: "a".into(),
                table: "t".into()
            }),
            ExitCode::NotFound
        );
    }

    #[test]
    fn test_is_success() {
        assert!(ExitCode::Success.is_success());
        assert!(!ExitCode::PartialFailure.is_success());
        assert!(!ExitCode::GeneralError.is_success());
    }

    #[test]
    fn test_is_blocking() {
        assert!(ExitCode::BlockingError.is_blocking());
        assert!(!ExitCode::Success.is_blocking());
        assert!(!ExitCode::NotFound.is_blocking());
    }
}
