use thiserror::Error;

use crate::vector::VectorError;

/// Errors raised by the SQLite-backed vector and edge tables.
///
/// Every variant that concerns stored data names the table, and the id when
/// one is involved, so the offending row can be found and fixed.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(
        "Table '{table}' already exists with columns ({}) but ({}) was expected\nSuggestion: Choose another table name with --table or drop the existing table",
        .found.join(", "),
        .expected.join(", ")
    )]
    SchemaConflict {
        table: String,
        found: Vec<String>,
        expected: Vec<String>,
    },

    #[error("Table '{table}' does not exist\nSuggestion: Run the embeddings command first or check --table")]
    TableNotFound { table: String },

    #[error("Stored vector for id '{id}' in table '{table}' is unreadable: {source}")]
    MalformedEntry {
        table: String,
        id: String,
        source: VectorError,
    },

    #[error(
        "Vector for id '{id}' has dimension {actual} but table '{table}' stores dimension {expected}\nSuggestion: Use a separate table for each embedding model"
    )]
    DimensionMismatch {
        table: String,
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to attach database '{path}' as '{alias}': {source}")]
    Attach {
        alias: String,
        path: String,
        source: rusqlite::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;
