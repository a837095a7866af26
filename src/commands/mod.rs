//! The CLI workflows as library functions.
//!
//! Each command takes plain option structs and a provider, so the binary
//! stays a thin argument-parsing layer and tests can drive workflows
//! without a network.

pub mod embeddings;
pub mod search;
pub mod similar;

use std::path::Path;

use rusqlite::Connection;

use crate::error::{EmbedError, EmbedResult};
use crate::storage::open_database;

pub use embeddings::{EmbeddingsOptions, IngestInput, run_embeddings};
pub use search::{SearchOptions, run_search};
pub use similar::{SimilarMode, SimilarOptions, SimilarOutcome, run_similar};

/// Opens a database that must already exist; read commands never create one.
fn open_existing_database(path: &Path) -> EmbedResult<Connection> {
    if !path.is_file() {
        return Err(EmbedError::FileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "database file not found"),
        });
    }
    Ok(open_database(path)?)
}
