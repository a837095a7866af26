//! Record sources: turning tabular, structured or query input into
//! `(id, text)` records for embedding.
//!
//! Every source follows the same convention: the first field of a row is the
//! id and the remaining fields, in order, are joined into the text that gets
//! embedded.

mod delimited;
mod json;
mod query;
pub mod sniff;
mod text;

use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use delimited::{Delimiter, DelimitedSource};
pub use json::JsonSource;
pub use query::QuerySource;
pub use sniff::{InputFormat, detect_format};
pub use text::{SeparatorJoiner, SpaceJoiner, TextJoiner, joiner_for};

/// One input row ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub id: String,
    pub text: String,
}

impl ContentRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Lazy, single-pass sequence of records.
pub type Records = Box<dyn Iterator<Item = SourceResult<ContentRecord>>>;

/// Anything that can produce content records.
pub trait RecordSource {
    /// Consumes the source and yields its records once.
    fn records(self) -> SourceResult<Records>;
}

/// Errors raised while reading input records.
///
/// Row numbers are 1-based and count data rows, not header lines.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(
        "Could not detect input format: {reason}\nSuggestion: Pass --format csv|tsv|json|nl explicitly"
    )]
    Format { reason: String },

    #[error("Row {row}: {reason}")]
    Schema { row: usize, reason: String },

    #[error("Query failed: {query}\nCause: {source}")]
    Query {
        query: String,
        source: rusqlite::Error,
    },

    #[error(
        "Invalid JSON{}: {source}",
        .row.map(|row| format!(" in row {row}")).unwrap_or_default()
    )]
    Json {
        row: Option<usize>,
        source: serde_json::Error,
    },

    #[error("Invalid delimited data at row {row}: {source}")]
    Csv { row: usize, source: csv::Error },

    #[error("Failed to read input from {origin}: {source}")]
    Read {
        origin: String,
        source: std::io::Error,
    },

    #[error("Input from {origin} is not valid UTF-8")]
    Encoding { origin: String },
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Where file-like input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    Stdin,
    Path(PathBuf),
}

impl InputSpec {
    /// Interprets `-` as standard input.
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == "-" {
            Self::Stdin
        } else {
            Self::Path(arg.to_path_buf())
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Stdin => "standard input".to_string(),
            Self::Path(path) => path.display().to_string(),
        }
    }

    /// Reads the whole input into memory.
    pub fn read_to_string(&self) -> SourceResult<String> {
        let mut bytes = Vec::new();
        let result = match self {
            Self::Stdin => std::io::stdin().lock().read_to_end(&mut bytes),
            Self::Path(path) => std::fs::File::open(path).and_then(|mut f| f.read_to_end(&mut bytes)),
        };
        result.map_err(|source| SourceError::Read {
            origin: self.describe(),
            source,
        })?;

        let mut text = String::from_utf8(bytes).map_err(|_| SourceError::Encoding {
            origin: self.describe(),
        })?;
        if text.starts_with('\u{feff}') {
            text.drain(..'\u{feff}'.len_utf8());
        }
        Ok(text)
    }
}

/// Builds the record sequence for in-memory file content, detecting the
/// format unless one is given.
pub fn records_from_text(
    text: String,
    format: Option<InputFormat>,
    joiner: Box<dyn TextJoiner>,
) -> SourceResult<Records> {
    let format = match format {
        Some(format) => format,
        None => detect_format(&text)?,
    };
    tracing::debug!(?format, "reading input");

    match format {
        InputFormat::Json => JsonSource::new(text, joiner).records(),
        InputFormat::NewlineJson => JsonSource::newline_delimited(text, joiner).records(),
        InputFormat::Csv => DelimitedSource::new(text, Delimiter::Comma, joiner).records(),
        InputFormat::Tsv => DelimitedSource::new(text, Delimiter::Tab, joiner).records(),
    }
}
