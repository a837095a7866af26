//! Core types for stored embedding vectors.
//!
//! Newtypes and error types shared by the codec, the vector store and the
//! similarity engine.

use thiserror::Error;

/// Dimension of `text-embedding-ada-002` embeddings.
pub const VECTOR_DIMENSION_1536: usize = 1536;

/// Number of bytes per encoded f32 value.
pub const BYTES_PER_F32: usize = 4;

/// Type-safe wrapper for vector dimensions.
///
/// Every vector stored in one table shares a single dimension. The wrapper
/// rejects zero so a decoded blob can never produce an empty vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, VectorError> {
        if dim == 0 {
            return Err(VectorError::InvalidDimension {
                dimension: 0,
                reason: "Vector dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// Dimension produced by the default embedding model.
    #[must_use]
    pub const fn ada_002() -> Self {
        Self(VECTOR_DIMENSION_1536)
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Size in bytes of one encoded vector of this dimension.
    #[must_use]
    pub const fn blob_len(&self) -> usize {
        self.0 * BYTES_PER_F32
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.0 {
            return Err(VectorError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An id paired with its embedding, as persisted in a vector table.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorEntry {
    pub id: String,
    pub vector: Vec<f32>,
}

impl VectorEntry {
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
        }
    }
}

/// Errors that can occur during vector operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorError {
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors in a table come from the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error(
        "Malformed vector blob of {len} bytes: length must be a positive multiple of 4\nSuggestion: The table may contain data that was not written by this tool"
    )]
    MalformedBlob { len: usize },
}
