//! Embedding vector types and their on-disk codec.
//!
//! # Blob Format
//! Vectors are stored as raw little-endian f32 arrays with no header. The
//! dimension is implied by the blob length and must be constant within one
//! table (canonical value: 1536 for `text-embedding-ada-002`).

pub mod codec;
mod types;

pub use codec::{decode, decode_with_dimension, encode};
pub use types::{
    BYTES_PER_F32, VECTOR_DIMENSION_1536, VectorDimension, VectorEntry, VectorError,
};
