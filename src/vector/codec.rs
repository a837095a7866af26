//! Binary codec for embedding vectors.
//!
//! # Blob Format
//!
//! A vector is stored as its f32 values in index order, each encoded as
//! little-endian IEEE-754 single precision. There is no header, padding or
//! length prefix: the dimension is the blob length divided by 4.
//!
//! Values are copied bit for bit, so NaN payloads and infinities survive a
//! round trip unchanged.

use crate::vector::types::{BYTES_PER_F32, VectorDimension, VectorError};

/// Encodes a vector into its blob representation.
#[must_use]
pub fn encode(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * BYTES_PER_F32);
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decodes a blob back into a vector.
///
/// Fails with [`VectorError::MalformedBlob`] when the blob is empty or its
/// length is not a multiple of 4.
pub fn decode(bytes: &[u8]) -> Result<Vec<f32>, VectorError> {
    if bytes.is_empty() || bytes.len() % BYTES_PER_F32 != 0 {
        return Err(VectorError::MalformedBlob { len: bytes.len() });
    }

    Ok(bytes
        .chunks_exact(BYTES_PER_F32)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Decodes a blob and checks it against an expected dimension.
pub fn decode_with_dimension(
    bytes: &[u8],
    dimension: VectorDimension,
) -> Result<Vec<f32>, VectorError> {
    let vector = decode(bytes)?;
    dimension.validate_vector(&vector)?;
    Ok(vector)
}
