//! Cosine similarity between embedding vectors.

/// Calculates cosine similarity between two vectors.
///
/// Accumulates in f64 and takes a single square root of the product of the
/// squared norms, which keeps `score(a, b) == score(b, a)` exact and makes
/// `score(v, v)` land on 1.0 for ordinary embeddings.
///
/// Returns 0.0 when either vector has zero norm, when the lengths differ, or
/// when non-finite input produces NaN, so every score is well ordered. The
/// result is clamped to [-1.0, 1.0].
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a * norm_b).sqrt();
    if score.is_nan() {
        return 0.0;
    }
    // Scores too small for f32 collapse to +0.0 so they tie with exact zeros
    let score = score.clamp(-1.0, 1.0) as f32;
    if score == 0.0 { 0.0 } else { score }
}
