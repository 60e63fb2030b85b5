//! Vector similarity scoring.

/// Compute cosine similarity between two vectors.
///
/// Equivalent to `1 - cosine_distance`; range [-1, 1], higher is more
/// similar. Callers are expected to have validated lengths already; a
/// length mismatch or zero-norm vector scores 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
