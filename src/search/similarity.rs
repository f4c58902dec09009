

/// Cosine similarity in `[-1, 1]`; `0.0` for empty, mismatched or zero-magnitude input.
pub fn cosine_similarity(vec1: &[f32], vec2: &[f32]) -> f64 {
    if vec1.is_empty() || vec2.is_empty() || vec1.len() != vec2.len() {
        return 0.0;
    }

    let (dot, mag1, mag2) = vec1.iter().zip(vec2.iter()).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(dot, m1, m2), (&a, &b)| {
            let (a, b) = (f64::from(a), f64::from(b));
            (dot + a * b, m1 + a * a, m2 + b * b)
        },
    );

    if mag1 == 0.0 || mag2 == 0.0 {
        return 0.0;
    }

    let similarity = dot / (mag1.sqrt() * mag2.sqrt());
    if similarity.is_finite() { similarity } else { 0.0 }
}


/// Similarity against an optional embedding; absent means no evidence.
pub fn similarity_or_zero(query: &[f32], embedding: Option<&[f32]>) -> f64 {
    embedding.map_or(0.0, |e| cosine_similarity(query, e))
}
