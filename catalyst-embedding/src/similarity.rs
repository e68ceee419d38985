//! Cosine similarity and centroid calculations

use ndarray::{Array1, ArrayView1};
use tracing::debug;

use crate::error::{EmbeddingError, Result};
use crate::types::{EmbeddingRecord, EmbeddingVector, SimilarityMatch};

/// Calculate cosine similarity between two embeddings
///
/// Returns a value between -1.0 (opposite) and 1.0 (identical direction).
/// A zero-magnitude vector has similarity 0.0 with everything.
///
/// Formula: cos(θ) = (A · B) / (||A|| ||B||)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let a_view = ArrayView1::from(a);
    let b_view = ArrayView1::from(b);

    let dot_product = a_view.dot(&b_view) as f64;
    let norm_a = (a_view.dot(&a_view) as f64).sqrt();
    let norm_b = (b_view.dot(&b_view) as f64).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (norm_a * norm_b))
}

/// Reject vectors holding NaN or infinite components
pub fn ensure_finite(vector: &[f32]) -> Result<()> {
    match vector.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(EmbeddingError::NonFiniteVector { index }),
        None => Ok(()),
    }
}

/// Dimension-wise mean of a set of embeddings
///
/// Returns `None` for an empty set. An empty set has no centroid, which is
/// not the same thing as a zero vector.
pub fn centroid(vectors: &[&[f32]]) -> Result<Option<EmbeddingVector>> {
    let Some(first) = vectors.first() else {
        return Ok(None);
    };
    let dimension = first.len();

    let mut sum = Array1::<f64>::zeros(dimension);
    for vector in vectors {
        if vector.len() != dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }
        sum += &ArrayView1::from(*vector).mapv(f64::from);
    }

    let count = vectors.len() as f64;
    Ok(Some(sum.iter().map(|v| (v / count) as f32).collect()))
}

/// Rank candidate records against a query vector
///
/// Drops candidates below `threshold`, sorts by similarity descending with
/// ties broken by entity (kind, then id) ascending, and keeps the top `limit`.
pub fn rank_matches<I>(
    query: &[f32],
    candidates: I,
    limit: usize,
    threshold: f64,
) -> Result<Vec<SimilarityMatch>>
where
    I: IntoIterator<Item = EmbeddingRecord>,
{
    let mut matches = Vec::new();
    let mut scanned = 0usize;
    for record in candidates {
        scanned += 1;
        let similarity = cosine_similarity(query, &record.vector)?;
        if similarity >= threshold {
            matches.push(SimilarityMatch { record, similarity });
        }
    }

    debug!(
        "Ranked {} candidates: {} at or above threshold {}",
        scanned,
        matches.len(),
        threshold
    );

    matches.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.record.entity.cmp(&b.record.entity))
    });
    matches.truncate(limit);

    if let Some(top) = matches.first() {
        debug!("Top match: {} score={:.3}", top.record.entity, top.similarity);
    }

    Ok(matches)
}
