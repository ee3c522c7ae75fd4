//! Similarity between sparse rating vectors
//!
//! Both metrics only look at the co-rated set: keys present in both vectors.
//! Co-rated keys are visited in ascending order so that `sim(a, b)` and
//! `sim(b, a)` perform the exact same floating point operations.

use crate::{
    error::RecommenderError,
    models::Metric,
    services::matrix::{RatingMatrix, RatingVector},
};

/// Similarity between two users over the items both rated
pub fn user_similarity(
    matrix: &RatingMatrix,
    a_id: &str,
    b_id: &str,
    metric: Metric,
) -> Result<f64, RecommenderError> {
    let a = matrix
        .user(a_id)
        .ok_or_else(|| RecommenderError::UnknownUser(a_id.to_string()))?;
    let b = matrix
        .user(b_id)
        .ok_or_else(|| RecommenderError::UnknownUser(b_id.to_string()))?;

    vector_similarity(a, b, metric).ok_or_else(|| RecommenderError::InsufficientOverlap {
        a: a_id.to_string(),
        b: b_id.to_string(),
    })
}

/// Similarity between two items over the users who rated both
pub fn item_similarity(
    matrix: &RatingMatrix,
    a_id: &str,
    b_id: &str,
    metric: Metric,
) -> Result<f64, RecommenderError> {
    let a = matrix
        .item(a_id)
        .ok_or_else(|| RecommenderError::UnknownItem(a_id.to_string()))?;
    let b = matrix
        .item(b_id)
        .ok_or_else(|| RecommenderError::UnknownItem(b_id.to_string()))?;

    vector_similarity(a, b, metric).ok_or_else(|| RecommenderError::InsufficientOverlap {
        a: a_id.to_string(),
        b: b_id.to_string(),
    })
}

/// Returns `None` when the co-rated set is empty
pub fn vector_similarity(a: &RatingVector, b: &RatingVector, metric: Metric) -> Option<f64> {
    let co_rated = co_rated(a, b);
    if co_rated.is_empty() {
        return None;
    }

    let score = match metric {
        Metric::Cosine => cosine(&co_rated),
        Metric::Pearson => pearson(&co_rated, a.mean(), b.mean()),
    };

    Some(score.clamp(-1.0, 1.0))
}

/// Paired values for keys present in both vectors, in key order
fn co_rated(a: &RatingVector, b: &RatingVector) -> Vec<(f64, f64)> {
    a.iter()
        .filter_map(|(key, va)| b.get(key).map(|vb| (va, vb)))
        .collect()
}

fn cosine(pairs: &[(f64, f64)]) -> f64 {
    let dot: f64 = pairs.iter().map(|(x, y)| x * y).sum();
    let norm_a = pairs.iter().map(|(x, _)| x * x).sum::<f64>().sqrt();
    let norm_b = pairs.iter().map(|(_, y)| y * y).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Centered on each vector's full mean, summed over the co-rated set
fn pearson(pairs: &[(f64, f64)], mean_a: f64, mean_b: f64) -> f64 {
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;

    for (x, y) in pairs {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = var_a.sqrt() * var_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    cov / denom
}
