use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::RecommenderError,
    models::{Metric, Recommendation, SimilarityScore},
    services::{
        matrix::{RatingMatrix, RatingVector},
        similarity::vector_similarity,
    },
};

/// Tuning knobs for neighborhood-based prediction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NeighborhoodParams {
    /// Maximum neighbors consulted per predicted item (top-N)
    pub neighborhood_size: usize,
    /// Items with fewer contributing neighbors are not predicted
    pub min_neighbors: usize,
    /// Neighbors must be strictly more similar than this
    pub min_similarity: f64,
}

impl Default for NeighborhoodParams {
    fn default() -> Self {
        Self {
            neighborhood_size: 20,
            min_neighbors: 1,
            min_similarity: 0.0,
        }
    }
}

/// A neighbor that passed the similarity threshold
#[derive(Debug, Clone)]
struct Neighbor<'m> {
    id: &'m str,
    ratings: &'m RatingVector,
    similarity: f64,
}

/// Similarity descending, then id ascending
fn by_similarity(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.similarity
        .partial_cmp(&a.similarity)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(b.id))
}

/// Ranked candidate vectors for `subject`, skipping those with no overlap
fn ranked_neighbors<'m>(
    subject_id: &str,
    subject: &RatingVector,
    candidates: impl Iterator<Item = (&'m str, &'m RatingVector)>,
    metric: Metric,
    min_similarity: f64,
) -> Vec<Neighbor<'m>> {
    let mut neighbors: Vec<Neighbor<'m>> = candidates
        .filter(|(id, _)| *id != subject_id)
        .filter_map(|(id, ratings)| {
            vector_similarity(subject, ratings, metric).map(|similarity| Neighbor {
                id,
                ratings,
                similarity,
            })
        })
        .filter(|n| n.similarity > min_similarity)
        .collect();

    neighbors.sort_by(by_similarity);
    neighbors
}

/// Weighted average over the first `neighborhood_size` neighbors who rated `item_id`
fn predict_from(
    neighbors: &[Neighbor],
    item_id: &str,
    params: &NeighborhoodParams,
) -> Option<(f64, usize)> {
    let mut weighted = 0.0;
    let mut weights = 0.0;
    let mut count = 0;

    for (rating, similarity) in neighbors
        .iter()
        .filter_map(|n| n.ratings.get(item_id).map(|r| (r, n.similarity)))
        .take(params.neighborhood_size)
    {
        weighted += similarity * rating;
        weights += similarity.abs();
        count += 1;
    }

    if count == 0 || count < params.min_neighbors || weights == 0.0 {
        return None;
    }

    Some((weighted / weights, count))
}

/// Top-k unrated items for a user, by predicted score
///
/// Ties in predicted score are broken by item id ascending. Items the user
/// already rated are never returned.
pub fn recommend(
    matrix: &RatingMatrix,
    user_id: &str,
    k: usize,
    metric: Metric,
    params: &NeighborhoodParams,
) -> Result<Vec<Recommendation>, RecommenderError> {
    let subject = matrix
        .user(user_id)
        .ok_or_else(|| RecommenderError::UnknownUser(user_id.to_string()))?;

    if k == 0 {
        return Ok(Vec::new());
    }

    let neighbors = ranked_neighbors(user_id, subject, matrix.users(), metric, params.min_similarity);

    // Candidate items: anything a neighbor rated that the user has not
    let mut candidates: BTreeSet<&str> = BTreeSet::new();
    for neighbor in &neighbors {
        for (item_id, _) in neighbor.ratings.iter() {
            if !subject.contains(item_id) {
                candidates.insert(item_id);
            }
        }
    }

    let mut recommendations: Vec<Recommendation> = candidates
        .into_iter()
        .filter_map(|item_id| {
            predict_from(&neighbors, item_id, params).map(|(predicted_score, neighbor_count)| {
                Recommendation {
                    item_id: item_id.to_string(),
                    predicted_score,
                    neighbor_count,
                }
            })
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.predicted_score
            .partial_cmp(&a.predicted_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    recommendations.truncate(k);

    tracing::debug!(
        user_id = %user_id,
        %metric,
        neighbors = neighbors.len(),
        returned = recommendations.len(),
        "Computed recommendations"
    );

    Ok(recommendations)
}

/// Predicts a single user's rating for an item, rated or not
///
/// Returns `Ok(None)` when no qualifying neighbor rated the item.
pub fn predict(
    matrix: &RatingMatrix,
    user_id: &str,
    item_id: &str,
    metric: Metric,
    params: &NeighborhoodParams,
) -> Result<Option<f64>, RecommenderError> {
    let subject = matrix
        .user(user_id)
        .ok_or_else(|| RecommenderError::UnknownUser(user_id.to_string()))?;

    let Some(raters) = matrix.item(item_id) else {
        return Ok(None);
    };

    // Only users who rated the item can contribute
    let candidates = raters
        .iter()
        .filter_map(|(rater_id, _)| matrix.user(rater_id).map(|ratings| (rater_id, ratings)));
    let neighbors = ranked_neighbors(user_id, subject, candidates, metric, params.min_similarity);

    Ok(predict_from(&neighbors, item_id, params).map(|(score, _)| score))
}

/// Top-k users most similar to `user_id`
pub fn neighbors(
    matrix: &RatingMatrix,
    user_id: &str,
    k: usize,
    metric: Metric,
) -> Result<Vec<SimilarityScore>, RecommenderError> {
    let subject = matrix
        .user(user_id)
        .ok_or_else(|| RecommenderError::UnknownUser(user_id.to_string()))?;

    Ok(top_k(
        user_id,
        ranked_neighbors(user_id, subject, matrix.users(), metric, f64::NEG_INFINITY),
        k,
    ))
}

/// Top-k items most similar to `item_id`, measured over shared raters
pub fn similar_items(
    matrix: &RatingMatrix,
    item_id: &str,
    k: usize,
    metric: Metric,
) -> Result<Vec<SimilarityScore>, RecommenderError> {
    let subject = matrix
        .item(item_id)
        .ok_or_else(|| RecommenderError::UnknownItem(item_id.to_string()))?;

    Ok(top_k(
        item_id,
        ranked_neighbors(item_id, subject, matrix.items(), metric, f64::NEG_INFINITY),
        k,
    ))
}

fn top_k(subject_id: &str, neighbors: Vec<Neighbor>, k: usize) -> Vec<SimilarityScore> {
    neighbors
        .into_iter()
        .take(k)
        .map(|n| SimilarityScore {
            subject_id: subject_id.to_string(),
            neighbor_id: n.id.to_string(),
            score: n.similarity,
        })
        .collect()
}
