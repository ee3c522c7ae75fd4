use std::collections::{BTreeMap, HashSet};

use crate::{
    error::ValidationError,
    models::{Rating, RatingScale},
};

/// Sparse ratings for one user (keyed by item) or one item (keyed by user)
#[derive(Debug, Clone, PartialEq)]
pub struct RatingVector {
    values: BTreeMap<String, f64>,
    mean: f64,
}

impl RatingVector {
    fn from_values(values: BTreeMap<String, f64>) -> Self {
        let mean = if values.is_empty() {
            0.0
        } else {
            values.values().sum::<f64>() / values.len() as f64
        };
        Self { values, mean }
    }

    /// Mean over every entry, not just the co-rated ones
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Immutable user × item rating matrix
///
/// Holds both orientations so that user-to-user and item-to-item similarity
/// go through the same code. Never mutated after [`RatingMatrix::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct RatingMatrix {
    by_user: BTreeMap<String, RatingVector>,
    by_item: BTreeMap<String, RatingVector>,
    scale: RatingScale,
    rating_count: usize,
}

impl RatingMatrix {
    /// Builds a matrix from a sequence of ratings
    ///
    /// Fails on the first duplicate (user, item) pair, empty id, or value
    /// outside `scale`. Nothing is kept from a rejected dataset.
    pub fn build(ratings: &[Rating], scale: RatingScale) -> Result<Self, ValidationError> {
        if !scale.is_valid() {
            return Err(ValidationError::InvalidScale {
                min: scale.min,
                max: scale.max,
            });
        }

        let mut users: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        let mut items: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        let mut seen: HashSet<(&str, &str)> = HashSet::with_capacity(ratings.len());

        for rating in ratings {
            if rating.user_id.trim().is_empty() {
                return Err(ValidationError::EmptyId("user_id"));
            }
            if rating.item_id.trim().is_empty() {
                return Err(ValidationError::EmptyId("item_id"));
            }
            if !scale.contains(rating.value) {
                return Err(ValidationError::OutOfRange {
                    user_id: rating.user_id.clone(),
                    item_id: rating.item_id.clone(),
                    value: rating.value,
                    min: scale.min,
                    max: scale.max,
                });
            }
            if !seen.insert((rating.user_id.as_str(), rating.item_id.as_str())) {
                return Err(ValidationError::DuplicateRating {
                    user_id: rating.user_id.clone(),
                    item_id: rating.item_id.clone(),
                });
            }

            users
                .entry(rating.user_id.clone())
                .or_default()
                .insert(rating.item_id.clone(), rating.value);
            items
                .entry(rating.item_id.clone())
                .or_default()
                .insert(rating.user_id.clone(), rating.value);
        }

        Ok(Self {
            by_user: users
                .into_iter()
                .map(|(id, values)| (id, RatingVector::from_values(values)))
                .collect(),
            by_item: items
                .into_iter()
                .map(|(id, values)| (id, RatingVector::from_values(values)))
                .collect(),
            scale,
            rating_count: ratings.len(),
        })
    }

    /// Ratings given by a user, keyed by item
    pub fn user(&self, user_id: &str) -> Option<&RatingVector> {
        self.by_user.get(user_id)
    }

    /// Ratings received by an item, keyed by user
    pub fn item(&self, item_id: &str) -> Option<&RatingVector> {
        self.by_item.get(item_id)
    }

    pub fn users(&self) -> impl Iterator<Item = (&str, &RatingVector)> {
        self.by_user.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, &RatingVector)> {
        self.by_item.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    pub fn item_count(&self) -> usize {
        self.by_item.len()
    }

    pub fn rating_count(&self) -> usize {
        self.rating_count
    }

    pub fn scale(&self) -> RatingScale {
        self.scale
    }

    /// Mean over every rating in the matrix (0.0 when empty)
    pub fn global_mean(&self) -> f64 {
        if self.rating_count == 0 {
            return 0.0;
        }
        let total: f64 = self
            .by_user
            .values()
            .flat_map(|v| v.iter().map(|(_, value)| value))
            .sum();
        total / self.rating_count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ratings() -> Vec<Rating> {
        vec![
            Rating::new("u1", "i1", 5.0),
            Rating::new("u1", "i2", 3.0),
            Rating::new("u2", "i1", 4.0),
            Rating::new("u2", "i2", 2.0),
            Rating::new("u2", "i3", 4.5),
        ]
    }

    #[test]
    fn test_build_indexes_both_orientations() {
        let matrix = RatingMatrix::build(&sample_ratings(), RatingScale::new(0.5, 5.0)).unwrap();

        assert_eq!(matrix.user_count(), 2);
        assert_eq!(matrix.item_count(), 3);
        assert_eq!(matrix.rating_count(), 5);
        assert_eq!(matrix.user("u2").unwrap().get("i3"), Some(4.5));
        assert_eq!(matrix.item("i1").unwrap().get("u1"), Some(5.0));
        assert!(matrix.user("u3").is_none());
    }

    #[test]
    fn test_vector_mean_uses_all_entries() {
        let matrix = RatingMatrix::build(&sample_ratings(), RatingScale::new(0.5, 5.0)).unwrap();
        assert!((matrix.user("u1").unwrap().mean() - 4.0).abs() < 1e-12);
        assert!((matrix.user("u2").unwrap().mean() - 3.5).abs() < 1e-12);
        assert!((matrix.item("i1").unwrap().mean() - 4.5).abs() < 1e-12);
        assert!((matrix.global_mean() - 3.7).abs() < 1e-12);
    }

    #[test]
    fn test_build_is_deterministic() {
        let ratings = sample_ratings();
        let first = RatingMatrix::build(&ratings, RatingScale::new(0.5, 5.0)).unwrap();
        let second = RatingMatrix::build(&ratings, RatingScale::new(0.5, 5.0)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_build_ignores_input_order_for_contents() {
        let mut reversed = sample_ratings();
        reversed.reverse();
        let first = RatingMatrix::build(&sample_ratings(), RatingScale::new(0.5, 5.0)).unwrap();
        let second = RatingMatrix::build(&reversed, RatingScale::new(0.5, 5.0)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let mut ratings = sample_ratings();
        ratings.push(Rating::new("u1", "i1", 2.0));

        let err = RatingMatrix::build(&ratings, RatingScale::new(0.5, 5.0)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateRating {
                user_id: "u1".to_string(),
                item_id: "i1".to_string(),
            }
        );
    }

    #[test]
    fn test_out_of_range_rejected() {
        let ratings = vec![Rating::new("u1", "i1", 5.5)];
        let err = RatingMatrix::build(&ratings, RatingScale::new(0.5, 5.0)).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { value, .. } if value == 5.5));
    }

    #[test]
    fn test_non_finite_rejected() {
        let ratings = vec![Rating::new("u1", "i1", f64::NAN)];
        let err = RatingMatrix::build(&ratings, RatingScale::default()).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
    }

    #[test]
    fn test_empty_ids_rejected() {
        let err = RatingMatrix::build(&[Rating::new(" ", "i1", 3.0)], RatingScale::default())
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyId("user_id"));

        let err = RatingMatrix::build(&[Rating::new("u1", "", 3.0)], RatingScale::default())
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyId("item_id"));
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let err = RatingMatrix::build(&[], RatingScale::new(5.0, 1.0)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidScale { .. }));
    }

    #[test]
    fn test_empty_input_builds_empty_matrix() {
        let matrix = RatingMatrix::build(&[], RatingScale::default()).unwrap();
        assert_eq!(matrix.user_count(), 0);
        assert_eq!(matrix.global_mean(), 0.0);
    }
}
