use serde::{Deserialize, Serialize};

use crate::{
    error::{RecommenderError, ValidationError},
    models::{Metric, Rating, RatingScale},
    services::{
        matrix::RatingMatrix,
        recommender::{predict, NeighborhoodParams},
    },
};

/// Accuracy of held-out predictions for one fold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoldResult {
    pub fold: usize,
    pub rmse: f64,
    pub mae: f64,
    pub predictions: usize,
    /// Predictions that fell back to a mean because no neighbor qualified
    pub impossible: usize,
}

/// K-fold cross-validation summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationReport {
    pub metric: Metric,
    pub folds: Vec<FoldResult>,
    pub mean_rmse: f64,
    pub mean_mae: f64,
}

/// Runs k-fold cross-validation of rating prediction
///
/// Rating `i` (in input order) is held out in fold `i % folds`, so the split is
/// deterministic. Each fold trains a fresh matrix on the remaining ratings.
pub fn cross_validate(
    ratings: &[Rating],
    scale: RatingScale,
    folds: usize,
    metric: Metric,
    params: &NeighborhoodParams,
) -> Result<EvaluationReport, RecommenderError> {
    if folds < 2 {
        return Err(ValidationError::InvalidEvaluation(format!(
            "at least 2 folds are required, got {}",
            folds
        ))
        .into());
    }
    if ratings.len() < folds {
        return Err(ValidationError::InvalidEvaluation(format!(
            "{} ratings cannot be split into {} folds",
            ratings.len(),
            folds
        ))
        .into());
    }

    // Validate the full dataset once so duplicates surface before any split
    RatingMatrix::build(ratings, scale)?;

    let mut results = Vec::with_capacity(folds);

    for fold in 0..folds {
        let (test, train): (Vec<(usize, &Rating)>, Vec<(usize, &Rating)>) = ratings
            .iter()
            .enumerate()
            .partition(|(i, _)| i % folds == fold);

        let train: Vec<Rating> = train.into_iter().map(|(_, r)| r.clone()).collect();
        let matrix = RatingMatrix::build(&train, scale)?;
        let global_mean = matrix.global_mean();

        let mut squared = 0.0;
        let mut absolute = 0.0;
        let mut impossible = 0;

        for (_, rating) in &test {
            let estimate = match predict(&matrix, &rating.user_id, &rating.item_id, metric, params)
            {
                Ok(Some(score)) => score,
                Ok(None) => {
                    impossible += 1;
                    matrix
                        .user(&rating.user_id)
                        .map(|u| u.mean())
                        .unwrap_or(global_mean)
                }
                Err(RecommenderError::UnknownUser(_)) => {
                    impossible += 1;
                    global_mean
                }
                Err(e) => return Err(e),
            };

            let error = estimate - rating.value;
            squared += error * error;
            absolute += error.abs();
        }

        let n = test.len() as f64;
        let result = FoldResult {
            fold,
            rmse: (squared / n).sqrt(),
            mae: absolute / n,
            predictions: test.len(),
            impossible,
        };

        tracing::debug!(
            fold,
            rmse = result.rmse,
            mae = result.mae,
            impossible,
            "Fold evaluated"
        );

        results.push(result);
    }

    let mean_rmse = results.iter().map(|r| r.rmse).sum::<f64>() / folds as f64;
    let mean_mae = results.iter().map(|r| r.mae).sum::<f64>() / folds as f64;

    tracing::info!(folds, %metric, mean_rmse, mean_mae, "Cross-validation completed");

    Ok(EvaluationReport {
        metric,
        folds: results,
        mean_rmse,
        mean_mae,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings() -> Vec<Rating> {
        let users = ["ana", "ben", "cy", "dee", "eli"];
        let items = ["alien", "brazil", "cube", "dune", "eraserhead", "fargo"];
        let mut ratings = Vec::new();
        for (u, user) in users.iter().enumerate() {
            for (i, item) in items.iter().enumerate() {
                if (u + i) % 4 == 3 {
                    continue;
                }
                let value = 1.0 + ((u * 3 + i * 7) % 10) as f64;
                ratings.push(Rating::new(*user, *item, value));
            }
        }
        ratings
    }

    #[test]
    fn test_cross_validate_reports_every_fold() {
        let data = ratings();
        let report = cross_validate(
            &data,
            RatingScale::default(),
            3,
            Metric::Pearson,
            &NeighborhoodParams::default(),
        )
        .unwrap();

        assert_eq!(report.folds.len(), 3);
        assert_eq!(
            report.folds.iter().map(|f| f.predictions).sum::<usize>(),
            data.len()
        );
        assert!(report.folds.iter().all(|f| f.rmse >= f.mae - 1e-12));
        assert!(report.mean_rmse.is_finite());
    }

    #[test]
    fn test_cross_validate_is_deterministic() {
        let data = ratings();
        let params = NeighborhoodParams::default();
        let first = cross_validate(&data, RatingScale::default(), 4, Metric::Cosine, &params).unwrap();
        let second =
            cross_validate(&data, RatingScale::default(), 4, Metric::Cosine, &params).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cross_validate_rejects_single_fold() {
        let err = cross_validate(
            &ratings(),
            RatingScale::default(),
            1,
            Metric::Cosine,
            &NeighborhoodParams::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RecommenderError::Validation(ValidationError::InvalidEvaluation(_))
        ));
    }

    #[test]
    fn test_cross_validate_rejects_too_few_ratings() {
        let data = vec![Rating::new("u1", "i1", 3.0)];
        let err = cross_validate(
            &data,
            RatingScale::default(),
            2,
            Metric::Cosine,
            &NeighborhoodParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RecommenderError::Validation(_)));
    }

    #[test]
    fn test_unknown_user_falls_back_to_global_mean() {
        // "solo" only appears in the fold that is held out
        let data = vec![
            Rating::new("solo", "i1", 9.0),
            Rating::new("u1", "i1", 4.0),
            Rating::new("u2", "i1", 6.0),
            Rating::new("u1", "i2", 2.0),
        ];
        let report = cross_validate(
            &data,
            RatingScale::default(),
            4,
            Metric::Cosine,
            &NeighborhoodParams::default(),
        )
        .unwrap();

        let first = &report.folds[0];
        assert_eq!(first.predictions, 1);
        assert_eq!(first.impossible, 1);
        // training mean is (4 + 6 + 2) / 3 = 4, error is 5
        assert!((first.mae - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_unpredictable_item_falls_back_to_user_mean() {
        // Nobody else rated "lonely", so no neighbor can contribute
        let data = vec![
            Rating::new("u1", "lonely", 9.0),
            Rating::new("u1", "i1", 4.0),
            Rating::new("u1", "i2", 6.0),
            Rating::new("u2", "i1", 2.0),
        ];
        let report = cross_validate(
            &data,
            RatingScale::default(),
            4,
            Metric::Pearson,
            &NeighborhoodParams::default(),
        )
        .unwrap();

        let first = &report.folds[0];
        assert_eq!(first.predictions, 1);
        assert_eq!(first.impossible, 1);
        // u1's training mean is 5, the global mean would be 4
        assert!((first.mae - 4.0).abs() < 1e-12);
    }
}
