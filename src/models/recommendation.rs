use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

/// Similarity measure used to compare two rating vectors
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Normalized dot product, ignores mean offset
    Cosine,
    /// Mean-centered correlation, centered on each vector's full mean
    #[default]
    Pearson,
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::Pearson => write!(f, "pearson"),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "pearson" => Ok(Metric::Pearson),
            other => Err(format!("unknown metric '{}'", other)),
        }
    }
}

/// Similarity between a subject (user or item) and one of its neighbors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityScore {
    pub subject_id: String,
    pub neighbor_id: String,
    pub score: f64,
}

/// A predicted rating for an item the user has not rated yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub item_id: String,
    pub predicted_score: f64,
    /// Number of neighbors whose ratings contributed to the prediction
    pub neighbor_count: usize,
}

/// Summary of the currently loaded rating matrix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetInfo {
    /// Identifies one build of the matrix; changes on every reload
    pub generation: Uuid,
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub user_count: usize,
    pub item_count: usize,
    pub rating_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_serialization() {
        assert_eq!(serde_json::to_string(&Metric::Cosine).unwrap(), "\"cosine\"");
        assert_eq!(serde_json::to_string(&Metric::Pearson).unwrap(), "\"pearson\"");

        let metric: Metric = serde_json::from_str("\"cosine\"").unwrap();
        assert_eq!(metric, Metric::Cosine);
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("Pearson".parse::<Metric>().unwrap(), Metric::Pearson);
        assert_eq!(" cosine ".parse::<Metric>().unwrap(), Metric::Cosine);
        assert!("jaccard".parse::<Metric>().is_err());
    }

    #[test]
    fn test_metric_display() {
        assert_eq!(format!("{}", Metric::Cosine), "cosine");
        assert_eq!(format!("{}", Metric::Pearson), "pearson");
    }
}
