use serde::{Deserialize, Serialize};

/// A single user's score for a single item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    /// User identifier (e.g., a Letterboxd username)
    pub user_id: String,
    /// Item identifier (e.g., a film slug)
    pub item_id: String,
    /// Score on the configured rating scale
    pub value: f64,
}

impl Rating {
    /// Creates a new rating
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>, value: f64) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            value,
        }
    }
}

/// Closed range of accepted rating values
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl Default for RatingScale {
    /// Half-star scale mapped onto 1..=10
    fn default() -> Self {
        Self { min: 1.0, max: 10.0 }
    }
}

impl RatingScale {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether both bounds are finite and ordered
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Checks if a value lies within the scale (inclusive)
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}
