pub mod rating;
pub mod recommendation;

pub use rating::{Rating, RatingScale};
pub use recommendation::{DatasetInfo, Metric, Recommendation, SimilarityScore};
