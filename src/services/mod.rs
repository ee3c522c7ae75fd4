pub mod evaluation;
pub mod matrix;
pub mod recommender;
pub mod similarity;
pub mod sources;

pub use evaluation::{cross_validate, EvaluationReport, FoldResult};
pub use matrix::{RatingMatrix, RatingVector};
pub use recommender::{neighbors, predict, recommend, similar_items, NeighborhoodParams};
pub use similarity::{item_similarity, user_similarity};
pub use sources::{load_matrix, RatingSource};
