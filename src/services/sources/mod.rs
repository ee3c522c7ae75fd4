//! Pluggable rating sources
//!
//! The engine itself never does I/O. A source loads the raw ratings table,
//! and [`load_matrix`] turns it into an immutable [`RatingMatrix`].
use std::time::Instant;

use crate::{
    error::AppResult,
    models::{Rating, RatingScale},
    services::matrix::RatingMatrix,
};

pub mod csv;
pub mod postgres;

pub use self::csv::CsvRatingSource;
pub use self::postgres::PostgresRatingSource;

/// Trait for anything that can produce a ratings table
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingSource: Send + Sync {
    /// Loads every rating in the dataset
    async fn load(&self) -> AppResult<Vec<Rating>>;

    /// Source name for logging and dataset info
    fn name(&self) -> String;
}

/// In-memory source, useful for tests and for seeding a service
pub struct StaticRatingSource {
    ratings: Vec<Rating>,
}

impl StaticRatingSource {
    pub fn new(ratings: Vec<Rating>) -> Self {
        Self { ratings }
    }
}

#[async_trait::async_trait]
impl RatingSource for StaticRatingSource {
    async fn load(&self) -> AppResult<Vec<Rating>> {
        Ok(self.ratings.clone())
    }

    fn name(&self) -> String {
        "static".to_string()
    }
}

/// Loads ratings from a source and builds a fresh matrix
pub async fn load_matrix(source: &dyn RatingSource, scale: RatingScale) -> AppResult<RatingMatrix> {
    let start = Instant::now();
    let ratings = source.load().await?;

    let matrix = RatingMatrix::build(&ratings, scale).inspect_err(|e| {
        tracing::warn!(source = %source.name(), error = %e, "Rejected ratings dataset");
    })?;

    tracing::info!(
        source = %source.name(),
        users = matrix.user_count(),
        items = matrix.item_count(),
        ratings = matrix.rating_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Rating matrix built"
    );

    Ok(matrix)
}
