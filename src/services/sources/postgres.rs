use sqlx::PgPool;

use crate::{error::AppResult, models::Rating};

use super::RatingSource;

/// Rows without a star rating (e.g. a "liked" film) are skipped
const LOAD_RATINGS_SQL: &str = r#"
    SELECT user_id, movie_id, rating::float8 AS rating
    FROM ratings
    WHERE rating IS NOT NULL
    ORDER BY user_id, movie_id
"#;

#[derive(sqlx::FromRow)]
struct RatingRow {
    user_id: String,
    movie_id: String,
    rating: f64,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Rating::new(row.user_id, row.movie_id, row.rating)
    }
}

/// Reads ratings from the `ratings` table populated by the ingestion job
pub struct PostgresRatingSource {
    pool: PgPool,
}

impl PostgresRatingSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RatingSource for PostgresRatingSource {
    async fn load(&self) -> AppResult<Vec<Rating>> {
        let rows: Vec<RatingRow> = sqlx::query_as(LOAD_RATINGS_SQL)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(rows = rows.len(), "Loaded ratings from Postgres");

        Ok(rows.into_iter().map(Rating::from).collect())
    }

    fn name(&self) -> String {
        "postgres:ratings".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_maps_movie_id_to_item_id() {
        let row = RatingRow {
            user_id: "613dbx".to_string(),
            movie_id: "the-thing".to_string(),
            rating: 9.0,
        };
        assert_eq!(Rating::from(row), Rating::new("613dbx", "the-thing", 9.0));
    }
}
