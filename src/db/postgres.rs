use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Creates the PostgreSQL pool used to read the ratings table
///
/// Ratings are read in one bulk query per dataset load, so a small pool is
/// plenty.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    Ok(pool)
}
