use serde::Deserialize;

use crate::{
    models::{Metric, RatingScale},
    services::NeighborhoodParams,
};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Path to a `user_id,item_id,rating` file; takes precedence over the database
    #[serde(default)]
    pub ratings_path: Option<String>,

    /// PostgreSQL database holding the `ratings` table
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL; caching is disabled when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// TTL for cached recommendation results, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_rating_min")]
    pub rating_min: f64,

    #[serde(default = "default_rating_max")]
    pub rating_max: f64,

    /// Neighbors consulted per predicted item
    #[serde(default = "default_neighborhood_size")]
    pub neighborhood_size: usize,

    #[serde(default = "default_min_neighbors")]
    pub min_neighbors: usize,

    #[serde(default)]
    pub min_similarity: f64,

    #[serde(default)]
    pub default_metric: Metric,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_rating_min() -> f64 {
    1.0
}

fn default_rating_max() -> f64 {
    10.0
}

fn default_neighborhood_size() -> usize {
    20
}

fn default_min_neighbors() -> usize {
    1
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Where the ratings table comes from
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    Csv(String),
    Postgres(String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::from_iter(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        if !config.scale().is_valid() {
            anyhow::bail!(
                "Invalid rating scale: RATING_MIN={} RATING_MAX={}",
                config.rating_min,
                config.rating_max
            );
        }
        if config.neighborhood_size == 0 {
            anyhow::bail!("NEIGHBORHOOD_SIZE must be at least 1");
        }

        Ok(config)
    }

    pub fn scale(&self) -> RatingScale {
        RatingScale::new(self.rating_min, self.rating_max)
    }

    pub fn neighborhood(&self) -> NeighborhoodParams {
        NeighborhoodParams {
            neighborhood_size: self.neighborhood_size,
            min_neighbors: self.min_neighbors,
            min_similarity: self.min_similarity,
        }
    }

    /// Picks the rating source; a file path wins over a database URL
    pub fn source(&self) -> anyhow::Result<SourceConfig> {
        match (&self.ratings_path, &self.database_url) {
            (Some(path), _) => Ok(SourceConfig::Csv(path.clone())),
            (None, Some(url)) => Ok(SourceConfig::Postgres(url.clone())),
            (None, None) => anyhow::bail!("Either RATINGS_PATH or DATABASE_URL must be set"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vars(&[("RATINGS_PATH", "data/ratings.csv")])).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.scale(), RatingScale::new(1.0, 10.0));
        assert_eq!(config.neighborhood(), NeighborhoodParams::default());
        assert_eq!(config.default_metric, Metric::Pearson);
        assert_eq!(config.cache_ttl_secs, 3600);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/recc-db"),
            ("RATING_MIN", "0.5"),
            ("RATING_MAX", "5"),
            ("NEIGHBORHOOD_SIZE", "7"),
            ("DEFAULT_METRIC", "cosine"),
            ("PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(config.scale(), RatingScale::new(0.5, 5.0));
        assert_eq!(config.neighborhood().neighborhood_size, 7);
        assert_eq!(config.default_metric, Metric::Cosine);
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(
            config.source().unwrap(),
            SourceConfig::Postgres("postgres://localhost/recc-db".to_string())
        );
    }

    #[test]
    fn test_csv_source_wins() {
        let config = Config::from_vars(vars(&[
            ("RATINGS_PATH", "ratings.csv"),
            ("DATABASE_URL", "postgres://localhost/recc-db"),
        ]))
        .unwrap();
        assert_eq!(config.source().unwrap(), SourceConfig::Csv("ratings.csv".to_string()));
    }

    #[test]
    fn test_missing_source_is_error() {
        let config = Config::from_vars(Vec::new()).unwrap();
        assert!(config.source().is_err());
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let result = Config::from_vars(vars(&[("RATING_MIN", "6"), ("RATING_MAX", "5")]));
        assert!(result.is_err());
    }
}
