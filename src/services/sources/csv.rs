use std::path::PathBuf;

use crate::{
    error::{AppResult, ValidationError},
    models::Rating,
};

use super::RatingSource;

/// Column names accepted for the item column
const ITEM_COLUMNS: [&str; 2] = ["item_id", "movie_id"];

/// Reads ratings from a delimited file with a `user_id,item_id,rating` header
pub struct CsvRatingSource {
    path: PathBuf,
}

impl CsvRatingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl RatingSource for CsvRatingSource {
    async fn load(&self) -> AppResult<Vec<Rating>> {
        tracing::debug!(path = %self.path.display(), "Reading ratings file");
        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(parse_ratings(&contents)?)
    }

    fn name(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

/// Parses a ratings table; line numbers in errors are 1-based
pub fn parse_ratings(contents: &str) -> Result<Vec<Rating>, ValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let headers = reader.headers().map_err(malformed)?.clone();
    check_header(&headers)?;

    let mut ratings = Vec::new();
    for record in reader.records() {
        let record = record.map_err(malformed)?;
        let line = record.position().map_or(0, |p| p.line() as usize);

        let (3, Some(user_id), Some(item_id), Some(value)) =
            (record.len(), record.get(0), record.get(1), record.get(2))
        else {
            return Err(ValidationError::Malformed {
                line,
                reason: format!("expected 3 fields, found {}", record.len()),
            });
        };

        let value: f64 = value.parse().map_err(|_| ValidationError::Malformed {
            line,
            reason: format!("rating '{}' is not a number", value),
        })?;

        ratings.push(Rating::new(user_id, item_id, value));
    }

    Ok(ratings)
}

fn malformed(err: csv::Error) -> ValidationError {
    ValidationError::Malformed {
        line: err.position().map_or(1, |p| p.line() as usize),
        reason: err.to_string(),
    }
}

fn check_header(headers: &csv::StringRecord) -> Result<(), ValidationError> {
    let columns: Vec<String> = headers
        .iter()
        .map(|c| c.trim_start_matches('\u{feff}').to_ascii_lowercase())
        .collect();

    let valid = columns.len() == 3
        && columns[0] == "user_id"
        && ITEM_COLUMNS.contains(&columns[1].as_str())
        && columns[2] == "rating";

    if valid {
        Ok(())
    } else {
        Err(ValidationError::Malformed {
            line: headers.position().map_or(1, |p| p.line() as usize),
            reason: format!(
                "expected header 'user_id,item_id,rating', found '{}'",
                columns.join(",")
            ),
        })
    }
}
