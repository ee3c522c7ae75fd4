use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Reasons a ratings dataset (or evaluation request) is rejected
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("duplicate rating for user '{user_id}' and item '{item_id}'")]
    DuplicateRating { user_id: String, item_id: String },

    #[error("rating {value} for user '{user_id}' and item '{item_id}' is outside {min}..={max}")]
    OutOfRange {
        user_id: String,
        item_id: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("rating has an empty {0}")]
    EmptyId(&'static str),

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("invalid rating scale {min}..={max}")]
    InvalidScale { min: f64, max: f64 },

    #[error("invalid evaluation: {0}")]
    InvalidEvaluation(String),
}

/// Errors raised by the similarity engine
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecommenderError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("No co-rated entries between '{a}' and '{b}'")]
    InsufficientOverlap { a: String, b: String },

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Unknown item: {0}")]
    UnknownItem(String),
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error(transparent)]
    Recommender(#[from] RecommenderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Recommender(RecommenderError::Validation(err))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl AppError {
    /// Stable machine-readable error kind for response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::Cache(_) => "cache",
            AppError::Io(_) => "io",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Internal(_) => "internal",
            AppError::Recommender(err) => match err {
                RecommenderError::Validation(_) => "validation",
                RecommenderError::InsufficientOverlap { .. } => "insufficient_overlap",
                RecommenderError::UnknownUser(_) => "unknown_user",
                RecommenderError::UnknownItem(_) => "unknown_item",
            },
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Cache(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Recommender(err) => match err {
                RecommenderError::Validation(_) => StatusCode::BAD_REQUEST,
                RecommenderError::InsufficientOverlap { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                RecommenderError::UnknownUser(_) | RecommenderError::UnknownItem(_) => {
                    StatusCode::NOT_FOUND
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_user_maps_to_not_found() {
        let err = AppError::from(RecommenderError::UnknownUser("ghost".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.kind(), "unknown_user");
    }

    #[test]
    fn test_insufficient_overlap_is_distinct_kind() {
        let err = AppError::from(RecommenderError::InsufficientOverlap {
            a: "u1".to_string(),
            b: "u2".to_string(),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.kind(), "insufficient_overlap");
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = AppError::from(ValidationError::EmptyId("user_id"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.to_string(), "Validation error: rating has an empty user_id");
    }
}
