use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    cached,
    db::CacheKey,
    error::{AppError, AppResult, RecommenderError},
    middleware::RequestId,
    models::{DatasetInfo, Metric, Recommendation, SimilarityScore},
    services::{self, EvaluationReport},
};

use super::{AppState, Dataset};

const DEFAULT_K: usize = 10;
const MAX_K: usize = 500;
const DEFAULT_FOLDS: usize = 5;

// Request types

#[derive(Debug, Deserialize)]
pub struct TopKQuery {
    pub k: Option<usize>,
    pub metric: Option<Metric>,
}

impl TopKQuery {
    fn k(&self) -> AppResult<usize> {
        let k = self.k.unwrap_or(DEFAULT_K);
        if k > MAX_K {
            return Err(AppError::InvalidInput(format!("k must be at most {}", MAX_K)));
        }
        Ok(k)
    }
}

#[derive(Debug, Deserialize)]
pub struct PairQuery {
    pub a: String,
    pub b: String,
    pub metric: Option<Metric>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EvaluateRequest {
    pub folds: Option<usize>,
    pub metric: Option<Metric>,
}

/// Runs an engine query on the blocking pool against one dataset snapshot
async fn run_blocking<T, F>(dataset: Arc<Dataset>, query: F) -> AppResult<T>
where
    F: FnOnce(&Dataset) -> Result<T, RecommenderError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || query(&dataset))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Describe the currently loaded dataset
pub async fn dataset_info(State(state): State<AppState>) -> Json<DatasetInfo> {
    Json(state.snapshot().await.info.clone())
}

/// Rebuild the rating matrix from the configured source
pub async fn reload_dataset(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<DatasetInfo>> {
    tracing::info!(request_id = %request_id, "Reloading dataset");
    Ok(Json(state.reload().await?))
}

/// Top-k recommended items for a user
pub async fn recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    query: Result<Query<TopKQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let Query(query) = query?;
    let k = query.k()?;
    let metric = query.metric.unwrap_or(state.settings.default_metric);
    let dataset = state.snapshot().await;

    tracing::info!(request_id = %request_id, user_id = %user_id, k, %metric, "Processing recommendation request");

    let key = CacheKey::Recommendations {
        generation: dataset.info.generation,
        user_id: user_id.clone(),
        metric,
        k,
    };
    let params = state.settings.params;
    let recs: Vec<Recommendation> = cached!(state.cache.as_ref(), key, {
        let user_id = user_id.clone();
        run_blocking(dataset.clone(), move |d| {
            services::recommend(&d.matrix, &user_id, k, metric, &params)
        })
        .await
    })?;

    Ok(Json(recs))
}

/// Top-k most similar users
pub async fn user_neighbors(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<TopKQuery>, QueryRejection>,
) -> AppResult<Json<Vec<SimilarityScore>>> {
    let Query(query) = query?;
    let k = query.k()?;
    let metric = query.metric.unwrap_or(state.settings.default_metric);
    let dataset = state.snapshot().await;

    let key = CacheKey::Neighbors {
        generation: dataset.info.generation,
        user_id: user_id.clone(),
        metric,
        k,
    };
    let scores: Vec<SimilarityScore> = cached!(state.cache.as_ref(), key, {
        let user_id = user_id.clone();
        run_blocking(dataset.clone(), move |d| {
            services::neighbors(&d.matrix, &user_id, k, metric)
        })
        .await
    })?;

    Ok(Json(scores))
}

/// Top-k most similar items
pub async fn similar_items(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    query: Result<Query<TopKQuery>, QueryRejection>,
) -> AppResult<Json<Vec<SimilarityScore>>> {
    let Query(query) = query?;
    let k = query.k()?;
    let metric = query.metric.unwrap_or(state.settings.default_metric);
    let dataset = state.snapshot().await;

    let key = CacheKey::SimilarItems {
        generation: dataset.info.generation,
        item_id: item_id.clone(),
        metric,
        k,
    };
    let scores: Vec<SimilarityScore> = cached!(state.cache.as_ref(), key, {
        let item_id = item_id.clone();
        run_blocking(dataset.clone(), move |d| {
            services::similar_items(&d.matrix, &item_id, k, metric)
        })
        .await
    })?;

    Ok(Json(scores))
}

/// Similarity between two users
pub async fn user_similarity(
    State(state): State<AppState>,
    query: Result<Query<PairQuery>, QueryRejection>,
) -> AppResult<Json<SimilarityScore>> {
    let Query(query) = query?;
    let metric = query.metric.unwrap_or(state.settings.default_metric);
    let dataset = state.snapshot().await;
    let score = services::user_similarity(&dataset.matrix, &query.a, &query.b, metric)?;

    Ok(Json(SimilarityScore {
        subject_id: query.a,
        neighbor_id: query.b,
        score,
    }))
}

/// Similarity between two items
pub async fn item_similarity(
    State(state): State<AppState>,
    query: Result<Query<PairQuery>, QueryRejection>,
) -> AppResult<Json<SimilarityScore>> {
    let Query(query) = query?;
    let metric = query.metric.unwrap_or(state.settings.default_metric);
    let dataset = state.snapshot().await;
    let score = services::item_similarity(&dataset.matrix, &query.a, &query.b, metric)?;

    Ok(Json(SimilarityScore {
        subject_id: query.a,
        neighbor_id: query.b,
        score,
    }))
}

/// K-fold cross-validation over a fresh load of the source
pub async fn evaluate(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    request: Option<Json<EvaluateRequest>>,
) -> AppResult<Json<EvaluationReport>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let folds = request.folds.unwrap_or(DEFAULT_FOLDS);
    let metric = request.metric.unwrap_or(state.settings.default_metric);

    tracing::info!(request_id = %request_id, folds, %metric, "Starting evaluation");

    let ratings = state.source().load().await?;
    let settings = state.settings;

    let report = tokio::task::spawn_blocking(move || {
        services::cross_validate(&ratings, settings.scale, folds, metric, &settings.params)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(Json(report))
}
