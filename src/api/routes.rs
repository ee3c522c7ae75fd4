use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Dataset lifecycle
        .route("/dataset", get(handlers::dataset_info))
        .route("/dataset/reload", post(handlers::reload_dataset))
        // Recommendations and neighbors
        .route("/users/:user_id/recommendations", get(handlers::recommendations))
        .route("/users/:user_id/neighbors", get(handlers::user_neighbors))
        .route("/items/:item_id/similar", get(handlers::similar_items))
        // Pairwise similarity
        .route("/similarity/users", get(handlers::user_similarity))
        .route("/similarity/items", get(handlers::item_similarity))
        // Offline accuracy
        .route("/evaluate", post(handlers::evaluate))
}
