//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{health, index, predict, preflight};
use crate::middleware::{cors_headers, json_errors, panic_response, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route("/", get(index).options(preflight))
        .route("/health", get(health).options(preflight))
        .route("/predict", post(predict).options(preflight))
        .layer(CatchPanicLayer::custom(panic_response))
        // Replaced by the configurable limit below.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(middleware::from_fn(json_errors))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(cors_headers))
        .with_state(state)
}
