//! Router configuration.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{handlers, AppState};

/// Uploads are capped at 20 MB, matching what the service's clients enforce.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ocr", post(handlers::ocr))
        .route("/health", get(handlers::health))
        .route("/export", post(handlers::export))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        // Callers are browser frontends on other origins; the service
        // itself performs no authentication.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
