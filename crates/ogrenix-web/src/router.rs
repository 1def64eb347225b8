//! Axum router — maps all URL paths to handlers.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{generate, image, index, logs, system};
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Pages
        .route("/",           get(index::index_page))
        .route("/logs",       get(logs::logs_page))

        // Lesson generation (SSE stream unless stream=false)
        .route("/generate",   post(generate::generate))

        // API endpoints
        .route("/logs/json",  get(logs::logs_json))
        .route("/logs/clear", get(logs::logs_clear))
        .route("/api/image",  post(image::generate_image))
        .route("/health",     get(system::health))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
