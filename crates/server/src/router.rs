//! HTTP router construction.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;
use crate::{health, sse};

/// Build the application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/sse", get(sse::sse_connect))
        .route(sse::MESSAGES_PATH, post(sse::post_message))
        .route("/messages", post(sse::post_message))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
