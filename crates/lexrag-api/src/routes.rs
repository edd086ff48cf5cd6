//! Route definitions

use crate::handlers::{health, ingest, query, scrape, summarize};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the full application router over shared state.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/ingest", post(ingest::ingest_handler))
        .route("/query", post(query::query_handler))
        .route("/summarize", post(summarize::summarize_handler))
        .route("/scrape", post(scrape::scrape_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
