//! Direct legal-term scrape endpoint

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub term: String,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub explanation: String,
    /// Which provider answered: a site name, "none", or "disabled"
    pub provider: String,
}

pub async fn scrape_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScrapeRequest>,
) -> Result<Json<ScrapeResponse>, AppError> {
    if request.term.trim().is_empty() {
        return Err(AppError(lexrag_core::LexError::InvalidInput(
            "term must not be empty".to_string(),
        )));
    }

    let outcome = state.scrape.scrape(request.term.trim()).await;
    Ok(Json(ScrapeResponse {
        explanation: outcome.explanation,
        provider: outcome.provider,
    }))
}
