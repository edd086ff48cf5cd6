//! Document summarization endpoint

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

pub async fn summarize_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError(lexrag_core::LexError::InvalidInput(
            "text must not be empty".to_string(),
        )));
    }

    let summary = state.summarizer.summarize(&request.text).await?;
    Ok(Json(SummarizeResponse { summary }))
}
