//! RAG query endpoint

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Index handle returned by /ingest
    #[serde(rename = "faissIndexPath")]
    pub index_path: PathBuf,
    /// Extra instructions appended to the prompt
    #[serde(rename = "userPrompt", default)]
    pub user_prompt: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError(lexrag_core::LexError::InvalidInput(
            "query must not be empty".to_string(),
        )));
    }

    tracing::info!(index = %request.index_path.display(), "query requested");
    let result = state
        .pipeline
        .answer(&request.index_path, &request.query, &request.user_prompt)
        .await?;

    Ok(Json(QueryResponse {
        answer: result.answer,
        sources: result.sources,
    }))
}
