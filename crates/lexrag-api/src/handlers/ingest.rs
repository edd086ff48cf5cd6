//! Document ingestion endpoint

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// Server-local path of the document to ingest
    pub filepath: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Handle for subsequent /query calls against this document
    #[serde(rename = "faissIndexPath")]
    pub index_path: PathBuf,
    pub chunks: usize,
}

pub async fn ingest_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    tracing::info!(path = %request.filepath.display(), "ingest requested");
    let report = state.ingestor.ingest(&request.filepath).await?;
    Ok(Json(IngestResponse {
        index_path: report.index_path,
        chunks: report.chunk_count,
    }))
}
