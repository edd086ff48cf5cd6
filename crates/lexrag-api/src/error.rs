//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lexrag_core::LexError;
use serde::{Deserialize, Serialize};

/// JSON error body returned on every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

/// Handler-level error: wraps a domain error and renders it as a status
/// code plus [`ApiError`] body.
#[derive(Debug)]
pub struct AppError(pub LexError);

impl From<LexError> for AppError {
    fn from(err: LexError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            LexError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            LexError::UnsupportedFormat(_) | LexError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }

        (status, Json(ApiError::new(code, self.0.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (LexError::NotFound("index".into()), StatusCode::NOT_FOUND),
            (
                LexError::UnsupportedFormat("xlsx".into()),
                StatusCode::BAD_REQUEST,
            ),
            (LexError::InvalidInput("empty".into()), StatusCode::BAD_REQUEST),
            (
                LexError::LlmError("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                LexError::ConfigError("no keys".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let response = AppError(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
