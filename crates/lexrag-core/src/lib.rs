//! LexRAG Core - Shared error taxonomy, configuration, and traits
//!
//! This crate defines the abstractions used throughout the LexRAG service:
//! - The service-wide error type and `Result` alias
//! - Configuration management (defaults, TOML files, environment overrides)
//! - The `LlmClient` trait implemented by generative-model backends
//! - Shared retrieval types

pub mod config;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, LlmConfig, RagConfig, ScrapeConfig, ServerConfig,
    StorageConfig,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Service-wide error type for LexRAG operations
#[derive(Error, Debug)]
pub enum LexError {
    /// A user-supplied path or identifier does not resolve to anything
    #[error("Not found: {0}")]
    NotFound(String),

    /// The file extension is not one of the supported document formats
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Request-level validation failure
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persisted index state violates the chunk/vector alignment invariant
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// Embedding server failure
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    /// Index persistence or load failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Generative model failure
    #[error("LLM error: {0}")]
    LlmError(String),

    /// Scraper provider failure
    #[error("Scrape error: {0}")]
    ScrapeError(String),

    /// Missing or invalid configuration at the point of use
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LexError>;

// ============================================================================
// LLM Client Trait
// ============================================================================

/// Trait for generative-model backends
///
/// A single opaque call: rendered prompt in, text completion out. Quota and
/// availability failures surface as `LexError::LlmError`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for the given prompt
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ============================================================================
// Shared Retrieval Types
// ============================================================================

/// A chunk retrieved from a vector index, paired with its squared-L2
/// distance from the query embedding (smaller is closer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub text: String,
    pub distance: f32,
}

impl ScoredChunk {
    pub fn new(text: impl Into<String>, distance: f32) -> Self {
        Self {
            text: text.into(),
            distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = LexError::NotFound("data/vector_indexes/doc1/index.bin".to_string());
        assert!(err.to_string().contains("doc1"));

        let err = LexError::UnsupportedFormat(".epub".to_string());
        assert!(err.to_string().contains(".epub"));
    }

    #[test]
    fn scored_chunk_construction() {
        let chunk = ScoredChunk::new("Section 498A deals with cruelty", 0.42);
        assert_eq!(chunk.text, "Section 498A deals with cruelty");
        assert!(chunk.distance < 0.5);
    }
}
