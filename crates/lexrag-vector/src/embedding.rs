//! Embedding client for generating dense vector representations
//!
//! Chunks and queries are embedded by a sentence-embedding server spoken to
//! over HTTP. The client is constructed once at startup and shared through
//! application state, so the expensive model materialization happens in the
//! server process exactly once and this side carries no lazy-init state.

use async_trait::async_trait;
use lexrag_core::{LexError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trait for embedding generation
///
/// Implementations must be order-preserving: the i-th output vector always
/// corresponds to the i-th input text, and batching must not change the
/// value of any individual embedding.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text (typically a query)
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, one vector per input, in input order.
    /// An empty input returns an empty output without any network call.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The fixed output dimension of the underlying model
    fn dimension(&self) -> usize;
}

/// HTTP client for a sentence-embedding inference server
pub struct HttpEmbedding {
    client: Client,
    base_url: String,
    model: String,
    batch_size: usize,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl HttpEmbedding {
    /// Create a new client. The dimension is fixed by the model name.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimension = match model.as_str() {
            "all-mpnet-base-v2" => 768,
            "multi-qa-mpnet-base-dot-v1" => 768,
            "all-MiniLM-L6-v2" => 384,
            _ => 768, // Default for mpnet-class models
        };

        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model,
            batch_size: 16,
            dimension,
        }
    }

    /// Create from config, with the configured request timeout.
    pub fn from_config(config: &lexrag_core::EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LexError::EmbeddingError(format!("client build failed: {e}")))?;

        let mut this = Self::new(config.base_url.clone(), config.model.clone());
        this.client = client;
        this.batch_size = config.batch_size.max(1);
        Ok(this)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            inputs: texts,
        };

        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| LexError::EmbeddingError(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LexError::EmbeddingError(format!(
                "embedding server returned {status}: {body}"
            )));
        }

        let result: EmbedResponse = response.json().await.map_err(|e| {
            LexError::EmbeddingError(format!("failed to parse embedding response: {e}"))
        })?;

        if result.embeddings.len() != texts.len() {
            return Err(LexError::EmbeddingError(format!(
                "embedding server returned {} vectors for {} inputs",
                result.embeddings.len(),
                texts.len()
            )));
        }

        Ok(result.embeddings)
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbedding {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.embed_many(&[text.to_string()]).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| LexError::EmbeddingError("no embedding returned".to_string()))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(count = texts.len(), "embedding texts");

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_follows_model_name() {
        assert_eq!(
            HttpEmbedding::new("http://localhost:8080", "all-mpnet-base-v2").dimension(),
            768
        );
        assert_eq!(
            HttpEmbedding::new("http://localhost:8080", "all-MiniLM-L6-v2").dimension(),
            384
        );
        assert_eq!(
            HttpEmbedding::new("http://localhost:8080", "some-custom-model").dimension(),
            768
        );
    }

    #[tokio::test]
    async fn empty_batch_short_circuits_without_a_server() {
        // The URL is unroutable; an empty input must never reach it.
        let client = HttpEmbedding::new("http://127.0.0.1:1", "all-mpnet-base-v2");
        let vectors = client.embed_many(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
