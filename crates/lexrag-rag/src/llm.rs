//! Gemini client and key/model rotation
//!
//! A single [`GeminiClient`] is a bound (key, model) pair talking to the
//! `generateContent` REST endpoint. [`RotatingLlmPool`] hands out clients
//! while spreading load across every configured API key and model: the
//! key cursor advances on every checkout, the model cursor only when the
//! caller has not pinned a model. Cursors are plain atomics, so checkout
//! never blocks and the distribution stays round-robin under concurrency.

use async_trait::async_trait;
use lexrag_core::{LexError, LlmClient, LlmConfig, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Appended when a prompt context is cut down to fit the model window.
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

// ============================================================================
// Gemini Client
// ============================================================================

/// One concrete (API key, model) binding against the Gemini REST API.
#[derive(Debug)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    /// Model this client is bound to.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.chars().count(), "calling Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LexError::LlmError(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LexError::LlmError(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LexError::LlmError(format!("invalid Gemini response: {}", e)))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| LexError::LlmError("Gemini returned no candidates".to_string()))?;

        Ok(text)
    }
}

// ============================================================================
// Rotating Pool
// ============================================================================

/// Round-robin pool over configured Gemini API keys and model names.
pub struct RotatingLlmPool {
    client: Client,
    base_url: String,
    keys: Vec<String>,
    models: Vec<String>,
    key_cursor: AtomicUsize,
    model_cursor: AtomicUsize,
    temperature: f32,
    max_output_tokens: u32,
}

impl RotatingLlmPool {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LexError::LlmError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: GEMINI_BASE_URL.to_string(),
            keys: config.api_keys.clone(),
            models: config.models.clone(),
            key_cursor: AtomicUsize::new(0),
            model_cursor: AtomicUsize::new(0),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Number of API keys available for rotation.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Check out a client bound to the next key in rotation.
    ///
    /// A pinned `model` leaves the model cursor untouched; `None` advances
    /// it, so sequential unpinned checkouts cycle through every configured
    /// model. An empty key pool is a configuration error at the point of
    /// use, not at construction, so a service can boot without credentials
    /// and report them missing per request.
    pub fn get_client(&self, model: Option<&str>, temperature: Option<f32>) -> Result<GeminiClient> {
        if self.keys.is_empty() {
            return Err(LexError::ConfigError(
                "no Gemini API keys configured (set GEMINI_API_KEYS)".to_string(),
            ));
        }
        if self.models.is_empty() {
            return Err(LexError::ConfigError(
                "no Gemini models configured".to_string(),
            ));
        }

        let key_idx = self.key_cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        let model = match model {
            Some(m) => m.to_string(),
            None => {
                let idx = self.model_cursor.fetch_add(1, Ordering::Relaxed) % self.models.len();
                self.models[idx].clone()
            }
        };

        tracing::debug!(key_idx, model = %model, "checked out LLM client");

        Ok(GeminiClient {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.keys[key_idx].clone(),
            model,
            temperature: temperature.unwrap_or(self.temperature),
            max_output_tokens: self.max_output_tokens,
        })
    }
}

#[async_trait]
impl LlmClient for RotatingLlmPool {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.get_client(None, None)?.generate(prompt).await
    }
}

// ============================================================================
// Context truncation
// ============================================================================

/// Hard-cap `text` at `max_chars` characters, marking the cut.
///
/// The cap counts characters, not bytes, so multibyte text never gets
/// split mid-codepoint. Text at or under the cap passes through unchanged.
pub fn truncate_context(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

// ============================================================================
// Tests
// ============================================================================
