//! LexRAG configuration management
//!
//! Configuration is layered: compiled-in defaults, then an optional TOML
//! file, then environment variables. Environment always wins for secrets
//! (the Gemini key pool is never read from a file).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Gemini credential/model pools and generation parameters
    pub llm: LlmConfig,

    /// Embedding server configuration
    pub embedding: EmbeddingConfig,

    /// Retrieval pipeline configuration
    pub rag: RagConfig,

    /// On-disk storage layout
    pub storage: StorageConfig,

    /// Legal-term scraping configuration
    pub scrape: ScrapeConfig,
}

impl AppConfig {
    /// Load configuration from environment variables over defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: port,
            })?;
        }

        // Credential pool: comma-separated, order defines rotation order
        if let Ok(keys) = std::env::var("GEMINI_API_KEYS") {
            config.llm.api_keys = keys
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(models) = std::env::var("GEMINI_MODELS") {
            config.llm.models = models
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(url) = std::env::var("EMBEDDING_URL") {
            config.embedding.base_url = url;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        if let Ok(top_k) = std::env::var("RAG_TOP_K") {
            config.rag.top_k = top_k.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RAG_TOP_K".to_string(),
                value: top_k,
            })?;
        }

        if let Ok(root) = std::env::var("DATA_ROOT") {
            config.storage.data_root = PathBuf::from(root);
        }

        if let Ok(enabled) = std::env::var("SCRAPE_ENABLED") {
            config.scrape.enabled = enabled.to_lowercase() == "true";
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Create the storage directories this configuration points at
    pub fn ensure_storage_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.storage.vector_indexes())?;
        std::fs::create_dir_all(self.storage.scrape_cache())?;
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Gemini LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Credential pool for round-robin rotation (set via GEMINI_API_KEYS)
    #[serde(skip_serializing, default)]
    pub api_keys: Vec<String>,

    /// Model-identifier pool, rotated when the caller does not pin a model
    pub models: Vec<String>,

    /// Generation temperature
    pub temperature: f32,

    /// Maximum output tokens per completion
    pub max_output_tokens: u32,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            models: vec![
                "gemini-2.0-flash-exp".to_string(),
                "gemini-exp-1206".to_string(),
                "gemini-2.0-flash-thinking-exp-1219".to_string(),
            ],
            temperature: 0.3,
            max_output_tokens: 8192,
            timeout_secs: 60,
        }
    }
}

/// Embedding server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL of the sentence-embedding server
    pub base_url: String,

    /// Embedding model name (fixes the vector dimension)
    pub model: String,

    /// Batch size for bulk embedding; performance knob only
    pub batch_size: usize,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            model: "all-mpnet-base-v2".to_string(),
            batch_size: 16,
            timeout_secs: 30,
        }
    }
}

/// Retrieval pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Number of chunks retrieved per query
    pub top_k: usize,

    /// Character budget for the assembled context window
    pub max_context_chars: usize,

    /// Chunk size in characters
    pub chunk_size: usize,

    /// Chunk overlap in characters (must stay below chunk_size)
    pub chunk_overlap: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 20,
            max_context_chars: 900_000,
            chunk_size: 1200,
            chunk_overlap: 200,
        }
    }
}

/// On-disk storage layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for all persisted state
    pub data_root: PathBuf,
}

impl StorageConfig {
    /// Per-document vector index directories live here
    pub fn vector_indexes(&self) -> PathBuf {
        self.data_root.join("vector_indexes")
    }

    /// Scrape cache entries live here
    pub fn scrape_cache(&self) -> PathBuf {
        self.data_root.join("cache").join("scrape")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
        }
    }
}

/// Legal-term scraping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Master switch for all outbound scraping
    pub enabled: bool,

    /// Cache entry lifetime in hours
    pub cache_ttl_hours: i64,

    /// Minimum seconds between requests to one provider
    pub min_request_interval_secs: f64,

    /// Retry attempts per provider request
    pub max_retries: u32,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_ttl_hours: 72,
            min_request_interval_secs: 1.0,
            max_retries: 3,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
