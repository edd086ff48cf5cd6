//! Application state shared across handlers
//!
//! Every component behind the handlers is held as an `Arc`, built once at
//! startup and injectable for tests through [`AppState::with_components`].

use lexrag_core::config::AppConfig;
use lexrag_core::{LlmClient, Result};
use lexrag_rag::{Ingestor, RagPipeline, RotatingLlmPool, Summarizer};
use lexrag_scrape::ScrapeService;
use lexrag_vector::{EmbeddingClient, HttpEmbedding, VectorIndexStore};
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    pub config: AppConfig,
    pub start_time: Instant,
    pub keys_configured: usize,
    pub ingestor: Arc<Ingestor>,
    pub pipeline: Arc<RagPipeline>,
    pub summarizer: Arc<Summarizer>,
    pub scrape: Arc<ScrapeService>,
}

impl AppState {
    /// Wire up the full production component graph from configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingClient> = Arc::new(HttpEmbedding::from_config(
            &config.embedding,
        )?);
        let store = Arc::new(VectorIndexStore::new(config.storage.vector_indexes()));
        let pool = Arc::new(RotatingLlmPool::new(&config.llm)?);
        let scrape = Arc::new(ScrapeService::new(
            &config.scrape,
            config.storage.scrape_cache(),
        ));
        Self::with_components(config, embedder, store, pool, scrape)
    }

    /// Assemble state from externally built components. Tests use this to
    /// substitute mock embedding and LLM clients.
    pub fn with_components(
        config: AppConfig,
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<VectorIndexStore>,
        llm: Arc<dyn LlmClient>,
        scrape: Arc<ScrapeService>,
    ) -> Result<Self> {
        let keys_configured = config.llm.api_keys.len();
        let ingestor = Arc::new(Ingestor::new(
            &config.rag,
            Arc::clone(&embedder),
            Arc::clone(&store),
        )?);
        let pipeline = Arc::new(RagPipeline::new(
            embedder,
            store,
            Arc::clone(&llm),
            Arc::clone(&scrape),
            &config.rag,
        ));
        let summarizer = Arc::new(Summarizer::new(llm, config.rag.max_context_chars));

        Ok(Self {
            config,
            start_time: Instant::now(),
            keys_configured,
            ingestor,
            pipeline,
            summarizer,
            scrape,
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
