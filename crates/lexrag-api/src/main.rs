//! LexRAG API server binary

use lexrag_api::{create_router, AppState};
use lexrag_core::config::AppConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexrag=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    config.ensure_storage_dirs()?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let keys = config.llm.api_keys.len();
    let state = Arc::new(AppState::new(config)?);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, keys_configured = keys, "LexRAG server listening");
    if keys == 0 {
        tracing::warn!("no Gemini API keys configured; /query and /summarize will fail");
    }

    axum::serve(listener, app).await?;
    Ok(())
}
