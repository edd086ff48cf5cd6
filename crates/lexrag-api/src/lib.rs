//! LexRAG API - HTTP surface for the legal document RAG service
//!
//! Endpoints:
//!
//! - `POST /ingest`: index a server-local document
//! - `POST /query`: answer a question against an ingested document
//! - `POST /summarize`: summarize raw text
//! - `POST /scrape`: look up a legal term on external reference sites
//! - `GET  /health`: liveness, uptime, and credential status

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
