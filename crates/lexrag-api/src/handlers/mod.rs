//! Request handlers, one module per endpoint

pub mod health;
pub mod ingest;
pub mod query;
pub mod scrape;
pub mod summarize;
