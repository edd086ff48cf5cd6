//! LexRAG RAG - Retrieval-augmented generation over legal documents
//!
//! The moving parts, wired together by the API layer:
//!
//! - [`Ingestor`]: file on disk -> chunked, embedded, persisted index
//! - [`RagPipeline`]: question + index path -> grounded answer with sources
//! - [`Summarizer`]: raw text -> summary
//! - [`RotatingLlmPool`]: Gemini access with key and model rotation

pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod summarize;

pub use ingest::{IngestReport, Ingestor};
pub use llm::{GeminiClient, RotatingLlmPool, TRUNCATION_MARKER};
pub use pipeline::{RagAnswer, RagPipeline, NO_CONTEXT_ANSWER};
pub use summarize::Summarizer;
