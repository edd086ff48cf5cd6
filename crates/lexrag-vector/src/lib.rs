//! LexRAG Vector - Chunking, embedding, and index management
//!
//! This crate owns the retrieval-side data path:
//! - [`chunking::TextChunker`] splits document text into overlapping chunks
//! - [`embedding::EmbeddingClient`] turns chunks and queries into vectors
//! - [`store::VectorIndexStore`] persists, caches, and searches the
//!   per-document flat-L2 indexes
//!
//! The invariant tying everything together: the i-th stored vector of an
//! index always corresponds to the i-th chunk in its parallel chunk file.

pub mod chunking;
pub mod embedding;
pub mod store;

pub use chunking::{ChunkError, TextChunker};
pub use embedding::{EmbeddingClient, HttpEmbedding};
pub use store::{FlatIndex, VectorIndexStore};
