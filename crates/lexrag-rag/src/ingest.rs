//! Document ingestion orchestrator
//!
//! Turns a file on disk into a searchable vector index: extract text,
//! chunk it, embed every chunk, persist the index under the document's
//! identifier. Re-ingesting the same document replaces its index.

use lexrag_core::{LexError, RagConfig, Result};
use lexrag_parser::ParserError;
use lexrag_vector::{EmbeddingClient, TextChunker, VectorIndexStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Path of the persisted index file, the handle later queries use.
    pub index_path: PathBuf,
    pub chunk_count: usize,
}

pub struct Ingestor {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<VectorIndexStore>,
}

impl Ingestor {
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<VectorIndexStore>,
    ) -> Result<Self> {
        let chunker = TextChunker::new(config.chunk_size, config.chunk_overlap)
            .map_err(|e| LexError::ConfigError(e.to_string()))?;
        Ok(Self {
            chunker,
            embedder,
            store,
        })
    }

    /// Ingest the document at `filepath`, returning where its index landed.
    pub async fn ingest(&self, filepath: &Path) -> Result<IngestReport> {
        let path = filepath.to_path_buf();
        // Parsing is CPU-bound (PDFs especially), keep it off the runtime.
        let text = tokio::task::spawn_blocking(move || lexrag_parser::extract_text(&path))
            .await
            .map_err(|e| LexError::Other(anyhow::anyhow!("parse task failed: {e}")))?
            .map_err(map_parser_error)?;

        if text.trim().is_empty() {
            return Err(LexError::InvalidInput(format!(
                "{} produced no text to index",
                filepath.display()
            )));
        }
        let chunks = self.chunker.chunk(&text);

        tracing::info!(
            path = %filepath.display(),
            chars = text.chars().count(),
            chunks = chunks.len(),
            "document chunked"
        );

        let vectors = self.embedder.embed_many(&chunks).await?;
        let doc_id = document_id(filepath);
        let index_path = self.store.create_index(&vectors, &chunks, &doc_id).await?;

        Ok(IngestReport {
            index_path,
            chunk_count: chunks.len(),
        })
    }
}

/// Stable identifier for a document: its parent directory name, so every
/// upload slot maps to one index. Falls back to the file stem for files
/// sitting at a filesystem root.
fn document_id(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .or_else(|| path.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

fn map_parser_error(err: ParserError) -> LexError {
    match err {
        ParserError::UnsupportedFormat(ext) => LexError::UnsupportedFormat(ext),
        ParserError::IoError { path, .. } => LexError::NotFound(format!("cannot read {path}")),
        other => LexError::InvalidInput(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct LenEmbedder;

    #[async_trait]
    impl EmbeddingClient for LenEmbedder {
        async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0, 0.0])
        }

        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for t in texts {
                out.push(self.embed_one(t).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    fn ingestor(dir: &TempDir) -> (Ingestor, Arc<VectorIndexStore>) {
        let store = Arc::new(VectorIndexStore::new(dir.path().join("indexes")));
        let ingestor = Ingestor::new(
            &RagConfig::default(),
            Arc::new(LenEmbedder),
            Arc::clone(&store),
        )
        .unwrap();
        (ingestor, store)
    }

    #[test]
    fn document_id_uses_parent_directory() {
        assert_eq!(document_id(Path::new("/data/uploads/case42/fir.pdf")), "case42");
        assert_eq!(document_id(Path::new("orphan.txt")), "orphan");
    }

    #[tokio::test]
    async fn text_file_round_trips_into_a_searchable_index() {
        let dir = TempDir::new().unwrap();
        let doc_dir = dir.path().join("uploads").join("lease7");
        std::fs::create_dir_all(&doc_dir).unwrap();
        let file = doc_dir.join("agreement.txt");

        // Roughly 3000 chars of paragraphs, enough for several 1200-char
        // chunks with 200 overlap.
        let para = "The lessee shall maintain the premises in good repair and shall not \
                    sublet any portion thereof without the prior written consent of the \
                    lessor, such consent not to be unreasonably withheld by either party.\n\n";
        std::fs::write(&file, para.repeat(15)).unwrap();

        let (ingestor, store) = ingestor(&dir);
        let report = ingestor.ingest(&file).await.unwrap();

        assert!(report.index_path.ends_with("lease7/index.bin"));
        assert!((3..=5).contains(&report.chunk_count));

        let loaded = store.load_index(&report.index_path).await.unwrap();
        assert_eq!(loaded.chunks.len(), report.chunk_count);
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.xlsx");
        std::fs::write(&file, b"not really a spreadsheet").unwrap();

        let (ingestor, _) = ingestor(&dir);
        let err = ingestor.ingest(&file).await.unwrap_err();
        assert!(matches!(err, LexError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (ingestor, _) = ingestor(&dir);
        let err = ingestor.ingest(&dir.path().join("ghost.txt")).await.unwrap_err();
        assert!(matches!(err, LexError::NotFound(_)));
    }

    #[tokio::test]
    async fn whitespace_only_document_is_invalid_input() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("blank.txt");
        std::fs::write(&file, "   \n\n   ").unwrap();

        let (ingestor, _) = ingestor(&dir);
        let err = ingestor.ingest(&file).await.unwrap_err();
        assert!(matches!(err, LexError::InvalidInput(_)));
    }
}
