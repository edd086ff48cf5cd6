//! Flat-L2 vector index persistence and search
//!
//! Each ingested document gets its own directory under the store root,
//! holding exactly two files written together:
//!
//! - `index.bin`, the bincode-serialized [`FlatIndex`] (dimension + vectors)
//! - `chunks.json`, the parallel ordered chunk texts
//!
//! The i-th stored vector corresponds to the i-th chunk; a count mismatch
//! on load is a corruption error, never silently realigned. Both files are
//! staged next to the live pair and renamed into place only after both
//! writes succeed, and index creation is serialized store-wide, so a failed
//! or concurrent re-ingest never leaves a mixed pair behind. Loaded indexes
//! are cached in memory behind a bounded concurrent cache keyed by path;
//! index contents are immutable after creation, so concurrent readers share
//! one handle safely.

use lexrag_core::{LexError, Result, ScoredChunk};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

const INDEX_FILE: &str = "index.bin";
const CHUNKS_FILE: &str = "chunks.json";

/// Number of loaded indexes kept in memory at once.
const CACHE_CAPACITY: u64 = 64;

// ============================================================================
// Flat Index
// ============================================================================

/// An exact nearest-neighbor structure: row-major vectors searched by
/// squared L2 distance with a linear scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Build from row vectors; all rows must share one non-zero dimension.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let dimension = rows
            .first()
            .map(|r| r.len())
            .ok_or_else(|| LexError::InvalidInput("cannot index zero vectors".to_string()))?;
        if dimension == 0 {
            return Err(LexError::InvalidInput(
                "embedding dimension must be non-zero".to_string(),
            ));
        }

        let mut vectors = Vec::with_capacity(rows.len() * dimension);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dimension {
                return Err(LexError::InvalidInput(format!(
                    "vector {i} has dimension {}, expected {dimension}",
                    row.len()
                )));
            }
            vectors.extend_from_slice(row);
        }

        Ok(Self { dimension, vectors })
    }

    /// An index holding zero vectors of the given dimension. Searching it
    /// always returns nothing; useful for pre-seeding a document slot.
    pub fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    /// Serialized form, as written to `index.bin`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| LexError::StorageError(format!("serialize index: {e}")))
    }

    /// Number of stored vectors
    pub fn count(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.vectors.len() / self.dimension
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Exact search: up to `k` row indices with their squared L2 distances,
    /// nearest first. Ties keep scan order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let count = self.count();
        if count == 0 || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = (0..count)
            .map(|i| {
                let row = &self.vectors[i * self.dimension..(i + 1) * self.dimension];
                let dist = row
                    .iter()
                    .zip(query)
                    .map(|(a, b)| {
                        let d = a - b;
                        d * d
                    })
                    .sum::<f32>();
                (i, dist)
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

/// An index loaded together with its parallel chunk texts
#[derive(Debug)]
pub struct LoadedIndex {
    pub index: FlatIndex,
    pub chunks: Vec<String>,
}

// ============================================================================
// Vector Index Store
// ============================================================================

/// Owns every loaded index; callers only ever hold path strings.
pub struct VectorIndexStore {
    root: PathBuf,
    cache: Cache<PathBuf, Arc<LoadedIndex>>,
    /// Serializes index creation. Concurrent re-ingests of one document
    /// resolve to whichever writer publishes last, never a mixed pair.
    write_lock: Mutex<()>,
}

impl VectorIndexStore {
    /// Create a store rooted at the per-document index directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Cache::new(CACHE_CAPACITY),
            write_lock: Mutex::new(()),
        }
    }

    /// Build and persist a new index for `document_id`, replacing any prior
    /// index for the same document. Returns the path of the index file.
    pub async fn create_index(
        &self,
        vectors: &[Vec<f32>],
        chunks: &[String],
        document_id: &str,
    ) -> Result<PathBuf> {
        if vectors.len() != chunks.len() {
            return Err(LexError::InvalidInput(format!(
                "{} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        let index = FlatIndex::from_rows(vectors)?;

        let dir = self.root.join(document_id);
        let index_path = dir.join(INDEX_FILE);
        let chunks_path = dir.join(CHUNKS_FILE);

        let index_bytes = index.to_bytes()?;
        let chunk_bytes = serde_json::to_vec(chunks)
            .map_err(|e| LexError::StorageError(format!("serialize chunks: {e}")))?;

        {
            // The lock is held only across this synchronous section, so it
            // never crosses an await point.
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

            std::fs::create_dir_all(&dir)
                .map_err(|e| LexError::StorageError(format!("create {}: {e}", dir.display())))?;

            // Stage both files next to the live pair, then rename them into
            // place. A failed write aborts before either live file changes,
            // leaving the previous index fully intact.
            let staged_index = dir.join(format!("{INDEX_FILE}.tmp"));
            let staged_chunks = dir.join(format!("{CHUNKS_FILE}.tmp"));
            let staged = std::fs::write(&staged_index, index_bytes)
                .and_then(|()| std::fs::write(&staged_chunks, chunk_bytes));
            if let Err(e) = staged {
                let _ = std::fs::remove_file(&staged_index);
                let _ = std::fs::remove_file(&staged_chunks);
                return Err(LexError::StorageError(format!(
                    "stage index in {}: {e}",
                    dir.display()
                )));
            }

            std::fs::rename(&staged_index, &index_path)
                .and_then(|()| std::fs::rename(&staged_chunks, &chunks_path))
                .map_err(|e| {
                    LexError::StorageError(format!("publish index in {}: {e}", dir.display()))
                })?;
        }

        // A re-ingest must not serve the superseded index from memory.
        self.cache.invalidate(&index_path).await;

        tracing::info!(
            path = %index_path.display(),
            chunks = chunks.len(),
            "created vector index"
        );

        Ok(index_path)
    }

    /// Load an index, reusing the in-memory handle when available.
    ///
    /// Two concurrent first loads of the same path may both read from disk;
    /// the contents are identical, so last-insert-wins is harmless.
    pub async fn load_index(&self, index_path: &Path) -> Result<Arc<LoadedIndex>> {
        if let Some(loaded) = self.cache.get(&index_path.to_path_buf()).await {
            return Ok(loaded);
        }

        let loaded = Arc::new(Self::read_from_disk(index_path)?);
        self.cache
            .insert(index_path.to_path_buf(), Arc::clone(&loaded))
            .await;

        tracing::info!(path = %index_path.display(), "loaded vector index");
        Ok(loaded)
    }

    /// Search an index for the `k` chunks nearest to `query_vector`,
    /// ascending by distance. Requesting more results than the index holds
    /// returns everything it has.
    pub async fn search(
        &self,
        index_path: &Path,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let loaded = self.load_index(index_path).await?;

        if loaded.index.count() == 0 {
            return Ok(Vec::new());
        }
        if query_vector.len() != loaded.index.dimension() {
            return Err(LexError::InvalidInput(format!(
                "query dimension {} does not match index dimension {}",
                query_vector.len(),
                loaded.index.dimension()
            )));
        }

        let hits = loaded.index.search(query_vector, k);
        let results: Vec<ScoredChunk> = hits
            .into_iter()
            // Out-of-range rows are dropped rather than failing the search.
            .filter(|(idx, _)| *idx < loaded.chunks.len())
            .map(|(idx, dist)| ScoredChunk::new(loaded.chunks[idx].clone(), dist))
            .collect();

        tracing::debug!(path = %index_path.display(), hits = results.len(), "index search");
        Ok(results)
    }

    fn read_from_disk(index_path: &Path) -> Result<LoadedIndex> {
        if !index_path.exists() {
            return Err(LexError::NotFound(format!(
                "index not found: {}",
                index_path.display()
            )));
        }

        let index_bytes = std::fs::read(index_path)
            .map_err(|e| LexError::StorageError(format!("read {}: {e}", index_path.display())))?;
        let index: FlatIndex = bincode::deserialize(&index_bytes).map_err(|e| {
            LexError::CorruptIndex(format!("unreadable index {}: {e}", index_path.display()))
        })?;

        let chunks_path = index_path
            .parent()
            .map(|dir| dir.join(CHUNKS_FILE))
            .ok_or_else(|| {
                LexError::StorageError(format!("index has no parent dir: {}", index_path.display()))
            })?;
        let chunk_bytes = std::fs::read(&chunks_path).map_err(|e| {
            LexError::CorruptIndex(format!("missing chunk file {}: {e}", chunks_path.display()))
        })?;
        let chunks: Vec<String> = serde_json::from_slice(&chunk_bytes).map_err(|e| {
            LexError::CorruptIndex(format!("unreadable chunks {}: {e}", chunks_path.display()))
        })?;

        if chunks.len() != index.count() {
            return Err(LexError::CorruptIndex(format!(
                "{}: {} chunks for {} vectors",
                index_path.display(),
                chunks.len(),
                index.count()
            )));
        }

        Ok(LoadedIndex { index, chunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vectors() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 2.0, 0.0],
            vec![3.0, 3.0, 3.0],
        ]
    }

    fn sample_chunks() -> Vec<String> {
        vec![
            "chunk zero".to_string(),
            "chunk one".to_string(),
            "chunk two".to_string(),
            "chunk three".to_string(),
        ]
    }

    #[tokio::test]
    async fn create_then_load_preserves_order_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorIndexStore::new(dir.path());

        let path = store
            .create_index(&sample_vectors(), &sample_chunks(), "doc1")
            .await
            .unwrap();
        assert!(path.ends_with("doc1/index.bin"));

        let loaded = store.load_index(&path).await.unwrap();
        assert_eq!(loaded.index.count(), 4);
        assert_eq!(loaded.chunks, sample_chunks());
    }

    #[tokio::test]
    async fn search_returns_ascending_distances() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorIndexStore::new(dir.path());
        let path = store
            .create_index(&sample_vectors(), &sample_chunks(), "doc1")
            .await
            .unwrap();

        let results = store.search(&path, &[0.1, 0.0, 0.0], 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].text, "chunk zero");
        assert_eq!(results[1].text, "chunk one");
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[tokio::test]
    async fn oversized_k_returns_everything_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorIndexStore::new(dir.path());
        let path = store
            .create_index(&sample_vectors(), &sample_chunks(), "doc1")
            .await
            .unwrap();

        let results = store.search(&path, &[0.0, 0.0, 0.0], 100).await.unwrap();
        assert_eq!(results.len(), 4);
    }

    #[tokio::test]
    async fn missing_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorIndexStore::new(dir.path());

        let err = store
            .load_index(&dir.path().join("ghost/index.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, LexError::NotFound(_)));
    }

    #[tokio::test]
    async fn chunk_count_mismatch_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorIndexStore::new(dir.path());
        let path = store
            .create_index(&sample_vectors(), &sample_chunks(), "doc1")
            .await
            .unwrap();

        // Drop one chunk behind the store's back
        let chunks_path = path.parent().unwrap().join("chunks.json");
        let mut chunks: Vec<String> =
            serde_json::from_slice(&std::fs::read(&chunks_path).unwrap()).unwrap();
        chunks.pop();
        std::fs::write(&chunks_path, serde_json::to_vec(&chunks).unwrap()).unwrap();

        // Fresh store so nothing is served from cache
        let store = VectorIndexStore::new(dir.path());
        let err = store.load_index(&path).await.unwrap_err();
        assert!(matches!(err, LexError::CorruptIndex(_)));
    }

    #[tokio::test]
    async fn mixed_dimensions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorIndexStore::new(dir.path());

        let vectors = vec![vec![1.0, 2.0], vec![1.0, 2.0, 3.0]];
        let chunks = vec!["a".to_string(), "b".to_string()];
        let err = store.create_index(&vectors, &chunks, "doc1").await.unwrap_err();
        assert!(matches!(err, LexError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn empty_input_is_rejected_at_creation() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorIndexStore::new(dir.path());
        let err = store.create_index(&[], &[], "doc1").await.unwrap_err();
        assert!(matches!(err, LexError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn reingest_replaces_the_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorIndexStore::new(dir.path());

        let path = store
            .create_index(&sample_vectors(), &sample_chunks(), "doc1")
            .await
            .unwrap();
        // Warm the cache, then re-ingest with fewer chunks
        store.load_index(&path).await.unwrap();

        let vectors = vec![vec![9.0, 9.0, 9.0]];
        let chunks = vec!["replacement".to_string()];
        let path2 = store.create_index(&vectors, &chunks, "doc1").await.unwrap();
        assert_eq!(path, path2);

        let loaded = store.load_index(&path).await.unwrap();
        assert_eq!(loaded.index.count(), 1);
        assert_eq!(loaded.chunks, chunks);
    }

    #[tokio::test]
    async fn failed_reingest_leaves_previous_index_intact() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorIndexStore::new(dir.path());
        let path = store
            .create_index(&sample_vectors(), &sample_chunks(), "doc1")
            .await
            .unwrap();

        // Occupy the chunk staging path with a directory so the second
        // staging write fails after the first one succeeded.
        std::fs::create_dir(dir.path().join("doc1").join("chunks.json.tmp")).unwrap();

        let vectors = vec![vec![9.0, 9.0, 9.0]];
        let chunks = vec!["replacement".to_string()];
        let err = store.create_index(&vectors, &chunks, "doc1").await.unwrap_err();
        assert!(matches!(err, LexError::StorageError(_)));

        // Fresh store, so nothing is served from memory: the live pair on
        // disk must still be the original, aligned index.
        let store = VectorIndexStore::new(dir.path());
        let loaded = store.load_index(&path).await.unwrap();
        assert_eq!(loaded.index.count(), 4);
        assert_eq!(loaded.chunks, sample_chunks());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_reingests_publish_one_complete_pair() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(VectorIndexStore::new(dir.path()));

        let a_chunks = vec!["alpha one".to_string(), "alpha two".to_string()];
        let a_vectors = vec![vec![1.0, 0.0, 0.0], vec![2.0, 0.0, 0.0]];
        let b_chunks = vec![
            "beta one".to_string(),
            "beta two".to_string(),
            "beta three".to_string(),
        ];
        let b_vectors = vec![
            vec![0.0, 1.0, 0.0],
            vec![0.0, 2.0, 0.0],
            vec![0.0, 3.0, 0.0],
        ];

        let writer_a = {
            let store = Arc::clone(&store);
            let (vectors, chunks) = (a_vectors, a_chunks.clone());
            tokio::spawn(async move {
                for _ in 0..25 {
                    store.create_index(&vectors, &chunks, "doc1").await.unwrap();
                }
            })
        };
        let writer_b = {
            let store = Arc::clone(&store);
            let (vectors, chunks) = (b_vectors, b_chunks.clone());
            tokio::spawn(async move {
                for _ in 0..25 {
                    store.create_index(&vectors, &chunks, "doc1").await.unwrap();
                }
            })
        };
        writer_a.await.unwrap();
        writer_b.await.unwrap();

        // The surviving pair must be one writer's in full, never a mix of
        // one writer's vectors with the other's chunks.
        let store = VectorIndexStore::new(dir.path());
        let loaded = store
            .load_index(&dir.path().join("doc1").join("index.bin"))
            .await
            .unwrap();
        assert!(
            loaded.chunks == a_chunks || loaded.chunks == b_chunks,
            "mixed pair survived: {:?}",
            loaded.chunks
        );
        assert_eq!(loaded.index.count(), loaded.chunks.len());
    }

    #[tokio::test]
    async fn consistent_empty_index_on_disk_loads_and_searches() {
        // create_index refuses zero vectors, but a consistent zero-count
        // pair on disk is readable and simply returns no results.
        let dir = tempfile::tempdir().unwrap();
        let doc_dir = dir.path().join("empty_doc");
        std::fs::create_dir_all(&doc_dir).unwrap();

        let index = FlatIndex::empty(3);
        std::fs::write(doc_dir.join("index.bin"), index.to_bytes().unwrap()).unwrap();
        std::fs::write(doc_dir.join("chunks.json"), b"[]").unwrap();

        let store = VectorIndexStore::new(dir.path());
        let path = doc_dir.join("index.bin");
        let results = store.search(&path, &[0.0, 0.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());
    }
}
