//! Time-expiring on-disk cache for scraped term explanations
//!
//! One JSON file per term under the cache directory. Entries past their TTL
//! read as absent and are overwritten lazily by the next `put`; nothing is
//! actively purged. Terms are sanitized before becoming filename components
//! so a hostile term string cannot escape the cache directory.

use chrono::{DateTime, Duration, Utc};
use lexrag_core::{LexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A cached scrape result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub term: String,
    pub explanation: String,
    pub provider: String,
    pub timestamp: DateTime<Utc>,
}

/// File-per-term cache with a fixed TTL
pub struct ScrapeCache {
    dir: PathBuf,
    ttl_hours: i64,
}

impl ScrapeCache {
    pub fn new(dir: impl Into<PathBuf>, ttl_hours: i64) -> Self {
        Self {
            dir: dir.into(),
            ttl_hours,
        }
    }

    /// Look up a term; expired or unreadable entries read as absent.
    pub fn get(&self, term: &str) -> Option<CacheEntry> {
        let path = self.entry_path(term);
        let bytes = std::fs::read(&path).ok()?;
        let entry: CacheEntry = serde_json::from_slice(&bytes).ok()?;

        let expiry = entry.timestamp + Duration::hours(self.ttl_hours);
        if Utc::now() > expiry {
            tracing::info!(term, "scrape cache entry expired");
            return None;
        }

        tracing::info!(term, provider = %entry.provider, "scrape cache hit");
        Some(entry)
    }

    /// Store a result, overwriting any existing entry unconditionally.
    pub fn put(&self, term: &str, explanation: &str, provider: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| LexError::StorageError(format!("create {}: {e}", self.dir.display())))?;

        let entry = CacheEntry {
            term: term.to_string(),
            explanation: explanation.to_string(),
            provider: provider.to_string(),
            timestamp: Utc::now(),
        };

        let path = self.entry_path(term);
        let bytes = serde_json::to_vec_pretty(&entry)
            .map_err(|e| LexError::StorageError(format!("serialize cache entry: {e}")))?;
        std::fs::write(&path, bytes)
            .map_err(|e| LexError::StorageError(format!("write {}: {e}", path.display())))?;

        tracing::info!(term, provider, "cached scrape result");
        Ok(())
    }

    fn entry_path(&self, term: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_term(term)))
    }

    #[cfg(test)]
    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Reduce a term to a safe filename component. Case is preserved (cache
/// keys are case-sensitive); anything outside a conservative portable set
/// becomes an underscore.
fn sanitize_term(term: &str) -> String {
    let cleaned: String = term
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // A term of only dots could still walk the tree as "." / ".."
    let cleaned = cleaned.trim_matches('.').trim().to_string();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}
