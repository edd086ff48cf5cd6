//! LexRAG Scrape - External legal-term explanation providers
//!
//! Two fixed upstream sites are scraped for term explanations: TLDRLegal
//! for software-license terms and IndianKanoon for Indian statutes and
//! constitutional articles. Each provider enforces a minimum inter-request
//! delay and retries transient failures with exponential backoff; a failed
//! provider degrades to "no content" and never fails an enclosing query.
//!
//! [`ScrapeService`] fronts the providers as an explicit ordered list
//! behind the on-disk TTL cache, and is the only entry point the rest of
//! the service uses.

use async_trait::async_trait;
use lexrag_core::{LexError, Result, ScrapeConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub mod cache;
mod indiankanoon;
mod tldrlegal;

pub use cache::{CacheEntry, ScrapeCache};
pub use indiankanoon::IndianKanoon;
pub use tldrlegal::TldrLegal;

/// Longest explanation kept from any provider, in characters.
const MAX_EXPLANATION_CHARS: usize = 1500;

// ============================================================================
// Provider Trait
// ============================================================================

/// A scraping provider for one upstream site.
///
/// `Ok(None)` means the site answered but had nothing useful; `Err` means
/// the provider could not be reached even after retries. Callers treat both
/// as "no content"; the distinction only matters for logging.
#[async_trait]
pub trait TermScraper: Send + Sync {
    /// Stable provider identifier (used in cache entries and responses)
    fn name(&self) -> &'static str;

    /// Fetch an explanation for the term
    async fn lookup(&self, term: &str) -> Result<Option<String>>;
}

// ============================================================================
// Rate Limiting
// ============================================================================

/// Minimum-interval rate limiter, one per provider. Holding the lock while
/// sleeping serializes concurrent callers, which is exactly the point.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until the minimum interval since the previous request has
    /// passed, then claim the current slot.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limiting");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Fetch a URL with rate limiting and exponential backoff, returning the
/// response body. Backoff starts at the rate-limit interval and doubles per
/// attempt.
async fn get_with_retries(
    client: &reqwest::Client,
    url: &str,
    limiter: &RateLimiter,
    max_retries: u32,
    provider: &str,
) -> Result<String> {
    let mut backoff = limiter.min_interval;

    for attempt in 1..=max_retries {
        limiter.acquire().await;
        tracing::info!(provider, url, attempt, "scrape request");

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                return resp.text().await.map_err(|e| {
                    LexError::ScrapeError(format!("{provider}: failed reading body: {e}"))
                });
            }
            Ok(resp) => {
                tracing::warn!(provider, status = %resp.status(), attempt, "scrape got error status");
            }
            Err(e) => {
                tracing::warn!(provider, error = %e, attempt, "scrape request failed");
            }
        }

        if attempt < max_retries {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    Err(LexError::ScrapeError(format!(
        "{provider}: exhausted {max_retries} attempts for {url}"
    )))
}

fn cap_explanation(text: String) -> String {
    if text.chars().count() <= MAX_EXPLANATION_CHARS {
        text
    } else {
        text.chars().take(MAX_EXPLANATION_CHARS).collect()
    }
}

// ============================================================================
// Scrape Service
// ============================================================================

/// Result of a scrape request
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub explanation: String,
    pub provider: String,
}

/// Ordered-provider dispatch fronted by the TTL cache and a master switch.
pub struct ScrapeService {
    enabled: bool,
    cache: ScrapeCache,
    providers: Vec<Arc<dyn TermScraper>>,
}

impl ScrapeService {
    /// Build the production service with the two fixed providers, tried in
    /// priority order: TLDRLegal first, IndianKanoon second.
    pub fn new(config: &ScrapeConfig, cache_dir: impl Into<PathBuf>) -> Self {
        let interval = Duration::from_secs_f64(config.min_request_interval_secs);
        let providers: Vec<Arc<dyn TermScraper>> = vec![
            Arc::new(TldrLegal::new(interval, config.max_retries)),
            Arc::new(IndianKanoon::new(interval, config.max_retries)),
        ];

        Self {
            enabled: config.enabled,
            cache: ScrapeCache::new(cache_dir, config.cache_ttl_hours),
            providers,
        }
    }

    /// Construct with explicit providers (used by tests)
    pub fn with_providers(
        enabled: bool,
        cache: ScrapeCache,
        providers: Vec<Arc<dyn TermScraper>>,
    ) -> Self {
        Self {
            enabled,
            cache,
            providers,
        }
    }

    /// Full lookup for the `/scrape` endpoint: cache, then each provider in
    /// order, then the "none" fallback. Every non-disabled outcome is
    /// cached, including the fallback.
    pub async fn scrape(&self, term: &str) -> ScrapeOutcome {
        if !self.enabled {
            return ScrapeOutcome {
                explanation: "Scraping is disabled.".to_string(),
                provider: "disabled".to_string(),
            };
        }

        if let Some(entry) = self.cache.get(term) {
            return ScrapeOutcome {
                explanation: entry.explanation,
                provider: entry.provider,
            };
        }

        let mut outcome = ScrapeOutcome {
            explanation: format!("No external explanation found for '{term}'."),
            provider: "none".to_string(),
        };

        for provider in &self.providers {
            match provider.lookup(term).await {
                Ok(Some(text)) => {
                    outcome = ScrapeOutcome {
                        explanation: text,
                        provider: provider.name().to_string(),
                    };
                    break;
                }
                Ok(None) => {
                    tracing::info!(provider = provider.name(), term, "no content");
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), term, error = %e, "provider failed");
                }
            }
        }

        if let Err(e) = self
            .cache
            .put(term, &outcome.explanation, &outcome.provider)
        {
            tracing::warn!(term, error = %e, "failed to write scrape cache");
        }

        outcome
    }

    /// Targeted lookup for the retrieval pipeline: one named provider,
    /// cache-first, positive results cached. Failures of any kind read as
    /// "no content".
    pub async fn fetch(&self, provider_name: &str, term: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }

        if let Some(entry) = self.cache.get(term) {
            if entry.provider == "none" {
                return None;
            }
            return Some(entry.explanation);
        }

        let provider = self.providers.iter().find(|p| p.name() == provider_name)?;

        match provider.lookup(term).await {
            Ok(Some(text)) => {
                if let Err(e) = self.cache.put(term, &text, provider_name) {
                    tracing::warn!(term, error = %e, "failed to write scrape cache");
                }
                Some(text)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(provider = provider_name, term, error = %e, "provider failed");
                None
            }
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScraper {
        name: &'static str,
        result: Option<String>,
    }

    #[async_trait]
    impl TermScraper for FixedScraper {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn lookup(&self, _term: &str) -> Result<Option<String>> {
            Ok(self.result.clone())
        }
    }

    struct FailingScraper;

    #[async_trait]
    impl TermScraper for FailingScraper {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn lookup(&self, term: &str) -> Result<Option<String>> {
            Err(LexError::ScrapeError(format!("unreachable for {term}")))
        }
    }

    fn service(providers: Vec<Arc<dyn TermScraper>>) -> (tempfile::TempDir, ScrapeService) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ScrapeCache::new(dir.path(), 72);
        let svc = ScrapeService::with_providers(true, cache, providers);
        (dir, svc)
    }

    #[tokio::test]
    async fn disabled_service_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let svc = ScrapeService::with_providers(
            false,
            ScrapeCache::new(dir.path(), 72),
            vec![Arc::new(FailingScraper)],
        );

        let outcome = svc.scrape("GPL").await;
        assert_eq!(outcome.provider, "disabled");
        assert!(svc.fetch("failing", "GPL").await.is_none());
    }

    #[tokio::test]
    async fn first_successful_provider_wins() {
        let (_dir, svc) = service(vec![
            Arc::new(FixedScraper {
                name: "first",
                result: None,
            }),
            Arc::new(FixedScraper {
                name: "second",
                result: Some("an explanation".to_string()),
            }),
        ]);

        let outcome = svc.scrape("MIT").await;
        assert_eq!(outcome.provider, "second");
        assert_eq!(outcome.explanation, "an explanation");
    }

    #[tokio::test]
    async fn provider_errors_degrade_to_none() {
        let (_dir, svc) = service(vec![Arc::new(FailingScraper)]);

        let outcome = svc.scrape("Section 302").await;
        assert_eq!(outcome.provider, "none");
        assert!(outcome.explanation.contains("Section 302"));
    }

    #[tokio::test]
    async fn scrape_results_are_served_from_cache() {
        let (_dir, svc) = service(vec![Arc::new(FixedScraper {
            name: "first",
            result: Some("cached once".to_string()),
        })]);

        let first = svc.scrape("Article 14").await;
        assert_eq!(first.provider, "first");

        // Swap in a failing provider behind the same cache dir; the cached
        // entry must still answer.
        let cache = ScrapeCache::new(_dir.path(), 72);
        let svc = ScrapeService::with_providers(true, cache, vec![Arc::new(FailingScraper)]);
        let second = svc.scrape("Article 14").await;
        assert_eq!(second.provider, "first");
        assert_eq!(second.explanation, "cached once");
    }

    #[tokio::test]
    async fn fetch_targets_one_provider_by_name() {
        let (_dir, svc) = service(vec![
            Arc::new(FixedScraper {
                name: "tldrlegal",
                result: Some("license text".to_string()),
            }),
            Arc::new(FixedScraper {
                name: "indiankanoon",
                result: Some("statute text".to_string()),
            }),
        ]);

        assert_eq!(
            svc.fetch("indiankanoon", "Section 498A").await.as_deref(),
            Some("statute text")
        );
        assert!(svc.fetch("unknown-provider", "Section 498A").await.is_none());
    }

    #[tokio::test]
    async fn rate_limiter_spaces_out_acquisitions() {
        tokio::time::pause();
        let limiter = RateLimiter::new(Duration::from_secs(1));

        let start = tokio::time::Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(1900));
    }
}
