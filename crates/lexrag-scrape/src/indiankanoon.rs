//! IndianKanoon provider: statute and case-law snippets from search results.

use async_trait::async_trait;
use lexrag_core::{LexError, Result};
use scraper::{Html, Selector};
use std::time::Duration;

use crate::{cap_explanation, get_with_retries, RateLimiter, TermScraper};

const SEARCH_URL: &str = "https://indiankanoon.org/search/";
const TIMEOUT_SECS: u64 = 15;

/// Minimum characters for a snippet to count as an explanation.
const MIN_SNIPPET_CHARS: usize = 60;

pub struct IndianKanoon {
    client: reqwest::Client,
    limiter: RateLimiter,
    max_retries: u32,
}

impl IndianKanoon {
    pub fn new(min_interval: Duration, max_retries: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent("LexRagLegalScraper/1.0 (Educational)")
            .build()
            .unwrap_or_default();

        Self {
            client,
            limiter: RateLimiter::new(min_interval),
            max_retries,
        }
    }
}

#[async_trait]
impl TermScraper for IndianKanoon {
    fn name(&self) -> &'static str {
        "indiankanoon"
    }

    async fn lookup(&self, term: &str) -> Result<Option<String>> {
        let url = reqwest::Url::parse_with_params(SEARCH_URL, &[("formInput", term)])
            .map_err(|e| LexError::ScrapeError(format!("indiankanoon: bad search url: {e}")))?;

        let body = get_with_retries(
            &self.client,
            url.as_str(),
            &self.limiter,
            self.max_retries,
            self.name(),
        )
        .await?;

        let extracted = extract_snippets(&body);
        match &extracted {
            Some(text) => {
                tracing::info!(term, chars = text.chars().count(), "indiankanoon content found")
            }
            None => tracing::warn!(term, "indiankanoon returned no usable content"),
        }

        Ok(extracted)
    }
}

/// Join the title and snippet of the top search results into one
/// explanation block.
fn extract_snippets(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let result_sel = Selector::parse("div.result").ok()?;
    let title_sel = Selector::parse("div.result_title").ok()?;

    let mut parts = Vec::new();
    for result in document.select(&result_sel).take(3) {
        let title = result
            .select(&title_sel)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();
        let snippet = element_text(&result);

        if snippet.chars().count() >= MIN_SNIPPET_CHARS {
            if title.is_empty() {
                parts.push(snippet);
            } else {
                parts.push(format!("{title}: {snippet}"));
            }
        }
    }

    if parts.is_empty() {
        // Older result pages render snippets as bare paragraphs
        let p_sel = Selector::parse("p").ok()?;
        parts = document
            .select(&p_sel)
            .map(|el| element_text(&el))
            .filter(|t| t.chars().count() >= MIN_SNIPPET_CHARS)
            .take(3)
            .collect();
    }

    if parts.is_empty() {
        None
    } else {
        Some(cap_explanation(parts.join("\n")))
    }
}

fn element_text(el: &scraper::ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_titled_results() {
        let html = r#"
            <html><body>
              <div class="result">
                <div class="result_title">State of Maharashtra vs Appellant</div>
                Section 498A of the Indian Penal Code penalizes cruelty by a husband
                or his relatives towards a married woman, punishable with imprisonment.
              </div>
            </body></html>
        "#;
        let text = extract_snippets(html).unwrap();
        assert!(text.starts_with("State of Maharashtra"));
        assert!(text.contains("cruelty"));
    }

    #[test]
    fn falls_back_to_paragraphs() {
        let html = format!(
            "<html><body><p>{}</p></body></html>",
            "Article 21 protects life and personal liberty against state action. ".repeat(2)
        );
        let text = extract_snippets(&html).unwrap();
        assert!(text.contains("Article 21"));
    }

    #[test]
    fn empty_pages_yield_none() {
        assert!(extract_snippets("<html><body></body></html>").is_none());
        assert!(extract_snippets("<html><body><p>short</p></body></html>").is_none());
    }

    #[test]
    fn snippets_are_capped() {
        let huge = "cruelty and dowry harassment case law citations ".repeat(100);
        let html = format!("<html><body><div class=\"result\">{huge}</div></body></html>");
        let text = extract_snippets(&html).unwrap();
        assert!(text.chars().count() <= 1500);
    }
}
