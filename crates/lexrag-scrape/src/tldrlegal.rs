//! TLDRLegal provider: plain-language software-license explanations.

use async_trait::async_trait;
use lexrag_core::{LexError, Result};
use scraper::{Html, Selector};
use std::time::Duration;

use crate::{cap_explanation, get_with_retries, RateLimiter, TermScraper};

const SEARCH_URL: &str = "https://tldrlegal.com/search";
const TIMEOUT_SECS: u64 = 10;

/// Content selectors tried in order; the site occasionally reshuffles its
/// markup, so a longest-text-block fallback backs these up.
const CONTENT_SELECTORS: [&str; 5] = [
    "div.summary",
    "div.license-info",
    "div.card-body",
    "div.result",
    "article",
];

pub struct TldrLegal {
    client: reqwest::Client,
    limiter: RateLimiter,
    max_retries: u32,
}

impl TldrLegal {
    pub fn new(min_interval: Duration, max_retries: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
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
impl TermScraper for TldrLegal {
    fn name(&self) -> &'static str {
        "tldrlegal"
    }

    async fn lookup(&self, term: &str) -> Result<Option<String>> {
        let url = reqwest::Url::parse_with_params(SEARCH_URL, &[("q", term)])
            .map_err(|e| LexError::ScrapeError(format!("tldrlegal: bad search url: {e}")))?;

        let body = get_with_retries(
            &self.client,
            url.as_str(),
            &self.limiter,
            self.max_retries,
            self.name(),
        )
        .await?;

        let extracted = extract_explanation(&body);
        match &extracted {
            Some(text) => {
                tracing::info!(term, chars = text.chars().count(), "tldrlegal content found")
            }
            None => tracing::warn!(term, "tldrlegal returned no usable content"),
        }

        Ok(extracted)
    }
}

/// Pull the most explanation-like text out of a results page.
fn extract_explanation(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for sel in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(sel) else {
            continue;
        };
        if let Some(el) = document.select(&selector).next() {
            let text = element_text(&el);
            if text.chars().count() > 50 {
                return Some(cap_explanation(text));
            }
        }
    }

    longest_text_block(&document).map(cap_explanation)
}

/// Fallback for unrecognized markup: the longest substantial text block in
/// common content containers, or failing that the longest paragraph.
fn longest_text_block(document: &Html) -> Option<String> {
    let container_selectors = [
        "article",
        "main",
        "div.card-body",
        "div.content",
        "div.entry-content",
        "section",
        "div",
    ];

    let mut best: Option<String> = None;
    for sel in container_selectors {
        let Ok(selector) = Selector::parse(sel) else {
            continue;
        };
        for el in document.select(&selector) {
            let text = element_text(&el);
            if text.chars().count() > 100
                && best.as_ref().map_or(true, |b| text.len() > b.len())
            {
                best = Some(text);
            }
        }
    }
    if best.is_some() {
        return best;
    }

    let Ok(p) = Selector::parse("p") else {
        return None;
    };
    document
        .select(&p)
        .map(|el| element_text(&el))
        .filter(|t| t.chars().count() > 80)
        .max_by_key(|t| t.chars().count())
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
    fn extracts_from_a_known_selector() {
        let html = format!(
            "<html><body><div class=\"summary\">{}</div></body></html>",
            "The MIT license is a permissive license with minimal conditions. ".repeat(2)
        );
        let text = extract_explanation(&html).unwrap();
        assert!(text.contains("permissive license"));
    }

    #[test]
    fn short_fragments_are_rejected() {
        let html = "<html><body><div class=\"summary\">too short</div></body></html>";
        assert!(extract_explanation(html).is_none());
    }

    #[test]
    fn falls_back_to_longest_text_block() {
        let long = "You may sublicense, distribute, and use the work commercially \
                    provided the license and copyright notice are included. "
            .repeat(3);
        let html =
            format!("<html><body><section>{long}</section><section>short one</section></body></html>");
        let text = extract_explanation(&html).unwrap();
        assert!(text.contains("sublicense"));
    }

    #[test]
    fn explanations_are_capped() {
        let huge = "x".repeat(5000);
        let html = format!("<html><body><article>{huge}</article></body></html>");
        let text = extract_explanation(&html).unwrap();
        assert_eq!(text.chars().count(), 1500);
    }
}
