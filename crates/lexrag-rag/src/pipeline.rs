//! Question answering over an ingested document
//!
//! [`RagPipeline::answer`] runs one query end to end: embed the question,
//! search the document's vector index, augment the retrieved chunks with
//! scraped explanations for any statute or license terms spotted in the
//! question, assemble a tagged context, and hand it to the LLM. A query
//! against an empty index short-circuits to a fixed fallback answer before
//! any scraping or LLM call happens.

use lexrag_core::{LlmClient, RagConfig, Result};
use lexrag_scrape::ScrapeService;
use lexrag_vector::{EmbeddingClient, VectorIndexStore};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

use crate::llm::truncate_context;

/// Answer returned when retrieval finds nothing to ground the question in.
pub const NO_CONTEXT_ANSWER: &str = "No relevant context found in the document. \
     Please upload relevant legal documents or try a different query.";

/// How much of a chunk shows up in the `sources` listing.
const SOURCE_PREVIEW_CHARS: usize = 200;

/// At most this many detected terms get scraped per query.
const MAX_SCRAPED_TERMS: usize = 2;

static LEGAL_TERM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Indian Penal Code sections, with or without "of": "Section 498A IPC"
        r"(?i)Section\s+\d+[A-Z]?\s*(?:of\s+)?IPC",
        // Constitutional articles: "Article 21"
        r"(?i)Article\s+\d+[A-Z]?",
        // Criminal Procedure Code sections: "CrPC 482"
        r"(?i)CrPC\s+\d+",
        // Software license families
        r"(?i)\b(?:GPL|MIT|Apache|BSD)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("invalid legal-term pattern {p}: {e}")))
    .collect()
});

const RAG_PROMPT_TEMPLATE: &str = "You are a legal research assistant. Answer the question using \
only the context below. The context contains excerpts from a legal document (tagged <CHUNK>) and, \
where available, explanations scraped from legal reference sites (tagged <WEB_SOURCE>). Cite the \
chunks you rely on. If the context does not contain the answer, say so plainly instead of \
speculating.\n\
{user_prompt_section}\
\nContext:\n{context}\n\nQuestion: {query}\n\nAnswer:";

/// A produced answer plus the evidence it was grounded in.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<VectorIndexStore>,
    llm: Arc<dyn LlmClient>,
    scrape: Arc<ScrapeService>,
    top_k: usize,
    max_context_chars: usize,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<VectorIndexStore>,
        llm: Arc<dyn LlmClient>,
        scrape: Arc<ScrapeService>,
        config: &RagConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            scrape,
            top_k: config.top_k,
            max_context_chars: config.max_context_chars,
        }
    }

    /// Run one query against the index at `index_path`.
    pub async fn answer(
        &self,
        index_path: &Path,
        query: &str,
        user_prompt: &str,
    ) -> Result<RagAnswer> {
        let query_vector = self.embedder.embed_one(query).await?;
        let results = self.store.search(index_path, &query_vector, self.top_k).await?;

        tracing::info!(
            index = %index_path.display(),
            retrieved = results.len(),
            "retrieval complete"
        );

        if results.is_empty() {
            return Ok(RagAnswer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let mut context_parts: Vec<String> = Vec::with_capacity(results.len() + MAX_SCRAPED_TERMS);
        let mut sources: Vec<String> = Vec::with_capacity(results.len() + MAX_SCRAPED_TERMS);

        for (i, chunk) in results.iter().enumerate() {
            let rank = i + 1;
            context_parts.push(format!("<CHUNK {rank}>\n{}\n</CHUNK {rank}>", chunk.text));
            sources.push(preview(&chunk.text));
        }

        self.augment_with_scraped_terms(query, &mut context_parts, &mut sources)
            .await;

        let context = truncate_context(&context_parts.join("\n\n"), self.max_context_chars);
        let prompt = render_prompt(&context, query, user_prompt);
        let answer = self.llm.generate(&prompt).await?;

        Ok(RagAnswer { answer, sources })
    }

    /// Scrape explanations for legal terms found in the query, appending a
    /// `<WEB_SOURCE>` block per hit. Provider failures leave the context
    /// untouched rather than failing the query.
    async fn augment_with_scraped_terms(
        &self,
        query: &str,
        context_parts: &mut Vec<String>,
        sources: &mut Vec<String>,
    ) {
        for term in extract_legal_terms(query).iter().take(MAX_SCRAPED_TERMS) {
            let Some((provider, label)) = route_term(term) else {
                continue;
            };
            match self.scrape.fetch(provider, term).await {
                Some(explanation) => {
                    tracing::info!(term = %term, provider, "scraped term explanation");
                    context_parts.push(format!("<WEB_SOURCE: {label}>\n{explanation}\n</WEB_SOURCE>"));
                    sources.push(format!("{label}: {term}"));
                }
                None => {
                    tracing::debug!(term = %term, provider, "no scraped explanation");
                }
            }
        }
    }
}

// ============================================================================
// Term detection
// ============================================================================

/// Every legal-term match in `query`, in pattern order. Matches are kept
/// as written, including repeats of the same term.
pub fn extract_legal_terms(query: &str) -> Vec<String> {
    LEGAL_TERM_PATTERNS
        .iter()
        .flat_map(|re| re.find_iter(query))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Map a detected term to its scrape provider name and display label.
fn route_term(term: &str) -> Option<(&'static str, &'static str)> {
    let upper = term.to_uppercase();
    if upper.contains("IPC") || upper.contains("ARTICLE") || upper.contains("CRPC") {
        Some(("indiankanoon", "IndianKanoon"))
    } else if ["GPL", "MIT", "APACHE", "BSD"].iter().any(|l| upper.contains(l)) {
        Some(("tldrlegal", "TLDRLegal"))
    } else {
        None
    }
}

fn render_prompt(context: &str, query: &str, user_prompt: &str) -> String {
    let user_prompt_section = if user_prompt.trim().is_empty() {
        String::new()
    } else {
        format!("\nAdditional User Instructions:\n{}\n", user_prompt.trim())
    };
    RAG_PROMPT_TEMPLATE
        .replace("{user_prompt_section}", &user_prompt_section)
        .replace("{context}", context)
        .replace("{query}", query)
}

fn preview(text: &str) -> String {
    if text.chars().count() <= SOURCE_PREVIEW_CHARS {
        text.to_string()
    } else {
        text.chars().take(SOURCE_PREVIEW_CHARS).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
