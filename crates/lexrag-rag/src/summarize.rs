//! Standalone document summarization, no retrieval involved.

use lexrag_core::{LlmClient, Result};
use std::sync::Arc;

use crate::llm::truncate_context;

const SUMMARY_PROMPT_TEMPLATE: &str = "You are a legal research assistant. Summarize the \
following legal document. Cover the parties involved, the key obligations or holdings, and \
any dates, amounts, or statutory references that matter. Keep the summary faithful to the \
text; do not add interpretation the document does not support.\n\nDocument:\n{text}\n\n\
Summary:";

pub struct Summarizer {
    llm: Arc<dyn LlmClient>,
    max_context_chars: usize,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LlmClient>, max_context_chars: usize) -> Self {
        Self {
            llm,
            max_context_chars,
        }
    }

    /// Summarize raw document text, truncating it to the context budget.
    pub async fn summarize(&self, text: &str) -> Result<String> {
        let bounded = truncate_context(text, self.max_context_chars);
        let prompt = SUMMARY_PROMPT_TEMPLATE.replace("{text}", &bounded);
        tracing::info!(chars = bounded.chars().count(), "summarizing document");
        self.llm.generate(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoLlm {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for EchoLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok("A short summary.".to_string())
        }
    }

    #[tokio::test]
    async fn text_is_embedded_in_the_prompt() {
        let llm = Arc::new(EchoLlm {
            seen: Mutex::new(Vec::new()),
        });
        let summarizer = Summarizer::new(Arc::clone(&llm) as Arc<dyn LlmClient>, 900_000);

        let summary = summarizer.summarize("Rent is due on the first.").await.unwrap();
        assert_eq!(summary, "A short summary.");

        let seen = llm.seen.lock().unwrap();
        assert!(seen[0].contains("Rent is due on the first."));
        assert!(seen[0].contains("Summarize"));
    }

    #[tokio::test]
    async fn oversized_text_is_truncated_before_prompting() {
        let llm = Arc::new(EchoLlm {
            seen: Mutex::new(Vec::new()),
        });
        let summarizer = Summarizer::new(Arc::clone(&llm) as Arc<dyn LlmClient>, 100);

        summarizer.summarize(&"y".repeat(500)).await.unwrap();

        let seen = llm.seen.lock().unwrap();
        assert!(seen[0].contains("... [truncated]"));
        assert!(!seen[0].contains(&"y".repeat(101)));
    }
}
