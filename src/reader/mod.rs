//! Final answer reading
//!
//! The reader produces the authoritative answer from the complete
//! evidence set. It deliberately never sees the interleaved
//! chain-of-thought: interleaved generation is tuned to trigger further
//! retrieval, not to answer well, so the reader reasons fresh over all
//! accumulated paragraphs.

use crate::config::ReaderConfig;
use crate::demos::DemoSet;
use crate::errors::Result;
use crate::extract::answer;
use crate::index::Paragraph;
use crate::ports::LanguageModel;
use crate::prompt::PromptBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Outcome of the final read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderOutput {
    /// Extracted answer (empty when no marker was found)
    pub answer: String,

    /// The reader's full reasoning text
    pub reasoning: String,

    /// Whether extraction succeeded
    pub found: bool,
}

/// Reads the final answer from accumulated evidence
pub struct Reader {
    lm: Arc<dyn LanguageModel>,
    demos: Arc<DemoSet>,
    prompts: PromptBuilder,
    config: ReaderConfig,
}

impl Reader {
    /// Create a new reader
    pub fn new(
        lm: Arc<dyn LanguageModel>,
        demos: Arc<DemoSet>,
        prompts: PromptBuilder,
        config: ReaderConfig,
    ) -> Self {
        Self {
            lm,
            demos,
            prompts,
            config,
        }
    }

    /// Produce the final answer over all accumulated paragraphs
    pub async fn answer(
        &self,
        question: &str,
        paragraphs: &[Arc<Paragraph>],
    ) -> Result<ReaderOutput> {
        // The accumulator already enforces the budget; guard anyway
        let shown = &paragraphs[..paragraphs.len().min(self.config.max_paragraphs)];

        let prompt = self
            .prompts
            .reader_prompt(self.demos.demos(), shown, question);

        let response = self
            .lm
            .generate(&prompt, self.config.max_tokens, self.config.temperature, None)
            .await?;

        let extraction = answer::extract(&response);
        debug!(
            paragraphs = shown.len(),
            found = extraction.found,
            method = ?extraction.method,
            "Reader extraction"
        );

        Ok(ReaderOutput {
            answer: extraction.answer,
            reasoning: response,
            found: extraction.found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ScriptedLm;

    fn reader(response: &str) -> Reader {
        Reader::new(
            Arc::new(ScriptedLm::new([response])),
            Arc::new(DemoSet::builtin()),
            PromptBuilder::new(2),
            ReaderConfig::default(),
        )
    }

    fn paragraph(index: usize, title: &str, text: &str) -> Arc<Paragraph> {
        Arc::new(Paragraph {
            index,
            title: title.to_string(),
            sentences: vec![text.to_string()],
            text: text.to_string(),
        })
    }

    #[tokio::test]
    async fn test_reads_answer_from_evidence() {
        let reader = reader("The works closed in 1982. So the answer is: 1982.");
        let output = reader
            .answer("When did the works close?", &[paragraph(0, "Works", "The works closed in 1982.")])
            .await
            .unwrap();

        assert!(output.found);
        assert_eq!(output.answer, "1982");
        assert!(output.reasoning.contains("closed in 1982"));
    }

    #[tokio::test]
    async fn test_markerless_response_reports_miss() {
        let reader = reader("The evidence does not settle the question in any obvious direction.");
        let output = reader.answer("q", &[]).await.unwrap();

        assert!(!output.found);
        assert_eq!(output.answer, "");
    }

    #[tokio::test]
    async fn test_truncates_to_paragraph_cap() {
        let mut config = ReaderConfig::default();
        config.max_paragraphs = 1;
        let reader = Reader::new(
            Arc::new(ScriptedLm::new(["So the answer is: ok."])),
            Arc::new(DemoSet::builtin()),
            PromptBuilder::new(0),
            config,
        );

        let paragraphs = vec![
            paragraph(0, "Kept", "Shown to the model."),
            paragraph(1, "Dropped", "Beyond the cap."),
        ];
        let output = reader.answer("q", &paragraphs).await.unwrap();
        assert!(output.found);
    }
}
