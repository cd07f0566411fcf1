//! Reasoning-step generation
//!
//! One bounded, low-temperature generation call per step, followed by
//! next-sentence selection on the raw output. The sentence it returns
//! doubles as the next retrieval query.

use crate::config::ReasoningConfig;
use crate::demos::DemoSet;
use crate::errors::Result;
use crate::extract::sentence;
use crate::index::Paragraph;
use crate::ports::LanguageModel;
use crate::prompt::PromptBuilder;
use std::sync::Arc;
use tracing::debug;

/// Generates the next chain-of-thought sentence
pub struct StepGenerator {
    lm: Arc<dyn LanguageModel>,
    demos: Arc<DemoSet>,
    prompts: PromptBuilder,
    config: ReasoningConfig,
}

impl StepGenerator {
    /// Create a new step generator
    pub fn new(
        lm: Arc<dyn LanguageModel>,
        demos: Arc<DemoSet>,
        prompts: PromptBuilder,
        config: ReasoningConfig,
    ) -> Self {
        Self {
            lm,
            demos,
            prompts,
            config,
        }
    }

    /// Produce the next reasoning sentence given the evidence so far
    ///
    /// Returns an empty string when the model has nothing new to say;
    /// the caller treats that as a termination condition, not an error.
    pub async fn next_step(
        &self,
        paragraphs: &[Arc<Paragraph>],
        question: &str,
        cot: &str,
    ) -> Result<String> {
        let prompt = self
            .prompts
            .reasoning_prompt(self.demos.demos(), paragraphs, question, cot);

        let response = self
            .lm
            .generate(
                &prompt,
                self.config.max_new_tokens,
                self.config.temperature,
                Some(&self.config.stop),
            )
            .await?;

        let next = sentence::next_sentence(&response, cot);
        debug!(
            prompt_chars = prompt.len(),
            response_chars = response.len(),
            sentence = %next,
            "Generated reasoning step"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ScriptedLm;

    fn generator(responses: Vec<&str>) -> StepGenerator {
        StepGenerator::new(
            Arc::new(ScriptedLm::new(responses)),
            Arc::new(DemoSet::builtin()),
            PromptBuilder::new(2),
            ReasoningConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_takes_first_sentence() {
        let generator = generator(vec!["The dam was finished in 1955. Extra text."]);
        let sentence = generator.next_step(&[], "When was the dam finished?", "").await.unwrap();
        assert_eq!(sentence, "The dam was finished in 1955.");
    }

    #[tokio::test]
    async fn test_skips_echoed_sentence() {
        let generator = generator(vec!["The dam was finished in 1955. It powers the valley."]);
        let sentence = generator
            .next_step(&[], "q", "The dam was finished in 1955.")
            .await
            .unwrap();
        assert_eq!(sentence, "It powers the valley.");
    }

    #[tokio::test]
    async fn test_exhausted_model_yields_empty() {
        let generator = generator(vec![]);
        let sentence = generator.next_step(&[], "q", "").await.unwrap();
        assert_eq!(sentence, "");
    }
}
