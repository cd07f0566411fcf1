//! Prompt construction
//!
//! Formats demonstrations and retrieved paragraphs into the two prompt
//! shapes the engine uses: the step-generation prompt (chain-of-thought
//! continuation) and the reader prompt (full evidence plus a reasoning
//! cue). Demonstrations and live paragraphs share one format so the
//! model sees a consistent layout.

use crate::demos::CotDemo;
use crate::index::Paragraph;
use std::sync::Arc;

/// Reasoning cue appended by the reader prompt
const READER_CUE: &str = "Let's think step by step.";

/// Builds the engine's prompts
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_demos: usize,
}

impl PromptBuilder {
    /// Create a builder including up to `max_demos` demonstrations
    pub fn new(max_demos: usize) -> Self {
        Self { max_demos }
    }

    /// Format one paragraph the way demonstrations show them
    pub fn format_paragraph(paragraph: &Paragraph) -> String {
        format!("Wikipedia Title: {}\n{}", paragraph.title, paragraph.text)
    }

    fn format_demo(demo: &CotDemo) -> String {
        let mut block = String::new();
        for paragraph in &demo.paragraphs {
            block.push_str(&format!(
                "Wikipedia Title: {}\n{}\n\n",
                paragraph.title, paragraph.text
            ));
        }
        block.push_str(&format!("Q: {}\nA: {}", demo.question, demo.answer));
        block
    }

    /// Shared prefix: demonstrations, evidence paragraphs, question
    fn context_block(
        &self,
        demos: &[CotDemo],
        paragraphs: &[Arc<Paragraph>],
        question: &str,
    ) -> String {
        let mut prompt = String::new();

        for demo in demos.iter().take(self.max_demos) {
            prompt.push_str(&Self::format_demo(demo));
            prompt.push_str("\n\n");
        }

        for paragraph in paragraphs {
            prompt.push_str(&Self::format_paragraph(paragraph));
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!("Q: {}\n", question));
        prompt
    }

    /// Prompt for the next reasoning sentence, continuing the chain
    pub fn reasoning_prompt(
        &self,
        demos: &[CotDemo],
        paragraphs: &[Arc<Paragraph>],
        question: &str,
        cot: &str,
    ) -> String {
        let mut prompt = self.context_block(demos, paragraphs, question);
        if cot.is_empty() {
            prompt.push_str("A:");
        } else {
            prompt.push_str(&format!("A: {}", cot));
        }
        prompt
    }

    /// Prompt for the authoritative final read
    pub fn reader_prompt(
        &self,
        demos: &[CotDemo],
        paragraphs: &[Arc<Paragraph>],
        question: &str,
    ) -> String {
        let mut prompt = self.context_block(demos, paragraphs, question);
        prompt.push_str(&format!("A: {}", READER_CUE));
        prompt
    }
}
