//! Engine orchestration
//!
//! Drives the interleaved retrieval / chain-of-thought state machine:
//! initial retrieval, bounded reasoning steps, termination, and the
//! final read over all accumulated evidence.
//!
//! All mutable state is local to one engine instance. Hosts process many
//! questions concurrently by constructing one engine per task over
//! shared ports and demonstrations; nothing here needs locking. There is
//! no timeout, cancellation, or retry policy at this layer — a batch
//! caller owns those, and catches per-question port failures so one bad
//! question does not abort a run.

use crate::config::IrcotConfig;
use crate::demos::DemoSet;
use crate::errors::Result;
use crate::extract::answer::{self, ExtractedAnswer};
use crate::generator::StepGenerator;
use crate::index::{Paragraph, ParagraphIndex};
use crate::ports::{Embedder, LanguageModel};
use crate::prompt::PromptBuilder;
use crate::reader::Reader;
use crate::retrieval::{RetrievalEvent, RetrievalState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Why the reasoning loop stopped
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The chain-of-thought produced an answer marker
    AnswerMarker,
    /// The configured step limit was reached
    StepLimit,
    /// The paragraph budget was exhausted
    Capacity,
    /// The model produced no usable sentence
    EmptyGeneration,
    /// A retrieval step added nothing new
    NoNewParagraphs,
    /// Baseline mode, no reasoning loop was run
    OneShot,
}

/// One step of the interleaved loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// Step number (0 is the initial retrieval)
    pub step: usize,

    /// Generated sentence (empty for step 0)
    pub sentence: String,

    /// Query text used for this step's retrieval
    pub query: String,

    /// Paragraphs newly retrieved at this step
    pub new_paragraphs: Vec<Arc<Paragraph>>,

    /// Cumulative chain-of-thought up to and including this step
    pub cot: String,
}

/// Full outcome for one question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrcotResult {
    /// The question asked
    pub question: String,

    /// Final answer string for the external scorer
    pub answer: String,

    /// Final interleaved chain-of-thought
    pub reasoning: String,

    /// Raw output of the reader stage
    pub reader_text: String,

    /// Ordered step records, starting with the initial retrieval
    pub steps: Vec<ReasoningStep>,

    /// All accumulated evidence paragraphs
    pub paragraphs: Vec<Arc<Paragraph>>,

    /// Reasoning steps taken (excluding the initial retrieval)
    pub step_count: usize,

    /// Why the loop stopped
    pub termination: TerminationReason,

    /// Wall-clock time for the whole question
    pub elapsed_ms: u64,
}

/// Interleaved retrieval chain-of-thought engine
pub struct IrcotEngine {
    index: ParagraphIndex,
    state: RetrievalState,
    generator: StepGenerator,
    reader: Reader,
    config: IrcotConfig,
}

impl IrcotEngine {
    /// Create an engine over the given ports and demonstrations
    pub fn new(
        lm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        demos: Arc<DemoSet>,
        config: IrcotConfig,
    ) -> Self {
        let prompts = PromptBuilder::new(config.demos.max_demos);
        Self {
            index: ParagraphIndex::new(embedder),
            state: RetrievalState::new(config.retrieval.max_paragraphs, config.retrieval.min_score),
            generator: StepGenerator::new(
                Arc::clone(&lm),
                Arc::clone(&demos),
                prompts.clone(),
                config.reasoning.clone(),
            ),
            reader: Reader::new(lm, demos, prompts, config.reader.clone()),
            config,
        }
    }

    /// Answer a multi-hop question over its context paragraphs
    pub async fn answer(
        &mut self,
        question: &str,
        context: &[(String, Vec<String>)],
    ) -> Result<IrcotResult> {
        let started = Instant::now();
        self.state.reset();
        self.index.index(context).await?;

        let initial = self
            .state
            .initial_retrieve(&self.index, question, self.config.retrieval.k_initial)
            .await?;
        let mut steps = vec![ReasoningStep {
            step: 0,
            sentence: String::new(),
            query: question.to_string(),
            new_paragraphs: initial,
            cot: String::new(),
        }];

        let mut cot = String::new();
        // First successful in-loop extraction, consulted once at the end
        let mut fallback: Option<ExtractedAnswer> = None;
        let mut termination = TerminationReason::StepLimit;

        for step in 1..=self.config.reasoning.max_steps {
            if self.state.at_capacity() {
                termination = TerminationReason::Capacity;
                break;
            }

            let sentence = self
                .generator
                .next_step(self.state.accumulated(), question, &cot)
                .await?;
            if sentence.is_empty() {
                termination = TerminationReason::EmptyGeneration;
                break;
            }

            if !cot.is_empty() {
                cot.push(' ');
            }
            cot.push_str(&sentence);

            if fallback.is_none() {
                let extracted = answer::extract(&cot);
                if extracted.found {
                    fallback = Some(extracted);
                }
            }

            if answer::contains_answer_marker(&cot) {
                steps.push(ReasoningStep {
                    step,
                    sentence: sentence.clone(),
                    query: sentence,
                    new_paragraphs: Vec::new(),
                    cot: cot.clone(),
                });
                termination = TerminationReason::AnswerMarker;
                break;
            }

            let new_paragraphs = self
                .state
                .step_retrieve(&self.index, &sentence, self.config.retrieval.k_step, step)
                .await?;
            let stalled = new_paragraphs.is_empty();
            steps.push(ReasoningStep {
                step,
                sentence: sentence.clone(),
                query: sentence,
                new_paragraphs,
                cot: cot.clone(),
            });
            if stalled {
                termination = TerminationReason::NoNewParagraphs;
                break;
            }
        }

        debug!(
            ?termination,
            steps = steps.len() - 1,
            paragraphs = self.state.len(),
            "Reasoning loop finished"
        );
        self.finish(question, steps, cot, fallback, termination, started)
            .await
    }

    /// Baseline: one retrieval up to the full budget, then the reader
    ///
    /// The same state machine degenerated to a single retrieval+read
    /// pass, for ablation against the interleaved loop.
    pub async fn answer_one_shot(
        &mut self,
        question: &str,
        context: &[(String, Vec<String>)],
    ) -> Result<IrcotResult> {
        let started = Instant::now();
        self.state.reset();
        self.index.index(context).await?;

        let initial = self
            .state
            .initial_retrieve(&self.index, question, self.config.retrieval.max_paragraphs)
            .await?;
        let steps = vec![ReasoningStep {
            step: 0,
            sentence: String::new(),
            query: question.to_string(),
            new_paragraphs: initial,
            cot: String::new(),
        }];

        self.finish(
            question,
            steps,
            String::new(),
            None,
            TerminationReason::OneShot,
            started,
        )
        .await
    }

    /// Final read and answer fallback chain
    async fn finish(
        &mut self,
        question: &str,
        steps: Vec<ReasoningStep>,
        cot: String,
        fallback: Option<ExtractedAnswer>,
        termination: TerminationReason,
        started: Instant,
    ) -> Result<IrcotResult> {
        let read = self.reader.answer(question, self.state.accumulated()).await?;

        // Fallback chain: reader, then the first in-loop extraction,
        // then the raw chain-of-thought
        let mut answer = read.answer;
        if answer.is_empty() {
            if let Some(extracted) = fallback {
                answer = extracted.answer;
            }
        }
        if answer.is_empty() {
            answer = cot.trim().to_string();
        }

        let step_count = steps.len().saturating_sub(1);
        let result = IrcotResult {
            question: question.to_string(),
            answer,
            reasoning: cot,
            reader_text: read.reasoning,
            steps,
            paragraphs: self.state.accumulated().to_vec(),
            step_count,
            termination,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            question = %result.question,
            answer = %result.answer,
            termination = ?result.termination,
            steps = result.step_count,
            paragraphs = result.paragraphs.len(),
            elapsed_ms = result.elapsed_ms,
            "Question answered"
        );
        Ok(result)
    }

    /// Retrieval history for the most recent question
    pub fn history(&self) -> &[RetrievalEvent] {
        self.state.history()
    }
}
