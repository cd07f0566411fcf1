//! Stateful retrieval accumulator
//!
//! Wraps ParagraphIndex calls for one question:
//! - Enforces the total paragraph budget
//! - Deduplicates by paragraph index
//! - Records a history entry per retrieval call
//!
//! Reset between questions; no state crosses a question boundary.

use crate::errors::Result;
use crate::index::{Paragraph, ParagraphIndex, RetrievalResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// What kind of text a retrieval was queried with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// The raw question text
    Question,
    /// A generated chain-of-thought sentence
    CotSentence,
}

/// One retrieval call as recorded in the history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalEvent {
    /// Step number (0 for the initial retrieval)
    pub step: usize,

    /// Query text used
    pub query: String,

    /// Query kind tag
    pub kind: QueryKind,

    /// Candidates returned by the index
    pub candidates: usize,

    /// Paragraph indices actually added
    pub added: Vec<usize>,
}

/// Per-question retrieval accumulator
pub struct RetrievalState {
    max_paragraphs: usize,
    min_score: f32,
    accumulated: Vec<Arc<Paragraph>>,
    seen: HashSet<usize>,
    history: Vec<RetrievalEvent>,
}

impl RetrievalState {
    /// Create a fresh accumulator with the given paragraph budget
    pub fn new(max_paragraphs: usize, min_score: f32) -> Self {
        Self {
            max_paragraphs,
            min_score,
            accumulated: Vec::new(),
            seen: HashSet::new(),
            history: Vec::new(),
        }
    }

    /// Clear all per-question state
    pub fn reset(&mut self) {
        self.accumulated.clear();
        self.seen.clear();
        self.history.clear();
    }

    /// True once the paragraph budget is reached
    pub fn at_capacity(&self) -> bool {
        self.accumulated.len() >= self.max_paragraphs
    }

    /// Accumulated paragraph count
    pub fn len(&self) -> usize {
        self.accumulated.len()
    }

    /// True before any paragraph has been accumulated
    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }

    /// All accumulated paragraphs in arrival order
    pub fn accumulated(&self) -> &[Arc<Paragraph>] {
        &self.accumulated
    }

    /// Retrieval history for the current question
    pub fn history(&self) -> &[RetrievalEvent] {
        &self.history
    }

    /// First retrieval with the raw question text
    ///
    /// No exclusions apply; returns the full accumulated list.
    pub async fn initial_retrieve(
        &mut self,
        index: &ParagraphIndex,
        question: &str,
        k: usize,
    ) -> Result<Vec<Arc<Paragraph>>> {
        let k = k.min(self.remaining());
        let results = index
            .retrieve(question, k, &HashSet::new(), self.min_score)
            .await?;
        let added = self.add_new(&results);

        debug!(
            candidates = results.len(),
            added = added.len(),
            total = self.accumulated.len(),
            "Initial retrieval"
        );
        self.history.push(RetrievalEvent {
            step: 0,
            query: question.to_string(),
            kind: QueryKind::Question,
            candidates: results.len(),
            added,
        });

        Ok(self.accumulated.clone())
    }

    /// Retrieval with a chain-of-thought sentence
    ///
    /// Returns ONLY the newly added paragraphs; an empty return means no
    /// progress was made. At capacity this returns empty without touching
    /// the index.
    pub async fn step_retrieve(
        &mut self,
        index: &ParagraphIndex,
        sentence: &str,
        k: usize,
        step: usize,
    ) -> Result<Vec<Arc<Paragraph>>> {
        if self.at_capacity() {
            return Ok(Vec::new());
        }

        let k = k.min(self.remaining());
        let results = index
            .retrieve(sentence, k, &self.seen, self.min_score)
            .await?;
        let added = self.add_new(&results);
        let new_paragraphs: Vec<Arc<Paragraph>> = added
            .iter()
            .filter_map(|&i| index.get(i).cloned())
            .collect();

        debug!(
            step,
            candidates = results.len(),
            added = added.len(),
            total = self.accumulated.len(),
            "Step retrieval"
        );
        self.history.push(RetrievalEvent {
            step,
            query: sentence.to_string(),
            kind: QueryKind::CotSentence,
            candidates: results.len(),
            added,
        });

        Ok(new_paragraphs)
    }

    /// Paragraphs still allowed under the budget
    fn remaining(&self) -> usize {
        self.max_paragraphs.saturating_sub(self.accumulated.len())
    }

    /// Add genuinely new results up to the budget; returns added indices
    fn add_new(&mut self, results: &[RetrievalResult]) -> Vec<usize> {
        let mut added = Vec::new();
        for result in results {
            if self.at_capacity() {
                break;
            }
            if self.seen.insert(result.paragraph.index) {
                self.accumulated.push(Arc::clone(&result.paragraph));
                added.push(result.paragraph.index);
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::HashEmbedder;

    fn context() -> Vec<(String, Vec<String>)> {
        vec![
            (
                "Copper Mining".to_string(),
                vec!["Copper mining expanded across the region.".to_string()],
            ),
            (
                "Smelting Works".to_string(),
                vec!["The smelting works processed copper ore.".to_string()],
            ),
            (
                "Railway Line".to_string(),
                vec!["A railway line carried ore to the coast.".to_string()],
            ),
            (
                "Harbor Town".to_string(),
                vec!["The harbor town shipped refined metal abroad.".to_string()],
            ),
        ]
    }

    async fn built_index() -> ParagraphIndex {
        let mut index = ParagraphIndex::new(Arc::new(HashEmbedder::new(256)));
        index.index(&context()).await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_initial_retrieve_returns_accumulated() {
        let index = built_index().await;
        let mut state = RetrievalState::new(10, 0.0);

        let paragraphs = state
            .initial_retrieve(&index, "copper ore mining", 2)
            .await
            .unwrap();

        assert_eq!(paragraphs.len(), state.len());
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.history()[0].kind, QueryKind::Question);
        assert_eq!(state.history()[0].step, 0);
    }

    #[tokio::test]
    async fn test_step_retrieve_returns_only_new() {
        let index = built_index().await;
        let mut state = RetrievalState::new(10, 0.0);

        state
            .initial_retrieve(&index, "copper ore mining", 2)
            .await
            .unwrap();
        let before = state.len();

        let new = state
            .step_retrieve(&index, "railway line to the harbor", 2, 1)
            .await
            .unwrap();

        assert!(!new.is_empty());
        assert_eq!(state.len(), before + new.len());
        for paragraph in &new {
            // Newly returned paragraphs were not in the initial set
            assert!(state.accumulated()[..before]
                .iter()
                .all(|p| p.index != paragraph.index));
        }
        assert_eq!(state.history()[1].kind, QueryKind::CotSentence);
    }

    #[tokio::test]
    async fn test_budget_is_enforced() {
        let index = built_index().await;
        let mut state = RetrievalState::new(2, 0.0);

        state
            .initial_retrieve(&index, "copper ore mining", 10)
            .await
            .unwrap();
        assert_eq!(state.len(), 2);
        assert!(state.at_capacity());

        // At capacity: no query happens, empty result both times
        let first = state
            .step_retrieve(&index, "harbor town shipping", 5, 1)
            .await
            .unwrap();
        let second = state
            .step_retrieve(&index, "harbor town shipping", 5, 2)
            .await
            .unwrap();
        assert!(first.is_empty());
        assert!(second.is_empty());
        assert_eq!(state.len(), 2);
    }

    #[tokio::test]
    async fn test_no_duplicate_indices() {
        let index = built_index().await;
        let mut state = RetrievalState::new(10, 0.0);

        state
            .initial_retrieve(&index, "copper smelting railway harbor", 4)
            .await
            .unwrap();
        state
            .step_retrieve(&index, "copper smelting railway harbor", 4, 1)
            .await
            .unwrap();

        let mut seen = HashSet::new();
        for paragraph in state.accumulated() {
            assert!(seen.insert(paragraph.index));
        }
    }

    #[tokio::test]
    async fn test_exhausted_context_is_idempotent() {
        let index = built_index().await;
        let mut state = RetrievalState::new(10, 0.0);

        state
            .initial_retrieve(&index, "copper smelting railway harbor town", 10)
            .await
            .unwrap();
        assert_eq!(state.len(), 4);

        let first = state
            .step_retrieve(&index, "more copper ore", 3, 1)
            .await
            .unwrap();
        let second = state
            .step_retrieve(&index, "more copper ore", 3, 2)
            .await
            .unwrap();
        assert!(first.is_empty());
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let index = built_index().await;
        let mut state = RetrievalState::new(10, 0.0);

        state
            .initial_retrieve(&index, "copper ore mining", 3)
            .await
            .unwrap();
        assert!(!state.is_empty());

        state.reset();
        assert!(state.is_empty());
        assert!(state.history().is_empty());
        assert!(!state.at_capacity());
    }
}
