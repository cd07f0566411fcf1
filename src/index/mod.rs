//! Per-question paragraph index
//!
//! Provides:
//! - Paragraph records with stable indices assigned at indexing time
//! - One batched embedding call per context
//! - Cosine-similarity retrieval with exclusion and score filtering
//!
//! The index is rebuilt from scratch for every question; nothing carries
//! over between questions.

use crate::errors::Result;
use crate::ports::Embedder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// One source passage, indexed for the lifetime of a single question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paragraph {
    /// Stable 0-based index assigned at indexing time
    pub index: usize,

    /// Source document title
    pub title: String,

    /// Original sentence list
    pub sentences: Vec<String>,

    /// Sentences joined into running text
    pub text: String,
}

impl Paragraph {
    /// Title and text combined, the representation that gets embedded
    pub fn full_text(&self) -> String {
        if self.title.is_empty() {
            self.text.clone()
        } else {
            format!("{} {}", self.title, self.text)
        }
    }
}

/// One hit from a specific retrieve() call
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// The matched paragraph
    pub paragraph: Arc<Paragraph>,

    /// Cosine similarity against the query
    pub score: f32,

    /// 1-based rank within this call's results
    pub rank: usize,
}

/// Embedding-backed index over one question's context paragraphs
pub struct ParagraphIndex {
    embedder: Arc<dyn Embedder>,
    paragraphs: Vec<Arc<Paragraph>>,
    embeddings: Vec<Vec<f32>>,
}

impl ParagraphIndex {
    /// Create an empty index
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            paragraphs: Vec::new(),
            embeddings: Vec::new(),
        }
    }

    /// Number of indexed paragraphs
    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    /// True when no context has been indexed
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// All indexed paragraphs in input order
    pub fn paragraphs(&self) -> &[Arc<Paragraph>] {
        &self.paragraphs
    }

    /// Look up a paragraph by its stable index
    pub fn get(&self, index: usize) -> Option<&Arc<Paragraph>> {
        self.paragraphs.get(index)
    }

    /// Index a question's context, replacing any prior contents
    ///
    /// Paragraphs keep input order and receive sequential indices; all
    /// embeddings are computed in one batched call.
    pub async fn index(&mut self, context: &[(String, Vec<String>)]) -> Result<usize> {
        self.paragraphs.clear();
        self.embeddings.clear();

        if context.is_empty() {
            return Ok(0);
        }

        let mut full_texts = Vec::with_capacity(context.len());
        for (i, (title, sentences)) in context.iter().enumerate() {
            let paragraph = Paragraph {
                index: i,
                title: title.clone(),
                sentences: sentences.clone(),
                text: sentences.join(" "),
            };
            full_texts.push(paragraph.full_text());
            self.paragraphs.push(Arc::new(paragraph));
        }

        self.embeddings = self.embedder.embed_batch(&full_texts).await?;
        debug!(paragraphs = self.paragraphs.len(), "Indexed question context");
        Ok(self.paragraphs.len())
    }

    /// Retrieve the top-k paragraphs for a query
    ///
    /// Excluded indices are skipped, scores below `min_score` are
    /// dropped, and ties break by ascending paragraph index so results
    /// are deterministic.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        exclude: &HashSet<usize>,
        min_score: f32,
    ) -> Result<Vec<RetrievalResult>> {
        // An unbuilt or empty index is a normal empty result, not an error
        if self.paragraphs.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let mut scored: Vec<(f32, &Arc<Paragraph>)> = self
            .paragraphs
            .iter()
            .zip(self.embeddings.iter())
            .filter(|(paragraph, _)| !exclude.contains(&paragraph.index))
            .map(|(paragraph, embedding)| {
                (cosine_similarity(&query_embedding, embedding), paragraph)
            })
            .filter(|(score, _)| *score >= min_score)
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.index.cmp(&b.1.index))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, paragraph))| RetrievalResult {
                paragraph: Arc::clone(paragraph),
                score,
                rank: i + 1,
            })
            .collect())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
