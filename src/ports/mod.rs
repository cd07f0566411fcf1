//! External capability ports
//!
//! The two blocking request/response interfaces the engine depends on:
//! - LanguageModel: bounded text generation
//! - Embedder: single and batched text embedding
//!
//! Any provider (hosted API, local server, mock) implements the same
//! contract. Retry policy lives inside the provider, never in the engine.

pub mod mock;
pub mod openai;

pub use mock::{HashEmbedder, ScriptedLm};
pub use openai::{OpenAiEmbedder, OpenAiLm};

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for text generation
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for the prompt
    ///
    /// Output must be truncated at the first occurrence of any stop
    /// sequence if the underlying provider does not already do so.
    async fn generate(
        &self,
        prompt: &str,
        max_new_tokens: usize,
        temperature: f32,
        stop: Option<&[String]>,
    ) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// Truncate text at the first occurrence of any stop sequence
pub fn truncate_at_stop<'a>(text: &'a str, stop: &[String]) -> &'a str {
    let mut cut = text.len();
    for sequence in stop {
        if sequence.is_empty() {
            continue;
        }
        if let Some(pos) = text.find(sequence.as_str()) {
            cut = cut.min(pos);
        }
    }
    &text[..cut]
}

/// Create a language model based on configuration
pub fn create_language_model(config: &LlmConfig) -> Arc<dyn LanguageModel> {
    match config.provider.as_str() {
        "openai" => {
            let key = config.api_key.clone().expect("LLM API key required");
            Arc::new(OpenAiLm::new(key, config))
        }
        "scripted" => Arc::new(ScriptedLm::empty()),
        _ => {
            tracing::warn!(provider = %config.provider, "Unknown LLM provider, using scripted mock");
            Arc::new(ScriptedLm::empty())
        }
    }
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Arc<dyn Embedder> {
    match config.provider.as_str() {
        "openai" => {
            let key = config.api_key.clone().expect("Embedding API key required");
            Arc::new(OpenAiEmbedder::new(key, config))
        }
        "hash" => Arc::new(HashEmbedder::new(config.dimension)),
        _ => {
            tracing::warn!(provider = %config.provider, "Unknown embedding provider, using hash mock");
            Arc::new(HashEmbedder::new(config.dimension))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_at_first_stop() {
        let stop = vec!["\n".to_string(), "Q:".to_string()];
        assert_eq!(truncate_at_stop("one sentence.\nanother", &stop), "one sentence.");
        assert_eq!(truncate_at_stop("text Q: next question", &stop), "text ");
        assert_eq!(truncate_at_stop("no stops here", &stop), "no stops here");
    }

    #[test]
    fn test_truncate_picks_earliest_stop() {
        let stop = vec!["Q:".to_string(), "\n".to_string()];
        assert_eq!(truncate_at_stop("a\nb Q: c", &stop), "a");
    }

    #[test]
    fn test_empty_stop_sequences_ignored() {
        let stop = vec![String::new()];
        assert_eq!(truncate_at_stop("unchanged", &stop), "unchanged");
    }
}
