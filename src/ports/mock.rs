//! Test doubles for the two ports
//!
//! Provides:
//! - ScriptedLm: replays a fixed response sequence
//! - HashEmbedder: deterministic bag-of-tokens embeddings

use super::{truncate_at_stop, Embedder, LanguageModel};
use crate::errors::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Language model that replays a scripted response sequence
///
/// Returns an empty string once the script is exhausted, which drives the
/// reasoning loop's empty-generation termination in tests.
pub struct ScriptedLm {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedLm {
    /// Create a mock with the given response sequence
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }

    /// Create a mock with no responses
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    /// Responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLm {
    async fn generate(
        &self,
        _prompt: &str,
        _max_new_tokens: usize,
        _temperature: f32,
        stop: Option<&[String]>,
    ) -> Result<String> {
        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default();

        Ok(match stop {
            Some(stop) => truncate_at_stop(&next, stop).to_string(),
            None => next,
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Deterministic embedder hashing whitespace tokens into buckets
///
/// Texts sharing tokens land in shared buckets, so lexical overlap yields
/// high cosine similarity without a model call.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        (fnv1a(token) % self.dimension as u64) as usize
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in s.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            vector[self.bucket(token)] += 1.0;
        }
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        "hash-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
