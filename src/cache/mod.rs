//! In-memory embedding cache
//!
//! Provides:
//! - An explicit cache object injected by reference, never global state
//! - Content-addressed keys (model name + SHA-256 of the text)
//! - A caching decorator over any Embedder
//!
//! Concurrent question-processing can share one cache or isolate caches
//! by construction; the decorator is transparent to the engine.

use crate::errors::{IrcotError, Result};
use crate::ports::Embedder;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Build a content-addressed cache key
fn cache_key(model: &str, text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{}:{}", model, hex::encode(digest))
}

/// Shared in-memory embedding cache
#[derive(Default)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, Vec<f32>>>,
}

impl EmbeddingCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached embedding
    pub async fn get(&self, model: &str, text: &str) -> Option<Vec<f32>> {
        let key = cache_key(model, text);
        let hit = self.entries.read().await.get(&key).cloned();
        if hit.is_some() {
            debug!(key = %key, "Embedding cache hit");
        }
        hit
    }

    /// Store an embedding
    pub async fn insert(&self, model: &str, text: &str, embedding: Vec<f32>) {
        let key = cache_key(model, text);
        self.entries.write().await.insert(key, embedding);
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True when nothing is cached
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop all entries
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Embedder decorator that serves repeated texts from the cache
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Arc<EmbeddingCache>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, cache: Arc<EmbeddingCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self.cache.get(self.inner.model_name(), text).await {
            return Ok(hit);
        }
        let embedding = self.inner.embed(text).await?;
        self.cache
            .insert(self.inner.model_name(), text, embedding.clone())
            .await;
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.inner.model_name();

        // Serve hits locally, embed only the misses in one upstream call
        let mut resolved: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut misses: Vec<usize> = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            match self.cache.get(model, text).await {
                Some(hit) => resolved.push(Some(hit)),
                None => {
                    resolved.push(None);
                    misses.push(i);
                }
            }
        }

        if !misses.is_empty() {
            let pending: Vec<String> = misses.iter().map(|&i| texts[i].clone()).collect();
            let embedded = self.inner.embed_batch(&pending).await?;
            if embedded.len() != pending.len() {
                return Err(IrcotError::Embedding {
                    message: format!(
                        "Batch returned {} embeddings for {} texts",
                        embedded.len(),
                        pending.len()
                    ),
                });
            }
            for (&i, embedding) in misses.iter().zip(embedded) {
                self.cache.insert(model, &texts[i], embedding.clone()).await;
                resolved[i] = Some(embedding);
            }
        }

        Ok(resolved.into_iter().flatten().collect())
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Upstream embedder that counts how often it is actually called
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn model_name(&self) -> &str {
            "counting"
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_repeat_embed_hits_cache() {
        let upstream = Arc::new(CountingEmbedder::new());
        let cache = Arc::new(EmbeddingCache::new());
        let cached = CachedEmbedder::new(upstream.clone(), cache.clone());

        let first = cached.embed("same text").await.unwrap();
        let second = cached.embed("same text").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_batch_embeds_only_misses() {
        let upstream = Arc::new(CountingEmbedder::new());
        let cache = Arc::new(EmbeddingCache::new());
        let cached = CachedEmbedder::new(upstream.clone(), cache.clone());

        cached.embed("warm").await.unwrap();

        let texts = vec!["warm".to_string(), "cold".to_string()];
        let embeddings = cached.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0], vec![4.0, 1.0]);
        // One embed call for the warm-up, one batch call for the single miss
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_caches_are_isolated_by_construction() {
        let upstream = Arc::new(CountingEmbedder::new());
        let first = CachedEmbedder::new(upstream.clone(), Arc::new(EmbeddingCache::new()));
        let second = CachedEmbedder::new(upstream.clone(), Arc::new(EmbeddingCache::new()));

        first.embed("text").await.unwrap();
        second.embed("text").await.unwrap();

        // Separate caches, so the upstream is consulted twice
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
    }
}
