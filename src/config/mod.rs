//! Configuration for the IRCoT engine
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with IRCOT__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{IrcotError, Result};

/// Main engine configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct IrcotConfig {
    /// Retrieval budget and ranking configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Reasoning-loop configuration
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Reader-stage configuration
    #[serde(default)]
    pub reader: ReaderConfig,

    /// Demonstration configuration
    #[serde(default)]
    pub demos: DemoConfig,

    /// Language-model provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Paragraphs requested by the initial question retrieval
    #[serde(default = "default_k_initial")]
    pub k_initial: usize,

    /// Paragraphs requested per reasoning step
    #[serde(default = "default_k_step")]
    pub k_step: usize,

    /// Total paragraph budget per question
    #[serde(default = "default_max_paragraphs")]
    pub max_paragraphs: usize,

    /// Minimum similarity score to keep a retrieval hit
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReasoningConfig {
    /// Maximum reasoning steps before the loop gives up
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Token budget per step, sized for roughly one sentence
    #[serde(default = "default_step_tokens")]
    pub max_new_tokens: usize,

    /// Sampling temperature (0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Stop sequences for step generation
    #[serde(default = "default_stop")]
    pub stop: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReaderConfig {
    /// Token budget for the final read
    #[serde(default = "default_reader_tokens")]
    pub max_tokens: usize,

    /// Sampling temperature (0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Defensive cap on paragraphs shown to the reader
    #[serde(default = "default_max_paragraphs")]
    pub max_paragraphs: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemoConfig {
    /// Demonstrations included per prompt
    #[serde(default = "default_max_demos")]
    pub max_demos: usize,

    /// Path to an external demonstration resource (built-in when unset)
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Provider: openai, scripted
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model to use
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key for hosted providers
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries inside the provider
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Provider: openai, hash
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key for hosted providers
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Embedding dimension
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries inside the provider
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

// Default value functions
fn default_k_initial() -> usize { 4 }
fn default_k_step() -> usize { 4 }
fn default_max_paragraphs() -> usize { crate::DEFAULT_MAX_PARAGRAPHS }
fn default_min_score() -> f32 { 0.0 }
fn default_max_steps() -> usize { 8 }
fn default_step_tokens() -> usize { 128 }
fn default_reader_tokens() -> usize { 400 }
fn default_temperature() -> f32 { 0.0 }
fn default_stop() -> Vec<String> { vec!["\n".to_string(), "Q:".to_string()] }
fn default_max_demos() -> usize { 3 }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_llm_model() -> String { "gpt-4o-mini".to_string() }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { "text-embedding-ada-002".to_string() }
fn default_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_timeout() -> u64 { 30 }
fn default_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 100 }

impl IrcotConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self> {
        let env = std::env::var("IRCOT_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with IRCOT__ prefix
            // e.g., IRCOT__RETRIEVAL__MAX_PARAGRAPHS=10
            .add_source(
                Environment::with_prefix("IRCOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| IrcotError::Configuration { message: e.to_string() })?;

        config
            .try_deserialize()
            .map_err(|e| IrcotError::Configuration { message: e.to_string() })
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("IRCOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| IrcotError::Configuration { message: e.to_string() })?;

        config
            .try_deserialize()
            .map_err(|e| IrcotError::Configuration { message: e.to_string() })
    }

    /// Get the LLM request timeout as Duration
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    /// Get the embedding request timeout as Duration
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding.timeout_secs)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k_initial: default_k_initial(),
            k_step: default_k_step(),
            max_paragraphs: default_max_paragraphs(),
            min_score: default_min_score(),
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_new_tokens: default_step_tokens(),
            temperature: default_temperature(),
            stop: default_stop(),
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_reader_tokens(),
            temperature: default_temperature(),
            max_paragraphs: default_max_paragraphs(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            max_demos: default_max_demos(),
            path: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: None,
            api_base: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_key: None,
            api_base: None,
            dimension: default_dimension(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            batch_size: default_batch_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IrcotConfig::default();
        assert_eq!(config.retrieval.max_paragraphs, 15);
        assert_eq!(config.reasoning.max_steps, 8);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.reasoning.temperature, 0.0);
    }

    #[test]
    fn test_timeouts_as_durations() {
        let config = IrcotConfig::default();
        assert_eq!(config.llm_timeout(), Duration::from_secs(30));
        assert_eq!(config.embedding_timeout(), Duration::from_secs(30));
    }
}
