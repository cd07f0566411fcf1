//! IRCoT Reasoning Engine
//!
//! Answers multi-hop questions by interleaving chain-of-thought generation
//! with document retrieval, then reading a final answer from all gathered
//! evidence. Core pieces:
//! - Per-question paragraph index with embedding similarity search
//! - Budgeted, deduplicating retrieval accumulator
//! - Sentence-at-a-time reasoning loop with termination logic
//! - Independent reader stage producing the authoritative answer
//! - Language-model and embedding ports with OpenAI-compatible clients

pub mod cache;
pub mod config;
pub mod demos;
pub mod errors;
pub mod extract;
pub mod generator;
pub mod index;
pub mod ports;
pub mod prompt;
pub mod reader;
pub mod retrieval;
pub mod system;

// Re-export commonly used types
pub use config::IrcotConfig;
pub use demos::{CotDemo, DemoSet};
pub use errors::{IrcotError, Result};
pub use index::{Paragraph, ParagraphIndex, RetrievalResult};
pub use ports::{Embedder, LanguageModel};
pub use retrieval::RetrievalState;
pub use system::{IrcotEngine, IrcotResult, ReasoningStep, TerminationReason};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default total paragraph budget per question
pub const DEFAULT_MAX_PARAGRAPHS: usize = 15;

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
