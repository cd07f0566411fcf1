//! Error types for the IRCoT engine
//!
//! Provides:
//! - Distinct error types for the two external ports
//! - Conversions from transport and serialization errors
//! - A crate-wide Result alias
//!
//! Only genuine failures become errors. Heuristic "failure-like" outcomes
//! (empty retrieval, extraction miss, exhausted paragraph budget) are
//! represented as data on the result types instead.

use thiserror::Error;

/// Result type alias using IrcotError
pub type Result<T> = std::result::Result<T, IrcotError>;

/// Engine error types
#[derive(Error, Debug)]
pub enum IrcotError {
    /// A call against the language-model port failed
    #[error("Generation error: {message}")]
    Generation { message: String },

    /// A call against the embedding port failed
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The demonstration resource could not be parsed
    #[error("Demonstration format error: {message}")]
    DemoFormat { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl IrcotError {
    /// True for failures raised by an external port call
    ///
    /// Port failures propagate through the engine unmodified; a batch
    /// caller decides whether to retry or drop the question.
    pub fn is_port_failure(&self) -> bool {
        matches!(
            self,
            IrcotError::Generation { .. }
                | IrcotError::Embedding { .. }
                | IrcotError::HttpClient(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_failure_classification() {
        let err = IrcotError::Generation {
            message: "upstream 500".into(),
        };
        assert!(err.is_port_failure());

        let err = IrcotError::Configuration {
            message: "bad value".into(),
        };
        assert!(!err.is_port_failure());
    }

    #[test]
    fn test_error_display() {
        let err = IrcotError::Embedding {
            message: "timeout".into(),
        };
        assert_eq!(err.to_string(), "Embedding error: timeout");
    }
}
