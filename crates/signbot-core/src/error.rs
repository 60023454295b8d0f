//! Signbot error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignbotError>;

#[derive(Debug, Error)]
pub enum SignbotError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Account error: {0}")]
    Account(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Classify error: {0}")]
    Classify(String),

    #[error("Notify error: {0}")]
    Notify(String),

    #[error("Sink '{sink}' failed: {reason}")]
    Sink { sink: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SignbotError {
    pub fn sink(sink: &str, reason: impl Into<String>) -> Self {
        Self::Sink {
            sink: sink.to_string(),
            reason: reason.into(),
        }
    }
}
