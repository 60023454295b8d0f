//! Trait seams between the pipeline and the outside world.

use async_trait::async_trait;
use std::fmt;

use crate::types::{ErrorKind, RequestSpec};

/// A response that made it back over the wire, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Transport-level failure: DNS, connect, timeout, broken body stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Network,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportError {}

/// Performs a single HTTP attempt. Retrying is the caller's job.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, request: &RequestSpec) -> Result<RawResponse, TransportError>;
}
