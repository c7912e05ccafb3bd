//! Graph engine error types.

use std::io;
use thiserror::Error;

/// Errors raised by a [`GraphEngine`](super::GraphEngine) or the node facade.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Vertex, edge or property does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was malformed (empty name, dangling edge endpoint, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine failed for a reason of its own (transport, query, ...).
    #[error("graph backend error: {0}")]
    Backend(String),

    /// I/O error while reading or writing a snapshot.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl GraphError {
    /// Create a NotFound error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an InvalidArgument error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a Backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Returns true if this error only says the element is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Graph result type.
pub type GraphResult<T> = Result<T, GraphError>;
