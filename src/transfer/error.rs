//! Error type for storage-endpoint exchanges

use std::io;
use thiserror::Error;

/// A failure talking to the storage endpoint during one protocol step
#[derive(Debug, Error)]
pub enum StoreError {
    /// The endpoint answered with a non-success status
    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Could not reach the endpoint
    #[error("connection failure: {0}")]
    Connect(String),

    /// The request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Other transport-level failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// The endpoint's response violated the protocol (missing upload id,
    /// missing confirmation tag, malformed body)
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Local I/O failure while reading the source file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Check if the failure is transient and the step worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Connect(_) | StoreError::Timeout(_) | StoreError::Transport(_) => true,
            StoreError::Status { status, .. } => {
                matches!(status, 408 | 429) || *status >= 500
            }
            StoreError::Protocol(_) => false,
            StoreError::Io(_) => true,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        let detail = err.to_string();
        if err.is_timeout() {
            StoreError::Timeout(detail)
        } else if err.is_connect() {
            StoreError::Connect(detail)
        } else {
            StoreError::Transport(detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        let transient = |status| StoreError::Status {
            status,
            body: String::new(),
        }
        .is_transient();
        assert!(transient(500));
        assert!(transient(503));
        assert!(transient(429));
        assert!(transient(408));
        assert!(!transient(400));
        assert!(!transient(403));
        assert!(!transient(404));
    }

    #[test]
    fn test_transport_failures_transient() {
        assert!(StoreError::Connect("refused".to_string()).is_transient());
        assert!(StoreError::Timeout("30s".to_string()).is_transient());
        assert!(!StoreError::Protocol("no upload id".to_string()).is_transient());
    }
}
