/*!
 * Error types for Caravan
 */

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::transfer::StoreError;

pub type Result<T> = std::result::Result<T, CaravanError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug, Error)]
pub enum CaravanError {
    /// Upload target locator is missing an expected path segment
    #[error("upload target '{target}' does not contain the '{marker}' segment")]
    MalformedTarget { target: String, marker: &'static str },

    /// Genuine manifest parse failures remained after reconciliation
    #[error("{count} file(s) could not be parsed as session manifests")]
    InvalidManifests { count: usize },

    /// A manifest references a local file that does not exist
    #[error("referenced file does not exist: {}", .0.display())]
    MissingReferencedFile(PathBuf),

    /// Zero-byte files cannot be expressed by the multipart protocol
    #[error("file is empty and cannot be transferred: {}", .0.display())]
    EmptyFile(PathBuf),

    /// A job-resource call returned a status outside the operation's contract
    #[error("expected HTTP {expected}, got {actual}: {body}")]
    UnexpectedStatus {
        expected: u16,
        actual: u16,
        body: String,
    },

    /// A job-resource response was well-formed but missing a required field
    #[error("invalid job response: {0}")]
    InvalidJobResponse(String),

    /// Opening a transfer session failed
    #[error("failed to open transfer for '{key}': {source}")]
    TransferOpen { key: String, source: StoreError },

    /// Uploading a single part failed
    #[error("failed to upload part {part_number} of '{key}': {source}")]
    TransferPart {
        key: String,
        part_number: i32,
        source: StoreError,
    },

    /// Closing a transfer session failed (bad tag set, server rejection)
    #[error("failed to close transfer for '{key}': {source}")]
    TransferClose { key: String, source: StoreError },

    /// Request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Could not reach the server
    #[error("connection failure: {0}")]
    Connect(String),

    /// TLS negotiation failure
    #[error("TLS failure: {0}")]
    Tls(String),

    /// Other HTTP transport failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Jobs still pending when the polling deadline expired
    #[error("timed out waiting for processing: {pending} job(s) still pending")]
    PollTimeout { pending: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CaravanError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CaravanError::Config(_)
            | CaravanError::MalformedTarget { .. }
            | CaravanError::InvalidManifests { .. }
            | CaravanError::Tls(_) => EXIT_FATAL,
            _ => EXIT_PARTIAL,
        }
    }

    /// Check if this error is fatal for the whole run, regardless of policy.
    ///
    /// Lenient policy can skip per-job failures; it can never skip a broken
    /// configuration or a malformed upload target.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaravanError::Config(_)
                | CaravanError::MalformedTarget { .. }
                | CaravanError::InvalidManifests { .. }
        )
    }

    /// Check if this error is transient (temporary, worth retrying)
    pub fn is_transient(&self) -> bool {
        match self {
            CaravanError::Timeout(_) | CaravanError::Connect(_) | CaravanError::Transport(_) => {
                true
            }
            CaravanError::Io(io_err) => Self::is_io_transient(io_err),
            CaravanError::TransferOpen { source, .. }
            | CaravanError::TransferPart { source, .. }
            | CaravanError::TransferClose { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    fn is_io_transient(io_err: &io::Error) -> bool {
        use io::ErrorKind::*;
        matches!(
            io_err.kind(),
            ConnectionRefused
                | ConnectionReset
                | ConnectionAborted
                | NotConnected
                | BrokenPipe
                | TimedOut
                | Interrupted
                | WouldBlock
        )
    }
}

// Transport failures are classified by kind instead of being collapsed into
// one opaque string: a timeout, a refused connection, and a TLS failure call
// for different operator responses.
impl From<reqwest::Error> for CaravanError {
    fn from(err: reqwest::Error) -> Self {
        let detail = err.to_string();
        if err.is_timeout() {
            CaravanError::Timeout(detail)
        } else if err.is_connect() {
            if detail.contains("certificate") || detail.contains("tls") {
                CaravanError::Tls(detail)
            } else {
                CaravanError::Connect(detail)
            }
        } else {
            CaravanError::Transport(detail)
        }
    }
}
