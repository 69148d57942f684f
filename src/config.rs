/*!
 * Configuration types for Caravan
 */

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{CaravanError, Result};

/// Number of bytes in a kibibyte
pub const KIB: u64 = 1024;

/// Number of bytes in a mebibyte
pub const MIB: u64 = 1024 * KIB;

/// Default multipart part size (5 MiB, the storage endpoint's minimum)
pub const DEFAULT_PART_SIZE: u64 = 5 * MIB;

/// How to react when a manifest, referenced file, or job operation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Halt the whole run on the first genuine failure
    #[default]
    Strict,
    /// Log the failure, drop the affected unit, continue with the rest
    Lenient,
}

/// Log verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Main configuration for an upload run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Server domain name, no scheme or slashes (e.g. demo.hosted.example.com)
    pub server: String,

    /// Pre-acquired session auth cookie value
    pub auth_cookie: String,

    /// Root directory to scan for session manifests
    pub directory: PathBuf,

    /// Destination folder id on the server
    pub folder_id: Uuid,

    /// Optional path to write final upload results to (JSON)
    #[serde(default)]
    pub output_file: Option<PathBuf>,

    /// Failure policy for manifests, missing files, and per-job errors
    #[serde(default)]
    pub error_policy: ErrorPolicy,

    /// Accept invalid TLS certificates.
    ///
    /// Immutable per-run transport configuration, applied to every client
    /// built from this config; there is no process-wide toggle.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Multipart part size in bytes
    #[serde(default = "default_part_size")]
    pub part_size: u64,

    /// Maximum number of parts of a single file in flight at once
    #[serde(default = "default_in_flight_parts")]
    pub max_in_flight_parts: usize,

    /// Seconds between status-poll rounds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Overall deadline for status polling, in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Per-request HTTP timeout, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

fn default_part_size() -> u64 {
    DEFAULT_PART_SIZE
}

fn default_in_flight_parts() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    10
}

fn default_poll_timeout() -> u64 {
    6 * 60 * 60
}

fn default_request_timeout() -> u64 {
    300
}

impl UploadConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.is_empty() {
            return Err(CaravanError::Config("server must not be empty".to_string()));
        }
        if self.server.contains('/') {
            return Err(CaravanError::Config(format!(
                "server must be a bare domain name, got '{}'",
                self.server
            )));
        }
        if self.auth_cookie.is_empty() {
            return Err(CaravanError::Config(
                "auth cookie must not be empty".to_string(),
            ));
        }
        if self.part_size == 0 {
            return Err(CaravanError::Config(
                "part size must be greater than zero".to_string(),
            ));
        }
        if self.max_in_flight_parts == 0 {
            return Err(CaravanError::Config(
                "max in-flight parts must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(CaravanError::Config(
                "poll interval must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL for the server's REST API
    pub fn rest_base_url(&self) -> String {
        format!("https://{}/Panopto/PublicAPI/REST", self.server)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            server: String::new(),
            auth_cookie: String::new(),
            directory: PathBuf::new(),
            folder_id: Uuid::nil(),
            output_file: None,
            error_policy: ErrorPolicy::default(),
            accept_invalid_certs: false,
            part_size: default_part_size(),
            max_in_flight_parts: default_in_flight_parts(),
            poll_interval_secs: default_poll_interval(),
            poll_timeout_secs: default_poll_timeout(),
            request_timeout_secs: default_request_timeout(),
            log_level: LogLevel::default(),
            log_file: None,
            verbose: false,
        }
    }
}
