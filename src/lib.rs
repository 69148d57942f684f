/*!
 * Caravan - bulk media-session uploader
 *
 * Ingests locally stored capture sessions (an XML manifest plus the media
 * files it references) into a content platform:
 * - Two-pass manifest resolution that separates true manifests from
 *   auxiliary XML files they reference
 * - Chunked multipart transfer (open / send parts / close / abort) against
 *   the storage endpoint encoded in a server-issued upload target
 * - REST upload-job lifecycle (create, mark complete, poll to a terminal
 *   state)
 */

pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod poller;
pub mod rest;
pub mod target;
pub mod transfer;

// Re-export commonly used types
pub use config::{ErrorPolicy, LogLevel, UploadConfig};
pub use error::{CaravanError, Result};
pub use orchestrator::{StartedUpload, UploadOrchestrator};
pub use poller::StatusPoller;
pub use rest::{JobApi, JobState, RestJobClient, UploadJob};
pub use transfer::{StoreBackend, TransferEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
