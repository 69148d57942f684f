//! Upload job REST surface.
//!
//! Jobs are the server-side resource that ties a manifest upload to the
//! ingest pipeline: create a job to get an upload target, push the files,
//! flip the job to `UploadComplete`, then watch it move through processing.

mod client;
mod types;

pub use client::RestJobClient;
pub use types::{JobState, UploadJob};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// CRUD operations on upload jobs
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Create a job targeting `folder_id`; the response carries the
    /// assigned id and upload target
    async fn create(&self, folder_id: Uuid) -> Result<UploadJob>;

    /// Fetch the current server-side view of a job
    async fn read(&self, id: Uuid) -> Result<UploadJob>;

    /// Push a modified job back, returning the server's view
    async fn update(&self, job: &UploadJob) -> Result<UploadJob>;

    /// Cancel a job and release its upload target, returning the
    /// server's final view of it
    async fn delete(&self, id: Uuid) -> Result<UploadJob>;
}
