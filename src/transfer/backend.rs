//! Protocol seam between the transfer engine and the storage endpoint

use async_trait::async_trait;
use bytes::Bytes;

use super::error::StoreError;
use super::types::{CompletionRecord, PartTag};

/// One storage endpoint's multipart operations.
///
/// `endpoint` is the service URL derived from an upload target (always
/// ending in a slash); `key` is the object key under the upload bucket.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Request a new transfer session for the object, returning its id
    async fn initiate(&self, endpoint: &str, key: &str) -> Result<String, StoreError>;

    /// Send one part; the returned tag is required to close the session
    async fn upload_part(
        &self,
        endpoint: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<PartTag, StoreError>;

    /// Close the session. Tags must arrive in part-number order with no
    /// gaps; the endpoint rejects anything else.
    async fn complete(
        &self,
        endpoint: &str,
        key: &str,
        upload_id: &str,
        tags: &[PartTag],
    ) -> Result<CompletionRecord, StoreError>;

    /// Release server-side resources for an unfinished session
    async fn abort(&self, endpoint: &str, key: &str, upload_id: &str) -> Result<(), StoreError>;
}
