//! The per-file transfer engine.
//!
//! Opens a session, streams the file up in fixed-size parts with a bounded
//! number in flight, closes the session with the confirmation tags sorted
//! by part number, and aborts the session on any failure along the way.
//! The close-ordering invariant is a protocol requirement: tags must be
//! submitted in part-number order with no gaps, which is why completions
//! are collected keyed by index and sorted rather than taken in arrival
//! order.

use std::io::SeekFrom;
use std::path::Path;

use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use super::backend::StoreBackend;
use super::error::StoreError;
use super::types::{part_plan, CompletionRecord, PartSpec, PartTag};
use crate::error::{CaravanError, Result};
use crate::target;

/// Drives the multipart protocol for one file at a time
#[derive(Debug)]
pub struct TransferEngine<B> {
    backend: B,
    part_size: u64,
    max_in_flight: usize,
}

impl<B: StoreBackend> TransferEngine<B> {
    pub fn new(backend: B, part_size: u64, max_in_flight: usize) -> Self {
        TransferEngine {
            backend,
            part_size,
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Upload one local file to the storage endpoint behind `upload_target`.
    ///
    /// On failure the open session is aborted best-effort before the
    /// original error propagates.
    pub async fn upload_file(&self, upload_target: &str, path: &Path) -> Result<CompletionRecord> {
        let endpoint = target::service_endpoint(upload_target)?;
        let file_name = path.to_string_lossy();
        let key = target::object_key(upload_target, &file_name)?;

        let size = tokio::fs::metadata(path).await?.len();
        if size == 0 {
            return Err(CaravanError::EmptyFile(path.to_path_buf()));
        }

        let upload_id = self
            .backend
            .initiate(endpoint, &key)
            .await
            .map_err(|source| CaravanError::TransferOpen {
                key: key.clone(),
                source,
            })?;
        debug!(key = %key, upload_id = %upload_id, size, "opened transfer session");

        match self.send_parts(endpoint, &key, &upload_id, path, size).await {
            Ok(mut tags) => {
                // Completions may arrive out of order; the close call must not.
                tags.sort_by_key(|t| t.part_number);
                match self.backend.complete(endpoint, &key, &upload_id, &tags).await {
                    Ok(record) => {
                        debug!(key = %key, parts = tags.len(), "closed transfer session");
                        Ok(record)
                    }
                    Err(source) => {
                        self.abort_quietly(endpoint, &key, &upload_id).await;
                        Err(CaravanError::TransferClose { key, source })
                    }
                }
            }
            Err(err) => {
                self.abort_quietly(endpoint, &key, &upload_id).await;
                Err(err)
            }
        }
    }

    /// Upload every planned part, at most `max_in_flight` concurrently.
    async fn send_parts(
        &self,
        endpoint: &str,
        key: &str,
        upload_id: &str,
        path: &Path,
        size: u64,
    ) -> Result<Vec<PartTag>> {
        let plan = part_plan(size, self.part_size);
        let uploads = plan
            .iter()
            .map(|spec| self.upload_one_part(endpoint, key, upload_id, path, *spec));

        stream::iter(uploads)
            .buffer_unordered(self.max_in_flight)
            .try_collect()
            .await
    }

    async fn upload_one_part(
        &self,
        endpoint: &str,
        key: &str,
        upload_id: &str,
        path: &Path,
        spec: PartSpec,
    ) -> Result<PartTag> {
        let data = read_chunk(path, spec)
            .await
            .map_err(|e| CaravanError::TransferPart {
                key: key.to_string(),
                part_number: spec.part_number,
                source: StoreError::Io(e),
            })?;

        self.backend
            .upload_part(endpoint, key, upload_id, spec.part_number, data)
            .await
            .map_err(|source| CaravanError::TransferPart {
                key: key.to_string(),
                part_number: spec.part_number,
                source,
            })
    }

    /// Abort failure must not mask the error that triggered it.
    async fn abort_quietly(&self, endpoint: &str, key: &str, upload_id: &str) {
        if let Err(e) = self.backend.abort(endpoint, key, upload_id).await {
            warn!(key = %key, upload_id = %upload_id, error = %e, "failed to abort transfer session");
        } else {
            debug!(key = %key, upload_id = %upload_id, "aborted transfer session");
        }
    }
}

/// Read one part's bytes from the source file.
///
/// Each part opens its own handle so concurrent reads never race on a
/// shared cursor.
async fn read_chunk(path: &Path, spec: PartSpec) -> std::io::Result<Bytes> {
    let mut file = File::open(path).await?;
    file.seek(SeekFrom::Start(spec.offset)).await?;
    let mut buf = vec![0u8; spec.len as usize];
    file.read_exact(&mut buf).await?;
    Ok(Bytes::from(buf))
}
