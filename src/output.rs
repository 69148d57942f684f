//! Machine-readable run results

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{CaravanError, Result};
use crate::orchestrator::StartedUpload;
use crate::rest::UploadJob;

#[derive(Debug, Serialize)]
struct ResultEntry<'a> {
    manifest: String,
    job: &'a UploadJob,
}

/// Write the final state of every started upload as a JSON array.
///
/// Written unconditionally at the end of a run, including after a polling
/// timeout, so downstream tooling always sees the last known state.
pub fn write_results(path: &Path, uploads: &[StartedUpload]) -> Result<()> {
    let entries: Vec<ResultEntry<'_>> = uploads
        .iter()
        .map(|u| ResultEntry {
            manifest: u.manifest_path.display().to_string(),
            job: &u.job,
        })
        .collect();

    let json = serde_json::to_string_pretty(&entries)
        .map_err(|e| CaravanError::Serialization(e.to_string()))?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), jobs = uploads.len(), "results written");
    Ok(())
}
