//! Upload orchestration.
//!
//! For each confirmed manifest: create a job, transfer the manifest file
//! and every referenced file into the job's upload target, then flip the
//! job to `UploadComplete` so the server starts processing. The manifest
//! file always goes first so a half-finished upload is recognizable
//! server-side.

use std::path::PathBuf;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ErrorPolicy;
use crate::error::{CaravanError, Result};
use crate::manifest::{ResolvedManifest, ResolvedSet};
use crate::rest::{JobApi, JobState, UploadJob};
use crate::transfer::{StoreBackend, TransferEngine};

/// A job whose files all landed and which is now processing server-side
#[derive(Debug, Clone)]
pub struct StartedUpload {
    pub manifest_path: PathBuf,
    pub job: UploadJob,
}

/// Drives the create-transfer-complete sequence for a set of manifests
pub struct UploadOrchestrator<'a, J, B> {
    jobs: &'a J,
    engine: &'a TransferEngine<B>,
    folder_id: Uuid,
    policy: ErrorPolicy,
}

impl<'a, J: JobApi, B: StoreBackend> UploadOrchestrator<'a, J, B> {
    pub fn new(
        jobs: &'a J,
        engine: &'a TransferEngine<B>,
        folder_id: Uuid,
        policy: ErrorPolicy,
    ) -> Self {
        UploadOrchestrator {
            jobs,
            engine,
            folder_id,
            policy,
        }
    }

    /// Start an upload for every confirmed manifest in the set.
    ///
    /// Genuine manifest errors end the run under the strict policy before
    /// any job is created. Per-manifest failures after that point follow
    /// the policy: strict stops the run, lenient skips the manifest and
    /// carries on. Fatal errors stop the run under either policy.
    pub async fn start_uploads(&self, set: &ResolvedSet) -> Result<Vec<StartedUpload>> {
        if !set.errors.is_empty() {
            match self.policy {
                ErrorPolicy::Strict => {
                    return Err(CaravanError::InvalidManifests {
                        count: set.errors.len(),
                    });
                }
                ErrorPolicy::Lenient => {
                    warn!(
                        count = set.errors.len(),
                        "continuing despite unparsable manifest candidates"
                    );
                }
            }
        }

        let mut started = Vec::with_capacity(set.manifests.len());
        for manifest in &set.manifests {
            match self.start_one(manifest).await {
                Ok(upload) => started.push(upload),
                Err(e) if self.policy == ErrorPolicy::Lenient && !e.is_fatal() => {
                    warn!(
                        manifest = %manifest.path.display(),
                        error = %e,
                        "skipping manifest after failure"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(started)
    }

    async fn start_one(&self, manifest: &ResolvedManifest) -> Result<StartedUpload> {
        info!(
            manifest = %manifest.path.display(),
            title = manifest.title.as_deref().unwrap_or("<untitled>"),
            files = manifest.referenced_files.len(),
            "starting upload"
        );

        let job = self.jobs.create(self.folder_id).await?;
        let id = job
            .id
            .ok_or_else(|| CaravanError::InvalidJobResponse("created job has no id".to_string()))?;
        let target = job.upload_target.clone().ok_or_else(|| {
            CaravanError::InvalidJobResponse("created job has no upload target".to_string())
        })?;
        info!(job_id = %id, target = %target, "job created");

        // Manifest first, then its dependencies in manifest order.
        self.engine.upload_file(&target, &manifest.path).await?;
        for file in &manifest.referenced_files {
            if !file.exists() {
                match self.policy {
                    ErrorPolicy::Lenient => {
                        warn!(file = %file.display(), "referenced file missing, skipping");
                        continue;
                    }
                    ErrorPolicy::Strict => {
                        return Err(CaravanError::MissingReferencedFile(file.clone()));
                    }
                }
            }
            self.engine.upload_file(&target, file).await?;
        }

        let mut done = job.clone();
        done.state = JobState::UploadComplete;
        let job = self.jobs.update(&done).await?;
        info!(job_id = %id, "all files transferred, job marked complete");

        Ok(StartedUpload {
            manifest_path: manifest.path.clone(),
            job,
        })
    }
}
