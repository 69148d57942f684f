//! Upload job wire types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an upload job.
///
/// The forward path is `Uploading` to `UploadComplete` (set by the client
/// once every file landed) to `Processing`, ending in `Complete`,
/// `ProcessingError`, or `UploadCancelled`. Deletion runs on its own
/// short track, `DeletingFiles` into `Deleted` or `DeletingError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Uploading,
    UploadComplete,
    Processing,
    Complete,
    ProcessingError,
    UploadCancelled,
    DeletingFiles,
    Deleted,
    DeletingError,
}

impl JobState {
    /// Check if the job can still change state on its own
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Complete
                | JobState::ProcessingError
                | JobState::UploadCancelled
                | JobState::Deleted
                | JobState::DeletingError
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JobState::ProcessingError | JobState::DeletingError)
    }

    /// Position along the forward lifecycle, for spotting regressions.
    ///
    /// Deletion states share a rank since they sit outside the forward
    /// path.
    pub fn phase_rank(&self) -> u8 {
        match self {
            JobState::Uploading => 0,
            JobState::UploadComplete => 1,
            JobState::Processing => 2,
            JobState::Complete | JobState::ProcessingError | JobState::UploadCancelled => 3,
            JobState::DeletingFiles | JobState::Deleted | JobState::DeletingError => 3,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Uploading => "Uploading",
            JobState::UploadComplete => "UploadComplete",
            JobState::Processing => "Processing",
            JobState::Complete => "Complete",
            JobState::ProcessingError => "ProcessingError",
            JobState::UploadCancelled => "UploadCancelled",
            JobState::DeletingFiles => "DeletingFiles",
            JobState::Deleted => "Deleted",
            JobState::DeletingError => "DeletingError",
        };
        f.write_str(name)
    }
}

/// One upload job as the server represents it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadJob {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[serde(rename = "UploadTarget", default, skip_serializing_if = "Option::is_none")]
    pub upload_target: Option<String>,

    #[serde(rename = "State")]
    pub state: JobState,

    #[serde(rename = "FolderId", default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Uuid>,

    /// Set by the server once processing created the session
    #[serde(rename = "SessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,

    #[serde(rename = "MessageID", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,

    /// Human-readable progress or error detail
    #[serde(rename = "Message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UploadJob {
    /// Build the creation request body for a job targeting `folder_id`
    pub fn creation_request(folder_id: Uuid) -> Self {
        UploadJob {
            id: None,
            upload_target: None,
            state: JobState::Uploading,
            folder_id: Some(folder_id),
            session_id: None,
            message_id: None,
            message: None,
        }
    }
}
