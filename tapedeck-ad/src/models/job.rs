//! Download job lifecycle model
//!
//! A job progresses through defined statuses:
//! queued → downloading → processing → completed/error
//!
//! Transitions are forward-only. `error` is reachable from any
//! non-terminal status; terminal statuses never change again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, not yet started
    Queued,
    /// Extractor subprocess running
    Downloading,
    /// Tempo adjustment running
    Processing,
    /// Finished successfully
    Completed,
    /// Failed; message carries the reason
    Error,
}

impl JobStatus {
    /// Check if status is terminal (job finished)
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Check whether a transition to `next` is allowed
    ///
    /// The processing step is optional, so `downloading` may complete
    /// directly when no tempo change was requested.
    pub fn can_transition(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Downloading)
                | (JobStatus::Downloading, JobStatus::Processing)
                | (JobStatus::Downloading, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Completed)
                | (_, JobStatus::Error)
        )
    }

    /// Status name as used on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

/// Download job (in-memory state)
///
/// Serialized directly as the `/status/{id}` response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job identifier
    pub id: Uuid,

    /// Submitted media URL
    pub url: String,

    /// Requested playback speed factor
    pub speed: f64,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Human-readable description, overwritten on each transition
    pub message: String,

    /// Download percentage string, updated only while downloading
    pub progress: String,

    /// Submission time (sort key for the jobs listing)
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a new queued job
    pub fn new(url: String, speed: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            speed,
            status: JobStatus::Queued,
            message: String::from("Waiting to start..."),
            progress: String::from("0%"),
            created_at: Utc::now(),
        }
    }
}
