//! In-memory download job store
//!
//! Jobs are held in a shared map for the lifetime of the process; there
//! is no eviction or persistence. Every accepted mutation is announced
//! on the event bus, so SSE clients see the same lifecycle the status
//! endpoint reports.

use crate::models::{Job, JobStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tapedeck_common::events::{EventBus, TapedeckEvent};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Shared job table
#[derive(Clone)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
    event_bus: EventBus,
}

impl JobStore {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            event_bus,
        }
    }

    /// Create a queued job and announce it
    pub async fn create(&self, url: &str, speed: f64) -> Job {
        let job = Job::new(url.to_string(), speed);
        self.jobs.write().await.insert(job.id, job.clone());

        self.event_bus.emit_lossy(TapedeckEvent::JobQueued {
            job_id: job.id,
            url: job.url.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(job_id = %job.id, url, speed, "job created");
        job
    }

    /// Snapshot of a single job
    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Snapshot of all jobs, newest first
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Advance a job's status, refusing illegal transitions
    ///
    /// Returns the updated job when the transition applied; `None` for an
    /// unknown id or a transition the lifecycle does not allow. Reaching
    /// `Completed` also pins progress to 100%.
    pub async fn set_status(&self, id: Uuid, status: JobStatus, message: &str) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id)?;
        if !job.status.can_transition(status) {
            tracing::warn!(
                job_id = %id,
                from = job.status.as_str(),
                to = status.as_str(),
                "ignoring illegal status transition"
            );
            return None;
        }

        let old_status = job.status;
        job.status = status;
        job.message = message.to_string();
        if status == JobStatus::Completed {
            job.progress = "100%".to_string();
        }
        let updated = job.clone();
        drop(jobs);

        self.event_bus.emit_lossy(TapedeckEvent::JobStatusChanged {
            job_id: id,
            old_status: old_status.as_str().to_string(),
            new_status: status.as_str().to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        });
        tracing::info!(
            job_id = %id,
            from = old_status.as_str(),
            to = status.as_str(),
            message,
            "job status changed"
        );
        Some(updated)
    }

    /// Record download progress
    ///
    /// Only applies while the job is downloading; late reports from an
    /// already-settled job are dropped.
    pub async fn set_progress(&self, id: Uuid, progress: &str) {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return;
        };
        if job.status != JobStatus::Downloading {
            return;
        }
        job.progress = progress.to_string();
        drop(jobs);

        self.event_bus.emit_lossy(TapedeckEvent::JobProgress {
            job_id: id,
            progress: progress.to_string(),
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> JobStore {
        JobStore::new(EventBus::new(16))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = store();
        let job = store.create("https://example.com/watch?v=1", 1.5).await;

        let fetched = store.get(job.id).await.expect("job exists");
        assert_eq!(fetched.url, "https://example.com/watch?v=1");
        assert_eq!(fetched.speed, 1.5);
        assert_eq!(fetched.status, JobStatus::Queued);
        assert_eq!(fetched.progress, "0%");
    }

    #[tokio::test]
    async fn test_get_unknown_id() {
        assert!(store().get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = store();
        let first = store.create("https://example.com/1", 1.0).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.create("https://example.com/2", 1.0).await;

        let jobs = store.list().await;
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, second.id);
        assert_eq!(jobs[1].id, first.id);
    }

    #[tokio::test]
    async fn test_forward_transitions_apply() {
        let store = store();
        let job = store.create("https://example.com/1", 1.0).await;

        let updated = store
            .set_status(job.id, JobStatus::Downloading, "Starting download...")
            .await
            .expect("transition applies");
        assert_eq!(updated.status, JobStatus::Downloading);
        assert_eq!(updated.message, "Starting download...");

        store.set_progress(job.id, "42.7%").await;
        assert_eq!(store.get(job.id).await.unwrap().progress, "42.7%");

        let done = store
            .set_status(job.id, JobStatus::Completed, "Downloaded 1 file")
            .await
            .expect("transition applies");
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress, "100%");
    }

    #[tokio::test]
    async fn test_backward_transition_rejected() {
        let store = store();
        let job = store.create("https://example.com/1", 1.0).await;
        store
            .set_status(job.id, JobStatus::Downloading, "Starting download...")
            .await
            .unwrap();
        store
            .set_status(job.id, JobStatus::Processing, "Applying speed adjustment (2x)...")
            .await
            .unwrap();

        assert!(store
            .set_status(job.id, JobStatus::Downloading, "again")
            .await
            .is_none());
        let job = store.get(job.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.message, "Applying speed adjustment (2x)...");
    }

    #[tokio::test]
    async fn test_terminal_states_frozen() {
        let store = store();
        let job = store.create("https://example.com/1", 1.0).await;
        store
            .set_status(job.id, JobStatus::Error, "Error: boom")
            .await
            .unwrap();

        assert!(store
            .set_status(job.id, JobStatus::Downloading, "Starting download...")
            .await
            .is_none());
        assert!(store.set_status(job.id, JobStatus::Error, "again").await.is_none());
        assert_eq!(store.get(job.id).await.unwrap().message, "Error: boom");
    }

    #[tokio::test]
    async fn test_progress_ignored_outside_downloading() {
        let store = store();
        let job = store.create("https://example.com/1", 1.0).await;

        store.set_progress(job.id, "55.0%").await;
        assert_eq!(store.get(job.id).await.unwrap().progress, "0%");

        store
            .set_status(job.id, JobStatus::Downloading, "Starting download...")
            .await
            .unwrap();
        store
            .set_status(job.id, JobStatus::Completed, "Downloaded 1 file")
            .await
            .unwrap();
        store.set_progress(job.id, "55.0%").await;
        assert_eq!(store.get(job.id).await.unwrap().progress, "100%");
    }

    #[tokio::test]
    async fn test_status_changes_reach_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let store = JobStore::new(bus);

        let job = store.create("https://example.com/1", 1.0).await;
        store
            .set_status(job.id, JobStatus::Downloading, "Starting download...")
            .await
            .unwrap();

        let queued = rx.try_recv().expect("queued event");
        assert_eq!(queued.event_type(), "JobQueued");
        match rx.try_recv().expect("status event") {
            TapedeckEvent::JobStatusChanged {
                old_status,
                new_status,
                ..
            } => {
                assert_eq!(old_status, "queued");
                assert_eq!(new_status, "downloading");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
