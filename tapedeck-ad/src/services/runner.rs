//! Background download pipeline
//!
//! Each accepted job runs as its own tokio task:
//! fetch into the job's staging directory, optionally re-tempo every
//! staged file, then promote the results into the scratch library.
//! Status and progress flow through the job store, which announces them
//! on the event bus.

use crate::models::JobStatus;
use crate::services::extractor::{ExtractError, MediaExtractor};
use crate::services::registry::{FileRegistry, RegistryError};
use crate::services::tempo::{TempoError, TempoPlan};
use crate::services::transcoder::AudioTranscoder;
use crate::store::JobStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Wait after extraction for postprocessor writes to settle
const WRITE_SETTLE: Duration = Duration::from_millis(500);

/// Pipeline failure
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Tempo(#[from] TempoError),
}

/// Executes download jobs as background tasks
#[derive(Clone)]
pub struct JobRunner {
    store: JobStore,
    extractor: MediaExtractor,
    transcoder: AudioTranscoder,
    registry: FileRegistry,
    last_error: Arc<RwLock<Option<String>>>,
}

impl JobRunner {
    pub fn new(
        store: JobStore,
        extractor: MediaExtractor,
        transcoder: AudioTranscoder,
        registry: FileRegistry,
        last_error: Arc<RwLock<Option<String>>>,
    ) -> Self {
        Self {
            store,
            extractor,
            transcoder,
            registry,
            last_error,
        }
    }

    /// Launch a job's pipeline on a background task
    ///
    /// Any pipeline error lands the job in `Error` with an
    /// `Error: <cause>` message.
    pub fn spawn(&self, job_id: Uuid) {
        let runner = self.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.run(job_id).await {
                tracing::error!(job_id = %job_id, error = %e, "download job failed");
                runner
                    .store
                    .set_status(job_id, JobStatus::Error, &format!("Error: {e}"))
                    .await;
                *runner.last_error.write().await = Some(e.to_string());
            }
        });
    }

    async fn run(&self, job_id: Uuid) -> Result<(), RunnerError> {
        self.registry.create_staging(job_id).await?;
        let result = self.execute(job_id).await;
        if result.is_err() {
            self.registry.remove_staging(job_id).await;
        }
        result
    }

    async fn execute(&self, job_id: Uuid) -> Result<(), RunnerError> {
        let Some(job) = self.store.get(job_id).await else {
            tracing::warn!(job_id = %job_id, "job vanished before start");
            return Ok(());
        };

        self.store
            .set_status(job_id, JobStatus::Downloading, "Starting download...")
            .await;

        let staging = self.registry.staging_dir(job_id);
        let (tx, rx) = mpsc::channel(32);
        let forwarder = tokio::spawn(forward_progress(self.store.clone(), job_id, rx));

        let fetch_result = self.extractor.fetch(&job.url, &staging, tx).await;
        // The sender is gone, so the forwarder drains and exits
        let _ = forwarder.await;
        let outcome = fetch_result?;
        tracing::debug!(job_id = %job_id, files = outcome.files.len(), "fetch complete");

        // Let the extractor's postprocessors finish their writes
        tokio::time::sleep(WRITE_SETTLE).await;

        let staged = self.registry.staged_files(job_id).await?;
        let plan = TempoPlan::for_speed(job.speed)?;
        if !plan.is_identity() && !staged.is_empty() {
            self.store
                .set_status(
                    job_id,
                    JobStatus::Processing,
                    &format!("Applying speed adjustment ({}x)...", job.speed),
                )
                .await;
            self.adjust_tempo(&staged, &plan).await;
        }

        let names = self.registry.promote_staging(job_id).await?;
        self.store
            .set_status(job_id, JobStatus::Completed, &completion_message(&names))
            .await;
        Ok(())
    }

    /// Apply the tempo plan to each staged file in place
    ///
    /// Failures stay per file: the temp output is discarded, the
    /// original kept, and the batch continues.
    async fn adjust_tempo(&self, files: &[PathBuf], plan: &TempoPlan) {
        for path in files {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let temp = path.with_file_name(format!("temp_{name}"));
            match self.transcoder.apply_tempo(path, &temp, plan).await {
                Ok(()) => {
                    if let Err(e) = replace_file(&temp, path).await {
                        tracing::warn!(file = name, error = %e, "failed to swap in adjusted file");
                        let _ = tokio::fs::remove_file(&temp).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(file = name, error = %e, "tempo adjustment failed, keeping original");
                    let _ = tokio::fs::remove_file(&temp).await;
                }
            }
        }
    }
}

/// Forward extractor progress reports into the store
async fn forward_progress(store: JobStore, job_id: Uuid, mut rx: mpsc::Receiver<String>) {
    while let Some(percent) = rx.recv().await {
        store.set_progress(job_id, &percent).await;
    }
}

/// Summary message for a finished job
fn completion_message(names: &[String]) -> String {
    match names {
        [single] => format!("Downloaded: {}", title_of(single)),
        _ => format!("Downloaded {} file(s)", names.len()),
    }
}

fn title_of(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

/// Move `temp` over `dest`, tolerating platforms where rename will not
/// replace an existing file
async fn replace_file(temp: &Path, dest: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(temp, dest).await.is_ok() {
        return Ok(());
    }
    tokio::fs::remove_file(dest).await?;
    tokio::fs::rename(temp, dest).await
}
