//! File registry for the two-area audio library
//!
//! All filesystem access for scratch and finalized storage goes through
//! this service. File names arriving from HTTP are sanitized and every
//! resolved path is verified to sit under its area root, so handlers can
//! never reach outside the library.
//!
//! Download jobs work in per-job staging directories under
//! `scratch/.staging/<job-id>/`; finished files are promoted into the
//! scratch root in one pass. Listings only report plain files, so the
//! staging subtree never shows up in the library.

use crate::models::{Area, FileEntry};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Staging subtree under the scratch root
const STAGING_DIR: &str = ".staging";

/// Timeout for the artwork presence probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for artwork extraction
const ARTWORK_TIMEOUT: Duration = Duration::from_secs(10);

/// File registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// File does not exist in the requested area
    #[error("{0}")]
    NotFound(String),

    /// Name failed sanitization
    #[error("{0}")]
    InvalidName(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a batch move into finalized storage
#[derive(Debug, Clone, Default)]
pub struct MoveOutcome {
    /// Names moved successfully
    pub moved: Vec<String>,
    /// Per-name failure descriptions
    pub errors: Vec<String>,
}

/// Registry over the scratch and finalized areas
#[derive(Debug, Clone)]
pub struct FileRegistry {
    scratch_dir: PathBuf,
    finalized_dir: PathBuf,
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl FileRegistry {
    pub fn new(
        scratch_dir: PathBuf,
        finalized_dir: PathBuf,
        ffmpeg_bin: &str,
        ffprobe_bin: &str,
    ) -> Self {
        Self {
            scratch_dir,
            finalized_dir,
            ffmpeg_bin: ffmpeg_bin.to_string(),
            ffprobe_bin: ffprobe_bin.to_string(),
        }
    }

    /// Root directory of a storage area
    pub fn root(&self, area: Area) -> &Path {
        match area {
            Area::Scratch => &self.scratch_dir,
            Area::Finalized => &self.finalized_dir,
        }
    }

    /// Resolve a client-supplied name to a verified path inside an area
    ///
    /// The canonicalized result must stay under the canonicalized area
    /// root and must be a plain file.
    pub fn resolve(&self, area: Area, name: &str) -> Result<PathBuf, RegistryError> {
        let name = sanitize_name(name)?;
        let root = self.root(area);
        let not_found = || RegistryError::NotFound(format!("file not found: {name}"));

        let canonical = root.join(name).canonicalize().map_err(|_| not_found())?;
        let canonical_root = root.canonicalize().map_err(|_| not_found())?;
        if !canonical.starts_with(&canonical_root) || !canonical.is_file() {
            return Err(not_found());
        }
        Ok(canonical)
    }

    /// List the mp3 files of an area, newest first
    ///
    /// A missing area root is an empty listing, not an error.
    pub async fn list(&self, area: Area) -> Result<Vec<FileEntry>, RegistryError> {
        let root = self.root(area);
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() || !is_mp3(&path) {
                continue;
            }
            let metadata = entry.metadata().await?;
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            let size = metadata.len();
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size,
                size_mb: (size as f64 / 1_048_576.0 * 100.0).round() / 100.0,
                modified,
                has_artwork: self.has_artwork(&path).await,
                location: area,
            });
        }

        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(entries)
    }

    /// Check whether a file carries an embedded artwork stream
    ///
    /// Probes the first video stream's codec name; any output means
    /// artwork is present. Probe failures read as "no artwork".
    pub async fn has_artwork(&self, path: &Path) -> bool {
        let mut cmd = tokio::process::Command::new(&self.ffprobe_bin);
        cmd.args([
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=codec_name",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]);
        cmd.arg(path);
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        match tokio::time::timeout(PROBE_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) => {
                output.status.success()
                    && !String::from_utf8_lossy(&output.stdout).trim().is_empty()
            }
            _ => false,
        }
    }

    /// Extract embedded artwork as `(mime type, image bytes)`
    pub async fn artwork(
        &self,
        area: Area,
        name: &str,
    ) -> Result<(&'static str, Vec<u8>), RegistryError> {
        let path = self.resolve(area, name)?;

        let mut cmd = tokio::process::Command::new(&self.ffmpeg_bin);
        cmd.arg("-i").arg(&path);
        cmd.args(["-an", "-c:v", "copy", "-f", "image2pipe", "-"]);
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        let bytes = match tokio::time::timeout(ARTWORK_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() && !output.stdout.is_empty() => {
                output.stdout
            }
            Ok(Err(e)) => return Err(RegistryError::Io(e)),
            _ => {
                return Err(RegistryError::NotFound(format!(
                    "no embedded artwork in {name}"
                )))
            }
        };

        let mime = infer::get(&bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.mime_type())
            .unwrap_or("image/jpeg");
        Ok((mime, bytes))
    }

    /// Delete a file from an area
    pub async fn delete(&self, area: Area, name: &str) -> Result<(), RegistryError> {
        let path = self.resolve(area, name)?;
        tokio::fs::remove_file(&path).await?;
        tracing::info!(area = area.as_str(), name, "deleted file");
        Ok(())
    }

    /// Move named scratch files into finalized storage
    ///
    /// Processes every name; failures are collected per name instead of
    /// aborting the batch.
    pub async fn move_to_finalized(&self, names: &[String]) -> Result<MoveOutcome, RegistryError> {
        tokio::fs::create_dir_all(&self.finalized_dir).await?;

        let mut outcome = MoveOutcome::default();
        for name in names {
            let source = match self.resolve(Area::Scratch, name) {
                Ok(path) => path,
                Err(RegistryError::InvalidName(_)) => {
                    outcome.errors.push(format!("{name}: invalid name"));
                    continue;
                }
                Err(_) => {
                    outcome.errors.push(format!("{name}: not found"));
                    continue;
                }
            };
            let dest = self.finalized_dir.join(name);
            match move_file(&source, &dest).await {
                Ok(()) => outcome.moved.push(name.clone()),
                Err(e) => outcome.errors.push(format!("{name}: {e}")),
            }
        }

        tracing::info!(
            moved = outcome.moved.len(),
            errors = outcome.errors.len(),
            "finalized move complete"
        );
        Ok(outcome)
    }

    /// Private staging directory for a download job
    pub fn staging_dir(&self, job_id: Uuid) -> PathBuf {
        self.scratch_dir.join(STAGING_DIR).join(job_id.to_string())
    }

    /// Create a job's staging directory
    pub async fn create_staging(&self, job_id: Uuid) -> Result<PathBuf, RegistryError> {
        let dir = self.staging_dir(job_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Remove a job's staging directory and everything in it
    pub async fn remove_staging(&self, job_id: Uuid) {
        let dir = self.staging_dir(job_id);
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(job_id = %job_id, error = %e, "failed to remove staging directory");
            }
        }
    }

    /// The mp3 files currently staged for a job, sorted by name
    pub async fn staged_files(&self, job_id: Uuid) -> Result<Vec<PathBuf>, RegistryError> {
        let dir = self.staging_dir(job_id);
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && is_mp3(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Promote a job's staged mp3 files into the scratch root
    ///
    /// Returns the promoted file names. The staging directory is removed
    /// afterwards, discarding stray sidecar files such as thumbnails.
    pub async fn promote_staging(&self, job_id: Uuid) -> Result<Vec<String>, RegistryError> {
        let mut names = Vec::new();
        for path in self.staged_files(job_id).await? {
            let Some(file_name) = path.file_name() else {
                continue;
            };
            let dest = self.scratch_dir.join(file_name);
            move_file(&path, &dest).await?;
            names.push(file_name.to_string_lossy().into_owned());
        }
        self.remove_staging(job_id).await;
        Ok(names)
    }
}

/// Reject names that are empty, dot entries, or carry path separators
fn sanitize_name(name: &str) -> Result<&str, RegistryError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\')
    {
        return Err(RegistryError::InvalidName(format!(
            "invalid file name: {name}"
        )));
    }
    Ok(name)
}

fn is_mp3(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("mp3"))
        .unwrap_or(false)
}

/// Rename, falling back to copy+remove across filesystems
async fn move_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(source, dest).await {
        Ok(()) => Ok(()),
        Err(_) => {
            tokio::fs::copy(source, dest).await?;
            tokio::fs::remove_file(source).await
        }
    }
}
