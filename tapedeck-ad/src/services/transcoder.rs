//! Audio transcoder wrapper
//!
//! Runs ffmpeg to apply a tempo filter chain to one file while keeping
//! the embedded artwork stream (`-map 0:v?` tolerates files without
//! one), container metadata, and the mp3 codec parameters of the
//! original download.

use crate::services::stderr_excerpt;
use crate::services::tempo::TempoPlan;
use std::ffi::OsString;
use std::path::Path;
use thiserror::Error;

/// Transcoder errors
#[derive(Debug, Error)]
pub enum ProcessError {
    /// ffmpeg binary not found
    #[error("transcoder binary not found: {0}")]
    BinaryNotFound(String),

    /// ffmpeg ran but exited non-zero
    #[error("transcoder exited with {code:?}: {stderr}")]
    Failed {
        code: Option<i32>,
        stderr: String,
    },

    /// I/O error launching or talking to the subprocess
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// ffmpeg wrapper for tempo adjustment
#[derive(Debug, Clone)]
pub struct AudioTranscoder {
    ffmpeg_bin: String,
}

impl AudioTranscoder {
    /// Create a transcoder using the given ffmpeg binary
    pub fn new(ffmpeg_bin: &str) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.to_string(),
        }
    }

    /// Check if the transcoder binary responds to `-version`
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.ffmpeg_bin)
            .arg("-version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Apply a tempo plan, writing the adjusted audio to `output`
    ///
    /// The caller owns cleanup: on failure the input is untouched and any
    /// partial output file should be removed.
    pub async fn apply_tempo(
        &self,
        input: &Path,
        output: &Path,
        plan: &TempoPlan,
    ) -> Result<(), ProcessError> {
        let args = build_args(input, output, plan);

        tracing::debug!(
            input = %input.display(),
            filter = %plan.filter_chain(),
            "running transcoder"
        );

        let result = tokio::process::Command::new(&self.ffmpeg_bin)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProcessError::BinaryNotFound(self.ffmpeg_bin.clone()));
            }
            Err(e) => return Err(ProcessError::Io(e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessError::Failed {
                code: output.status.code(),
                stderr: stderr_excerpt(&stderr),
            });
        }

        Ok(())
    }
}

/// Build the full ffmpeg argument list for one tempo adjustment
///
/// The video metadata flags restore the cover-art stream title that
/// id3v2 muxing would otherwise drop.
fn build_args(input: &Path, output: &Path, plan: &TempoPlan) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    args.push("-i".into());
    args.push(input.as_os_str().to_os_string());
    args.push("-filter:a".into());
    args.push(plan.filter_chain().into());
    for flag in [
        "-map",
        "0:a",
        "-map",
        "0:v?",
        "-map_metadata",
        "0",
        "-c:v",
        "copy",
        "-id3v2_version",
        "3",
        "-metadata:s:v",
        "title=Album cover",
        "-metadata:s:v",
        "comment=Cover (front)",
        "-acodec",
        "libmp3lame",
        "-b:a",
        "192k",
        "-y",
    ] {
        args.push(flag.into());
    }
    args.push(output.as_os_str().to_os_string());
    args
}
