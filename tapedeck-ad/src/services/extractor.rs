//! Media extraction adapter
//!
//! Wraps the yt-dlp command-line tool for two operations: metadata-only
//! preview and full download-with-postprocessing. The download path asks
//! the tool itself to decode to mp3, embed the thumbnail as artwork, and
//! write standard tags, so no media handling happens in-process.
//!
//! Progress is parsed from the tool's stdout (`[download]  42.7% ...`
//! lines) and forwarded over an mpsc channel; the channel closes when
//! the subprocess exits.

use crate::services::stderr_excerpt;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::mpsc;

/// Extraction adapter errors
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Extractor binary not found
    #[error("extractor binary not found: {0}")]
    BinaryNotFound(String),

    /// Extractor ran but exited non-zero
    #[error("extractor exited with {code:?}: {stderr}")]
    Failed {
        code: Option<i32>,
        stderr: String,
    },

    /// Extractor produced metadata we could not parse
    #[error("invalid metadata from extractor: {0}")]
    InvalidMetadata(String),

    /// I/O error launching or talking to the subprocess
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Preview target classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
    Video,
    Playlist,
}

/// Sampled entry of a playlist preview
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEntry {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Metadata-only preview of a media URL
///
/// Serialized directly as the `/preview` response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewInfo {
    #[serde(rename = "type")]
    pub kind: PreviewKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_entries: Vec<PreviewEntry>,
}

/// Result of a completed fetch
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Paths reported by the extractor's after-move hook, in completion order
    pub files: Vec<PathBuf>,
}

impl FetchOutcome {
    /// Titles of the fetched files (file stems)
    pub fn titles(&self) -> Vec<String> {
        self.files
            .iter()
            .filter_map(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }
}

/// yt-dlp wrapper
#[derive(Debug, Clone)]
pub struct MediaExtractor {
    ytdlp_bin: String,
}

impl MediaExtractor {
    /// Create an extractor using the given yt-dlp binary
    pub fn new(ytdlp_bin: &str) -> Self {
        Self {
            ytdlp_bin: ytdlp_bin.to_string(),
        }
    }

    /// Check if the extractor binary responds to `--version`
    pub fn probe(&self) -> bool {
        std::process::Command::new(&self.ytdlp_bin)
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Fetch metadata for a URL without downloading anything
    pub async fn preview(&self, url: &str) -> Result<PreviewInfo, ExtractError> {
        let mut cmd = tokio::process::Command::new(&self.ytdlp_bin);
        cmd.args(["--dump-single-json", "--no-warnings", "--skip-download"]);
        cmd.args(["--extractor-args", "youtube:player_client=android,web"]);
        if is_playlist_url(url) {
            // Flat extraction keeps playlist previews fast; entry metadata
            // stays limited to title/duration/thumbnail.
            cmd.args(["--yes-playlist", "--flat-playlist"]);
        } else {
            cmd.arg("--no-playlist");
        }
        cmd.arg(url);
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        tracing::debug!(url, "previewing media url");

        let output = cmd.output().await.map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Failed {
                code: output.status.code(),
                stderr: stderr_excerpt(&stderr),
            });
        }

        let info: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractError::InvalidMetadata(e.to_string()))?;
        Ok(parse_preview(&info))
    }

    /// Download a URL's audio into `dest_dir`
    ///
    /// The extractor decodes to mp3, embeds the thumbnail, and tags the
    /// file; progress percentages stream over `progress` while the
    /// subprocess runs. No partial-cleanup guarantees beyond the tool's
    /// own.
    pub async fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        progress: mpsc::Sender<String>,
    ) -> Result<FetchOutcome, ExtractError> {
        let template = dest_dir.join("%(title)s.%(ext)s");

        let mut cmd = tokio::process::Command::new(&self.ytdlp_bin);
        cmd.arg("-f").arg("bestaudio/best");
        cmd.arg("-o").arg(&template);
        cmd.args([
            "--write-thumbnail",
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "192K",
            "--embed-thumbnail",
            "--add-metadata",
        ]);
        if is_playlist_url(url) {
            cmd.args(["--yes-playlist", "--ignore-errors", "--no-playlist-reverse"]);
        } else {
            cmd.arg("--no-playlist");
        }
        cmd.args(["--extractor-args", "youtube:player_client=android,web"]);
        cmd.arg("--no-check-certificate");
        // --print implies quiet; force progress back on, one record per line
        cmd.args(["--newline", "--progress", "--print", "after_move:filepath"]);
        cmd.arg(url);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(url, dest = %dest_dir.display(), "starting extraction");

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("extractor stdout unavailable"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("extractor stderr unavailable"))?;

        // Drain stderr concurrently so a chatty extractor cannot stall on
        // a full pipe while we read stdout.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
            buf
        });

        let mut files = Vec::new();
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(percent) = parse_progress_line(&line) {
                let _ = progress.send(percent).await;
            } else if !line.starts_with('[') && !line.trim().is_empty() {
                // after_move:filepath prints one bare path per finished file
                files.push(PathBuf::from(line.trim()));
            }
        }

        let status = child.wait().await?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(ExtractError::Failed {
                code: status.code(),
                stderr: stderr_excerpt(&stderr_text),
            });
        }

        tracing::info!(url, files = files.len(), "extraction finished");
        Ok(FetchOutcome { files })
    }

    fn spawn_error(&self, e: std::io::Error) -> ExtractError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExtractError::BinaryNotFound(self.ytdlp_bin.clone())
        } else {
            ExtractError::Io(e)
        }
    }
}

/// Heuristic playlist detection on the submitted URL
///
/// Matches both bare playlist pages and watch URLs carrying a `list=`
/// parameter.
pub(crate) fn is_playlist_url(url: &str) -> bool {
    url.contains("list=") || url.contains("/playlist")
}

/// Extract the percentage token from one extractor progress line
///
/// Recognizes `[download]  42.7% of ~3.00MiB ...`; returns `"42.7%"`.
pub(crate) fn parse_progress_line(line: &str) -> Option<String> {
    let rest = line.strip_prefix("[download]")?;
    let token = rest.split_whitespace().find(|t| t.ends_with('%'))?;
    let digits = &token[..token.len() - 1];
    if digits.parse::<f64>().is_ok() {
        Some(token.to_string())
    } else {
        None
    }
}

/// Map the extractor's JSON document onto the preview shape
fn parse_preview(info: &Value) -> PreviewInfo {
    let title = info
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let uploader = info
        .get("uploader")
        .and_then(Value::as_str)
        .map(str::to_string);
    let entries = info.get("entries").and_then(Value::as_array);
    let is_playlist =
        entries.is_some() || info.get("_type").and_then(Value::as_str) == Some("playlist");

    if is_playlist {
        let entries = entries.map(|v| v.as_slice()).unwrap_or(&[]);
        let sample_entries: Vec<PreviewEntry> = entries
            .iter()
            .filter(|e| !e.is_null())
            .take(5)
            .map(|entry| PreviewEntry {
                title: entry
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_string(),
                duration: entry.get("duration").and_then(Value::as_f64),
                thumbnail_url: thumbnail_of(entry),
            })
            .collect();

        PreviewInfo {
            kind: PreviewKind::Playlist,
            title,
            duration: None,
            thumbnail_url: thumbnail_of(info)
                .or_else(|| sample_entries.first().and_then(|e| e.thumbnail_url.clone())),
            uploader,
            entry_count: Some(entries.len()),
            sample_entries,
        }
    } else {
        PreviewInfo {
            kind: PreviewKind::Video,
            title,
            duration: info.get("duration").and_then(Value::as_f64),
            thumbnail_url: thumbnail_of(info),
            uploader,
            entry_count: None,
            sample_entries: Vec::new(),
        }
    }
}

/// Best thumbnail URL for a metadata document
fn thumbnail_of(value: &Value) -> Option<String> {
    if let Some(url) = value.get("thumbnail").and_then(Value::as_str) {
        return Some(url.to_string());
    }
    value
        .get("thumbnails")?
        .as_array()?
        .last()?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress_line() {
        assert_eq!(
            parse_progress_line("[download]   0.0% of ~3.00MiB at  512.00KiB/s"),
            Some("0.0%".to_string())
        );
        assert_eq!(
            parse_progress_line("[download]  42.7% of 3.00MiB at 1.00MiB/s ETA 00:02"),
            Some("42.7%".to_string())
        );
        assert_eq!(
            parse_progress_line("[download] 100% of 3.00MiB in 00:03"),
            Some("100%".to_string())
        );
    }

    #[test]
    fn test_parse_progress_line_ignores_other_output() {
        assert_eq!(
            parse_progress_line("[download] Destination: /tmp/Track.webm"),
            None
        );
        assert_eq!(parse_progress_line("[ExtractAudio] Destination: x.mp3"), None);
        assert_eq!(parse_progress_line("/tmp/scratch/Track.mp3"), None);
        assert_eq!(parse_progress_line(""), None);
    }

    #[test]
    fn test_playlist_url_detection() {
        assert!(is_playlist_url(
            "https://www.youtube.com/watch?v=abc&list=PL123"
        ));
        assert!(is_playlist_url("https://www.youtube.com/playlist?list=PL123"));
        assert!(is_playlist_url("https://youtube.com/playlist?list=PL123"));
        assert!(!is_playlist_url("https://www.youtube.com/watch?v=abc"));
        assert!(!is_playlist_url("https://example.com/media/track"));
    }

    #[test]
    fn test_parse_preview_single_video() {
        let json = r#"{
            "title": "Test Track",
            "duration": 213.0,
            "thumbnail": "https://img.example.com/abc.jpg",
            "uploader": "Test Channel"
        }"#;
        let info: Value = serde_json::from_str(json).unwrap();
        let preview = parse_preview(&info);

        assert_eq!(preview.kind, PreviewKind::Video);
        assert_eq!(preview.title, "Test Track");
        assert_eq!(preview.duration, Some(213.0));
        assert_eq!(
            preview.thumbnail_url.as_deref(),
            Some("https://img.example.com/abc.jpg")
        );
        assert_eq!(preview.uploader.as_deref(), Some("Test Channel"));
        assert_eq!(preview.entry_count, None);
        assert!(preview.sample_entries.is_empty());
    }

    #[test]
    fn test_parse_preview_playlist_samples_first_five() {
        let json = r#"{
            "_type": "playlist",
            "title": "Test Playlist",
            "uploader": "Test Channel",
            "entries": [
                {"title": "One", "duration": 10.0, "thumbnail": "https://img/1.jpg"},
                {"title": "Two", "duration": 20.0},
                null,
                {"title": "Three"},
                {"title": "Four"},
                {"title": "Five"},
                {"title": "Six"}
            ]
        }"#;
        let info: Value = serde_json::from_str(json).unwrap();
        let preview = parse_preview(&info);

        assert_eq!(preview.kind, PreviewKind::Playlist);
        assert_eq!(preview.title, "Test Playlist");
        assert_eq!(preview.entry_count, Some(7));
        assert_eq!(preview.sample_entries.len(), 5);
        assert_eq!(preview.sample_entries[0].title, "One");
        assert_eq!(preview.sample_entries[1].duration, Some(20.0));
        // Playlist-level thumbnail falls back to the first entry's
        assert_eq!(preview.thumbnail_url.as_deref(), Some("https://img/1.jpg"));
    }

    #[test]
    fn test_parse_preview_thumbnails_array_fallback() {
        let json = r#"{
            "title": "Test Track",
            "thumbnails": [
                {"url": "https://img/low.jpg"},
                {"url": "https://img/high.jpg"}
            ]
        }"#;
        let info: Value = serde_json::from_str(json).unwrap();
        let preview = parse_preview(&info);
        assert_eq!(preview.thumbnail_url.as_deref(), Some("https://img/high.jpg"));
    }

    #[test]
    fn test_preview_serializes_spec_field_names() {
        let preview = PreviewInfo {
            kind: PreviewKind::Playlist,
            title: "Mix".to_string(),
            duration: None,
            thumbnail_url: Some("https://img/x.jpg".to_string()),
            uploader: None,
            entry_count: Some(3),
            sample_entries: vec![PreviewEntry {
                title: "One".to_string(),
                duration: Some(10.0),
                thumbnail_url: None,
            }],
        };
        let json = serde_json::to_string(&preview).unwrap();
        assert!(json.contains("\"type\":\"playlist\""));
        assert!(json.contains("\"thumbnailUrl\""));
        assert!(json.contains("\"entryCount\":3"));
        assert!(json.contains("\"sampleEntries\""));
        assert!(!json.contains("\"duration\":null"));
    }

    #[test]
    fn test_fetch_outcome_titles() {
        let outcome = FetchOutcome {
            files: vec![
                PathBuf::from("/tmp/stage/First Track.mp3"),
                PathBuf::from("/tmp/stage/Second Track.mp3"),
            ],
        };
        assert_eq!(outcome.titles(), vec!["First Track", "Second Track"]);
    }
}
