//! Audio Download services
//!
//! Service layer for media download and file management:
//! - Media extraction (yt-dlp wrapper: preview + fetch)
//! - Audio transcoding (ffmpeg wrapper: tempo adjustment)
//! - Tempo stage planning
//! - File registry (scratch/finalized library operations)
//! - Job runner (background download pipeline)

pub mod extractor;
pub mod registry;
pub mod runner;
pub mod tempo;
pub mod transcoder;

pub use extractor::{ExtractError, FetchOutcome, MediaExtractor, PreviewInfo};
pub use registry::{FileRegistry, MoveOutcome, RegistryError};
pub use runner::JobRunner;
pub use tempo::{TempoError, TempoPlan};
pub use transcoder::{AudioTranscoder, ProcessError};

/// Bounded tail of a subprocess's stderr for error messages
pub(crate) fn stderr_excerpt(text: &str) -> String {
    const MAX_LEN: usize = 800;
    let trimmed = text.trim();
    if trimmed.len() <= MAX_LEN {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - MAX_LEN;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &trimmed[start..])
}
