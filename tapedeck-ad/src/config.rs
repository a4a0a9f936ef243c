//! Service configuration
//!
//! Settings resolve in precedence order: command line, environment,
//! TOML config file, built-in defaults. The file layer comes from
//! `tapedeck_common::config::ConfigFile`.

use clap::Parser;
use std::path::PathBuf;
use tapedeck_common::config::{default_data_dir, ConfigFile};

/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 5000;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "tapedeck-ad", about = "Tapedeck Audio Download service", version)]
pub struct Args {
    /// HTTP listen port
    #[arg(long, env = "TAPEDECK_PORT")]
    pub port: Option<u16>,

    /// Directory for freshly downloaded files awaiting review
    #[arg(long, env = "TAPEDECK_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Directory for files promoted into the permanent library
    #[arg(long, env = "TAPEDECK_FINAL_DIR")]
    pub finalized_dir: Option<PathBuf>,

    /// Media extractor binary
    #[arg(long, env = "TAPEDECK_YTDLP_BIN")]
    pub ytdlp_bin: Option<String>,

    /// Transcoder binary
    #[arg(long, env = "TAPEDECK_FFMPEG_BIN")]
    pub ffmpeg_bin: Option<String>,

    /// Media prober binary
    #[arg(long, env = "TAPEDECK_FFPROBE_BIN")]
    pub ffprobe_bin: Option<String>,
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub scratch_dir: PathBuf,
    pub finalized_dir: PathBuf,
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
}

impl Config {
    /// Merge arguments over file values over defaults
    pub fn resolve(args: Args, file: ConfigFile) -> Self {
        let data_dir = default_data_dir();
        Self {
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            scratch_dir: args
                .scratch_dir
                .or(file.scratch_dir)
                .unwrap_or_else(|| data_dir.join("scratch")),
            finalized_dir: args
                .finalized_dir
                .or(file.finalized_dir)
                .unwrap_or_else(|| data_dir.join("finalized")),
            ytdlp_bin: args
                .ytdlp_bin
                .or(file.ytdlp_bin)
                .unwrap_or_else(|| "yt-dlp".to_string()),
            ffmpeg_bin: args
                .ffmpeg_bin
                .or(file.ffmpeg_bin)
                .unwrap_or_else(|| "ffmpeg".to_string()),
            ffprobe_bin: args
                .ffprobe_bin
                .or(file.ffprobe_bin)
                .unwrap_or_else(|| "ffprobe".to_string()),
        }
    }

    /// Create the storage roots if they do not exist
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.scratch_dir)?;
        std::fs::create_dir_all(&self.finalized_dir)?;
        Ok(())
    }
}
