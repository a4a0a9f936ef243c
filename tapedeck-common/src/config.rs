//! Configuration file loading and default path resolution
//!
//! Runtime settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! The CLI and environment layers live with each service binary (clap);
//! this module supplies the TOML layer and the compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Optional settings read from the TOML config file
///
/// Every field is optional; absent fields fall through to the compiled
/// defaults. Unknown keys are ignored so config files can be shared
/// across service versions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// HTTP listen port
    pub port: Option<u16>,
    /// Storage area for freshly downloaded files
    pub scratch_dir: Option<PathBuf>,
    /// Storage area for finalized files
    pub finalized_dir: Option<PathBuf>,
    /// Media extractor binary (yt-dlp or compatible)
    pub ytdlp_bin: Option<String>,
    /// Audio transcoder binary
    pub ffmpeg_bin: Option<String>,
    /// Stream prober binary
    pub ffprobe_bin: Option<String>,
}

impl ConfigFile {
    /// Load the config file from the default platform location
    ///
    /// Missing file is not an error; it yields the empty defaults. A file
    /// that exists but fails to parse is logged and treated as absent so a
    /// broken config cannot keep the service from starting.
    pub fn load() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::debug!("loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load and parse a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Get the config file path for the platform, if one exists
///
/// Linux checks `~/.config/tapedeck/config.toml` first, then
/// `/etc/tapedeck/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    if cfg!(target_os = "linux") {
        if let Some(user_config) = dirs::config_dir().map(|d| d.join("tapedeck").join("config.toml"))
        {
            if user_config.exists() {
                return Some(user_config);
            }
        }
        let system_config = PathBuf::from("/etc/tapedeck/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
        None
    } else {
        dirs::config_dir()
            .map(|d| d.join("tapedeck").join("config.toml"))
            .filter(|p| p.exists())
    }
}

/// Get the OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/tapedeck (or /var/lib/tapedeck for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("tapedeck"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/tapedeck"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/tapedeck
        dirs::data_dir()
            .map(|d| d.join("tapedeck"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/tapedeck"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\tapedeck
        dirs::data_local_dir()
            .map(|d| d.join("tapedeck"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\tapedeck"))
    } else {
        PathBuf::from("./tapedeck_data")
    }
}
