//! Managed file listing model

use serde::{Deserialize, Serialize};

/// Storage area a managed file lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    /// Freshly downloaded files awaiting review
    Scratch,
    /// Files promoted by the user
    Finalized,
}

impl Area {
    /// Parse an `{area}` path segment
    pub fn parse(s: &str) -> Option<Area> {
        match s {
            "scratch" => Some(Area::Scratch),
            "finalized" => Some(Area::Finalized),
            _ => None,
        }
    }

    /// Area name as used in URLs and JSON
    pub fn as_str(self) -> &'static str {
        match self {
            Area::Scratch => "scratch",
            Area::Finalized => "finalized",
        }
    }
}

/// One managed audio file, as returned by the files listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// File name within its storage area
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Size in megabytes, rounded to two decimals
    pub size_mb: f64,
    /// Modification time as unix seconds
    pub modified: i64,
    /// Whether an embedded artwork stream was detected
    pub has_artwork: bool,
    /// Storage area the file lives in
    pub location: Area,
}
