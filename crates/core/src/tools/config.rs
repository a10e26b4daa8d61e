//! Configuration for the external tools.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Executable names of the external tools, as shipped in the resource folder.
pub const FFPROBE: &str = "ffprobe";
pub const FFMPEG: &str = "ffmpeg";
pub const RCRACK: &str = "rcrack";
pub const ATOMIC_PARSLEY: &str = "AtomicParsley";
pub const MP4ART: &str = "mp4art";

/// Where to find the external tools.
///
/// Each tool resolves to its explicit path if configured, otherwise to
/// `<resource_dir>/<name>`, otherwise to the bare name (looked up on `PATH`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Directory holding the bundled tool binaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffprobe: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rcrack: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atomic_parsley: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mp4art: Option<PathBuf>,
}

impl ToolsConfig {
    /// Creates a config that resolves every tool inside `resource_dir`.
    pub fn with_resource_dir(resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_dir: Some(resource_dir.into()),
            ..Default::default()
        }
    }

    fn resolve(&self, explicit: Option<&Path>, name: &str) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        match &self.resource_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Resolves the final executable path of every tool.
    pub fn resolve_paths(&self) -> ToolPaths {
        ToolPaths {
            ffprobe: self.resolve(self.ffprobe.as_deref(), FFPROBE),
            ffmpeg: self.resolve(self.ffmpeg.as_deref(), FFMPEG),
            rcrack: self.resolve(self.rcrack.as_deref(), RCRACK),
            atomic_parsley: self.resolve(self.atomic_parsley.as_deref(), ATOMIC_PARSLEY),
            mp4art: self.resolve(self.mp4art.as_deref(), MP4ART),
        }
    }
}

/// Resolved executable paths, built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// Checksum and metadata probe.
    pub ffprobe: PathBuf,
    /// Transcoder and cover extractor.
    pub ffmpeg: PathBuf,
    /// Rainbow-table key cracker.
    pub rcrack: PathBuf,
    /// Tagger.
    pub atomic_parsley: PathBuf,
    /// Cover-art embedder.
    pub mp4art: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        ToolsConfig::default().resolve_paths()
    }
}

impl ToolPaths {
    /// All tools as `(name, path)` pairs.
    pub fn all(&self) -> [(&'static str, &Path); 5] {
        [
            (FFPROBE, self.ffprobe.as_path()),
            (FFMPEG, self.ffmpeg.as_path()),
            (RCRACK, self.rcrack.as_path()),
            (ATOMIC_PARSLEY, self.atomic_parsley.as_path()),
            (MP4ART, self.mp4art.as_path()),
        ]
    }
}
