//! # subweave-av
//!
//! External media tool provisioning and media probing.
//!
//! This crate provides functionality for:
//! - Locating ffmpeg, ffprobe, mkvmerge and mkvpropedit: explicit overrides,
//!   a toolset shipped next to the executable, a hash-verified toolset
//!   extracted into a per-user cache, or `PATH`
//! - Probing media files with ffprobe or mkvmerge and normalizing either
//!   report into one [`MediaInfo`]
//!
//! ## Example
//!
//! ```no_run
//! use subweave_av::tools::{DirectorySource, ManifestLoader, ToolOverrides, ToolResolver};
//! use subweave_av::{probe_with, ProbeBackend};
//! use std::path::Path;
//!
//! let loader = ManifestLoader::new(DirectorySource::new("/opt/subweave/packages"));
//! let resolver = ToolResolver::from_environment(loader, Default::default())?;
//! let tools = resolver.resolve_all(&ToolOverrides::default())?;
//!
//! let info = probe_with(&tools, Path::new("/path/to/video.mkv"), ProbeBackend::Mkvmerge)?;
//! println!("{} tracks", info.tracks.len());
//! # Ok::<(), subweave_av::Error>(())
//! ```

mod error;
pub mod probe;
pub mod tools;

// Re-exports
pub use error::{Error, Result};
pub use probe::{probe_with, AttachmentInfo, MediaInfo, TrackInfo, TrackType};
pub use tools::{ToolKind, ToolPathsResolved, ToolResolver, ToolSource};

/// Backend to use for probing media files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    /// Use ffprobe (parses `-show_format -show_streams` JSON)
    #[default]
    Ffprobe,
    /// Use mkvmerge (parses `-J` JSON)
    Mkvmerge,
}

impl ProbeBackend {
    /// Map a tool name, case-insensitively.
    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ffprobe" => Some(ProbeBackend::Ffprobe),
            "mkvmerge" => Some(ProbeBackend::Mkvmerge),
            _ => None,
        }
    }

    /// The tool this backend runs.
    pub fn tool(self) -> ToolKind {
        match self {
            ProbeBackend::Ffprobe => ToolKind::Ffprobe,
            ProbeBackend::Mkvmerge => ToolKind::Mkvmerge,
        }
    }
}

impl std::fmt::Display for ProbeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tool())
    }
}
