//! Canonical media information types.
//!
//! Both probe backends produce these, so callers never need to know which
//! tool described a file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Fixed keys used in [`TrackInfo::extra`].
pub mod extra_keys {
    /// Video frame size, `"<width>x<height>"`.
    pub const RESOLUTION: &str = "resolution";
    /// Audio channel count.
    pub const CHANNELS: &str = "channels";
    /// Audio sample rate in Hz.
    pub const SAMPLE_RATE: &str = "sampleRate";
}

/// Information about a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path to the media file.
    pub file_path: PathBuf,
    /// Container format (e.g., "matroska,webm", "Matroska").
    pub container: Option<String>,
    /// Duration of the media.
    pub duration: Option<Duration>,
    /// File size in bytes.
    pub size_bytes: Option<u64>,
    /// Tracks in the order the probing tool reported them.
    pub tracks: Vec<TrackInfo>,
    /// Attached files (fonts, cover art).
    pub attachments: Vec<AttachmentInfo>,
}

/// Kind of elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Video,
    Audio,
    Subtitle,
}

impl TrackType {
    /// Map a tool's type name. Accepts ffprobe's `subtitle` and mkvmerge's
    /// `subtitles`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "video" => Some(TrackType::Video),
            "audio" => Some(TrackType::Audio),
            "subtitle" | "subtitles" => Some(TrackType::Subtitle),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackType::Video => write!(f, "video"),
            TrackType::Audio => write!(f, "audio"),
            TrackType::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// Information about one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Position among the file's tracks, in the tool's order.
    pub index: u32,
    /// The tool's own identifier (ffprobe stream index, mkvmerge track id).
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub track_type: TrackType,
    /// Codec name as the tool reports it (e.g., "hevc", "AVC/H.264/MPEG-4p10").
    pub codec: String,
    /// Language code (e.g., "eng", "jpn").
    pub language: Option<String>,
    /// Track title.
    pub title: Option<String>,
    pub is_default: bool,
    pub is_forced: bool,
    /// Tool-specific details under the keys in [`extra_keys`].
    pub extra: BTreeMap<String, String>,
}

impl TrackInfo {
    /// Look up an [`extra`](Self::extra) value.
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

/// A file attached to the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<u64>,
}

impl MediaInfo {
    /// Tracks of one type, in file order.
    pub fn tracks_of(&self, track_type: TrackType) -> impl Iterator<Item = &TrackInfo> {
        self.tracks
            .iter()
            .filter(move |t| t.track_type == track_type)
    }

    /// Get the primary (first) video track.
    pub fn primary_video(&self) -> Option<&TrackInfo> {
        self.tracks_of(TrackType::Video).next()
    }

    /// Resolution of the primary video track.
    pub fn resolution(&self) -> Option<&str> {
        self.primary_video()
            .and_then(|t| t.extra(extra_keys::RESOLUTION))
    }

    /// Whether any subtitle track is flagged forced.
    pub fn has_forced_subtitles(&self) -> bool {
        self.tracks_of(TrackType::Subtitle).any(|t| t.is_forced)
    }
}
