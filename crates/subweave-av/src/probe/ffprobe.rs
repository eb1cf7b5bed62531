//! FFprobe-based media probing.

use super::command::capture_stdout;
use super::types::*;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const TOOL: &str = "ffprobe";

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: Option<u64>,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    channels: Option<u32>,
    sample_rate: Option<String>,
    extradata_size: Option<u64>,
    #[serde(default)]
    disposition: FfprobeDisposition,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    default: u8,
    #[serde(default)]
    forced: u8,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
    title: Option<String>,
    filename: Option<String>,
    mimetype: Option<String>,
}

/// Runs ffprobe and normalizes its report.
#[derive(Debug, Clone)]
pub struct FfprobeClient {
    program: PathBuf,
}

impl FfprobeClient {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Probe a media file.
    pub fn probe(&self, file: &Path) -> Result<MediaInfo> {
        if !file.exists() {
            return Err(Error::file_not_found(file));
        }

        let args = [
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]
        .into_iter()
        .map(OsStr::new)
        .chain(std::iter::once(file.as_os_str()));
        let json = capture_stdout(TOOL, &self.program, args)?;

        parse_ffprobe_json(file, &json)
    }
}

/// Normalize ffprobe's `-print_format json -show_format -show_streams`
/// output.
pub fn parse_ffprobe_json(path: &Path, json: &str) -> Result<MediaInfo> {
    let output: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| Error::parse_error(TOOL, e.to_string()))?;
    Ok(parse_ffprobe_output(path, output))
}

fn parse_ffprobe_output(path: &Path, output: FfprobeOutput) -> MediaInfo {
    let (container, duration, size_bytes) = match output.format {
        Some(format) => (
            non_empty(format.format_name),
            format.duration.as_deref().and_then(parse_seconds),
            format.size.and_then(|s| s.trim().parse().ok()),
        ),
        None => (None, None, None),
    };

    let mut info = MediaInfo {
        file_path: path.to_path_buf(),
        container,
        duration,
        size_bytes,
        tracks: Vec::new(),
        attachments: Vec::new(),
    };

    for stream in output.streams {
        let codec_type = stream.codec_type.as_deref().unwrap_or_default();

        if codec_type == "attachment" {
            // Attachments without a file name are unnamed data streams.
            if let Some(file_name) = non_empty(stream.tags.filename) {
                info.attachments.push(AttachmentInfo {
                    file_name,
                    mime_type: non_empty(stream.tags.mimetype),
                    size_bytes: stream.extradata_size,
                });
            }
            continue;
        }

        let Some(track_type) = TrackType::parse(codec_type) else {
            continue;
        };

        let mut extra = BTreeMap::new();
        match track_type {
            TrackType::Video => {
                if let (Some(w), Some(h)) = (stream.width, stream.height) {
                    extra.insert(extra_keys::RESOLUTION.to_string(), format!("{}x{}", w, h));
                }
            }
            TrackType::Audio => {
                if let Some(channels) = stream.channels {
                    extra.insert(extra_keys::CHANNELS.to_string(), channels.to_string());
                }
                if let Some(rate) = non_empty(stream.sample_rate) {
                    extra.insert(extra_keys::SAMPLE_RATE.to_string(), rate);
                }
            }
            TrackType::Subtitle => {}
        }

        info.tracks.push(TrackInfo {
            index: info.tracks.len() as u32,
            id: stream.index,
            track_type,
            codec: non_empty(stream.codec_name).unwrap_or_else(|| "unknown".to_string()),
            language: non_empty(stream.tags.language),
            title: non_empty(stream.tags.title),
            is_default: stream.disposition.default == 1,
            is_forced: stream.disposition.forced == 1,
            extra,
        });
    }

    info
}

/// Parse a decimal-seconds string such as `"5423.456000"`.
fn parse_seconds(s: &str) -> Option<Duration> {
    let secs: f64 = s.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
