//! mkvmerge-based media identification.
//!
//! `mkvmerge -J` describes a file container-first: tracks carry a
//! `properties` object and attachments are listed separately. The report is
//! mapped onto the same [`MediaInfo`] that ffprobe produces.

use super::command::capture_stdout;
use super::types::*;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const TOOL: &str = "mkvmerge";

#[derive(Debug, Deserialize)]
struct MkvmergeOutput {
    #[serde(default)]
    container: Option<MkvmergeContainer>,
    #[serde(default)]
    duration: Option<MkvmergeDuration>,
    file_size: Option<u64>,
    #[serde(default)]
    tracks: Vec<MkvmergeTrack>,
    #[serde(default)]
    attachments: Vec<MkvmergeAttachment>,
}

#[derive(Debug, Deserialize)]
struct MkvmergeContainer {
    #[serde(rename = "type")]
    container_type: Option<String>,
    #[serde(default)]
    properties: MkvmergeContainerProperties,
}

#[derive(Debug, Default, Deserialize)]
struct MkvmergeContainerProperties {
    /// Nanoseconds.
    duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MkvmergeDuration {
    seconds: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MkvmergeTrack {
    id: Option<u64>,
    #[serde(rename = "type")]
    track_type: Option<String>,
    codec: Option<String>,
    #[serde(default)]
    properties: MkvmergeTrackProperties,
}

#[derive(Debug, Default, Deserialize)]
struct MkvmergeTrackProperties {
    language: Option<String>,
    track_name: Option<String>,
    #[serde(default)]
    default_track: bool,
    #[serde(default)]
    forced_track: bool,
    pixel_dimensions: Option<String>,
    audio_channels: Option<u32>,
    #[serde(alias = "audio_sampling_frequency")]
    sampling_frequency: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MkvmergeAttachment {
    file_name: Option<String>,
    content_type: Option<String>,
    size: Option<u64>,
}

/// Runs `mkvmerge -J` and normalizes its report.
#[derive(Debug, Clone)]
pub struct MkvmergeClient {
    program: PathBuf,
}

impl MkvmergeClient {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Identify a media file.
    pub fn identify(&self, file: &Path) -> Result<MediaInfo> {
        if !file.exists() {
            return Err(Error::file_not_found(file));
        }

        let json = capture_stdout(TOOL, &self.program, [OsStr::new("-J"), file.as_os_str()])?;
        parse_mkvmerge_json(file, &json)
    }
}

/// Normalize `mkvmerge -J` output.
pub fn parse_mkvmerge_json(path: &Path, json: &str) -> Result<MediaInfo> {
    let output: MkvmergeOutput =
        serde_json::from_str(json).map_err(|e| Error::parse_error(TOOL, e.to_string()))?;
    Ok(parse_mkvmerge_output(path, output))
}

fn parse_mkvmerge_output(path: &Path, output: MkvmergeOutput) -> MediaInfo {
    let container_ns = output
        .container
        .as_ref()
        .and_then(|c| c.properties.duration);
    let duration = output
        .duration
        .and_then(|d| d.seconds)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .or_else(|| container_ns.map(Duration::from_nanos));

    let mut info = MediaInfo {
        file_path: path.to_path_buf(),
        container: output
            .container
            .and_then(|c| non_empty(c.container_type)),
        duration,
        size_bytes: output.file_size,
        tracks: Vec::with_capacity(output.tracks.len()),
        attachments: Vec::with_capacity(output.attachments.len()),
    };

    for track in output.tracks {
        let Some(track_type) = track.track_type.as_deref().and_then(TrackType::parse) else {
            continue;
        };
        let props = track.properties;

        let mut extra = BTreeMap::new();
        match track_type {
            TrackType::Video => {
                if let Some(dims) = non_empty(props.pixel_dimensions) {
                    extra.insert(extra_keys::RESOLUTION.to_string(), dims);
                }
            }
            TrackType::Audio => {
                if let Some(channels) = props.audio_channels {
                    extra.insert(extra_keys::CHANNELS.to_string(), channels.to_string());
                }
                if let Some(rate) = props.sampling_frequency {
                    extra.insert(extra_keys::SAMPLE_RATE.to_string(), format_rate(rate));
                }
            }
            TrackType::Subtitle => {}
        }

        info.tracks.push(TrackInfo {
            index: info.tracks.len() as u32,
            id: track.id,
            track_type,
            codec: non_empty(track.codec).unwrap_or_else(|| "unknown".to_string()),
            language: non_empty(props.language),
            title: non_empty(props.track_name),
            is_default: props.default_track,
            is_forced: props.forced_track,
            extra,
        });
    }

    info.attachments = output
        .attachments
        .into_iter()
        .filter_map(|a| {
            Some(AttachmentInfo {
                file_name: non_empty(a.file_name)?,
                mime_type: non_empty(a.content_type),
                size_bytes: a.size,
            })
        })
        .collect();

    info
}

/// Whole rates print without a fractional part (`48000`, not `48000.0`).
fn format_rate(rate: f64) -> String {
    if rate.is_finite() && rate >= 0.0 && rate.fract() == 0.0 {
        format!("{}", rate as u64)
    } else {
        rate.to_string()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
