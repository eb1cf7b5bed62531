//! Media file probing.
//!
//! Two backends are supported, both run as external tools:
//!
//! - **ffprobe** (default): stream-oriented report
//! - **mkvmerge**: container-oriented `-J` report
//!
//! Either way the result is the same canonical [`MediaInfo`]; track order is
//! whatever the tool reported.

mod command;
mod ffprobe;
mod mkvmerge;
mod types;

pub use ffprobe::{parse_ffprobe_json, FfprobeClient};
pub use mkvmerge::{parse_mkvmerge_json, MkvmergeClient};
pub use types::*;

use crate::tools::ToolPathsResolved;
use crate::{Error, ProbeBackend, Result};
use std::path::Path;

/// Probe `file` with the tool chosen by `backend`, using resolved tool paths.
pub fn probe_with(tools: &ToolPathsResolved, file: &Path, backend: ProbeBackend) -> Result<MediaInfo> {
    match backend {
        ProbeBackend::Ffprobe => FfprobeClient::new(&tools.ffprobe.path).probe(file),
        ProbeBackend::Mkvmerge => MkvmergeClient::new(&tools.mkvmerge.path).identify(file),
    }
}

/// Normalize raw JSON captured from the named tool.
///
/// `tool` is `"ffprobe"` or `"mkvmerge"`; anything else is a parse error.
pub fn normalize(tool: &str, file: &Path, json: &str) -> Result<MediaInfo> {
    match ProbeBackend::from_tool_name(tool) {
        Some(ProbeBackend::Ffprobe) => parse_ffprobe_json(file, json),
        Some(ProbeBackend::Mkvmerge) => parse_mkvmerge_json(file, json),
        None => Err(Error::parse_error(tool, "no normalizer for this tool")),
    }
}
