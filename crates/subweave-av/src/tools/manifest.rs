//! The toolset manifest: which binaries exist for each platform, where they
//! live inside the archive, and the SHA-256 they must hash to.
//!
//! On disk the manifest is JSON:
//!
//! ```json
//! {
//!   "toolsetVersion": "2024.06.1",
//!   "rids": {
//!     "linux-x64": {
//!       "ffmpeg":      { "path": "ffmpeg",      "sha256": "9f86d0..." },
//!       "ffprobe":     { "path": "ffprobe",     "sha256": null },
//!       "mkvmerge":    { "path": "mkvmerge",    "sha256": "..." },
//!       "mkvpropedit": { "path": "mkvpropedit", "sha256": "..." }
//!     }
//!   }
//! }
//! ```
//!
//! Property names and RID keys are matched case-insensitively and unknown
//! fields are ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// One of the external binaries a toolset provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Ffmpeg,
    Ffprobe,
    Mkvmerge,
    Mkvpropedit,
}

impl ToolKind {
    /// Every tool in the fixed order used for reporting and logging.
    pub const ALL: [ToolKind; 4] = [
        ToolKind::Ffmpeg,
        ToolKind::Ffprobe,
        ToolKind::Mkvmerge,
        ToolKind::Mkvpropedit,
    ];

    /// Executable base name (without any platform suffix).
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Ffmpeg => "ffmpeg",
            ToolKind::Ffprobe => "ffprobe",
            ToolKind::Mkvmerge => "mkvmerge",
            ToolKind::Mkvpropedit => "mkvpropedit",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Location and expected hash of one binary inside a toolset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolManifestEntry {
    /// Path relative to the toolset root, using `/` separators.
    #[serde(rename = "path")]
    pub relative_path: String,
    /// Lowercase or uppercase hex SHA-256. `None` means the binary is not
    /// pinned and always passes verification.
    #[serde(default)]
    pub sha256: Option<String>,
}

/// The binaries published for one RID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolManifestRid {
    #[serde(default)]
    pub ffmpeg: Option<ToolManifestEntry>,
    #[serde(default)]
    pub ffprobe: Option<ToolManifestEntry>,
    #[serde(default)]
    pub mkvmerge: Option<ToolManifestEntry>,
    #[serde(default)]
    pub mkvpropedit: Option<ToolManifestEntry>,
}

impl ToolManifestRid {
    /// Get the entry for a tool.
    pub fn entry(&self, kind: ToolKind) -> Option<&ToolManifestEntry> {
        match kind {
            ToolKind::Ffmpeg => self.ffmpeg.as_ref(),
            ToolKind::Ffprobe => self.ffprobe.as_ref(),
            ToolKind::Mkvmerge => self.mkvmerge.as_ref(),
            ToolKind::Mkvpropedit => self.mkvpropedit.as_ref(),
        }
    }

    /// All four entries in tool order, or `None` if any is missing. A RID
    /// with a missing tool never yields a toolset.
    pub fn complete_entries(&self) -> Option<[(ToolKind, &ToolManifestEntry); 4]> {
        Some([
            (ToolKind::Ffmpeg, self.ffmpeg.as_ref()?),
            (ToolKind::Ffprobe, self.ffprobe.as_ref()?),
            (ToolKind::Mkvmerge, self.mkvmerge.as_ref()?),
            (ToolKind::Mkvpropedit, self.mkvpropedit.as_ref()?),
        ])
    }
}

/// Known toolsets per RID plus the version string used to key the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolManifest {
    #[serde(rename = "toolsetversion", default)]
    pub toolset_version: String,
    /// Keyed by lowercased RID.
    #[serde(default)]
    pub rids: HashMap<String, ToolManifestRid>,
}

impl ToolManifest {
    /// Parse manifest JSON, tolerating property-name case drift.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let mut manifest: ToolManifest = serde_json::from_value(lowercase_keys(value))?;
        for rid in manifest.rids.values_mut() {
            for entry in [
                &mut rid.ffmpeg,
                &mut rid.ffprobe,
                &mut rid.mkvmerge,
                &mut rid.mkvpropedit,
            ]
            .into_iter()
            .flatten()
            {
                // An empty hash string is the same as no hash.
                if entry.sha256.as_deref().is_some_and(|h| h.trim().is_empty()) {
                    entry.sha256 = None;
                }
            }
        }
        Ok(manifest)
    }

    /// Look up the entries for a RID, case-insensitively.
    pub fn rid(&self, rid: &str) -> Option<&ToolManifestRid> {
        self.rids.get(&rid.to_lowercase())
    }

    /// Whether the manifest lists no platforms at all.
    pub fn is_empty(&self) -> bool {
        self.rids.is_empty()
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), lowercase_keys(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "toolsetVersion": "2024.06.1",
        "generatedBy": "release-pipeline",
        "rids": {
            "Linux-X64": {
                "ffmpeg": { "path": "bin/ffmpeg", "sha256": "ABCDEF" },
                "FFPROBE": { "Path": "bin/ffprobe", "sha256": null },
                "mkvmerge": { "path": "bin/mkvmerge", "sha256": "" },
                "mkvpropedit": { "path": "bin/mkvpropedit" }
            },
            "win-x64": {
                "ffmpeg": { "path": "ffmpeg.exe", "sha256": "01" }
            }
        }
    }"#;

    #[test]
    fn test_parse_case_insensitive() {
        let manifest = ToolManifest::from_json(MANIFEST).unwrap();
        assert_eq!(manifest.toolset_version, "2024.06.1");

        let linux = manifest.rid("linux-x64").unwrap();
        assert_eq!(manifest.rid("LINUX-x64"), Some(linux));
        assert_eq!(
            linux.entry(ToolKind::Ffprobe).unwrap().relative_path,
            "bin/ffprobe"
        );
        assert_eq!(
            linux.entry(ToolKind::Ffmpeg).unwrap().sha256.as_deref(),
            Some("ABCDEF")
        );
    }

    #[test]
    fn test_empty_hash_is_unpinned() {
        let manifest = ToolManifest::from_json(MANIFEST).unwrap();
        let linux = manifest.rid("linux-x64").unwrap();
        assert_eq!(linux.entry(ToolKind::Mkvmerge).unwrap().sha256, None);
        assert_eq!(linux.entry(ToolKind::Mkvpropedit).unwrap().sha256, None);
    }

    #[test]
    fn test_complete_entries() {
        let manifest = ToolManifest::from_json(MANIFEST).unwrap();
        let linux = manifest.rid("linux-x64").unwrap().complete_entries().unwrap();
        let kinds: Vec<ToolKind> = linux.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, ToolKind::ALL);

        assert!(manifest.rid("win-x64").unwrap().complete_entries().is_none());
        assert!(manifest.rid("osx-arm64").is_none());
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(ToolManifest::from_json("{ not json").is_err());
        assert!(ToolManifest::from_json(r#"{"rids": []}"#).is_err());
    }

    #[test]
    fn test_tool_kind_names() {
        let names: Vec<&str> = ToolKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names, ["ffmpeg", "ffprobe", "mkvmerge", "mkvpropedit"]);
        assert_eq!(ToolKind::Mkvpropedit.to_string(), "mkvpropedit");
    }
}
