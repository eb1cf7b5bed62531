//! Shared fixtures for integration tests.
//!
//! [`Package`] lays out a packaged toolset on disk the way a release ships
//! it: `tools-manifest.json` plus one `<rid>.zip` per platform.

#![allow(dead_code)]

use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use subweave_av::tools::{DirectorySource, ManifestLoader};
use tempfile::{tempdir, TempDir};
use zip::write::SimpleFileOptions;

pub const VERSION: &str = "2025.06.1";

/// Archive layout: (path inside the zip, contents).
pub const TOOL_FILES: [(&str, &[u8]); 4] = [
    ("ffmpeg/bin/ffmpeg", b"#!/bin/sh\necho ffmpeg\n"),
    ("ffmpeg/bin/ffprobe", b"#!/bin/sh\necho ffprobe\n"),
    ("mkvtoolnix/mkvmerge", b"#!/bin/sh\necho mkvmerge\n"),
    ("mkvtoolnix/mkvpropedit", b"#!/bin/sh\necho mkvpropedit\n"),
];

pub struct Package {
    pub dir: TempDir,
    pub rid: String,
}

impl Package {
    /// A correctly pinned package for `rid`.
    pub fn new(rid: &str) -> Self {
        Self::with_ffprobe_hash(rid, None)
    }

    /// A package whose ffprobe entry is pinned to `ffprobe_hash` instead of
    /// its real digest.
    pub fn with_ffprobe_hash(rid: &str, ffprobe_hash: Option<String>) -> Self {
        let dir = tempdir().unwrap();

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in TOOL_FILES {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        let archive = writer.finish().unwrap().into_inner();
        fs::write(dir.path().join(format!("{rid}.zip")), archive).unwrap();

        let ffprobe_hash = ffprobe_hash.unwrap_or_else(|| sha(TOOL_FILES[1].1));
        let manifest = serde_json::json!({
            "toolsetVersion": VERSION,
            "rids": {
                rid: {
                    "ffmpeg": { "path": TOOL_FILES[0].0, "sha256": sha(TOOL_FILES[0].1) },
                    "ffprobe": { "path": TOOL_FILES[1].0, "sha256": ffprobe_hash },
                    "mkvmerge": { "path": TOOL_FILES[2].0, "sha256": sha(TOOL_FILES[2].1) },
                    "mkvpropedit": { "path": TOOL_FILES[3].0, "sha256": sha(TOOL_FILES[3].1) },
                    "mediainfo": null
                }
            },
            "generatedBy": "release pipeline"
        });
        fs::write(
            dir.path().join("tools-manifest.json"),
            serde_json::to_string_pretty(&manifest).unwrap(),
        )
        .unwrap();

        Self {
            dir,
            rid: rid.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn loader(&self) -> ManifestLoader {
        ManifestLoader::new(DirectorySource::new(self.dir.path()))
    }

    pub fn remove_archive(&self) {
        fs::remove_file(self.dir.path().join(format!("{}.zip", self.rid))).unwrap();
    }
}

pub fn sha(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
