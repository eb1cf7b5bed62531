//! SHA-256 verification of toolset files against the manifest.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use rayon::prelude::*;
use sha2::{Digest, Sha256};

use super::bundle::ToolPaths;
use super::manifest::{ToolKind, ToolManifestEntry};
use crate::{Error, Result};

/// Compute the lowercase hex SHA-256 of a file.
pub fn file_sha256(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Outcome of checking one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCheck {
    /// Present, and the hash matched or none is pinned.
    Ok,
    /// The file does not exist.
    Missing,
    /// The file exists but hashes to something else.
    Mismatch { expected: String, actual: String },
    /// The file exists but could not be read.
    Unreadable(String),
}

fn check_file(path: &Path, expected: Option<&str>) -> FileCheck {
    if !path.is_file() {
        return FileCheck::Missing;
    }
    let Some(expected) = expected else {
        return FileCheck::Ok;
    };
    match file_sha256(path) {
        Ok(actual) if actual.eq_ignore_ascii_case(expected.trim()) => FileCheck::Ok,
        Ok(actual) => FileCheck::Mismatch {
            expected: expected.to_string(),
            actual,
        },
        Err(e) => FileCheck::Unreadable(e.to_string()),
    }
}

/// Check every tool in parallel. Results are returned in tool order.
pub fn check_toolset(
    paths: &ToolPaths,
    entries: &[(ToolKind, &ToolManifestEntry)],
) -> Vec<(ToolKind, FileCheck)> {
    entries
        .par_iter()
        .map(|(kind, entry)| (*kind, check_file(paths.get(*kind), entry.sha256.as_deref())))
        .collect()
}

/// Whether every tool is present and matches its pinned hash.
pub fn is_verified(paths: &ToolPaths, entries: &[(ToolKind, &ToolManifestEntry)]) -> bool {
    check_toolset(paths, entries)
        .iter()
        .all(|(_, check)| *check == FileCheck::Ok)
}

/// Verify a freshly extracted toolset. Any failure is an integrity error.
pub fn verify_extracted(
    paths: &ToolPaths,
    entries: &[(ToolKind, &ToolManifestEntry)],
) -> Result<()> {
    for (kind, check) in check_toolset(paths, entries) {
        let path = paths.get(kind).display();
        match check {
            FileCheck::Ok => {}
            FileCheck::Missing => {
                return Err(Error::integrity(format!(
                    "{kind} is missing from the extracted toolset ({path})"
                )));
            }
            FileCheck::Mismatch { expected, actual } => {
                return Err(Error::integrity(format!(
                    "{kind} hash mismatch at {path}: expected {expected}, got {actual}"
                )));
            }
            FileCheck::Unreadable(e) => {
                return Err(Error::integrity(format!(
                    "{kind} could not be read for verification at {path}: {e}"
                )));
            }
        }
    }
    Ok(())
}
