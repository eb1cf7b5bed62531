//! Zip extraction that refuses to write outside its destination.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;

use super::loader::ReadSeek;
use crate::{Error, Result};

/// Resolve an archive entry name (or manifest relative path) under `dest`.
///
/// Both `/` and `\` are treated as separators, `.` is dropped and `..` pops
/// a component. The result must stay rooted under `dest`; absolute names,
/// drive prefixes and anything that climbs above `dest` are integrity
/// errors.
pub fn resolve_entry_path(dest: &Path, name: &str) -> Result<PathBuf> {
    let normalized = name.replace('\\', "/");
    if normalized.starts_with('/') {
        return Err(Error::integrity(format!(
            "archive entry '{name}' is an absolute path"
        )));
    }

    let mut parts: Vec<&str> = Vec::new();
    for component in normalized.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(Error::integrity(format!(
                        "archive entry '{name}' escapes the destination directory"
                    )));
                }
            }
            c if c.contains(':') => {
                return Err(Error::integrity(format!(
                    "archive entry '{name}' contains a drive or stream specifier"
                )));
            }
            c => parts.push(c),
        }
    }

    let resolved = parts.iter().fold(dest.to_path_buf(), |acc, p| acc.join(p));
    if !resolved.starts_with(dest) {
        return Err(Error::integrity(format!(
            "archive entry '{name}' escapes the destination directory"
        )));
    }
    Ok(resolved)
}

/// Extract every entry of a zip archive under `dest`.
///
/// Directory entries become directories; file entries overwrite whatever is
/// there. Extraction stops at the first entry that would land outside
/// `dest`. Returns the number of files written.
pub fn extract_archive(reader: Box<dyn ReadSeek>, dest: &Path) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let target = resolve_entry_path(dest, entry.name())?;

        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| write_failed(&target, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_failed(parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| write_failed(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| write_failed(&target, e))?;
        trace!(path = %target.display(), "Extracted");
        written += 1;
    }

    Ok(written)
}

fn write_failed(path: &Path, err: io::Error) -> Error {
    Error::provisioning(format!("failed to extract {}: {err}", path.display()))
}
