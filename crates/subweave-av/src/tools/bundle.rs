//! Locating a complete toolset: shipped next to the executable, or
//! extracted into the per-user cache on demand.
//!
//! Cache layout:
//!
//! ```text
//! <cache root>/
//! └── <rid>/
//!     ├── .extract.lock
//!     ├── .<toolset version>.partial/   (only while extracting)
//!     └── <toolset version>/
//!         └── <relative paths from the manifest...>
//! ```
//!
//! Versions live side by side, so bumping the toolset version never needs a
//! cleanup step. An existing directory is only trusted after its hashes
//! verify, which also covers an extraction interrupted halfway. The RID and
//! the toolset version must each be a single plain directory name.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::archive::{extract_archive, resolve_entry_path};
use super::loader::ManifestLoader;
use super::lock::{ExtractionLock, DEFAULT_LOCK_TIMEOUT, LOCK_FILE_NAME};
use super::manifest::{ToolKind, ToolManifestEntry};
use super::permissions;
use super::verify;
use crate::{Error, Result};

/// Absolute paths to the four tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub mkvmerge: PathBuf,
    pub mkvpropedit: PathBuf,
}

impl ToolPaths {
    /// Build paths by computing each tool in turn.
    pub fn try_from_fn(mut f: impl FnMut(ToolKind) -> Result<PathBuf>) -> Result<Self> {
        Ok(Self {
            ffmpeg: f(ToolKind::Ffmpeg)?,
            ffprobe: f(ToolKind::Ffprobe)?,
            mkvmerge: f(ToolKind::Mkvmerge)?,
            mkvpropedit: f(ToolKind::Mkvpropedit)?,
        })
    }

    /// Path for one tool.
    pub fn get(&self, kind: ToolKind) -> &Path {
        match kind {
            ToolKind::Ffmpeg => &self.ffmpeg,
            ToolKind::Ffprobe => &self.ffprobe,
            ToolKind::Mkvmerge => &self.mkvmerge,
            ToolKind::Mkvpropedit => &self.mkvpropedit,
        }
    }

    /// All paths in tool order.
    pub fn iter(&self) -> impl Iterator<Item = (ToolKind, &Path)> {
        ToolKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

/// Where a toolset was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolsetLocation {
    /// Shipped next to the executable.
    Bundled,
    /// Extracted into the per-user cache.
    Extracted,
}

/// A complete toolset ready to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolBundleResult {
    /// Directory all `paths` are rooted under.
    pub base_directory: PathBuf,
    pub location: ToolsetLocation,
    pub paths: ToolPaths,
}

/// Snapshot of the cache for one RID, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub cache_root: PathBuf,
    pub toolset_version: String,
    /// `None` when the manifest has no complete toolset for the RID.
    pub version_dir: Option<PathBuf>,
    /// All four files exist.
    pub present: bool,
    /// All four files exist and match their pinned hashes.
    pub verified: bool,
}

/// Finds, extracts and verifies toolsets.
#[derive(Debug)]
pub struct BundleManager {
    loader: ManifestLoader,
    cache_root: PathBuf,
    bundled_root: Option<PathBuf>,
    lock_timeout: Duration,
    extractions: AtomicUsize,
}

impl BundleManager {
    /// Create a manager caching under `cache_root`, with no bundled
    /// directory.
    pub fn new(loader: ManifestLoader, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            cache_root: cache_root.into(),
            bundled_root: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            extractions: AtomicUsize::new(0),
        }
    }

    /// Create a manager using the conventional directories: the cache root
    /// from [`subweave_common::paths::tools_cache_dir`] and the bundled
    /// directory next to the executable.
    pub fn from_environment(loader: ManifestLoader, cache_override: Option<&Path>) -> Result<Self> {
        let cache_root = subweave_common::paths::tools_cache_dir(cache_override)?;
        let manager = Self::new(loader, cache_root);
        Ok(match subweave_common::paths::bundled_tools_dir() {
            Ok(dir) => manager.with_bundled_root(dir),
            Err(e) => {
                debug!(error = %e, "No executable-adjacent tools directory");
                manager
            }
        })
    }

    /// Look for bundled toolsets under `<root>/<rid>/`.
    pub fn with_bundled_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.bundled_root = Some(root.into());
        self
    }

    /// How long to wait for another process's extraction to finish.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// The manifest loader this manager reads from.
    pub fn loader(&self) -> &ManifestLoader {
        &self.loader
    }

    /// Root of the extraction cache.
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Number of extractions this manager has performed.
    pub fn extractions(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }

    /// Toolset version declared by the manifest (empty if none).
    pub fn toolset_version(&self) -> String {
        self.loader.load().toolset_version.clone()
    }

    fn rid_dir(&self, rid: &str) -> Option<PathBuf> {
        let rid = rid.to_lowercase();
        path_component(&rid).map(|c| self.cache_root.join(c))
    }

    /// `<cache root>/<rid>/<version>`, or `None` when either part is not a
    /// single plain path component.
    fn version_dir(&self, rid: &str, version: &str) -> Option<PathBuf> {
        let dir = self.rid_dir(rid)?.join(path_component(version)?);
        dir.starts_with(&self.cache_root).then_some(dir)
    }

    /// Find a toolset shipped next to the executable.
    ///
    /// Returns a result only if all four files exist. Bundled binaries ship
    /// with the build, so no hashes are checked.
    pub fn try_get_bundled_toolset(&self, rid: &str) -> Option<ToolBundleResult> {
        let root = self.bundled_root.as_ref()?;
        let base = root.join(path_component(&rid.to_lowercase())?);
        if !base.is_dir() {
            return None;
        }

        let manifest = self.loader.load();
        let rid_entry = manifest.rid(rid);
        let paths = ToolPaths::try_from_fn(|kind| {
            match rid_entry.and_then(|r| r.entry(kind)) {
                Some(entry) => resolve_entry_path(&base, &entry.relative_path),
                None => Ok(base.join(subweave_common::paths::default_tool_file_name(
                    kind.name(),
                    rid,
                ))),
            }
        })
        .ok()?;

        if paths.iter().all(|(_, p)| p.is_file()) {
            debug!(base = %base.display(), "Using bundled toolset");
            Some(ToolBundleResult {
                base_directory: base,
                location: ToolsetLocation::Bundled,
                paths,
            })
        } else {
            None
        }
    }

    /// Find a verified toolset in the cache, extracting it first if needed.
    ///
    /// Returns `Ok(None)` when the manifest has no complete toolset for the
    /// RID, or when its RID or version would not map to a directory inside
    /// the cache root. A verified cache hit takes no lock. Otherwise the RID's
    /// extraction lock is taken and the cache is checked again before any
    /// work, since another process may have just finished.
    ///
    /// # Errors
    ///
    /// - [`Error::Provisioning`] when the lock is unavailable, no archive is
    ///   packaged, or extraction fails on I/O.
    /// - [`Error::Integrity`] when an archive entry escapes the destination
    ///   or the extracted files fail verification.
    pub fn try_get_extracted_toolset(&self, rid: &str) -> Result<Option<ToolBundleResult>> {
        let manifest = self.loader.load();
        let Some(rid_entry) = manifest.rid(rid) else {
            debug!(rid, "Manifest has no toolset for this platform");
            return Ok(None);
        };
        let Some(entries) = rid_entry.complete_entries() else {
            warn!(rid, "Manifest toolset is incomplete; ignoring it");
            return Ok(None);
        };
        if manifest.toolset_version.trim().is_empty() {
            warn!(rid, "Manifest has no toolset version; cache is unusable");
            return Ok(None);
        }
        let (Some(rid_dir), Some(version_dir)) =
            (self.rid_dir(rid), self.version_dir(rid, &manifest.toolset_version))
        else {
            warn!(
                rid,
                version = %manifest.toolset_version,
                "Platform or toolset version is not a plain directory name; cache is unusable"
            );
            return Ok(None);
        };

        let paths = rooted_paths(&version_dir, &entries)?;
        let result = ToolBundleResult {
            base_directory: version_dir.clone(),
            location: ToolsetLocation::Extracted,
            paths,
        };

        if verify::is_verified(&result.paths, &entries) {
            debug!(dir = %version_dir.display(), "Using cached toolset");
            return Ok(Some(result));
        }

        let lock_path = rid_dir.join(LOCK_FILE_NAME);
        let _lock = ExtractionLock::try_acquire(&lock_path, self.lock_timeout)?;

        if verify::is_verified(&result.paths, &entries) {
            debug!(dir = %version_dir.display(), "Toolset was extracted by another process");
            return Ok(Some(result));
        }

        self.extract(rid, &version_dir, &entries)?;
        Ok(Some(result))
    }

    /// Extract and verify the toolset for a RID now.
    ///
    /// Same as [`try_get_extracted_toolset`](Self::try_get_extracted_toolset),
    /// but a RID missing from the manifest is an error.
    pub fn provision(&self, rid: &str) -> Result<ToolBundleResult> {
        self.try_get_extracted_toolset(rid)?.ok_or_else(|| {
            Error::provisioning(format!("no complete toolset for '{rid}' in the manifest"))
        })
    }

    /// Called with the RID's extraction lock held.
    ///
    /// The archive is unpacked into a hidden staging directory beside
    /// `version_dir` and renamed into place only once it verifies, so the
    /// version directory never holds a partial toolset.
    fn extract(
        &self,
        rid: &str,
        version_dir: &Path,
        entries: &[(ToolKind, &ToolManifestEntry); 4],
    ) -> Result<()> {
        let staging = version_dir
            .starts_with(&self.cache_root)
            .then(|| staging_dir(version_dir))
            .flatten()
            .ok_or_else(|| {
                Error::integrity(format!(
                    "{} is not a toolset directory under {}",
                    version_dir.display(),
                    self.cache_root.display()
                ))
            })?;

        let archive = self
            .loader
            .open_archive(rid)
            .map_err(|e| Error::provisioning(format!("cannot open archive for '{rid}': {e}")))?
            .ok_or_else(|| Error::provisioning(format!("no archive packaged for '{rid}'")))?;

        info!(rid, dir = %version_dir.display(), "Extracting toolset");

        for stale in [version_dir, staging.as_path()] {
            if stale.exists() {
                std::fs::remove_dir_all(stale).map_err(|e| {
                    Error::provisioning(format!("cannot remove stale {}: {e}", stale.display()))
                })?;
            }
        }
        std::fs::create_dir_all(&staging).map_err(|e| {
            Error::provisioning(format!("cannot create {}: {e}", staging.display()))
        })?;

        let outcome = rooted_paths(&staging, entries).and_then(|staged| {
            extract_archive(archive, &staging)?;
            mark_executable(&staged)?;
            verify::verify_extracted(&staged, entries)
        });
        let outcome = outcome.and_then(|_| {
            std::fs::rename(&staging, version_dir).map_err(|e| {
                Error::provisioning(format!(
                    "cannot move {} into place: {e}",
                    staging.display()
                ))
            })
        });

        if let Err(e) = outcome {
            if let Err(cleanup) = std::fs::remove_dir_all(&staging) {
                debug!(error = %cleanup, "Failed to remove partial toolset");
            }
            return Err(e);
        }

        self.extractions.fetch_add(1, Ordering::SeqCst);
        info!(rid, "Toolset extracted and verified");
        Ok(())
    }

    /// Report on the cached toolset for a RID without extracting anything.
    pub fn status(&self, rid: &str) -> CacheStatus {
        let manifest = self.loader.load();
        let mut status = CacheStatus {
            cache_root: self.cache_root.clone(),
            toolset_version: manifest.toolset_version.clone(),
            version_dir: None,
            present: false,
            verified: false,
        };

        let Some(entries) = manifest.rid(rid).and_then(|r| r.complete_entries()) else {
            return status;
        };
        let Some(version_dir) = self.version_dir(rid, &manifest.toolset_version) else {
            return status;
        };

        if let Ok(paths) = rooted_paths(&version_dir, &entries) {
            status.present = paths.iter().all(|(_, p)| p.is_file());
            status.verified = status.present && verify::is_verified(&paths, &entries);
        }
        status.version_dir = Some(version_dir);
        status
    }

    /// Delete the whole cache root. Returns `false` if it did not exist.
    pub fn clean_cache(&self) -> Result<bool> {
        if !self.cache_root.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&self.cache_root)?;
        info!(root = %self.cache_root.display(), "Removed tools cache");
        Ok(true)
    }
}

/// `name` as a single plain directory name, or `None` if it is empty, a
/// dot entry, or carries a separator or drive specifier.
fn path_component(name: &str) -> Option<&str> {
    let name = name.trim();
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':', '\0']);
    plain.then_some(name)
}

/// `<parent>/.<name>.partial` for a version directory.
fn staging_dir(version_dir: &Path) -> Option<PathBuf> {
    let name = version_dir.file_name()?.to_string_lossy();
    Some(version_dir.with_file_name(format!(".{name}.partial")))
}

fn rooted_paths(base: &Path, entries: &[(ToolKind, &ToolManifestEntry); 4]) -> Result<ToolPaths> {
    ToolPaths::try_from_fn(|kind| {
        let (_, entry) = entries
            .iter()
            .find(|(k, _)| *k == kind)
            .ok_or_else(|| Error::configuration(format!("manifest lacks {kind}")))?;
        resolve_entry_path(base, &entry.relative_path)
    })
}

fn mark_executable(paths: &ToolPaths) -> Result<()> {
    if !permissions::POSIX_PERMISSIONS {
        return Ok(());
    }
    for (_, path) in paths.iter() {
        permissions::set_executable(path).map_err(|e| {
            Error::provisioning(format!("cannot mark {} executable: {e}", path.display()))
        })?;
    }
    Ok(())
}
