//! Manifest loading and access to the per-platform toolset archives.
//!
//! Where the manifest and archives come from is abstracted behind
//! [`PackageSource`]: a directory shipped with the build, or bytes held in
//! memory (embedded with `include_bytes!`, or written by a test). Network
//! download is not a concern of this module.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use super::manifest::ToolManifest;

/// File name of the manifest inside a package directory.
pub const MANIFEST_FILE_NAME: &str = "tools-manifest.json";

/// A readable, seekable stream. Zip archives need both.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Supplier of the manifest text and the zip archive for each RID.
pub trait PackageSource: Send + Sync {
    /// Raw manifest JSON, or `None` when no manifest is packaged.
    fn manifest_json(&self) -> Option<String>;

    /// Open the zip archive for a RID, or `Ok(None)` if none is packaged.
    fn open_archive(&self, rid: &str) -> io::Result<Option<Box<dyn ReadSeek>>>;
}

/// Packages laid out in a directory:
///
/// ```text
/// <dir>/
/// ├── tools-manifest.json
/// ├── linux-x64.zip
/// └── win-x64.zip
/// ```
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Create a source reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory packages are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn find_archive(&self, rid: &str) -> io::Result<Option<PathBuf>> {
        let wanted = format!("{}.zip", rid.to_lowercase());
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.to_lowercase() == wanted);
            if matches && entry.file_type()?.is_file() {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }
}

impl PackageSource for DirectorySource {
    fn manifest_json(&self) -> Option<String> {
        let path = self.dir.join(MANIFEST_FILE_NAME);
        match std::fs::read_to_string(&path) {
            Ok(json) => Some(json),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No packaged tool manifest");
                None
            }
        }
    }

    fn open_archive(&self, rid: &str) -> io::Result<Option<Box<dyn ReadSeek>>> {
        match self.find_archive(rid)? {
            Some(path) => Ok(Some(Box::new(File::open(path)?))),
            None => Ok(None),
        }
    }
}

/// Packages held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    manifest: Option<String>,
    archives: HashMap<String, Arc<[u8]>>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the manifest JSON.
    pub fn with_manifest(mut self, json: impl Into<String>) -> Self {
        self.manifest = Some(json.into());
        self
    }

    /// Add the zip archive for a RID.
    pub fn with_archive(mut self, rid: &str, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.archives.insert(rid.to_lowercase(), bytes.into());
        self
    }
}

impl PackageSource for MemorySource {
    fn manifest_json(&self) -> Option<String> {
        self.manifest.clone()
    }

    fn open_archive(&self, rid: &str) -> io::Result<Option<Box<dyn ReadSeek>>> {
        Ok(self
            .archives
            .get(&rid.to_lowercase())
            .map(|bytes| Box::new(Cursor::new(Arc::clone(bytes))) as Box<dyn ReadSeek>))
    }
}

/// Loads the manifest once and hands out archive streams.
///
/// The parsed manifest is memoized by the loader instance; share the loader
/// (it is cheap to clone) rather than reloading.
#[derive(Clone)]
pub struct ManifestLoader {
    source: Arc<dyn PackageSource>,
    manifest: Arc<OnceLock<Arc<ToolManifest>>>,
}

impl std::fmt::Debug for ManifestLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestLoader")
            .field("loaded", &self.manifest.get().is_some())
            .finish()
    }
}

impl ManifestLoader {
    /// Create a loader over the given package source.
    pub fn new(source: impl PackageSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            manifest: Arc::new(OnceLock::new()),
        }
    }

    /// Load the manifest. Never fails: a missing or unparseable manifest
    /// yields an empty one, which callers treat as "nothing packaged".
    pub fn load(&self) -> Arc<ToolManifest> {
        Arc::clone(self.manifest.get_or_init(|| Arc::new(self.read_manifest())))
    }

    fn read_manifest(&self) -> ToolManifest {
        let Some(json) = self.source.manifest_json() else {
            warn!("Tool manifest not found; bundled toolsets are unavailable");
            return ToolManifest::default();
        };

        match ToolManifest::from_json(&json) {
            Ok(manifest) => {
                debug!(
                    version = %manifest.toolset_version,
                    rids = manifest.rids.len(),
                    "Loaded tool manifest"
                );
                manifest
            }
            Err(e) => {
                warn!(error = %e, "Tool manifest could not be parsed; ignoring it");
                ToolManifest::default()
            }
        }
    }

    /// Open the zip archive for a RID, or `Ok(None)` if none is packaged.
    pub fn open_archive(&self, rid: &str) -> io::Result<Option<Box<dyn ReadSeek>>> {
        self.source.open_archive(rid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{"toolsetVersion": "1.0", "rids": {"linux-x64": {}}}"#;

    #[test]
    fn test_missing_manifest_is_empty() {
        let loader = ManifestLoader::new(MemorySource::new());
        let manifest = loader.load();
        assert!(manifest.is_empty());
        assert_eq!(manifest.toolset_version, "");
    }

    #[test]
    fn test_corrupt_manifest_is_empty() {
        let loader = ManifestLoader::new(MemorySource::new().with_manifest("{{{"));
        assert!(loader.load().is_empty());
    }

    #[test]
    fn test_manifest_is_memoized() {
        let loader = ManifestLoader::new(MemorySource::new().with_manifest(MANIFEST));
        let first = loader.load();
        let second = loader.clone().load();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.toolset_version, "1.0");
    }

    #[test]
    fn test_memory_archive_lookup_is_case_insensitive() {
        let source = MemorySource::new().with_archive("Linux-X64", vec![1u8, 2, 3]);
        let mut stream = source.open_archive("linux-x64").unwrap().unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        assert!(source.open_archive("osx-arm64").unwrap().is_none());
    }

    #[test]
    fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE_NAME), MANIFEST).unwrap();
        std::fs::write(dir.path().join("LINUX-X64.zip"), b"zip").unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.manifest_json().as_deref(), Some(MANIFEST));
        assert!(source.open_archive("linux-x64").unwrap().is_some());
        assert!(source.open_archive("win-x64").unwrap().is_none());
    }

    #[test]
    fn test_directory_source_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path().join("absent"));
        assert!(source.manifest_json().is_none());
        assert!(source.open_archive("linux-x64").unwrap().is_none());
    }
}
