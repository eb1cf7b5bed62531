//! Deciding which binary to run for each tool.
//!
//! Each tool is resolved on its own, in this order:
//!
//! 1. An explicit override. A bare command name is used verbatim; a path
//!    with a directory part is made absolute.
//! 2. `PATH`, when `prefer_path` is set.
//! 3. The bundled toolset, then the extracted cache, when `prefer_bundled`
//!    is set.
//! 4. `PATH`; failing that, the bare tool name.
//!
//! Resolution never fails for lack of a binary. It only fails when the
//! cache is found to be corrupt or tampered with.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::bundle::{BundleManager, ToolBundleResult, ToolsetLocation};
use super::loader::ManifestLoader;
use super::manifest::ToolKind;
use super::search::PathSearch;
use crate::{Error, Result};

/// How resolution should prioritise sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResolverOptions {
    pub prefer_bundled: bool,
    pub prefer_path: bool,
    pub tools_cache_directory: Option<PathBuf>,
}

impl Default for ToolResolverOptions {
    fn default() -> Self {
        Self {
            prefer_bundled: true,
            prefer_path: false,
            tools_cache_directory: None,
        }
    }
}

/// Per-tool override paths. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOverrides {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub mkvmerge: Option<PathBuf>,
    pub mkvpropedit: Option<PathBuf>,
}

impl ToolOverrides {
    /// Override for one tool, if set and non-empty.
    pub fn get(&self, kind: ToolKind) -> Option<&Path> {
        let path = match kind {
            ToolKind::Ffmpeg => self.ffmpeg.as_deref(),
            ToolKind::Ffprobe => self.ffprobe.as_deref(),
            ToolKind::Mkvmerge => self.mkvmerge.as_deref(),
            ToolKind::Mkvpropedit => self.mkvpropedit.as_deref(),
        };
        path.filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
    }

    /// Set the override for one tool.
    pub fn set(&mut self, kind: ToolKind, path: Option<PathBuf>) {
        let slot = match kind {
            ToolKind::Ffmpeg => &mut self.ffmpeg,
            ToolKind::Ffprobe => &mut self.ffprobe,
            ToolKind::Mkvmerge => &mut self.mkvmerge,
            ToolKind::Mkvpropedit => &mut self.mkvpropedit,
        };
        *slot = path;
    }
}

/// The tier a resolved path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSource {
    Override,
    Bundled,
    Extracted,
    Path,
}

impl std::fmt::Display for ToolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolSource::Override => write!(f, "override"),
            ToolSource::Bundled => write!(f, "bundled"),
            ToolSource::Extracted => write!(f, "extracted"),
            ToolSource::Path => write!(f, "PATH"),
        }
    }
}

impl From<ToolsetLocation> for ToolSource {
    fn from(location: ToolsetLocation) -> Self {
        match location {
            ToolsetLocation::Bundled => ToolSource::Bundled,
            ToolsetLocation::Extracted => ToolSource::Extracted,
        }
    }
}

/// A resolved tool path and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPathResolution {
    pub path: PathBuf,
    pub source: ToolSource,
}

/// Resolution of all four tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPathsResolved {
    pub runtime_rid: String,
    pub toolset_version: String,
    pub ffmpeg: ToolPathResolution,
    pub ffprobe: ToolPathResolution,
    pub mkvmerge: ToolPathResolution,
    pub mkvpropedit: ToolPathResolution,
}

impl ToolPathsResolved {
    /// Resolution for one tool.
    pub fn get(&self, kind: ToolKind) -> &ToolPathResolution {
        match kind {
            ToolKind::Ffmpeg => &self.ffmpeg,
            ToolKind::Ffprobe => &self.ffprobe,
            ToolKind::Mkvmerge => &self.mkvmerge,
            ToolKind::Mkvpropedit => &self.mkvpropedit,
        }
    }

    /// All resolutions in tool order.
    pub fn iter(&self) -> impl Iterator<Item = (ToolKind, &ToolPathResolution)> {
        ToolKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

/// Merges overrides, bundled/cached toolsets and `PATH`.
#[derive(Debug)]
pub struct ToolResolver {
    bundles: BundleManager,
    options: ToolResolverOptions,
    rid: String,
    search: PathSearch,
}

impl ToolResolver {
    /// Create a resolver for `rid`, searching the process `PATH`.
    pub fn new(bundles: BundleManager, options: ToolResolverOptions, rid: impl Into<String>) -> Self {
        Self {
            bundles,
            options,
            rid: rid.into(),
            search: PathSearch::from_env(),
        }
    }

    /// Create a resolver for the running platform, with the conventional
    /// cache and bundle directories.
    pub fn from_environment(loader: ManifestLoader, options: ToolResolverOptions) -> Result<Self> {
        let rid = subweave_common::Platform::current()?.rid();
        let bundles =
            BundleManager::from_environment(loader, options.tools_cache_directory.as_deref())?;
        Ok(Self::new(bundles, options, rid))
    }

    /// Search a specific `PATH` instead of the process environment.
    pub fn with_search_path(mut self, search: PathSearch) -> Self {
        self.search = search;
        self
    }

    /// The bundle manager used for toolset lookups.
    pub fn bundles(&self) -> &BundleManager {
        &self.bundles
    }

    /// The RID toolsets are resolved for.
    pub fn rid(&self) -> &str {
        &self.rid
    }

    /// The options this resolver was built with.
    pub fn options(&self) -> &ToolResolverOptions {
        &self.options
    }

    /// Resolve every tool.
    ///
    /// # Errors
    ///
    /// Fails only on [`Error::Integrity`] from the cache, or
    /// [`Error::Configuration`] for an override that cannot be made
    /// absolute. Provisioning failures are logged and resolution moves on
    /// to `PATH`.
    pub fn resolve_all(&self, overrides: &ToolOverrides) -> Result<ToolPathsResolved> {
        let mut toolset = LazyToolset::default();
        let mut resolve = |kind: ToolKind| self.resolve_one(kind, overrides.get(kind), &mut toolset);

        let resolved = ToolPathsResolved {
            runtime_rid: self.rid.clone(),
            toolset_version: self.bundles.toolset_version(),
            ffmpeg: resolve(ToolKind::Ffmpeg)?,
            ffprobe: resolve(ToolKind::Ffprobe)?,
            mkvmerge: resolve(ToolKind::Mkvmerge)?,
            mkvpropedit: resolve(ToolKind::Mkvpropedit)?,
        };

        for (kind, resolution) in resolved.iter() {
            debug!(
                tool = %kind,
                source = %resolution.source,
                path = %resolution.path.display(),
                "Resolved tool"
            );
        }
        Ok(resolved)
    }

    fn resolve_one(
        &self,
        kind: ToolKind,
        override_path: Option<&Path>,
        toolset: &mut LazyToolset,
    ) -> Result<ToolPathResolution> {
        if let Some(path) = override_path {
            return Ok(ToolPathResolution {
                path: override_to_path(kind, path)?,
                source: ToolSource::Override,
            });
        }

        if self.options.prefer_path {
            if let Some(path) = self.search.find(kind.name()) {
                return Ok(ToolPathResolution {
                    path,
                    source: ToolSource::Path,
                });
            }
        }

        if self.options.prefer_bundled {
            if let Some(bundle) = toolset.get(self)? {
                return Ok(ToolPathResolution {
                    path: bundle.paths.get(kind).to_path_buf(),
                    source: bundle.location.into(),
                });
            }
        }

        if let Some(path) = self.search.find(kind.name()) {
            return Ok(ToolPathResolution {
                path,
                source: ToolSource::Path,
            });
        }

        warn!(
            tool = %kind,
            "{kind} not found in overrides, toolsets or PATH; relying on the system to find it"
        );
        Ok(ToolPathResolution {
            path: PathBuf::from(kind.name()),
            source: ToolSource::Path,
        })
    }

    fn find_toolset(&self) -> Result<Option<ToolBundleResult>> {
        if let Some(bundle) = self.bundles.try_get_bundled_toolset(&self.rid) {
            return Ok(Some(bundle));
        }
        match self.bundles.try_get_extracted_toolset(&self.rid) {
            Ok(found) => Ok(found),
            Err(e) if e.is_recoverable() => {
                warn!(rid = %self.rid, error = %e, "Cached toolset unavailable; falling back to PATH");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// A bare command name (`ffmpeg-6`) is kept as given for the OS to look up
/// at spawn time. Anything with a directory part is made absolute against
/// the current directory.
fn override_to_path(kind: ToolKind, path: &Path) -> Result<PathBuf> {
    if path.components().count() <= 1 && !path.has_root() {
        return Ok(path.to_path_buf());
    }
    std::path::absolute(path).map_err(|e| {
        Error::configuration(format!(
            "invalid {kind} override '{}': {e}",
            path.display()
        ))
    })
}

/// Looks up the toolset at most once per `resolve_all`, and only if some
/// tool actually needs it.
#[derive(Default)]
struct LazyToolset {
    looked_up: bool,
    found: Option<ToolBundleResult>,
}

impl LazyToolset {
    fn get(&mut self, resolver: &ToolResolver) -> Result<Option<&ToolBundleResult>> {
        if !self.looked_up {
            self.found = resolver.find_toolset()?;
            self.looked_up = true;
        }
        Ok(self.found.as_ref())
    }
}
