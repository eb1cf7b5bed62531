//! External tool discovery and provisioning.
//!
//! - [`manifest`] describes the known binaries per platform.
//! - [`loader`] reads the manifest and opens per-platform archives.
//! - [`bundle`] finds a bundled toolset or extracts and verifies a cached one.
//! - [`resolver`] merges overrides, toolsets and `PATH` into one path per tool.

pub mod archive;
pub mod bundle;
pub mod loader;
pub mod lock;
pub mod manifest;
pub mod permissions;
pub mod resolver;
pub mod search;
pub mod verify;

pub use bundle::{BundleManager, CacheStatus, ToolBundleResult, ToolPaths, ToolsetLocation};
pub use loader::{DirectorySource, ManifestLoader, MemorySource, PackageSource, ReadSeek};
pub use lock::ExtractionLock;
pub use manifest::{ToolKind, ToolManifest, ToolManifestEntry, ToolManifestRid};
pub use resolver::{
    ToolOverrides, ToolPathResolution, ToolPathsResolved, ToolResolver, ToolResolverOptions,
    ToolSource,
};
pub use search::PathSearch;
