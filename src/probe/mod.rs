// Re-export all probe functionality from subweave-av
pub use subweave_av::probe::*;
pub use subweave_av::ProbeBackend;

use crate::config::ToolsConfig;
use anyhow::{Context, Result};
use std::path::Path;
use subweave_av::tools::{
    BundleManager, DirectorySource, ManifestLoader, ToolPathsResolved, ToolResolver,
};
use subweave_common::Platform;

/// Build a resolver for the running platform from `[tools]` settings.
pub fn build_resolver(tools: &ToolsConfig) -> Result<ToolResolver> {
    let package_dir = match &tools.package_dir {
        Some(dir) => dir.clone(),
        None => subweave_common::paths::default_package_dir()
            .context("Could not locate the packaged toolsets")?,
    };
    tracing::debug!("Reading packaged toolsets from {:?}", package_dir);

    let rid = Platform::current()?.rid();
    let loader = ManifestLoader::new(DirectorySource::new(package_dir));
    let bundles = BundleManager::from_environment(loader, tools.cache_dir.as_deref())?
        .with_lock_timeout(tools.lock_timeout());

    Ok(ToolResolver::new(bundles, tools.resolver_options(), rid))
}

/// Resolve every tool from `[tools]` settings.
pub fn resolve_tools(tools: &ToolsConfig) -> Result<ToolPathsResolved> {
    let resolver = build_resolver(tools)?;
    resolver
        .resolve_all(&tools.overrides())
        .context("Failed to resolve external tools")
}

/// Probe a media file with the chosen backend.
pub fn probe_file(
    tools: &ToolPathsResolved,
    path: &Path,
    backend: ProbeBackend,
) -> Result<MediaInfo> {
    probe_with(tools, path, backend).with_context(|| format!("Failed to probe {:?}", path))
}
