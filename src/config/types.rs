use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use subweave_av::tools::{ToolKind, ToolOverrides, ToolResolverOptions};
use subweave_av::ProbeBackend;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub startup: StartupConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe: Option<PathBuf>,

    #[serde(default)]
    pub mkvmerge: Option<PathBuf>,

    #[serde(default)]
    pub mkvpropedit: Option<PathBuf>,

    /// Use a bundled or cached toolset before PATH
    #[serde(default = "default_true")]
    pub prefer_bundled: bool,

    /// Use PATH before any toolset
    #[serde(default)]
    pub prefer_path: bool,

    /// Root for extracted toolsets (defaults to the per-user data directory)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Directory holding `tools-manifest.json` and the per-platform archives
    #[serde(default)]
    pub package_dir: Option<PathBuf>,

    /// How long to wait for another process's extraction
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: None,
            ffprobe: None,
            mkvmerge: None,
            mkvpropedit: None,
            prefer_bundled: true,
            prefer_path: false,
            cache_dir: None,
            package_dir: None,
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}

impl ToolsConfig {
    /// Configured override for one tool.
    pub fn override_for(&self, kind: ToolKind) -> Option<&Path> {
        match kind {
            ToolKind::Ffmpeg => self.ffmpeg.as_deref(),
            ToolKind::Ffprobe => self.ffprobe.as_deref(),
            ToolKind::Mkvmerge => self.mkvmerge.as_deref(),
            ToolKind::Mkvpropedit => self.mkvpropedit.as_deref(),
        }
    }

    pub fn override_slot(&mut self, kind: ToolKind) -> &mut Option<PathBuf> {
        match kind {
            ToolKind::Ffmpeg => &mut self.ffmpeg,
            ToolKind::Ffprobe => &mut self.ffprobe,
            ToolKind::Mkvmerge => &mut self.mkvmerge,
            ToolKind::Mkvpropedit => &mut self.mkvpropedit,
        }
    }

    pub fn overrides(&self) -> ToolOverrides {
        let mut overrides = ToolOverrides::default();
        for kind in ToolKind::ALL {
            overrides.set(kind, self.override_for(kind).map(Path::to_path_buf));
        }
        overrides
    }

    pub fn resolver_options(&self) -> ToolResolverOptions {
        ToolResolverOptions {
            prefer_bundled: self.prefer_bundled,
            prefer_path: self.prefer_path,
            tools_cache_directory: self.cache_dir.clone(),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub backend: ProbeBackend,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StartupConfig {
    /// Minimum hours between toolset checks
    #[serde(default = "default_check_interval_hours")]
    pub check_interval_hours: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            check_interval_hours: default_check_interval_hours(),
        }
    }
}

impl StartupConfig {
    pub fn check_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(self.check_interval_hours.min(MAX_CHECK_INTERVAL_HOURS) as i64)
    }
}

/// Longest accepted `lock_timeout_secs`.
pub const MAX_LOCK_TIMEOUT_SECS: u64 = 300;

/// Longest accepted `check_interval_hours` (one year).
pub const MAX_CHECK_INTERVAL_HOURS: u64 = 24 * 365;

fn default_true() -> bool {
    true
}

fn default_lock_timeout_secs() -> u64 {
    10
}

fn default_check_interval_hours() -> u64 {
    24
}
