//! Persisted startup bookkeeping.
//!
//! Records when the toolset was last checked and which version was seen, so
//! the CLI can skip repeated checks and report version changes.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// File name under the state directory.
pub const STARTUP_STATE_FILE: &str = "startup.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupState {
    /// When the toolset was last checked.
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,

    /// Platform identifier at the last check.
    #[serde(default)]
    pub runtime_rid: Option<String>,

    /// Toolset version seen at the last check.
    #[serde(default)]
    pub toolset_version: Option<String>,
}

impl StartupState {
    /// Default location, `<state dir>/startup.json`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(subweave_common::paths::state_dir()?.join(STARTUP_STATE_FILE))
    }

    /// Load state, falling back to the default on a missing or corrupt file.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let loaded = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from));

        match loaded {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Failed to load startup state from {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory: {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write startup state: {:?}", path))?;
        Ok(())
    }

    /// True if never checked, or `interval` has elapsed since the last check.
    pub fn should_check(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        match self.last_check {
            None => true,
            // A clock that moved backwards counts as elapsed.
            Some(last) => now < last || now - last >= interval,
        }
    }

    /// True if a version was recorded and differs from `version`.
    pub fn toolset_changed(&self, version: &str) -> bool {
        self.toolset_version
            .as_deref()
            .is_some_and(|previous| previous != version)
    }
}

/// Writes the startup state at most once per process.
#[derive(Debug)]
pub struct StartupTracker {
    path: PathBuf,
    written: AtomicBool,
}

impl StartupTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> StartupState {
        StartupState::load(&self.path)
    }

    /// Record a completed check. Returns `false` if this tracker already
    /// wrote.
    pub fn record(&self, now: DateTime<Utc>, rid: &str, toolset_version: &str) -> Result<bool> {
        if self.written.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }

        let state = StartupState {
            last_check: Some(now),
            runtime_rid: Some(rid.to_string()),
            toolset_version: Some(toolset_version.to_string()),
        };
        if let Err(e) = state.save(&self.path) {
            self.written.store(false, Ordering::SeqCst);
            return Err(e);
        }
        tracing::debug!("Recorded startup state at {:?}", self.path);
        Ok(true)
    }
}
