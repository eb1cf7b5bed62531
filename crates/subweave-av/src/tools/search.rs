//! `PATH` lookup.

use std::ffi::OsString;
use std::path::PathBuf;

/// Searches a `PATH`-style directory list for executables.
///
/// Directories are tried in the order given; the first match wins. On
/// Windows each `PATHEXT` extension is tried as well.
#[derive(Debug, Clone)]
pub struct PathSearch {
    paths: Option<OsString>,
    cwd: PathBuf,
}

impl PathSearch {
    /// Search the process's `PATH`.
    pub fn from_env() -> Self {
        Self {
            paths: std::env::var_os("PATH"),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Search an explicit directory list, joined with the platform's path
    /// list separator (see [`std::env::join_paths`]).
    pub fn with_paths(paths: impl Into<OsString>) -> Self {
        Self {
            paths: Some(paths.into()),
            ..Self::from_env()
        }
    }

    /// Search nowhere. Every lookup misses.
    pub fn empty() -> Self {
        Self {
            paths: None,
            ..Self::from_env()
        }
    }

    /// Find `name`, returning its full path.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let paths = self.paths.as_ref().filter(|p| !p.is_empty())?;
        which::which_in(name, Some(paths), &self.cwd).ok()
    }
}

impl Default for PathSearch {
    fn default() -> Self {
        Self::from_env()
    }
}
