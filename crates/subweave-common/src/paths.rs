//! Directory conventions for extracted toolsets and persisted state.
//!
//! | Platform | Tools cache | State |
//! |----------|-------------|-------|
//! | **Linux** | `~/.local/share/subweave/tools` | `~/.local/state/subweave` |
//! | **macOS** | `~/Library/Application Support/subweave/tools` | `~/Library/Application Support/subweave` |
//! | **Windows** | `%LOCALAPPDATA%\subweave\tools` | `%APPDATA%\subweave` |
//!
//! Environment overrides (testing and CI):
//! - `SUBWEAVE_TOOLS_CACHE_DIR` - Override the tools cache root
//! - `SUBWEAVE_STATE_DIR` - Override the state directory

use std::path::{Path, PathBuf};

use crate::platform::is_windows_rid;
use crate::{Error, Result};

/// Environment variable overriding the tools cache root.
pub const TOOLS_CACHE_DIR_ENV: &str = "SUBWEAVE_TOOLS_CACHE_DIR";

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "SUBWEAVE_STATE_DIR";

const APP_DIR: &str = "subweave";

/// Get the root directory extracted toolsets are cached under.
///
/// Resolution order:
/// 1. `override_dir`, when supplied
/// 2. `SUBWEAVE_TOOLS_CACHE_DIR` environment variable
/// 3. Platform local data directory + `/subweave/tools`
///
/// # Errors
///
/// Returns an error if no per-user data directory can be determined.
pub fn tools_cache_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        return Ok(dir.to_path_buf());
    }

    if let Some(dir) = non_empty_env(TOOLS_CACHE_DIR_ENV) {
        return Ok(dir);
    }

    let base = dirs::data_local_dir()
        .ok_or_else(|| Error::configuration("Could not determine local data directory"))?;

    Ok(base.join(APP_DIR).join("tools"))
}

/// Get the directory for small persisted state files.
///
/// `dirs::state_dir()` is only defined on Linux, so other platforms fall
/// back to the roaming data directory.
///
/// # Errors
///
/// Returns an error if no per-user directory can be determined.
pub fn state_dir() -> Result<PathBuf> {
    if let Some(dir) = non_empty_env(STATE_DIR_ENV) {
        return Ok(dir);
    }

    let base = dirs::state_dir()
        .or_else(dirs::data_dir)
        .ok_or_else(|| Error::configuration("Could not determine state directory"))?;

    Ok(base.join(APP_DIR))
}

/// Directory holding toolsets shipped next to the running executable:
/// `<exe dir>/tools`.
///
/// # Errors
///
/// Returns an error if the current executable path is unavailable.
pub fn bundled_tools_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| Error::configuration("Executable has no parent directory"))?;
    Ok(dir.join("tools"))
}

/// Default directory packaged manifests and archives are read from:
/// `<exe dir>/tools/packages`.
///
/// # Errors
///
/// Returns an error if the current executable path is unavailable.
pub fn default_package_dir() -> Result<PathBuf> {
    Ok(bundled_tools_dir()?.join("packages"))
}

/// File name a tool is expected under for the given RID.
///
/// # Examples
///
/// ```
/// use subweave_common::paths::default_tool_file_name;
///
/// assert_eq!(default_tool_file_name("mkvmerge", "linux-x64"), "mkvmerge");
/// assert_eq!(default_tool_file_name("mkvmerge", "win-arm64"), "mkvmerge.exe");
/// ```
#[must_use]
pub fn default_tool_file_name(tool: &str, rid: &str) -> String {
    if is_windows_rid(rid) {
        format!("{tool}.exe")
    } else {
        tool.to_string()
    }
}

fn non_empty_env(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
