//! Running a probe tool and capturing its JSON report.

use crate::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

/// Run `program` with `args`, returning stdout as text.
///
/// `tool` is the name used in errors.
pub(crate) fn capture_stdout<I, S>(tool: &str, program: &Path, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    tracing::debug!(tool, program = %program.display(), "running probe tool");

    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::tool_not_found(tool)
        } else {
            Error::Io(e)
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed(tool, stderr.trim().to_string()));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| Error::parse_error(tool, format!("Invalid UTF-8: {}", e)))
}
