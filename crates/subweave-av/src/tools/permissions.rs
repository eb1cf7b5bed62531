//! Executable permission bits, for platforms that have them.

use std::io;
use std::path::Path;

/// Whether this platform carries POSIX permission bits that must be set
/// before an extracted binary can run.
pub const POSIX_PERMISSIONS: bool = cfg!(unix);

/// Mark a file `rwxr-xr-x`. A no-op where [`POSIX_PERMISSIONS`] is false.
pub fn set_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_set_executable_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffmpeg");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();

        set_executable(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
