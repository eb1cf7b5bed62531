//! Cross-process lock guarding toolset extraction.
//!
//! The lock is an advisory exclusive lock on `<cache root>/<rid>/.extract.lock`.
//! Acquisition never blocks indefinitely: it polls for a bounded time and
//! then reports the cache as unusable, so an interactive command can fall
//! back to `PATH` instead of hanging behind another process.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;
use tracing::{debug, trace};

use crate::{Error, Result};

/// Name of the lock file inside a RID's cache directory.
pub const LOCK_FILE_NAME: &str = ".extract.lock";

/// Default time to wait for another process to finish extracting.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Held exclusive lock. Released when dropped, on every exit path.
#[derive(Debug)]
pub struct ExtractionLock {
    file: File,
    path: PathBuf,
}

impl ExtractionLock {
    /// Try to take the lock at `path`, polling for at most `timeout`.
    ///
    /// `Duration::ZERO` makes exactly one attempt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provisioning`] if the lock file cannot be opened or
    /// the lock is still held by someone else when the timeout expires.
    pub fn try_acquire(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::provisioning(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                Error::provisioning(format!("cannot open lock file {}: {e}", path.display()))
            })?;

        let deadline = Instant::now() + timeout;
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(true) => {
                    trace!(path = %path.display(), "Acquired extraction lock");
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Ok(false) => {}
                Err(e) => {
                    return Err(Error::provisioning(format!(
                        "cannot lock {}: {e}",
                        path.display()
                    )));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::provisioning(format!(
                    "extraction lock {} is held by another process",
                    path.display()
                )));
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ExtractionLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(path = %self.path.display(), error = %e, "Failed to release extraction lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linux-x64").join(LOCK_FILE_NAME);
        let lock = ExtractionLock::try_acquire(&path, Duration::ZERO).unwrap();
        assert!(path.exists());
        assert_eq!(lock.path(), path);
    }

    #[test]
    fn test_second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);

        let held = ExtractionLock::try_acquire(&path, Duration::ZERO).unwrap();
        let err = ExtractionLock::try_acquire(&path, Duration::from_millis(120)).unwrap_err();
        assert!(matches!(err, Error::Provisioning(_)));

        drop(held);
        assert!(ExtractionLock::try_acquire(&path, Duration::ZERO).is_ok());
    }

    #[test]
    fn test_waits_for_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);

        let held = ExtractionLock::try_acquire(&path, Duration::ZERO).unwrap();
        let releaser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            drop(held);
        });

        let lock = ExtractionLock::try_acquire(&path, Duration::from_secs(5));
        releaser.join().unwrap();
        assert!(lock.is_ok());
    }
}
