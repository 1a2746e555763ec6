//! Advisory lock for the history file.
//!
//! Lock strategy:
//! - `<history file>.lock` next to the history file marks an active writer.
//! - The lock file is created with exclusive-create; if it already exists the
//!   cache is owned by someone else (or a crashed run left it behind).
//! - Held from cache open to cache close. No waiting, no re-entry.
//! - Stale locks are removed by hand once the operator has checked no other
//!   ai-feed is running.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const LOCK_SUFFIX: &str = ".lock";

/// Path of the lock file guarding `data_path`.
pub fn lock_path_for(data_path: &Path) -> PathBuf {
    let mut raw = data_path.as_os_str().to_os_string();
    raw.push(LOCK_SUFFIX);
    PathBuf::from(raw)
}

/// A held lock file. Released on [`FileLock::release`] or drop.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    file: Option<File>,
}

impl FileLock {
    /// Create the lock file next to `data_path`.
    ///
    /// Fails with [`Error::LockHeld`] when the lock file already exists.
    pub fn acquire(data_path: &Path) -> Result<Self> {
        let path = lock_path_for(data_path);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                tracing::debug!(path = %path.display(), "Acquired cache lock");
                Ok(Self {
                    path,
                    file: Some(file),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(Error::LockHeld { path }),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Err(Error::Permission { path, source: e })
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Close the handle and remove the lock file. Idempotent.
    ///
    /// A missing lock file is fine; any other unlink failure is logged and
    /// swallowed.
    pub fn release(&mut self) {
        if self.file.take().is_none() {
            return;
        }

        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Released cache lock"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove cache lock file"
            ),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.release();
    }
}
