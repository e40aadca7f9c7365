//! Advisory lock for a sync target
//!
//! Two devsync processes on the same machine pointed at the same remote
//! staging directory would interleave archives and deletions. The lock is a
//! file in the system temp directory, keyed by the target, held with an
//! exclusive `fs2` lock for the lifetime of the guard. Processes on other
//! machines are not coordinated.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, Result};

/// Guard for an acquired session lock. Released on drop.
#[derive(Debug)]
pub struct SessionLock {
    file: File,
    path: PathBuf,
}

impl SessionLock {
    /// Acquire the lock for `key` in the system temp directory.
    pub fn acquire(key: &str) -> Result<Self> {
        Self::acquire_in(&std::env::temp_dir(), key)
    }

    /// Acquire the lock for `key` inside `dir`. Fails immediately with
    /// [`Error::LockHeld`] when another process holds it.
    pub fn acquire_in(dir: &Path, key: &str) -> Result<Self> {
        let path = dir.join(format!("devsync-{}.lock", sanitize_key(key)));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io(&path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "acquired session lock");
                Ok(Self { file, path })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(Error::LockHeld { path })
            }
            Err(_) => Err(Error::LockFailed { path }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release session lock");
        }
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
