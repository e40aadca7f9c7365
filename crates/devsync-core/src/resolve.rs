//! Mapping sync targets onto the local, staging and container paths

use std::fmt;
use std::path::{Path, PathBuf};

use devsync_fs::{NormalizedPath, RelativePath};
use serde::Serialize;

use crate::config::SyncConfig;
use crate::{Error, Result};

/// What a sync invocation asks for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Every regular file under the local root
    All,
    /// Every file under a directory of the local root
    Dir(RelativePath),
    /// One file of the local root
    File(RelativePath),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("<all>"),
            Self::Dir(path) => write!(f, "{}/", path),
            Self::File(path) => write!(f, "{}", path),
        }
    }
}

/// The same logical location on all three sides
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountPoint {
    pub local_path: PathBuf,
    pub staging_path: String,
    pub container_path: String,
}

/// Resolves targets against a [`SyncConfig`].
///
/// Only reads local metadata; never touches the remote side.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    config: &'a SyncConfig,
}

impl<'a> PathResolver<'a> {
    pub fn new(config: &'a SyncConfig) -> Self {
        Self { config }
    }

    /// Mount point of the whole tree.
    pub fn root(&self) -> MountPoint {
        MountPoint {
            local_path: self.config.local_root.clone(),
            staging_path: self.config.staging_path.clone(),
            container_path: self.config.container_path.clone(),
        }
    }

    /// Mount point of one entry, without checking that it exists.
    pub fn mount_for(&self, path: &RelativePath) -> MountPoint {
        MountPoint {
            local_path: path.to_native_under(&self.config.local_root),
            staging_path: path.join_under(&self.config.staging_path),
            container_path: path.join_under(&self.config.container_path),
        }
    }

    /// Parse a user-supplied file reference. Relative references are taken
    /// relative to the local root; absolute ones must lie inside it.
    pub fn file_target(&self, raw: impl AsRef<Path>) -> Result<Target> {
        let target = Target::File(self.relative(raw.as_ref())?);
        self.resolve(&target)?;
        Ok(target)
    }

    /// Parse a user-supplied directory reference.
    pub fn dir_target(&self, raw: impl AsRef<Path>) -> Result<Target> {
        let target = Target::Dir(self.relative(raw.as_ref())?);
        self.resolve(&target)?;
        Ok(target)
    }

    /// Resolve a target to its mount point.
    ///
    /// A file target must exist locally as a regular file. A directory
    /// target may be absent (it then selects nothing) but must not name a
    /// file.
    pub fn resolve(&self, target: &Target) -> Result<MountPoint> {
        match target {
            Target::All => Ok(self.root()),
            Target::Dir(path) => {
                let mount = self.mount_for(path);
                if mount.local_path.is_file() {
                    return Err(Error::invalid_target(path.as_str(), "is a file, not a directory"));
                }
                Ok(mount)
            }
            Target::File(path) => {
                let mount = self.mount_for(path);
                if !mount.local_path.exists() {
                    return Err(Error::invalid_target(
                        path.as_str(),
                        format!("does not exist under {}", self.config.local_root.display()),
                    ));
                }
                if !mount.local_path.is_file() {
                    return Err(Error::invalid_target(path.as_str(), "is not a regular file"));
                }
                Ok(mount)
            }
        }
    }

    fn relative(&self, raw: &Path) -> Result<RelativePath> {
        let display = raw.display().to_string();
        let relative = if raw.is_absolute() {
            let root = NormalizedPath::new(&self.config.local_root)
                .canonicalize()
                .map_err(|_| Error::invalid_target(&display, "local root does not exist"))?;
            let absolute = NormalizedPath::new(raw)
                .canonicalize()
                .map_err(|_| Error::invalid_target(&display, "does not exist"))?;
            let rest = absolute
                .strip_prefix(&root)
                .ok_or_else(|| Error::invalid_target(&display, "is outside the local root"))?;
            RelativePath::new(rest)
        } else {
            RelativePath::new(NormalizedPath::new(raw).as_str())
        };

        let relative = relative.map_err(|e| Error::invalid_target(&display, e.to_string()))?;
        if relative.is_hidden() {
            return Err(Error::invalid_target(&display, "hidden paths are not synchronized"));
        }
        Ok(relative)
    }
}
