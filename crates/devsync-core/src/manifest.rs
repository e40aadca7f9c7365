//! Manifests: the set of relative file paths present at one location

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use devsync_fs::RelativePath;
use devsync_remote::{RemoteExecutor, quote};
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::{ContainerBridge, SyncConfig};
use crate::{Error, Result};

/// Exit code the listing script uses when its root is missing
const MISSING_ROOT_EXIT: i32 = 3;

/// Which of the three locations a path was observed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Local,
    Remote,
    Container,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Container => "container",
        })
    }
}

/// A relative path tagged with where it was seen
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileEntry {
    pub path: RelativePath,
    pub origin: Origin,
}

/// Sorted set of relative paths present at one origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    origin: Origin,
    paths: BTreeSet<RelativePath>,
}

impl Manifest {
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            paths: BTreeSet::new(),
        }
    }

    pub fn from_paths(origin: Origin, paths: impl IntoIterator<Item = RelativePath>) -> Self {
        Self {
            origin,
            paths: paths.into_iter().collect(),
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn insert(&mut self, path: RelativePath) -> bool {
        self.paths.insert(path)
    }

    pub fn contains(&self, path: &RelativePath) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelativePath> {
        self.paths.iter()
    }

    pub fn paths(&self) -> &BTreeSet<RelativePath> {
        &self.paths
    }

    /// Paths paired with this manifest's origin.
    pub fn entries(&self) -> impl Iterator<Item = FileEntry> + '_ {
        self.paths.iter().map(|path| FileEntry {
            path: path.clone(),
            origin: self.origin,
        })
    }

    /// Union of two manifests, keeping this manifest's origin.
    pub fn merged(mut self, other: &Manifest) -> Self {
        self.paths.extend(other.paths.iter().cloned());
        self
    }
}

/// Builds manifests for the local tree and its remote mirrors.
pub struct ManifestBuilder<'a> {
    config: &'a SyncConfig,
}

impl<'a> ManifestBuilder<'a> {
    pub fn new(config: &'a SyncConfig) -> Self {
        Self { config }
    }

    /// Build the manifest for `origin`. Remote and container listings go
    /// through `executor`; the local one does not.
    pub fn build(&self, origin: Origin, executor: &dyn RemoteExecutor) -> Result<Manifest> {
        match origin {
            Origin::Local => build_local(&self.config.local_root),
            Origin::Remote => {
                let script = listing_script(&self.config.staging_path);
                list_remote(executor, &script, origin, &self.config.staging_path)
            }
            Origin::Container => {
                if let Some((docker, container)) = self.config.bridge.docker() {
                    let script = format!(
                        "{} exec {} sh -c {}",
                        docker,
                        quote(container),
                        quote(&listing_script(&self.config.container_path))
                    );
                    return list_remote(executor, &script, origin, &self.config.container_path);
                }
                // Disabled: staging is the mount
                let root = match self.config.bridge {
                    ContainerBridge::HostCopy => &self.config.container_path,
                    _ => &self.config.staging_path,
                };
                list_remote(executor, &listing_script(root), origin, root)
            }
        }
    }
}

/// Walk a local tree, skipping dotfiles and dot-directories.
pub fn build_local(root: &Path) -> Result<Manifest> {
    if !root.is_dir() {
        return Err(Error::ManifestUnavailable {
            origin: Origin::Local.to_string(),
            root: root.display().to_string(),
        });
    }

    let mut manifest = Manifest::new(Origin::Local);
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        match RelativePath::from_native(relative) {
            Ok(path) => {
                manifest.insert(path);
            }
            Err(e) => tracing::warn!(path = %entry.path().display(), error = %e, "skipping unrepresentable path"),
        }
    }

    tracing::debug!(root = %root.display(), files = manifest.len(), "built local manifest");
    Ok(manifest)
}

fn listing_script(root: &str) -> String {
    format!(
        "cd {} 2>/dev/null || exit {}; find . -type f",
        quote(root),
        MISSING_ROOT_EXIT
    )
}

fn list_remote(executor: &dyn RemoteExecutor, script: &str, origin: Origin, root: &str) -> Result<Manifest> {
    let output = match executor.run(script) {
        Ok(output) => output,
        Err(e) if e.exit_code() == Some(MISSING_ROOT_EXIT) => {
            return Err(Error::ManifestUnavailable {
                origin: origin.to_string(),
                root: root.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let manifest = parse_listing(origin, output.lines());
    tracing::debug!(%origin, root, files = manifest.len(), "built remote manifest");
    Ok(manifest)
}

/// Turn `find .` output into a manifest, dropping hidden entries.
///
/// Duplicate lines (several workers answering) collapse into one entry.
pub(crate) fn parse_listing<'l>(origin: Origin, lines: impl Iterator<Item = &'l str>) -> Manifest {
    let mut manifest = Manifest::new(origin);
    for line in lines {
        let trimmed = line.strip_prefix("./").unwrap_or(line);
        match RelativePath::new(trimmed) {
            Ok(path) if !path.is_hidden() => {
                manifest.insert(path);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(line, error = %e, "ignoring unparseable listing entry"),
        }
    }
    manifest
}
