//! Path handling shared by the local, staging and container sides
//!
//! Local paths go through [`NormalizedPath`] so that separators look the same
//! on every host. Paths that travel between hosts are [`RelativePath`]s: posix
//! style, relative to the synchronized root, and unable to escape it.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// A path normalized to use forward slashes internally.
///
/// Converts to platform-native format only at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        let mut normalized = path_str.replace('\\', "/");
        while normalized.len() > 1 && normalized.ends_with('/') {
            normalized.pop();
        }
        Self { inner: normalized }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Resolve symlinks and `.` segments without producing UNC paths on Windows.
    pub fn canonicalize(&self) -> Result<Self> {
        let native = self.to_native();
        dunce::canonicalize(&native)
            .map(Self::new)
            .map_err(|e| Error::io(native, e))
    }

    /// Strip `base` from the front of this path, returning the remainder
    /// as a root-relative path.
    pub fn strip_prefix(&self, base: &NormalizedPath) -> Option<&str> {
        if base.inner == "/" {
            return self.inner.strip_prefix('/');
        }
        let rest = self.inner.strip_prefix(base.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        self.inner.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 {
                None
            } else {
                Some(&name[idx + 1..])
            }
        })
    }

    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

/// A posix-style path relative to the synchronized root.
///
/// Always non-empty, never absolute, and never contains a `..` segment, so
/// joining it under any root stays inside that root. `.` segments and
/// repeated separators are collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RelativePath(String);

impl RelativePath {
    /// Validate and normalize a root-relative path.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref();
        let normalized = raw.replace('\\', "/");

        if normalized.starts_with('/') || has_drive_prefix(&normalized) {
            return Err(Error::invalid_path(raw, "path must be relative to the sync root"));
        }

        let mut segments = Vec::new();
        for segment in normalized.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(Error::invalid_path(raw, "path must not contain '..'"));
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            return Err(Error::invalid_path(raw, "path is empty"));
        }

        Ok(Self(segments.join("/")))
    }

    /// Build from a native path relative to a local root (for example one
    /// produced by `Path::strip_prefix`).
    ///
    /// Stricter than [`new`](Self::new): the result must name the same file
    /// again under any root, so names that are not UTF-8 or that hold a `\`
    /// on Unix are rejected instead of silently rewritten.
    pub fn from_native(path: &Path) -> Result<Self> {
        let raw = path
            .to_str()
            .ok_or_else(|| Error::invalid_path(path.to_string_lossy(), "name is not valid UTF-8"))?;
        let relative = Self::new(raw)?;
        if relative.to_native_under(Path::new("")) != path {
            return Err(Error::invalid_path(raw, "name does not map to a portable path"));
        }
        Ok(relative)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// True when any segment is a dotfile or dot-directory.
    pub fn is_hidden(&self) -> bool {
        self.segments().any(|segment| segment.starts_with('.'))
    }

    /// True when this path is `dir` itself or lies beneath it.
    pub fn is_within(&self, dir: &RelativePath) -> bool {
        self.0 == dir.0
            || (self.0.starts_with(dir.as_str()) && self.0.as_bytes().get(dir.0.len()) == Some(&b'/'))
    }

    /// Native path of this entry under a local root.
    pub fn to_native_under(&self, root: &Path) -> PathBuf {
        self.segments().fold(root.to_path_buf(), |acc, segment| acc.join(segment))
    }

    /// Posix path of this entry under a remote root.
    pub fn join_under(&self, root: &str) -> String {
        let root = root.trim_end_matches('/');
        if root.is_empty() {
            format!("/{}", self.0)
        } else {
            format!("{}/{}", root, self.0)
        }
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for RelativePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}
