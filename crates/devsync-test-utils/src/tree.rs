//! Temporary directory fixtures

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary local source tree.
///
/// # Example
///
/// ```rust,no_run
/// use devsync_test_utils::TestTree;
///
/// let tree = TestTree::new().with_file("a.py", "print('a')");
/// assert!(tree.path("a.py").exists());
/// ```
pub struct TestTree {
    temp_dir: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Root of the tree.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `relative` inside the tree.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("TestTree::write: {}: {e}", path.display()));
    }

    pub fn with_file(self, relative: &str, content: &str) -> Self {
        self.write(relative, content);
        self
    }

    pub fn mkdir(&self, relative: &str) {
        fs::create_dir_all(self.path(relative)).unwrap();
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.path(relative)).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative))
            .unwrap_or_else(|e| panic!("TestTree::read: {relative}: {e}"))
    }

    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_exists(&self, relative: &str) {
        let path = self.path(relative);
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }

    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_not_exists(&self, relative: &str) {
        let path = self.path(relative);
        assert!(!path.exists(), "Expected file NOT to exist: {}", path.display());
    }
}

/// A fake remote host laid out in a temporary directory: a staging
/// directory and a host-visible container mount.
pub struct TestRemote {
    pub staging: TestTree,
    pub container: TestTree,
    pub scratch: TestTree,
}

impl Default for TestRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRemote {
    pub fn new() -> Self {
        Self {
            staging: TestTree::new(),
            container: TestTree::new(),
            scratch: TestTree::new(),
        }
    }

    pub fn staging_path(&self) -> String {
        self.staging.root().to_string_lossy().to_string()
    }

    pub fn container_path(&self) -> String {
        self.container.root().to_string_lossy().to_string()
    }

    /// Directory used for uploaded archives.
    pub fn scratch_path(&self) -> String {
        self.scratch.root().to_string_lossy().to_string()
    }
}
