//! Removing remote files that no longer exist locally
//!
//! Only the staging directory and the container mount are ever touched, and
//! never a path the local tree still has. Directories are removed only when a
//! deletion left them empty.

use std::collections::BTreeSet;

use devsync_fs::RelativePath;
use devsync_remote::{RemoteExecutor, best_effort, quote, quote_all};
use serde::Serialize;

use crate::config::{ContainerBridge, SyncConfig};
use crate::manifest::{FileEntry, Manifest, Origin};
use crate::{Error, Result};

/// Upper bound on the quoted names carried by one remote command. Keeps a
/// docker-wrapped, requoted script well under the per-argument limit.
const MAX_NAMES_PER_COMMAND: usize = 16 * 1024;

/// Yes/no gate in front of destructive operations.
pub trait Confirm: Send + Sync {
    /// Ask `prompt`; `Ok(false)` declines.
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Approves everything. Used for `--yes` and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Declines everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

impl Confirm for DenyAll {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    pub location: Origin,
    pub root: String,
    pub message: String,
}

/// What happened to one deletion batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub requested: usize,
    /// Files removed from the staging directory
    pub deleted: usize,
    /// The confirmation gate declined; nothing was removed
    pub denied: bool,
    /// Local entries that were asked to be deleted remotely and skipped
    pub refused: Vec<FileEntry>,
    pub failures: Vec<DeletionFailure>,
}

impl DeletionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Applies the `to_delete` half of a plan.
pub struct DeletionExecutor<'a> {
    config: &'a SyncConfig,
    executor: &'a dyn RemoteExecutor,
    confirm: &'a dyn Confirm,
}

impl<'a> DeletionExecutor<'a> {
    pub fn new(config: &'a SyncConfig, executor: &'a dyn RemoteExecutor, confirm: &'a dyn Confirm) -> Self {
        Self {
            config,
            executor,
            confirm,
        }
    }

    /// Delete `paths` from staging and the container once confirmed.
    ///
    /// Declining is reported as `denied`, not as an error. Only a failing
    /// confirmation gate itself is returned as `Err`.
    pub fn apply(&self, paths: &BTreeSet<RelativePath>, local: &Manifest) -> Result<DeletionReport> {
        let mut report = DeletionReport {
            requested: paths.len(),
            ..DeletionReport::default()
        };

        report.refused = local.entries().filter(|entry| paths.contains(&entry.path)).collect();
        for entry in &report.refused {
            tracing::warn!(path = %entry.path, origin = %entry.origin, "refusing to delete a path that exists locally");
        }
        let allowed: Vec<RelativePath> = paths.iter().filter(|path| !local.contains(path)).cloned().collect();
        if allowed.is_empty() {
            return Ok(report);
        }

        match self.gate(&allowed) {
            Ok(()) => {}
            Err(Error::DeletionDenied { count }) => {
                tracing::info!(count, "deletion declined");
                report.denied = true;
                return Ok(report);
            }
            Err(e) => return Err(e),
        }

        let staging = &self.config.staging_path;
        let mount = &self.config.container_path;
        for batch in batches(&allowed) {
            let names = quote_all(batch.iter().map(RelativePath::as_str));
            match self.executor.run(&remove_script(staging, &names)) {
                Ok(_) => report.deleted += batch.len(),
                Err(e) => report.failures.push(failure(Origin::Remote, staging, e.to_string())),
            }
            if let Some(command) = self.in_container(remove_script(mount, &names))
                && let Err(e) = self.executor.run(&command)
            {
                report.failures.push(failure(Origin::Container, mount, e.to_string()));
            }
        }

        let parents = emptied_parents(&allowed);
        for batch in batches(&parents) {
            let dirs = quote_all(batch.iter().map(RelativePath::as_str));
            best_effort(
                self.executor.run(&prune_script(staging, &dirs)),
                "remove emptied staging directories",
            );
            if let Some(command) = self.in_container(prune_script(mount, &dirs)) {
                best_effort(self.executor.run(&command), "remove emptied container directories");
            }
        }

        tracing::info!(deleted = report.deleted, failures = report.failures.len(), "deletion finished");
        Ok(report)
    }

    fn gate(&self, allowed: &[RelativePath]) -> Result<()> {
        let prompt = format!(
            "Delete {} file(s) from {} on {}?",
            allowed.len(),
            self.config.staging_path,
            self.executor.describe()
        );
        if self.confirm.confirm(&prompt)? {
            Ok(())
        } else {
            Err(Error::DeletionDenied { count: allowed.len() })
        }
    }

    /// Wrap a script so it runs against the container mount, or `None` when
    /// staging is the mount.
    fn in_container(&self, script: String) -> Option<String> {
        if let Some((docker, container)) = self.config.bridge.docker() {
            return Some(format!("{docker} exec {} sh -c {}", quote(container), quote(&script)));
        }
        match self.config.bridge {
            ContainerBridge::HostCopy => Some(script),
            _ => None,
        }
    }
}

/// Split `paths` so each group's quoted names stay under
/// [`MAX_NAMES_PER_COMMAND`].
fn batches(paths: &[RelativePath]) -> Vec<&[RelativePath]> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut size = 0;
    for (i, path) in paths.iter().enumerate() {
        let cost = quote(path.as_str()).len() + 1;
        if i > start && size + cost > MAX_NAMES_PER_COMMAND {
            groups.push(&paths[start..i]);
            start = i;
            size = 0;
        }
        size += cost;
    }
    if start < paths.len() {
        groups.push(&paths[start..]);
    }
    groups
}

/// Parent directories of the deleted paths, deepest first.
fn emptied_parents(paths: &[RelativePath]) -> Vec<RelativePath> {
    let parents: BTreeSet<RelativePath> = paths
        .iter()
        .filter_map(|path| path.as_str().rsplit_once('/'))
        .filter_map(|(dir, _)| RelativePath::new(dir).ok())
        .collect();
    parents.into_iter().rev().collect()
}

fn remove_script(root: &str, names: &str) -> String {
    format!("cd {} && rm -f -- {}", quote(root), names)
}

/// Remove each directory and then its ancestors while they are empty,
/// stopping at the root.
fn prune_script(root: &str, dirs: &str) -> String {
    format!(
        "cd {} && for d in {}; do while [ \"$d\" != . ] && rmdir -- \"$d\" 2>/dev/null; do d=$(dirname -- \"$d\"); done; done",
        quote(root),
        dirs
    )
}

fn failure(location: Origin, root: &str, message: String) -> DeletionFailure {
    tracing::warn!(%location, root, error = %message, "deletion failed");
    DeletionFailure {
        location,
        root: root.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devsync_remote::LocalExecutor;
    use devsync_test_utils::{FailingExecutor, RecordingExecutor, TestRemote};
    use pretty_assertions::assert_eq;

    fn set(paths: &[&str]) -> BTreeSet<RelativePath> {
        paths.iter().map(|p| RelativePath::new(p).unwrap()).collect()
    }

    fn config(remote: &TestRemote) -> SyncConfig {
        SyncConfig::new("unused")
            .with_staging_path(remote.staging_path())
            .with_container_path(remote.container_path())
            .with_bridge(ContainerBridge::HostCopy)
    }

    #[test]
    fn confirmed_deletion_clears_staging_and_container() {
        let remote = TestRemote::new();
        remote.staging.write("old/stale.py", "");
        remote.staging.write("keep.py", "");
        remote.container.write("old/stale.py", "");
        let config = config(&remote);
        let local = Manifest::new(Origin::Local);

        let report = DeletionExecutor::new(&config, &LocalExecutor::new(), &AssumeYes)
            .apply(&set(&["old/stale.py"]), &local)
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert!(report.is_success());
        remote.staging.assert_not_exists("old/stale.py");
        remote.staging.assert_not_exists("old");
        remote.staging.assert_exists("keep.py");
        remote.container.assert_not_exists("old/stale.py");
    }

    #[test]
    fn denial_is_a_clean_no_op() {
        let remote = TestRemote::new();
        remote.staging.write("old.py", "");
        let config = config(&remote);
        let executor = RecordingExecutor::new();

        let report = DeletionExecutor::new(&config, &executor, &DenyAll)
            .apply(&set(&["old.py"]), &Manifest::new(Origin::Local))
            .unwrap();

        assert!(report.denied);
        assert_eq!(report.deleted, 0);
        assert_eq!(executor.call_count(), 0);
        remote.staging.assert_exists("old.py");
    }

    #[test]
    fn paths_present_locally_are_refused() {
        let remote = TestRemote::new();
        remote.staging.write("a.py", "");
        let config = config(&remote);
        let local = Manifest::from_paths(Origin::Local, set(&["a.py"]));
        let executor = RecordingExecutor::new();

        let report = DeletionExecutor::new(&config, &executor, &AssumeYes)
            .apply(&set(&["a.py"]), &local)
            .unwrap();

        assert_eq!(
            report.refused,
            vec![FileEntry {
                path: RelativePath::new("a.py").unwrap(),
                origin: Origin::Local,
            }]
        );
        assert_eq!(executor.call_count(), 0);
        remote.staging.assert_exists("a.py");
    }

    #[test]
    fn container_failure_is_collected() {
        let remote = TestRemote::new();
        remote.staging.write("old.py", "");
        let config = config(&remote);
        let executor = FailingExecutor::failing_commands_with(&remote.container_path());

        let report = DeletionExecutor::new(&config, &executor, &AssumeYes)
            .apply(&set(&["old.py"]), &Manifest::new(Origin::Local))
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].location, Origin::Container);
    }

    #[test]
    fn unrelated_empty_directories_survive() {
        let remote = TestRemote::new();
        remote.staging.write("old.py", "");
        remote.staging.write("pkg/sub/gone.py", "");
        remote.staging.mkdir("checkpoints");
        remote.staging.mkdir("pkg/keep");
        remote.container.mkdir("logs");
        let config = config(&remote);

        let report = DeletionExecutor::new(&config, &LocalExecutor::new(), &AssumeYes)
            .apply(&set(&["old.py", "pkg/sub/gone.py"]), &Manifest::new(Origin::Local))
            .unwrap();

        assert_eq!(report.deleted, 2);
        remote.staging.assert_exists("checkpoints");
        remote.staging.assert_exists("pkg/keep");
        remote.staging.assert_not_exists("pkg/sub");
        remote.container.assert_exists("logs");
    }

    #[test]
    fn thousands_of_deletions_are_split_across_commands() {
        let remote = TestRemote::new();
        let mut paths = Vec::new();
        for i in 0..3000 {
            let path = format!("pkg/module_group_{:03}/submodule_file_{i:05}.py", i % 50);
            remote.staging.write(&path, "");
            paths.push(path);
        }
        let config = config(&remote).with_bridge(ContainerBridge::Disabled);
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let executor = RecordingExecutor::new();

        let report = DeletionExecutor::new(&config, &executor, &AssumeYes)
            .apply(&set(&refs), &Manifest::new(Origin::Local))
            .unwrap();

        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(report.deleted, 3000);
        assert!(executor.calls().iter().all(|call| call.len() < 4 * MAX_NAMES_PER_COMMAND));
        assert!(executor.calls().iter().filter(|call| call.contains("rm -f")).count() > 1);
        remote.staging.assert_not_exists("pkg");
    }

    #[test]
    fn batches_respect_size_limit() {
        let paths: Vec<RelativePath> = (0..2000)
            .map(|i| RelativePath::new(format!("dir/file_{i:06}.py")).unwrap())
            .collect();
        let groups = batches(&paths);

        assert!(groups.len() > 1);
        assert_eq!(groups.iter().map(|g| g.len()).sum::<usize>(), 2000);
        for group in groups {
            let names = quote_all(group.iter().map(RelativePath::as_str));
            assert!(names.len() <= MAX_NAMES_PER_COMMAND);
        }
    }

    #[test]
    fn names_are_quoted() {
        let remote = TestRemote::new();
        remote.staging.write("odd name.py", "");
        let config = config(&remote).with_bridge(ContainerBridge::Disabled);

        let report = DeletionExecutor::new(&config, &LocalExecutor::new(), &AssumeYes)
            .apply(&set(&["odd name.py"]), &Manifest::new(Origin::Local))
            .unwrap();
        assert!(report.is_success());
        remote.staging.assert_not_exists("odd name.py");
    }
}
