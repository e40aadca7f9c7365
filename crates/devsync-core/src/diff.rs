//! Planning: which files to send and which to remove
//!
//! Equality is decided by existence alone. There is no reliable change
//! signal across hosts (clocks and filesystems differ), so full mode
//! re-sends every local file and a whole-file overwrite is the update.

use std::collections::BTreeSet;

use devsync_fs::RelativePath;
use serde::Serialize;

use crate::manifest::Manifest;
use crate::resolve::Target;
use crate::{Error, Result};

/// How a sync invocation selects files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    /// Every local file is sent; remote files absent locally are deleted
    Full,
    /// Only the named targets are sent; nothing is ever deleted
    Selective(Vec<Target>),
    /// Plan as the wrapped mode, execute nothing
    DryRun(Box<SyncMode>),
}

impl SyncMode {
    pub fn dry_run(inner: SyncMode) -> Self {
        match inner {
            already @ Self::DryRun(_) => already,
            other => Self::DryRun(Box::new(other)),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun(_))
    }

    /// The mode that decides the plan, with any dry-run wrapper removed.
    pub fn planning_mode(&self) -> &SyncMode {
        match self {
            Self::DryRun(inner) => inner.planning_mode(),
            other => other,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self.planning_mode(), Self::Full)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Selective(_) => "selective",
            Self::DryRun(inner) => match inner.planning_mode() {
                Self::Full => "dry-run (full)",
                _ => "dry-run (selective)",
            },
        }
    }
}

/// Outcome of comparing a local and a remote manifest. The three sets are
/// disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    /// Present locally, to be (re)sent
    pub to_transfer: BTreeSet<RelativePath>,
    /// Present remotely but not locally; only filled in full mode
    pub to_delete: BTreeSet<RelativePath>,
    /// Present locally and deliberately not sent; informational
    pub unchanged: BTreeSet<RelativePath>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_transfer.is_empty() && self.to_delete.is_empty()
    }
}

/// Compares manifests under a [`SyncMode`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

impl DiffEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn diff(&self, local: &Manifest, remote: &Manifest, mode: &SyncMode) -> Result<SyncPlan> {
        let plan = match mode.planning_mode() {
            SyncMode::Full => SyncPlan {
                to_transfer: local.paths().clone(),
                to_delete: remote.paths().difference(local.paths()).cloned().collect(),
                unchanged: BTreeSet::new(),
            },
            SyncMode::Selective(targets) => {
                let to_transfer = select(local, targets)?;
                let unchanged = local.paths().difference(&to_transfer).cloned().collect();
                SyncPlan {
                    to_transfer,
                    to_delete: BTreeSet::new(),
                    unchanged,
                }
            }
            SyncMode::DryRun(_) => unreachable!("planning_mode strips dry-run"),
        };

        tracing::debug!(
            mode = mode.label(),
            transfer = plan.to_transfer.len(),
            delete = plan.to_delete.len(),
            unchanged = plan.unchanged.len(),
            "computed sync plan"
        );
        Ok(plan)
    }
}

fn select(local: &Manifest, targets: &[Target]) -> Result<BTreeSet<RelativePath>> {
    let mut selected = BTreeSet::new();
    for target in targets {
        match target {
            Target::All => selected.extend(local.iter().cloned()),
            Target::Dir(dir) => {
                let before = selected.len();
                selected.extend(local.iter().filter(|path| path.is_within(dir)).cloned());
                if selected.len() == before {
                    tracing::warn!(dir = %dir, "directory target selects no files");
                }
            }
            Target::File(file) => {
                if !local.contains(file) {
                    return Err(Error::invalid_target(file.as_str(), "not present in the local tree"));
                }
                selected.insert(file.clone());
            }
        }
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Origin;
    use pretty_assertions::assert_eq;

    fn manifest(origin: Origin, paths: &[&str]) -> Manifest {
        Manifest::from_paths(origin, paths.iter().map(|p| RelativePath::new(p).unwrap()))
    }

    fn set(paths: &[&str]) -> BTreeSet<RelativePath> {
        paths.iter().map(|p| RelativePath::new(p).unwrap()).collect()
    }

    #[test]
    fn full_mode_scenario_a() {
        let local = manifest(Origin::Local, &["a.py", "b.py"]);
        let remote = manifest(Origin::Remote, &["a.py", "old.py"]);

        let plan = DiffEngine::new().diff(&local, &remote, &SyncMode::Full).unwrap();
        assert_eq!(plan.to_transfer, set(&["a.py", "b.py"]));
        assert_eq!(plan.to_delete, set(&["old.py"]));
        assert!(plan.unchanged.is_empty());
    }

    #[test]
    fn full_mode_scenario_b_fresh_remote() {
        let local = manifest(Origin::Local, &["a.py"]);
        let remote = Manifest::new(Origin::Remote);

        let plan = DiffEngine::new().diff(&local, &remote, &SyncMode::Full).unwrap();
        assert_eq!(plan.to_transfer, set(&["a.py"]));
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn selective_mode_never_deletes() {
        let local = manifest(Origin::Local, &["a.py", "b.py"]);
        let remote = manifest(Origin::Remote, &["old.py", "stale/x.py"]);
        let mode = SyncMode::Selective(vec![Target::File(RelativePath::new("b.py").unwrap())]);

        let plan = DiffEngine::new().diff(&local, &remote, &mode).unwrap();
        assert_eq!(plan.to_transfer, set(&["b.py"]));
        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.unchanged, set(&["a.py"]));
    }

    #[test]
    fn selective_dir_expands_to_files_beneath() {
        let local = manifest(Origin::Local, &["data/a.py", "data/sub/b.py", "database.py"]);
        let mode = SyncMode::Selective(vec![Target::Dir(RelativePath::new("data").unwrap())]);

        let plan = DiffEngine::new()
            .diff(&local, &Manifest::new(Origin::Remote), &mode)
            .unwrap();
        assert_eq!(plan.to_transfer, set(&["data/a.py", "data/sub/b.py"]));
        assert_eq!(plan.unchanged, set(&["database.py"]));
    }

    #[test]
    fn selective_missing_file_is_invalid_target() {
        let local = manifest(Origin::Local, &["a.py"]);
        let mode = SyncMode::Selective(vec![Target::File(RelativePath::new("b.py").unwrap())]);
        let err = DiffEngine::new()
            .diff(&local, &Manifest::new(Origin::Remote), &mode)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTarget { .. }));
    }

    #[test]
    fn dry_run_plans_like_the_wrapped_mode() {
        let local = manifest(Origin::Local, &["a.py"]);
        let remote = manifest(Origin::Remote, &["old.py"]);
        let engine = DiffEngine::new();

        let real = engine.diff(&local, &remote, &SyncMode::Full).unwrap();
        let dry = engine
            .diff(&local, &remote, &SyncMode::dry_run(SyncMode::Full))
            .unwrap();
        assert_eq!(real, dry);
    }

    #[test]
    fn dry_run_does_not_nest() {
        let mode = SyncMode::dry_run(SyncMode::dry_run(SyncMode::Full));
        assert_eq!(mode, SyncMode::DryRun(Box::new(SyncMode::Full)));
        assert_eq!(mode.label(), "dry-run (full)");
    }
}
