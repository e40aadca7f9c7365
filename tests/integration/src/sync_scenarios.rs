//! End-to-end sync scenarios
//!
//! The remote host is this machine ([`LocalExecutor`]) and the container
//! mount is a plain directory, so every cycle runs the real listing,
//! archive, extract, bridge and delete commands.

use std::collections::BTreeSet;
use std::sync::Arc;

use devsync_core::{
    AssumeYes, Confirm, ContainerBridge, CycleOutcome, DenyAll, Error, SyncConfig, SyncEngine, SyncMode, Target,
};
use devsync_fs::{RelativePath, SessionLock};
use devsync_remote::{LocalExecutor, RemoteExecutor};
use devsync_test_utils::{FailingExecutor, RecordingExecutor, TestRemote, TestTree};
use pretty_assertions::assert_eq;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Fixture {
    local: TestTree,
    remote: TestRemote,
}

impl Fixture {
    fn new() -> Self {
        Self {
            local: TestTree::new(),
            remote: TestRemote::new(),
        }
    }

    fn config(&self) -> SyncConfig {
        SyncConfig::new(self.local.root())
            .with_staging_path(self.remote.staging_path())
            .with_container_path(self.remote.container_path())
            .with_remote_tmp(self.remote.scratch_path())
            .with_bridge(ContainerBridge::HostCopy)
    }

    fn engine(&self, executor: Arc<dyn RemoteExecutor>, confirm: Arc<dyn Confirm>) -> SyncEngine {
        SyncEngine::new(self.config(), executor, confirm).unwrap()
    }

    fn local_engine(&self) -> SyncEngine {
        self.engine(Arc::new(LocalExecutor::new()), Arc::new(AssumeYes))
    }
}

fn set(paths: &[&str]) -> BTreeSet<RelativePath> {
    paths.iter().map(|p| RelativePath::new(p).unwrap()).collect()
}

fn file(path: &str) -> Target {
    Target::File(RelativePath::new(path).unwrap())
}

// =============================================================================
// Planning scenarios
// =============================================================================

#[test]
fn scenario_a_full_sync_replaces_stale_remote() {
    let fx = Fixture::new();
    fx.local.write("a.py", "a2");
    fx.local.write("b.py", "b");
    fx.remote.staging.write("a.py", "a1");
    fx.remote.staging.write("old.py", "");
    fx.remote.container.write("a.py", "a1");
    fx.remote.container.write("old.py", "");

    let report = fx.local_engine().run_cycle(&SyncMode::Full).unwrap();

    assert_eq!(report.plan.to_transfer, set(&["a.py", "b.py"]));
    assert_eq!(report.plan.to_delete, set(&["old.py"]));
    assert_eq!(report.outcome(), CycleOutcome::Success);
    for side in [&fx.remote.staging, &fx.remote.container] {
        assert_eq!(side.read("a.py"), "a2");
        assert_eq!(side.read("b.py"), "b");
        side.assert_not_exists("old.py");
    }
}

#[test]
fn scenario_b_fresh_remote_is_created() {
    let fx = Fixture::new();
    fx.local.write("a.py", "");
    let staging = format!("{}/fresh/src", fx.remote.staging_path());
    let config = fx.config().with_staging_path(&staging);

    let engine = SyncEngine::new(config, Arc::new(LocalExecutor::new()), Arc::new(AssumeYes)).unwrap();
    let report = engine.run_cycle(&SyncMode::Full).unwrap();

    assert_eq!(report.plan.to_transfer, set(&["a.py"]));
    assert!(report.plan.to_delete.is_empty());
    fx.remote.staging.assert_exists("fresh/src/a.py");
}

#[test]
fn scenario_c_missing_target_makes_no_remote_calls() {
    let fx = Fixture::new();
    fx.local.write("a.py", "");
    let executor = Arc::new(RecordingExecutor::new());

    let engine = fx.engine(executor.clone(), Arc::new(AssumeYes));
    let err = engine.run_cycle(&SyncMode::Selective(vec![file("b.py")])).unwrap_err();

    assert!(matches!(err, Error::InvalidTarget { .. }));
    assert!(executor.calls().is_empty());
}

#[test]
fn second_full_sync_is_idempotent() {
    let fx = Fixture::new();
    fx.local.write("a.py", "");
    fx.local.write("pkg/b.py", "");
    fx.remote.staging.write("old.py", "");
    let engine = fx.local_engine();

    let first = engine.run_cycle(&SyncMode::Full).unwrap();
    let second = engine.run_cycle(&SyncMode::Full).unwrap();

    assert_eq!(second.plan.to_transfer, first.plan.to_transfer);
    assert!(second.plan.to_delete.is_empty());
    assert!(second.deletion.is_none());
}

#[test]
fn selective_sync_leaves_remote_extras_alone() {
    let fx = Fixture::new();
    fx.local.write("a.py", "");
    fx.local.write("models/bert.py", "bert");
    fx.remote.staging.write("old.py", "");
    let executor = Arc::new(RecordingExecutor::new());

    let engine = fx.engine(executor.clone(), Arc::new(AssumeYes));
    let mode = SyncMode::Selective(vec![Target::Dir(RelativePath::new("models").unwrap())]);
    let report = engine.run_cycle(&mode).unwrap();

    assert_eq!(report.plan.to_transfer, set(&["models/bert.py"]));
    assert!(report.plan.to_delete.is_empty());
    assert_eq!(fx.remote.container.read("models/bert.py"), "bert");
    fx.remote.staging.assert_exists("old.py");
    fx.remote.staging.assert_not_exists("a.py");
    // no listing of the remote side in selective mode
    assert!(executor.calls().iter().all(|call| !call.contains("find . -type f")));
}

#[test]
fn hidden_local_files_are_never_sent() {
    let fx = Fixture::new();
    fx.local.write("a.py", "");
    fx.local.write(".env", "TOKEN=secret");
    fx.local.write(".git/config", "");

    fx.local_engine().run_cycle(&SyncMode::Full).unwrap();
    fx.remote.staging.assert_exists("a.py");
    fx.remote.staging.assert_not_exists(".env");
    fx.remote.staging.assert_not_exists(".git");
}

#[cfg(unix)]
#[test]
fn unsendable_local_name_does_not_block_the_batch() {
    let fx = Fixture::new();
    fx.local.write("a.py", "a");
    fx.local.write("weird\\name.py", "");

    let report = fx.local_engine().run_cycle(&SyncMode::Full).unwrap();

    assert_eq!(report.plan.to_transfer, set(&["a.py"]));
    assert_eq!(report.outcome(), CycleOutcome::Success);
    assert_eq!(fx.remote.container.read("a.py"), "a");
}

#[test]
fn full_sync_of_a_large_tree_reaches_the_container() {
    let fx = Fixture::new();
    for i in 0..4000 {
        fx.local
            .write(&format!("pkg/module_group_{:03}/submodule_file_{i:05}.py", i % 100), "");
    }

    let report = fx.local_engine().run_cycle(&SyncMode::Full).unwrap();

    assert_eq!(report.outcome(), CycleOutcome::Success, "{:?}", report.transfer);
    assert_eq!(report.transferred(), 4000);
    fx.remote
        .container
        .assert_exists("pkg/module_group_042/submodule_file_03942.py");
}

#[test]
fn deletion_keeps_unrelated_empty_remote_directories() {
    let fx = Fixture::new();
    fx.local.write("a.py", "");
    fx.remote.staging.write("old.py", "");
    fx.remote.staging.mkdir("checkpoints");
    fx.remote.container.mkdir("logs");

    let report = fx.local_engine().run_cycle(&SyncMode::Full).unwrap();

    assert_eq!(report.deleted(), 1);
    fx.remote.staging.assert_not_exists("old.py");
    fx.remote.staging.assert_exists("checkpoints");
    fx.remote.container.assert_exists("logs");
}

#[test]
fn hidden_remote_files_are_never_deleted() {
    let fx = Fixture::new();
    fx.local.write("a.py", "");
    fx.remote.staging.write(".cache/state", "");

    let report = fx.local_engine().run_cycle(&SyncMode::Full).unwrap();
    assert!(report.plan.to_delete.is_empty());
    fx.remote.staging.assert_exists(".cache/state");
}

// =============================================================================
// Deletion gate
// =============================================================================

#[test]
fn declined_deletion_keeps_remote_files() {
    let fx = Fixture::new();
    fx.local.write("a.py", "");
    fx.remote.staging.write("old.py", "");

    let engine = fx.engine(Arc::new(LocalExecutor::new()), Arc::new(DenyAll));
    let report = engine.run_cycle(&SyncMode::Full).unwrap();

    let deletion = report.deletion.unwrap();
    assert!(deletion.denied);
    assert_eq!(deletion.deleted, 0);
    fx.remote.staging.assert_exists("old.py");
    fx.remote.staging.assert_exists("a.py");
}

#[test]
fn dry_run_changes_nothing() {
    let fx = Fixture::new();
    fx.local.write("a.py", "");
    fx.remote.staging.write("old.py", "");

    let report = fx
        .local_engine()
        .run_cycle(&SyncMode::dry_run(SyncMode::Full))
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.plan.to_delete, set(&["old.py"]));
    fx.remote.staging.assert_exists("old.py");
    fx.remote.staging.assert_not_exists("a.py");
}

// =============================================================================
// Partial failures
// =============================================================================

#[test]
fn failed_upload_reports_partial_and_keeps_remote() {
    let fx = Fixture::new();
    fx.local.write("a.py", "");
    fx.remote.staging.write("a.py", "previous");

    let engine = fx.engine(Arc::new(FailingExecutor::failing_copies()), Arc::new(AssumeYes));
    let report = engine.run_cycle(&SyncMode::Full).unwrap();

    assert_eq!(report.outcome(), CycleOutcome::PartialFailure);
    assert_eq!(report.transferred(), 0);
    assert_eq!(fx.remote.staging.read("a.py"), "previous");
}

#[test]
fn failed_bridge_leaves_staging_updated() {
    let fx = Fixture::new();
    fx.local.write("a.py", "new");

    let engine = fx.engine(
        Arc::new(FailingExecutor::failing_commands_with("chmod -R")),
        Arc::new(AssumeYes),
    );
    let report = engine.run_cycle(&SyncMode::Full).unwrap();

    let transfer = report.transfer.as_ref().unwrap();
    assert!(transfer.partial);
    assert_eq!(report.transferred(), 1);
    assert_eq!(report.outcome(), CycleOutcome::PartialFailure);
    assert_eq!(fx.remote.staging.read("a.py"), "new");
}

#[test]
fn rerun_after_failure_converges() {
    let fx = Fixture::new();
    fx.local.write("a.py", "a");
    fx.remote.staging.write("old.py", "");

    let broken = fx.engine(Arc::new(FailingExecutor::failing_copies()), Arc::new(AssumeYes));
    broken.run_cycle(&SyncMode::Full).unwrap();

    let report = fx.local_engine().run_cycle(&SyncMode::Full).unwrap();
    assert_eq!(report.outcome(), CycleOutcome::Success);
    assert_eq!(fx.remote.container.read("a.py"), "a");
}

// =============================================================================
// Session lock
// =============================================================================

#[test]
fn second_session_on_same_target_is_refused() {
    let fx = Fixture::new();
    let key = fx.config().lock_key("localhost");

    let held = SessionLock::acquire_in(fx.remote.scratch.root(), &key).unwrap();
    let err = SessionLock::acquire_in(fx.remote.scratch.root(), &key).unwrap_err();
    assert!(matches!(err, devsync_fs::Error::LockHeld { .. }));

    drop(held);
    SessionLock::acquire_in(fx.remote.scratch.root(), &key).unwrap();
}
