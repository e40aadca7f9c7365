//! Watch mode against a local "remote"
//!
//! Cycles run the real engine on blocking threads, so these tests use the
//! multi-threaded runtime and wall-clock time.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use devsync_core::watch::{ChangeEvent, ChangeKind, EngineCycle, WatchScheduler, WatchSession, start_watching, stop_channel};
use devsync_core::{AssumeYes, ContainerBridge, SyncConfig, SyncEngine, SyncMode, Target};
use devsync_fs::RelativePath;
use devsync_remote::LocalExecutor;
use devsync_test_utils::{TestRemote, TestTree};
use tokio::sync::mpsc;

// =============================================================================
// Helpers
// =============================================================================

fn engine(local: &TestTree, remote: &TestRemote) -> SyncEngine {
    let config = SyncConfig::new(local.root())
        .with_staging_path(remote.staging_path())
        .with_container_path(remote.container_path())
        .with_remote_tmp(remote.scratch_path())
        .with_bridge(ContainerBridge::HostCopy);
    SyncEngine::new(config, Arc::new(LocalExecutor::new()), Arc::new(AssumeYes)).unwrap()
}

fn session(root: &Path) -> WatchSession {
    WatchSession::new(root).with_debounce(Duration::from_millis(20))
}

async fn wait_for(path: &Path) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn initial_cycle_then_flush_on_close() {
    let local = TestTree::new().with_file("a.py", "a");
    let remote = TestRemote::new();
    remote.staging.write("old.py", "");

    let cycle = Arc::new(EngineCycle::new(engine(&local, &remote), SyncMode::Full));
    let scheduler = WatchScheduler::new(session(local.root()), cycle);
    let (events_tx, events_rx) = mpsc::channel(8);
    let (_stop, stop_rx) = stop_channel();

    local.write("b.py", "b");
    local.remove("a.py");
    events_tx
        .send(ChangeEvent {
            path: local.path("b.py"),
            kind: ChangeKind::Created,
        })
        .await
        .unwrap();
    drop(events_tx);

    let stats = scheduler.run(events_rx, stop_rx).await.unwrap();

    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.failures, 0);
    remote.container.assert_exists("b.py");
    remote.container.assert_not_exists("a.py");
    remote.staging.assert_not_exists("old.py");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn polling_watcher_picks_up_new_file() {
    let local = TestTree::new().with_file("a.py", "a");
    let remote = TestRemote::new();

    let (_watcher, events) = start_watching(local.root(), true, Duration::from_millis(20)).unwrap();
    let cycle = Arc::new(EngineCycle::new(engine(&local, &remote), SyncMode::Full));
    let (stop, stop_rx) = stop_channel();
    let task = tokio::spawn(WatchScheduler::new(session(local.root()), cycle).run(events, stop_rx));

    assert!(wait_for(&remote.container.path("a.py")).await, "initial cycle did not land");
    local.write("models/bert.py", "bert");
    assert!(
        wait_for(&remote.container.path("models/bert.py")).await,
        "change was not synced"
    );

    stop.stop();
    let stats = task.await.unwrap().unwrap();
    assert!(stats.cycles >= 2);
    assert_eq!(remote.container.read("models/bert.py"), "bert");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn selective_watch_starts_with_full_sync() {
    let local = TestTree::new().with_file("a.py", "a").with_file("b.py", "b");
    let remote = TestRemote::new();
    remote.staging.write("old.py", "");

    let mode = SyncMode::Selective(vec![Target::File(RelativePath::new("a.py").unwrap())]);
    let cycle = Arc::new(EngineCycle::new(engine(&local, &remote), mode));
    let (_events_tx, events_rx) = mpsc::channel::<ChangeEvent>(8);
    let (stop, stop_rx) = stop_channel();
    stop.stop();

    let stats = WatchScheduler::new(session(local.root()), cycle)
        .run(events_rx, stop_rx)
        .await
        .unwrap();

    assert_eq!(stats.cycles, 1);
    remote.container.assert_exists("a.py");
    remote.container.assert_exists("b.py");
    remote.staging.assert_not_exists("old.py");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_before_changes_runs_only_initial_cycle() {
    let local = TestTree::new().with_file("a.py", "a");
    let remote = TestRemote::new();

    let cycle = Arc::new(EngineCycle::new(engine(&local, &remote), SyncMode::Full));
    let (_events_tx, events_rx) = mpsc::channel::<ChangeEvent>(8);
    let (stop, stop_rx) = stop_channel();
    stop.stop();

    let stats = WatchScheduler::new(session(local.root()), cycle)
        .run(events_rx, stop_rx)
        .await
        .unwrap();

    assert_eq!(stats.cycles, 1);
    remote.staging.assert_exists("a.py");
}
