//! Continuous synchronization
//!
//! A [`FileWatcher`] turns filesystem activity under the local root into a
//! stream of [`ChangeEvent`]s. The [`WatchScheduler`] debounces that stream
//! and runs one sync cycle per quiet period, one cycle at a time.

pub mod scheduler;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

pub use scheduler::{EngineCycle, WatchCycle, WatchScheduler, WatchStats};
pub use watcher::{ChangeEvent, ChangeKind, FileWatcher, NotifyWatcher, PollingWatcher, start_watching};

/// Quiet period after the last event before a cycle runs
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Snapshot interval of the polling watcher
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Where the scheduler is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchState {
    Idle,
    Syncing,
    Watching,
    Stopped,
}

/// The live watch: what is observed, how events are debounced, and
/// whether the loop is still running.
#[derive(Debug, Clone)]
pub struct WatchSession {
    root: PathBuf,
    debounce: Duration,
    restart_after_sync: bool,
    running: Arc<AtomicBool>,
}

impl WatchSession {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            debounce: DEFAULT_DEBOUNCE,
            restart_after_sync: false,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_restart_after_sync(mut self, restart: bool) -> Self {
        self.restart_after_sync = restart;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn restart_after_sync(&self) -> bool {
        self.restart_after_sync
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

/// Asks a running scheduler to stop at its next transition.
#[derive(Debug, Clone)]
pub struct StopHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        // receiver gone means the scheduler already finished
        let _ = self.sender.send(true);
    }
}

/// Create a stop handle and the receiver a [`WatchScheduler`] listens on.
pub fn stop_channel() -> (StopHandle, watch::Receiver<bool>) {
    let (sender, receiver) = watch::channel(false);
    (
        StopHandle {
            sender: Arc::new(sender),
        },
        receiver,
    )
}
