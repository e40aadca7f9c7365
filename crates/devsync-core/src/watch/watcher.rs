//! Filesystem change sources: native notifications or periodic snapshots

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use devsync_fs::NormalizedPath;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use walkdir::WalkDir;

use crate::{Error, Result};

/// Capacity of the change channel. Overflow is dropped: one pending event
/// is enough to arm the debounce.
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// Something changed at `path` under the watched root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// A source of change events for a directory tree.
pub trait FileWatcher: Send {
    /// Start observing `root` recursively. Events stop when the watcher is
    /// dropped.
    fn watch(&mut self, root: &Path) -> Result<mpsc::Receiver<ChangeEvent>>;

    fn name(&self) -> &'static str;
}

/// Native notifications through the `notify` crate (inotify, FSEvents,
/// ReadDirectoryChanges).
#[derive(Default)]
pub struct NotifyWatcher {
    watcher: Option<RecommendedWatcher>,
}

impl NotifyWatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileWatcher for NotifyWatcher {
    fn watch(&mut self, root: &Path) -> Result<mpsc::Receiver<ChangeEvent>> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let roots = watch_roots(root);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for change in classify(&roots, &event) {
                        let _ = tx.try_send(change);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "file watcher error"),
            },
            Config::default(),
        )
        .map_err(|e| Error::WatchFailed {
            message: format!("cannot create native watcher: {e}"),
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| Error::WatchFailed {
                message: format!("cannot watch {}: {e}", root.display()),
            })?;

        tracing::info!(root = %root.display(), "watching with native notifications");
        self.watcher = Some(watcher);
        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

/// The root as given plus its canonical form, since notification paths
/// may come back resolved.
fn watch_roots(root: &Path) -> Vec<PathBuf> {
    let mut roots = vec![root.to_path_buf()];
    if let Ok(canonical) = NormalizedPath::new(root).canonicalize() {
        let canonical = canonical.to_native();
        if canonical != root {
            roots.push(canonical);
        }
    }
    roots
}

/// Map a notify event to change events, dropping access events and
/// anything under a hidden path.
pub(crate) fn classify(roots: &[PathBuf], event: &Event) -> Vec<ChangeEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter(|path| !is_hidden_under(roots, path))
        .map(|path| ChangeEvent {
            path: path.clone(),
            kind,
        })
        .collect()
}

fn is_hidden_under(roots: &[PathBuf], path: &Path) -> bool {
    let relative = roots
        .iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);
    relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

/// Size and modification time of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

pub type Snapshot = BTreeMap<PathBuf, FileStamp>;

/// Compares snapshots of the tree on a fixed interval. Works anywhere,
/// including network mounts where native notifications are missing.
#[derive(Debug, Clone)]
pub struct PollingWatcher {
    interval: Duration,
}

impl PollingWatcher {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl FileWatcher for PollingWatcher {
    /// Must be called from within a tokio runtime.
    fn watch(&mut self, root: &Path) -> Result<mpsc::Receiver<ChangeEvent>> {
        if self.interval.is_zero() {
            return Err(Error::WatchFailed {
                message: "polling interval must be greater than zero".to_string(),
            });
        }
        let handle = tokio::runtime::Handle::try_current().map_err(|e| Error::WatchFailed {
            message: format!("polling watcher needs a tokio runtime: {e}"),
        })?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let interval = self.interval;
        tracing::info!(root = %root.display(), interval_ms = interval.as_millis() as u64, "watching by polling");

        let root = root.to_path_buf();
        let mut previous = snapshot(&root);

        handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let scan_root = root.clone();
                let Ok(current) = tokio::task::spawn_blocking(move || snapshot(&scan_root)).await else {
                    tracing::warn!(root = %root.display(), "snapshot task failed");
                    continue;
                };
                for change in compare(&previous, &current) {
                    if tx.send(change).await.is_err() {
                        return;
                    }
                }
                previous = current;
            }
        });

        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "polling"
    }
}

/// Stamp every non-hidden regular file under `root`. Unreadable entries are
/// skipped; a missing root gives an empty snapshot.
pub fn snapshot(root: &Path) -> Snapshot {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            let stamp = FileStamp {
                modified: metadata.modified().ok(),
                len: metadata.len(),
            };
            Some((entry.into_path(), stamp))
        })
        .collect()
}

/// Changes that turn `previous` into `current`.
pub fn compare(previous: &Snapshot, current: &Snapshot) -> Vec<ChangeEvent> {
    let mut changes = Vec::new();
    for (path, stamp) in current {
        match previous.get(path) {
            None => changes.push(ChangeEvent {
                path: path.clone(),
                kind: ChangeKind::Created,
            }),
            Some(old) if old != stamp => changes.push(ChangeEvent {
                path: path.clone(),
                kind: ChangeKind::Modified,
            }),
            Some(_) => {}
        }
    }
    for path in previous.keys().filter(|path| !current.contains_key(*path)) {
        changes.push(ChangeEvent {
            path: path.clone(),
            kind: ChangeKind::Removed,
        });
    }
    changes
}

/// Start the preferred watcher for `root`, falling back to polling when
/// native notifications are unavailable.
pub fn start_watching(
    root: &Path,
    prefer_polling: bool,
    poll_interval: Duration,
) -> Result<(Box<dyn FileWatcher>, mpsc::Receiver<ChangeEvent>)> {
    if !prefer_polling {
        let mut native = NotifyWatcher::new();
        match native.watch(root) {
            Ok(events) => return Ok((Box::new(native), events)),
            Err(e) => tracing::warn!(error = %e, "native watching unavailable, falling back to polling"),
        }
    }

    let mut polling = PollingWatcher::new(poll_interval);
    let events = polling.watch(root)?;
    Ok((Box::new(polling), events))
}
