//! The debounced watch loop

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::{ChangeEvent, WatchSession, WatchState};
use crate::diff::SyncMode;
use crate::engine::{CycleOutcome, CycleReport, SyncEngine};
use crate::{Error, Result};

/// What the scheduler runs on each quiet period.
///
/// Called from a blocking thread; implementations may block freely.
pub trait WatchCycle: Send + Sync + 'static {
    fn sync(&self) -> Result<CycleReport>;

    /// The cycle run once before watching starts.
    fn initial_sync(&self) -> Result<CycleReport> {
        self.sync()
    }

    fn restart(&self) -> Result<()>;
}

/// Runs a [`SyncEngine`] cycle in a fixed mode. The initial cycle is always
/// a full sync so the remote starts out matching the whole tree.
pub struct EngineCycle {
    engine: SyncEngine,
    mode: SyncMode,
}

impl EngineCycle {
    pub fn new(engine: SyncEngine, mode: SyncMode) -> Self {
        Self { engine, mode }
    }
}

impl WatchCycle for EngineCycle {
    fn sync(&self) -> Result<CycleReport> {
        self.engine.run_cycle(&self.mode)
    }

    fn initial_sync(&self) -> Result<CycleReport> {
        let mode = if self.mode.is_dry_run() {
            SyncMode::dry_run(SyncMode::Full)
        } else {
            SyncMode::Full
        };
        self.engine.run_cycle(&mode)
    }

    fn restart(&self) -> Result<()> {
        self.engine.runtime().restart()
    }
}

/// Counters for a finished watch session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Cycles run, including the initial one
    pub cycles: usize,
    /// Cycles that returned an error
    pub failures: usize,
    /// Cycles that completed with some files failed
    pub partial: usize,
}

/// Drives `Idle -> Syncing -> Watching -> Syncing -> ... -> Stopped`.
pub struct WatchScheduler<C: WatchCycle> {
    session: WatchSession,
    cycle: Arc<C>,
    state: WatchState,
    stats: WatchStats,
}

impl<C: WatchCycle> WatchScheduler<C> {
    pub fn new(session: WatchSession, cycle: Arc<C>) -> Self {
        Self {
            session,
            cycle,
            state: WatchState::Idle,
            stats: WatchStats::default(),
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Run until `stop` flips to true, its sender is dropped, or `events`
    /// closes. An initial cycle always runs first. A stop request is only
    /// observed between cycles; a running cycle always completes.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ChangeEvent>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<WatchStats> {
        self.session.set_running(true);
        let result = self.event_loop(&mut events, &mut stop).await;
        self.transition(WatchState::Stopped);
        self.session.set_running(false);
        tracing::info!(
            cycles = self.stats.cycles,
            failures = self.stats.failures,
            "watch stopped"
        );
        result.map(|()| self.stats)
    }

    async fn event_loop(
        &mut self,
        events: &mut mpsc::Receiver<ChangeEvent>,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        self.run_cycle(true).await?;

        let debounce = self.session.debounce();
        let mut deadline: Option<Instant> = None;

        loop {
            if *stop.borrow() {
                return Ok(());
            }
            self.transition(WatchState::Watching);

            tokio::select! {
                biased;

                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        return Ok(());
                    }
                }

                event = events.recv() => match event {
                    Some(event) => {
                        tracing::debug!(path = %event.path.display(), kind = ?event.kind, "change detected");
                        deadline = Some(Instant::now() + debounce);
                    }
                    None => {
                        if deadline.take().is_some() {
                            self.run_cycle(false).await?;
                        }
                        tracing::info!("change stream closed");
                        return Ok(());
                    }
                },

                _ = async {
                    match deadline {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    deadline = None;
                    self.run_cycle(false).await?;
                }
            }
        }
    }

    /// Run one cycle on a blocking thread and wait for it. Cycle errors are
    /// logged and counted; only a crashed cycle task ends the loop.
    async fn run_cycle(&mut self, initial: bool) -> Result<()> {
        self.transition(WatchState::Syncing);

        let cycle = Arc::clone(&self.cycle);
        let restart = self.session.restart_after_sync();
        let joined = tokio::task::spawn_blocking(move || {
            let report = if initial { cycle.initial_sync()? } else { cycle.sync()? };
            if restart {
                cycle.restart()?;
            }
            Ok::<_, Error>(report)
        })
        .await
        .map_err(|e| Error::WatchFailed {
            message: format!("sync cycle task failed: {e}"),
        })?;

        self.stats.cycles += 1;
        match joined {
            Ok(report) => {
                if report.outcome() == CycleOutcome::PartialFailure {
                    self.stats.partial += 1;
                    tracing::warn!(failed = report.failed(), "sync cycle finished with failures");
                }
            }
            Err(e) => {
                self.stats.failures += 1;
                tracing::error!(error = %e, "sync cycle failed, still watching");
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: WatchState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "watch state");
            self.state = next;
        }
    }
}
