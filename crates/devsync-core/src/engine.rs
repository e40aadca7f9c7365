//! One sync cycle: resolve, list, diff, transfer, delete

use std::sync::Arc;

use devsync_remote::RemoteExecutor;
use serde::Serialize;

use crate::config::SyncConfig;
use crate::deletion::{Confirm, DeletionExecutor, DeletionReport};
use crate::diff::{DiffEngine, SyncMode, SyncPlan};
use crate::manifest::{Manifest, ManifestBuilder, Origin, build_local};
use crate::resolve::PathResolver;
use crate::runtime::ContainerRuntime;
use crate::transfer::{TransferExecutor, TransferReport};
use crate::{Error, Result};

/// How a finished cycle should be judged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    Success,
    PartialFailure,
}

/// Everything one cycle decided and did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub plan: SyncPlan,
    pub dry_run: bool,
    /// `None` for dry runs
    pub transfer: Option<TransferReport>,
    /// `None` for dry runs and when nothing was due for deletion
    pub deletion: Option<DeletionReport>,
}

impl CycleReport {
    pub fn transferred(&self) -> usize {
        self.transfer.as_ref().map_or(0, |t| t.applied)
    }

    pub fn deleted(&self) -> usize {
        self.deletion.as_ref().map_or(0, |d| d.deleted)
    }

    pub fn failed(&self) -> usize {
        let transfer = self.transfer.as_ref().map_or(0, |t| t.failures.len());
        let deletion = self.deletion.as_ref().map_or(0, |d| d.failures.len());
        transfer + deletion
    }

    pub fn outcome(&self) -> CycleOutcome {
        let partial = self.transfer.as_ref().is_some_and(|t| t.partial);
        if self.failed() > 0 || partial {
            CycleOutcome::PartialFailure
        } else {
            CycleOutcome::Success
        }
    }
}

/// Owns the configuration and collaborators for repeated sync cycles.
///
/// Cheap to clone; the watch loop hands clones to blocking tasks.
#[derive(Clone)]
pub struct SyncEngine {
    config: Arc<SyncConfig>,
    executor: Arc<dyn RemoteExecutor>,
    confirm: Arc<dyn Confirm>,
}

impl SyncEngine {
    pub fn new(config: SyncConfig, executor: Arc<dyn RemoteExecutor>, confirm: Arc<dyn Confirm>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            executor,
            confirm,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn executor(&self) -> &dyn RemoteExecutor {
        self.executor.as_ref()
    }

    pub fn runtime(&self) -> ContainerRuntime<'_> {
        ContainerRuntime::new(&self.config, self.executor.as_ref())
    }

    /// Compute the plan for `mode` without changing anything remotely.
    pub fn plan(&self, mode: &SyncMode) -> Result<SyncPlan> {
        self.plan_with_local(mode).map(|(plan, _)| plan)
    }

    /// Plan and, unless `mode` is a dry run, apply.
    pub fn run_cycle(&self, mode: &SyncMode) -> Result<CycleReport> {
        let (plan, local) = self.plan_with_local(mode)?;

        if mode.is_dry_run() {
            tracing::info!(
                transfer = plan.to_transfer.len(),
                delete = plan.to_delete.len(),
                "dry run, nothing applied"
            );
            return Ok(CycleReport {
                plan,
                dry_run: true,
                transfer: None,
                deletion: None,
            });
        }

        let transfer = TransferExecutor::new(&self.config, self.executor.as_ref()).apply(&plan.to_transfer);

        let deletion = if plan.to_delete.is_empty() {
            None
        } else {
            let executor = DeletionExecutor::new(&self.config, self.executor.as_ref(), self.confirm.as_ref());
            Some(executor.apply(&plan.to_delete, &local)?)
        };

        let report = CycleReport {
            plan,
            dry_run: false,
            transfer: Some(transfer),
            deletion,
        };
        tracing::info!(
            host = %self.executor.describe(),
            transferred = report.transferred(),
            deleted = report.deleted(),
            failed = report.failed(),
            "sync cycle finished"
        );
        Ok(report)
    }

    fn plan_with_local(&self, mode: &SyncMode) -> Result<(SyncPlan, Manifest)> {
        // Targets are checked before any remote call
        if let SyncMode::Selective(targets) = mode.planning_mode() {
            let resolver = PathResolver::new(&self.config);
            for target in targets {
                resolver.resolve(target)?;
            }
        }

        let local = build_local(&self.config.local_root)?;
        let remote = if mode.is_full() {
            self.remote_manifest()?
        } else {
            Manifest::new(Origin::Remote)
        };

        let plan = DiffEngine::new().diff(&local, &remote, mode)?;
        Ok((plan, local))
    }

    /// Union of what staging and the container hold. A root that does not
    /// exist yet counts as empty.
    fn remote_manifest(&self) -> Result<Manifest> {
        let builder = ManifestBuilder::new(&self.config);
        let executor = self.executor.as_ref();

        let staging = or_empty(builder.build(Origin::Remote, executor), Origin::Remote)?;
        if !self.config.bridge.is_enabled() {
            return Ok(staging);
        }
        let container = or_empty(builder.build(Origin::Container, executor), Origin::Container)?;
        Ok(staging.merged(&container))
    }
}

fn or_empty(result: Result<Manifest>, origin: Origin) -> Result<Manifest> {
    match result {
        Err(Error::ManifestUnavailable { root, .. }) => {
            tracing::info!(%origin, root, "remote root missing, treating as empty");
            Ok(Manifest::new(origin))
        }
        other => other,
    }
}
