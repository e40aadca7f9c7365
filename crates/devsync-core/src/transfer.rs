//! Moving a batch of local files to the staging directory and container
//!
//! A batch travels as one gzip tarball: staged locally, uploaded to a unique
//! remote temp path, extracted over the staging directory, then extracted a
//! second time into the container mount. Remote command lines never carry
//! the file names, so batch size is bounded only by the archive. Steps
//! before extraction are all-or-nothing; after
//! that the remote side may hold part of the batch and nothing is rolled
//! back, so re-running the sync is the recovery.

use std::collections::BTreeSet;
use std::fmt;

use devsync_fs::RelativePath;
use devsync_remote::{RemoteExecutor, best_effort, quote};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::config::{ContainerBridge, SyncConfig};
use crate::{Error, Result};

/// The step of a transfer that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStage {
    /// Building the local tarball
    Archive,
    /// Copying the tarball to the remote host
    Upload,
    /// Unpacking into the staging directory
    Extract,
    /// Copying from staging into the container mount
    Bridge,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Archive => "archive",
            Self::Upload => "upload",
            Self::Extract => "extract",
            Self::Bridge => "bridge",
        })
    }
}

/// One recorded failure: the operation, where it pointed, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferFailure {
    pub stage: TransferStage,
    pub target: String,
    pub message: String,
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.stage, self.target, self.message)
    }
}

/// What happened to one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    /// Files in the batch
    pub requested: usize,
    /// Files that reached the staging directory
    pub applied: usize,
    /// Some remote state was changed but the batch did not finish
    pub partial: bool,
    pub failures: Vec<TransferFailure>,
}

impl TransferReport {
    fn new(requested: usize) -> Self {
        Self {
            requested,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, stage: TransferStage, target: impl Into<String>, error: &Error) {
        let failure = TransferFailure {
            stage,
            target: target.into(),
            message: failure_message(error),
        };
        tracing::warn!(%stage, target = %failure.target, error = %failure.message, "transfer step failed");
        self.failures.push(failure);
    }
}

fn failure_message(error: &Error) -> String {
    match error {
        Error::TransferFailure { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Applies the `to_transfer` half of a plan.
pub struct TransferExecutor<'a> {
    config: &'a SyncConfig,
    executor: &'a dyn RemoteExecutor,
}

impl<'a> TransferExecutor<'a> {
    pub fn new(config: &'a SyncConfig, executor: &'a dyn RemoteExecutor) -> Self {
        Self { config, executor }
    }

    /// Send `files` to the staging directory and bridge them into the
    /// container. Failures are recorded in the report, never returned.
    pub fn apply(&self, files: &BTreeSet<RelativePath>) -> TransferReport {
        let mut report = TransferReport::new(files.len());
        if files.is_empty() {
            return report;
        }

        let archive = match self.stage_archive(files) {
            Ok(archive) => archive,
            Err(e) => {
                report.fail(TransferStage::Archive, self.config.local_root.display().to_string(), &e);
                return report;
            }
        };

        let remote_archive = format!(
            "{}/devsync-{}.tar.gz",
            self.config.remote_tmp.trim_end_matches('/'),
            Uuid::new_v4()
        );
        if let Err(e) = self.executor.copy_to(archive.path(), &remote_archive, false) {
            report.fail(TransferStage::Upload, &remote_archive, &e.into());
            return report;
        }

        self.unpack(&remote_archive, &mut report);
        best_effort(
            self.executor.run(&format!("rm -f {}", quote(&remote_archive))),
            "remove uploaded archive",
        );

        tracing::info!(
            requested = report.requested,
            applied = report.applied,
            partial = report.partial,
            "transfer finished"
        );
        report
    }

    /// Pack `files` into a gzip tarball, keyed by their relative paths.
    fn stage_archive(&self, files: &BTreeSet<RelativePath>) -> Result<NamedTempFile> {
        let archive_error = |message: String| Error::TransferFailure {
            stage: TransferStage::Archive,
            message,
        };

        let temp = tempfile::Builder::new()
            .prefix("devsync-")
            .suffix(".tar.gz")
            .tempfile()
            .map_err(|e| archive_error(format!("cannot create temp archive: {e}")))?;
        let handle = temp
            .as_file()
            .try_clone()
            .map_err(|e| archive_error(format!("cannot open temp archive: {e}")))?;

        let mut builder = tar::Builder::new(GzEncoder::new(handle, Compression::default()));
        builder.follow_symlinks(true);
        for file in files {
            let local = file.to_native_under(&self.config.local_root);
            builder
                .append_path_with_name(&local, file.as_str())
                .map_err(|e| archive_error(format!("{}: {e}", local.display())))?;
        }
        let encoder = builder
            .into_inner()
            .map_err(|e| archive_error(format!("cannot finish archive: {e}")))?;
        encoder
            .finish()
            .map_err(|e| archive_error(format!("cannot compress archive: {e}")))?;

        tracing::debug!(files = files.len(), archive = %temp.path().display(), "staged archive");
        Ok(temp)
    }

    /// Extract the uploaded archive into staging, then into the container
    /// mount. The archive must still exist on the remote side.
    fn unpack(&self, remote_archive: &str, report: &mut TransferReport) {
        if let Err(e) = self.extract(remote_archive) {
            report.partial = true;
            report.fail(TransferStage::Extract, &self.config.staging_path, &e);
            return;
        }
        report.applied = report.requested;

        if let Err(e) = self.bridge(remote_archive) {
            report.partial = true;
            report.fail(TransferStage::Bridge, &self.config.container_path, &e);
        }
    }

    fn extract(&self, remote_archive: &str) -> Result<()> {
        let staging = quote(&self.config.staging_path);
        let command = format!(
            "mkdir -p {staging} && tar -xzf {} -C {staging}",
            quote(remote_archive)
        );
        self.executor.run(&command)?;
        Ok(())
    }

    /// Unpack the same archive into the container mount and open up its
    /// permissions.
    fn bridge(&self, remote_archive: &str) -> Result<()> {
        let archive = quote(remote_archive);
        let mount = quote(&self.config.container_path);

        let command = if let Some((docker, container)) = self.config.bridge.docker() {
            let container = quote(container);
            format!(
                "{docker} exec {container} mkdir -p {mount} && \
                 {docker} exec -i {container} tar -xzf - -C {mount} < {archive} && \
                 {docker} exec {container} chmod -R a+rwX {mount}"
            )
        } else if self.config.bridge == ContainerBridge::HostCopy {
            format!("mkdir -p {mount} && tar -xzf {archive} -C {mount} && chmod -R a+rwX {mount}")
        } else {
            return Ok(());
        };
        self.executor.run(&command)?;
        Ok(())
    }
}
