//! Sync planning and execution for devsync
//!
//! Keeps a remote staging directory and a container mount consistent with a
//! local source tree. The local tree is the source of truth: one cycle lists
//! all three locations, plans the difference, sends what is local and removes
//! what is not.
//!
//! # Components
//!
//! - [`PathResolver`]: target to local / staging / container paths
//! - [`ManifestBuilder`]: what files exist where
//! - [`DiffEngine`]: manifests plus [`SyncMode`] to [`SyncPlan`]
//! - [`TransferExecutor`]: archive, upload, extract, bridge
//! - [`DeletionExecutor`]: confirmed removal of remote leftovers
//! - [`SyncEngine`]: one full cycle over the above
//! - [`watch`]: debounced re-sync on local changes

pub mod config;
pub mod deletion;
pub mod diff;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod resolve;
pub mod runtime;
pub mod transfer;
pub mod watch;

pub use config::{ContainerBridge, SyncConfig};
pub use deletion::{AssumeYes, Confirm, DeletionExecutor, DeletionReport, DenyAll};
pub use diff::{DiffEngine, SyncMode, SyncPlan};
pub use engine::{CycleOutcome, CycleReport, SyncEngine};
pub use error::{Error, Result};
pub use manifest::{FileEntry, Manifest, ManifestBuilder, Origin};
pub use resolve::{MountPoint, PathResolver, Target};
pub use runtime::ContainerRuntime;
pub use transfer::{TransferExecutor, TransferFailure, TransferReport, TransferStage};
