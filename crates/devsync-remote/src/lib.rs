//! Remote execution for devsync
//!
//! Everything that leaves this machine goes through a [`RemoteExecutor`]:
//! running a shell command on the remote host and copying files to or
//! from it. Two implementations ship with the crate:
//!
//! - [`GcloudExecutor`] talks to a TPU VM through `gcloud compute tpus tpu-vm`
//! - [`LocalExecutor`] treats this machine as the remote host
//!
//! Executors never retry. Callers decide, and secondary commands whose
//! failure should not abort anything go through [`best_effort`].

pub mod error;
pub mod executor;
pub mod gcloud;
pub mod local;
pub mod quote;

pub use error::{RemoteError, Result};
pub use executor::{CommandOutput, RemoteExecutor, best_effort};
pub use gcloud::{GcloudExecutor, GcloudTarget};
pub use local::LocalExecutor;
pub use quote::{quote, quote_all};
