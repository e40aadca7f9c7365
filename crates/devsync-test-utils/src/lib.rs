//! Shared test utilities for the devsync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`tree`]: [`TestTree`] builder for local source trees and fake remote roots
//! - [`executor`]: executors that record or fail remote calls

pub mod executor;
pub mod tree;

pub use executor::{FailingExecutor, RecordingExecutor};
pub use tree::{TestRemote, TestTree};
