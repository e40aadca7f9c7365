//! Command implementations for devsync-cli

pub mod config;
pub mod container;
pub mod init;
pub mod sync;

pub use config::run_config_show;
pub use container::{run_prune, run_restart};
pub use init::run_init;
pub use sync::{run_plan, run_sync};
