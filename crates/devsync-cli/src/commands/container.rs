//! Restart and prune command implementations

use colored::Colorize;
use devsync_core::ContainerRuntime;

use crate::config::Settings;
use crate::error::Result;

/// Run the restart command
pub fn run_restart(settings: &Settings) -> Result<()> {
    let executor = settings.build_executor();
    ContainerRuntime::new(&settings.sync, executor.as_ref()).restart()?;
    println!("{} Restarted container on {}", "OK".green().bold(), settings.host().cyan());
    Ok(())
}

/// Run the prune command
pub fn run_prune(settings: &Settings) -> Result<()> {
    let executor = settings.build_executor();
    let summary = ContainerRuntime::new(&settings.sync, executor.as_ref()).prune()?;
    println!("{} Pruned container storage on {}", "OK".green().bold(), settings.host().cyan());
    if !summary.is_empty() {
        println!("{}", summary.dimmed());
    }
    Ok(())
}
