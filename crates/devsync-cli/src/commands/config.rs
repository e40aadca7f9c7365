//! Config command implementation

use colored::Colorize;
use devsync_core::ContainerBridge;

use crate::config::Settings;
use crate::error::{CliError, Result};

/// Show the resolved configuration
pub fn run_config_show(settings: &Settings, json: bool) -> Result<()> {
    let sync = &settings.sync;

    if json {
        let output = serde_json::json!({
            "source": settings.source.as_ref().map(|p| p.display().to_string()),
            "executor": settings.executor,
            "host": settings.host(),
            "gcloud": settings.gcloud.as_ref().map(|t| serde_json::json!({
                "vm": t.vm,
                "zone": t.zone,
                "project": t.project,
                "worker": t.worker,
            })),
            "sync": sync,
        });
        let text = serde_json::to_string_pretty(&output).map_err(|e| CliError::user(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    let source = settings
        .source
        .as_ref()
        .map_or_else(|| "defaults and environment".to_string(), |p| p.display().to_string());
    println!("{} {}", "Configuration from".bold(), source.dimmed());
    println!();
    println!("  {:<16} {}", "host".cyan(), settings.host());
    if let Some(target) = &settings.gcloud {
        println!("  {:<16} {}", "zone".cyan(), target.zone);
        println!("  {:<16} {}", "worker".cyan(), target.worker);
    }
    println!("  {:<16} {}", "local root".cyan(), sync.local_root.display());
    println!("  {:<16} {}", "staging path".cyan(), sync.staging_path);
    println!("  {:<16} {}", "container path".cyan(), sync.container_path);
    println!("  {:<16} {}", "remote tmp".cyan(), sync.remote_tmp);
    let bridge = match &sync.bridge {
        ContainerBridge::DockerExec { container, sudo: true } => format!("sudo docker exec {container}"),
        ContainerBridge::DockerExec { container, sudo: false } => format!("docker exec {container}"),
        ContainerBridge::HostCopy => "host copy".to_string(),
        ContainerBridge::Disabled => "none (staging is the mount)".to_string(),
    };
    println!("  {:<16} {}", "bridge".cyan(), bridge);
    Ok(())
}
