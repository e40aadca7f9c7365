//! Container lifecycle commands that sit beside the sync itself

use devsync_remote::{RemoteExecutor, quote};

use crate::config::SyncConfig;
use crate::{Error, Result};

/// Restarts the container and reclaims docker storage on the remote host.
pub struct ContainerRuntime<'a> {
    config: &'a SyncConfig,
    executor: &'a dyn RemoteExecutor,
}

impl<'a> ContainerRuntime<'a> {
    pub fn new(config: &'a SyncConfig, executor: &'a dyn RemoteExecutor) -> Self {
        Self { config, executor }
    }

    /// Restart the configured container so it picks up synchronized code.
    pub fn restart(&self) -> Result<()> {
        let Some((docker, container)) = self.config.bridge.docker() else {
            return Err(Error::config("container restart requires a docker bridge with a container name"));
        };
        tracing::info!(container, host = %self.executor.describe(), "restarting container");
        self.executor.run(&format!("{docker} restart {}", quote(container)))?;
        Ok(())
    }

    /// Remove stopped containers, dangling images and unused networks.
    /// Returns docker's own summary.
    pub fn prune(&self) -> Result<String> {
        let docker = self.config.bridge.docker().map_or("sudo docker", |(docker, _)| docker);
        tracing::info!(host = %self.executor.describe(), "pruning container storage");
        let output = self.executor.run(&format!("{docker} system prune -f"))?;
        Ok(output.stdout.trim().to_string())
    }
}
