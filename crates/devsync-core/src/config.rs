//! Explicit configuration for one sync target
//!
//! Built by the front end (CLI flags, environment, config file) and handed
//! to every component by reference. The core never reads configuration
//! sources itself.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default local tree, relative to the working directory
pub const DEFAULT_LOCAL_ROOT: &str = "src";
/// Default staging directory on the remote host
pub const DEFAULT_STAGING_PATH: &str = "~/src";
/// Default mount point inside the container
pub const DEFAULT_CONTAINER_PATH: &str = "/app/src";
/// Default remote directory for uploaded archives
pub const DEFAULT_REMOTE_TMP: &str = "/tmp";

/// How files get from the staging directory into the container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerBridge {
    /// The container is a separate namespace; stream files in with `docker exec`
    DockerExec {
        container: String,
        #[serde(default = "default_sudo")]
        sudo: bool,
    },
    /// The container path is visible on the host filesystem
    HostCopy,
    /// Staging is bind-mounted as the container path; nothing to bridge
    Disabled,
}

fn default_sudo() -> bool {
    true
}

impl ContainerBridge {
    /// Docker command prefix and container name, when docker is involved.
    pub(crate) fn docker(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::DockerExec { container, sudo } => {
                let prefix = if *sudo { "sudo docker" } else { "docker" };
                Some((prefix, container.as_str()))
            }
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// Paths and bridge settings for one local tree and its remote mirrors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Local source tree; the source of truth
    pub local_root: PathBuf,
    /// Staging directory on the remote host
    pub staging_path: String,
    /// Mount point inside the container
    pub container_path: String,
    pub bridge: ContainerBridge,
    /// Remote directory that receives upload archives
    pub remote_tmp: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from(DEFAULT_LOCAL_ROOT),
            staging_path: DEFAULT_STAGING_PATH.to_string(),
            container_path: DEFAULT_CONTAINER_PATH.to_string(),
            bridge: ContainerBridge::Disabled,
            remote_tmp: DEFAULT_REMOTE_TMP.to_string(),
        }
    }
}

impl SyncConfig {
    pub fn new(local_root: impl Into<PathBuf>) -> Self {
        Self {
            local_root: local_root.into(),
            ..Self::default()
        }
    }

    pub fn with_staging_path(mut self, path: impl Into<String>) -> Self {
        self.staging_path = path.into();
        self
    }

    pub fn with_container_path(mut self, path: impl Into<String>) -> Self {
        self.container_path = path.into();
        self
    }

    pub fn with_bridge(mut self, bridge: ContainerBridge) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn with_remote_tmp(mut self, path: impl Into<String>) -> Self {
        self.remote_tmp = path.into();
        self
    }

    /// Reject configurations that would make remote commands operate on
    /// the wrong directory.
    pub fn validate(&self) -> Result<()> {
        if self.local_root.as_os_str().is_empty() {
            return Err(Error::config("local root is empty"));
        }
        for (name, value) in [
            ("staging path", &self.staging_path),
            ("container path", &self.container_path),
            ("remote tmp", &self.remote_tmp),
        ] {
            let trimmed = value.trim().trim_end_matches('/');
            if trimmed.is_empty() || trimmed == "~" {
                return Err(Error::config(format!("{name} '{value}' would target a root or home directory")));
            }
            if value.split('/').any(|segment| segment == "..") {
                return Err(Error::config(format!("{name} '{value}' must not contain '..'")));
            }
        }
        if let ContainerBridge::DockerExec { container, .. } = &self.bridge
            && container.trim().is_empty()
        {
            return Err(Error::config("docker bridge requires a container name"));
        }
        if self.bridge == ContainerBridge::HostCopy
            && self.container_path.trim_end_matches('/') == self.staging_path.trim_end_matches('/')
        {
            return Err(Error::config("host copy bridge needs a container path distinct from staging"));
        }
        Ok(())
    }

    /// Key identifying this target for the session lock.
    pub fn lock_key(&self, host: &str) -> String {
        format!("{}:{}", host, self.staging_path)
    }
}
