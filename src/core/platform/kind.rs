//! `kind` cluster provisioner.
//!
//! ## Requirements
//!
//! - `kind` CLI must be installed
//! - A container runtime `kind` can drive must be running

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use super::{seconds, ClusterProvisioner};
use crate::core::process::Tool;
use crate::error::Result;

/// Cluster provisioner using the `kind` CLI.
#[derive(Debug, Clone)]
pub struct Kind {
    tool: Tool,
}

impl Kind {
    /// Locate `kind` on `PATH`.
    pub fn locate() -> Result<Self> {
        Ok(Self {
            tool: Tool::locate("kind")?,
        })
    }
}

impl ClusterProvisioner for Kind {
    fn list(&self) -> Result<Vec<String>> {
        let stdout = self
            .tool
            .run("list", "clusters", ["get", "clusters"], None)?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn create(
        &self,
        name: &str,
        raw_config: &str,
        node_image: &str,
        ready_timeout: Duration,
        kubeconfig: &Path,
    ) -> Result<()> {
        info!(name, node_image, "creating cluster");
        let kubeconfig = kubeconfig.display().to_string();
        let wait = seconds(ready_timeout);
        self.tool.run(
            "create",
            &format!("cluster/{}", name),
            [
                "create",
                "cluster",
                "--name",
                name,
                "--config",
                "-",
                "--image",
                node_image,
                "--wait",
                wait.as_str(),
                "--kubeconfig",
                kubeconfig.as_str(),
            ],
            Some(raw_config.as_bytes()),
        )?;
        debug!(name, "cluster ready");
        Ok(())
    }

    fn delete(&self, name: &str, kubeconfig: &Path) -> Result<()> {
        info!(name, "deleting cluster");
        let kubeconfig = kubeconfig.display().to_string();
        self.tool.run(
            "delete",
            &format!("cluster/{}", name),
            [
                "delete",
                "cluster",
                "--name",
                name,
                "--kubeconfig",
                kubeconfig.as_str(),
            ],
            None,
        )?;
        Ok(())
    }
}
