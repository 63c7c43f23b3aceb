//! `docker` container runtime.
//!
//! ## Requirements
//!
//! - `docker` CLI must be installed and the daemon reachable

use serde::Deserialize;
use tracing::{debug, info};

use super::{ContainerInfo, ContainerRuntime, ContainerSpec};
use crate::core::process::Tool;
use crate::error::{RemoteError, Result};

/// Container runtime using the `docker` CLI.
#[derive(Debug, Clone)]
pub struct Docker {
    tool: Tool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Inspected {
    #[serde(default)]
    state: InspectedState,
    #[serde(default)]
    network_settings: InspectedNetworks,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct InspectedState {
    #[serde(default)]
    running: bool,
    #[serde(default)]
    error: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct InspectedNetworks {
    #[serde(default)]
    networks: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Docker {
    /// Locate `docker` on `PATH`.
    pub fn locate() -> Result<Self> {
        Ok(Self {
            tool: Tool::locate("docker")?,
        })
    }

    fn container(name: &str) -> String {
        format!("container/{}", name)
    }
}

/// `docker create` arguments for a spec.
fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "--name".to_string(),
        spec.name.clone(),
        format!("--restart={}", spec.restart.as_str()),
    ];
    for port in &spec.ports {
        let mapping = match &port.host_ip {
            Some(ip) => format!("{}:{}:{}", ip, port.host_port, port.container_port),
            None => format!("{}:{}", port.host_port, port.container_port),
        };
        args.extend(["--publish".to_string(), mapping]);
    }
    for (key, value) in &spec.env {
        args.extend(["--env".to_string(), format!("{}={}", key, value)]);
    }
    for (key, value) in &spec.labels {
        args.extend(["--label".to_string(), format!("{}={}", key, value)]);
    }
    for mount in &spec.mounts {
        let mut volume = format!("{}:{}", mount.source.display(), mount.target);
        if mount.read_only {
            volume.push_str(":ro");
        }
        args.extend(["--volume".to_string(), volume]);
    }
    if let Some(network) = &spec.network {
        args.push(format!("--network={}", network));
    }
    args.push(spec.image.clone());
    args.extend(spec.command.iter().cloned());
    args
}

fn parse_inspect(stdout: &str) -> Result<ContainerInfo> {
    let inspected: Inspected = serde_json::from_str(stdout.trim()).map_err(|e| {
        RemoteError::new("inspect", "container", format!("unreadable inspect output: {}", e))
    })?;
    let error = Some(inspected.state.error).filter(|e| !e.is_empty());
    let networks = inspected
        .network_settings
        .networks
        .map(|n| n.keys().cloned().collect())
        .unwrap_or_default();
    Ok(ContainerInfo {
        running: inspected.state.running,
        networks,
        error,
    })
}

impl ContainerRuntime for Docker {
    fn pull(&self, image: &str) -> Result<()> {
        info!(image, "pulling image");
        self.tool
            .run("pull", &format!("image/{}", image), ["pull", image], None)?;
        Ok(())
    }

    fn create(&self, spec: &ContainerSpec) -> Result<()> {
        debug!(name = %spec.name, image = %spec.image, "creating container");
        self.tool
            .run("create", &Self::container(&spec.name), create_args(spec), None)?;
        Ok(())
    }

    fn start(&self, name: &str) -> Result<()> {
        debug!(name, "starting container");
        self.tool
            .run("start", &Self::container(name), ["start", name], None)?;
        Ok(())
    }

    fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>> {
        let output = self
            .tool
            .capture(["container", "inspect", "--format", "{{json .}}", name], None)?;
        if !output.success {
            if output.stderr.contains("No such") {
                return Ok(None);
            }
            return Err(RemoteError::new(
                "inspect",
                Self::container(name),
                format!("docker failed: {}", output.stderr),
            )
            .into());
        }
        parse_inspect(&output.stdout).map(Some)
    }

    fn stop(&self, name: &str) -> Result<()> {
        debug!(name, "stopping container");
        self.tool
            .run("stop", &Self::container(name), ["stop", name], None)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        debug!(name, "removing container");
        self.tool
            .run("remove", &Self::container(name), ["rm", "--force", name], None)?;
        Ok(())
    }

    fn connect_network(&self, network: &str, container: &str) -> Result<()> {
        self.tool.run(
            "connect",
            &format!("network/{}", network),
            ["network", "connect", network, container],
            None,
        )?;
        Ok(())
    }

    fn disconnect_network(&self, network: &str, container: &str) -> Result<()> {
        self.tool.run(
            "disconnect",
            &format!("network/{}", network),
            ["network", "disconnect", network, container],
            None,
        )?;
        Ok(())
    }
}
