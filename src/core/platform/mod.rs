//! Platform collaborators.
//!
//! Narrow interfaces onto the systems the bootstrap drives: the local
//! cluster provisioner, the package-deployment engine, and the container
//! runtime. Each has a shell-out implementation:
//!
//! - [`Kind`]: `kind` for cluster lifecycle
//! - [`Kapp`]: `kapp` for package deployment
//! - [`Docker`]: `docker` for containers and networks
//!
//! ## Adding a New Backend
//!
//! 1. Implement the trait for the new tool
//! 2. Add the implementation in a new file
//! 3. Re-export from this module

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

mod docker;
mod kapp;
mod kind;

pub use docker::Docker;
pub use kapp::Kapp;
pub use kind::Kind;

/// Creates and deletes local clusters.
pub trait ClusterProvisioner {
    /// Names of existing clusters.
    fn list(&self) -> Result<Vec<String>>;

    /// Create a cluster from a rendered cluster config and wait for it.
    fn create(
        &self,
        name: &str,
        raw_config: &str,
        node_image: &str,
        ready_timeout: Duration,
        kubeconfig: &Path,
    ) -> Result<()>;

    fn delete(&self, name: &str, kubeconfig: &Path) -> Result<()>;
}

/// Where a deployment's manifests come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Url(String),
    Path(PathBuf),
    /// A generated document, passed on stdin.
    Inline { name: String, contents: String },
}

/// One application deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub app: String,
    pub namespace: String,
    pub sources: Vec<ManifestSource>,
    pub wait_timeout: Duration,
    pub wait_concurrency: u32,
    pub apply_concurrency: u32,
    /// Time allowed for applying all changes.
    pub apply_budget: Duration,
}

/// Deploys applications into a cluster; deploying an unchanged app is a no-op.
pub trait PackageDeployer {
    fn deploy(&self, deployment: &Deployment, kubeconfig: &Path) -> Result<()>;
}

/// A host-to-container port mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub host_ip: Option<String>,
    pub host_port: u16,
    pub container_port: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    #[default]
    No,
    Always,
    UnlessStopped,
}

impl RestartPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Always => "always",
            Self::UnlessStopped => "unless-stopped",
        }
    }
}

/// A host file or directory mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

/// What to run in a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub ports: Vec<PortBinding>,
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub mounts: Vec<Mount>,
    pub restart: RestartPolicy,
    pub network: Option<String>,
}

/// Observed state of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerInfo {
    pub running: bool,
    pub networks: Vec<String>,
    /// Last error the runtime recorded, if any.
    pub error: Option<String>,
}

/// Runs containers on the host.
pub trait ContainerRuntime {
    fn pull(&self, image: &str) -> Result<()>;

    fn create(&self, spec: &ContainerSpec) -> Result<()>;

    fn start(&self, name: &str) -> Result<()>;

    /// `None` if no container has that name.
    fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>>;

    fn stop(&self, name: &str) -> Result<()>;

    fn remove(&self, name: &str) -> Result<()>;

    fn connect_network(&self, network: &str, container: &str) -> Result<()>;

    fn disconnect_network(&self, network: &str, container: &str) -> Result<()>;
}

pub(crate) fn seconds(duration: Duration) -> String {
    format!("{}s", duration.as_secs())
}
