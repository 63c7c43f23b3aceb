//! Recording fakes for the bootstrap collaborators.
//!
//! Each fake logs the calls it receives so tests can assert on ordering and
//! can be told to fail specific operations.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use educates_local::core::bootstrap::{Collaborators, Connector};
use educates_local::core::platform::{
    ClusterProvisioner, ContainerInfo, ContainerRuntime, ContainerSpec, Deployment,
    PackageDeployer,
};
use educates_local::core::remote::{MemoryStore, ObjectStore};
use educates_local::error::{RemoteError, Result};

/// Shared, ordered log of calls across all fakes.
pub type CallLog = Rc<RefCell<Vec<String>>>;

#[derive(Default)]
pub struct FakeProvisioner {
    pub existing: RefCell<Vec<String>>,
    pub created: RefCell<Vec<(String, String)>>,
    pub log: CallLog,
}

impl ClusterProvisioner for FakeProvisioner {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.existing.borrow().clone())
    }

    fn create(
        &self,
        name: &str,
        raw_config: &str,
        _node_image: &str,
        _ready_timeout: Duration,
        _kubeconfig: &Path,
    ) -> Result<()> {
        self.log.borrow_mut().push(format!("cluster create {name}"));
        self.created
            .borrow_mut()
            .push((name.to_string(), raw_config.to_string()));
        self.existing.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn delete(&self, name: &str, _kubeconfig: &Path) -> Result<()> {
        self.log.borrow_mut().push(format!("cluster delete {name}"));
        self.existing.borrow_mut().retain(|n| n != name);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDeployer {
    pub deployments: RefCell<Vec<Deployment>>,
    pub failing: RefCell<BTreeSet<String>>,
    pub log: CallLog,
}

impl FakeDeployer {
    /// Make deploying `app` fail.
    pub fn fail_app(&self, app: &str) {
        self.failing.borrow_mut().insert(app.to_string());
    }

    pub fn apps(&self) -> Vec<String> {
        self.deployments
            .borrow()
            .iter()
            .map(|d| d.app.clone())
            .collect()
    }
}

impl PackageDeployer for FakeDeployer {
    fn deploy(&self, deployment: &Deployment, _kubeconfig: &Path) -> Result<()> {
        self.log
            .borrow_mut()
            .push(format!("deploy {}", deployment.app));
        if self.failing.borrow().contains(&deployment.app) {
            return Err(RemoteError::new("deploy", &deployment.app, "injected failure").into());
        }
        self.deployments.borrow_mut().push(deployment.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub spec: ContainerSpec,
    pub info: ContainerInfo,
}

#[derive(Default)]
pub struct FakeRuntime {
    pub containers: RefCell<BTreeMap<String, FakeContainer>>,
    /// Message returned by `start`, keyed by container name.
    pub start_failures: RefCell<BTreeMap<String, String>>,
    pub log: CallLog,
}

impl FakeRuntime {
    /// Seed a container in the given state.
    pub fn with_container(self, name: &str, running: bool, networks: &[&str]) -> Self {
        self.containers.borrow_mut().insert(
            name.to_string(),
            FakeContainer {
                spec: ContainerSpec {
                    name: name.to_string(),
                    ..Default::default()
                },
                info: ContainerInfo {
                    running,
                    networks: networks.iter().map(|n| n.to_string()).collect(),
                    error: None,
                },
            },
        );
        self
    }

    pub fn fail_start(&self, name: &str, message: &str) {
        self.start_failures
            .borrow_mut()
            .insert(name.to_string(), message.to_string());
    }

    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.containers.borrow().get(name).cloned()
    }

    fn push(&self, entry: String) {
        self.log.borrow_mut().push(entry);
    }

    fn missing(operation: &str, name: &str) -> educates_local::error::Error {
        RemoteError::new(operation, format!("container/{name}"), "No such container").into()
    }
}

impl ContainerRuntime for FakeRuntime {
    fn pull(&self, image: &str) -> Result<()> {
        self.push(format!("pull {image}"));
        Ok(())
    }

    fn create(&self, spec: &ContainerSpec) -> Result<()> {
        self.push(format!("create {}", spec.name));
        let mut containers = self.containers.borrow_mut();
        if containers.contains_key(&spec.name) {
            return Err(RemoteError::new("create", &spec.name, "name already in use").into());
        }
        containers.insert(
            spec.name.clone(),
            FakeContainer {
                spec: spec.clone(),
                info: ContainerInfo {
                    networks: spec.network.iter().cloned().collect(),
                    ..Default::default()
                },
            },
        );
        Ok(())
    }

    fn start(&self, name: &str) -> Result<()> {
        self.push(format!("start {name}"));
        if let Some(message) = self.start_failures.borrow().get(name) {
            return Err(RemoteError::new("start", name, message.clone()).into());
        }
        let mut containers = self.containers.borrow_mut();
        let container = containers
            .get_mut(name)
            .ok_or_else(|| Self::missing("start", name))?;
        container.info.running = true;
        Ok(())
    }

    fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>> {
        Ok(self.containers.borrow().get(name).map(|c| c.info.clone()))
    }

    fn stop(&self, name: &str) -> Result<()> {
        self.push(format!("stop {name}"));
        if let Some(container) = self.containers.borrow_mut().get_mut(name) {
            container.info.running = false;
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.push(format!("remove {name}"));
        self.containers.borrow_mut().remove(name);
        Ok(())
    }

    fn connect_network(&self, network: &str, container: &str) -> Result<()> {
        self.push(format!("connect {network} {container}"));
        let mut containers = self.containers.borrow_mut();
        let entry = containers
            .get_mut(container)
            .ok_or_else(|| Self::missing("connect", container))?;
        entry.info.networks.push(network.to_string());
        Ok(())
    }

    fn disconnect_network(&self, network: &str, container: &str) -> Result<()> {
        self.push(format!("disconnect {network} {container}"));
        if let Some(entry) = self.containers.borrow_mut().get_mut(container) {
            entry.info.networks.retain(|n| n != network);
        }
        Ok(())
    }
}

/// Hands out the same in-memory store on every connect.
pub struct FakeConnector {
    pub store: Rc<MemoryStore>,
    pub log: CallLog,
}

impl Connector for FakeConnector {
    fn connect(&self, _kubeconfig: &Path) -> Result<Rc<dyn ObjectStore>> {
        self.log.borrow_mut().push("connect".to_string());
        let store: Rc<dyn ObjectStore> = self.store.clone();
        Ok(store)
    }
}

/// A full set of fakes sharing one call log.
pub struct Fakes {
    pub provisioner: FakeProvisioner,
    pub deployer: FakeDeployer,
    pub runtime: FakeRuntime,
    pub connector: FakeConnector,
    pub log: CallLog,
}

impl Fakes {
    pub fn new() -> Self {
        Self::with_runtime(FakeRuntime::default())
    }

    pub fn with_runtime(runtime: FakeRuntime) -> Self {
        let log = CallLog::default();
        Self {
            provisioner: FakeProvisioner {
                log: log.clone(),
                ..Default::default()
            },
            deployer: FakeDeployer {
                log: log.clone(),
                ..Default::default()
            },
            runtime: FakeRuntime {
                log: log.clone(),
                ..runtime
            },
            connector: FakeConnector {
                store: Rc::new(MemoryStore::new()),
                log: log.clone(),
            },
            log,
        }
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            provisioner: &self.provisioner,
            deployer: &self.deployer,
            runtime: &self.runtime,
            connector: &self.connector,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.connector.store
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}
