//! Local environment bootstrap.
//!
//! Converges a machine to a running training platform in a fixed order:
//!
//! 1. resolve the effective configuration
//! 2. check the ingress ports are free
//! 3. create the cluster
//! 4. push cached secrets into it
//! 5. deploy the package controller
//! 6. run the local registry and expose it to the cluster
//! 7. deploy the platform
//!
//! The first failing step stops the pipeline; its error carries the step
//! name. Nothing is rolled back. Every step other than cluster creation
//! treats an already-satisfied state as success, so re-running converges
//! from wherever a previous run stopped.

pub mod cluster_config;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::config::{ConfigResolver, EffectiveConfig};
use crate::core::constants;
use crate::core::domain::{ObjectMeta, SyncReport};
use crate::core::platform::{
    ClusterProvisioner, ContainerRuntime, ContainerSpec, Deployment, ManifestSource,
    PackageDeployer, PortBinding, RestartPolicy,
};
use crate::core::remote::{Kubectl, ObjectStore, ServiceManifest};
use crate::core::secrets::SecretsCache;
use crate::error::{ConfigError, ConflictError, RemoteError, Result};

/// Step names, in execution order.
pub const STEPS: [&str; 7] = [
    "resolve configuration",
    "check ingress ports",
    "create cluster",
    "sync secrets",
    "deploy package controller",
    "deploy registry",
    "deploy platform",
];

/// Kubernetes context the provisioner writes for the local cluster.
pub fn cluster_context() -> String {
    format!("kind-{}", constants::CLUSTER_NAME)
}

/// Opens an object-store client for a freshly created cluster.
pub trait Connector {
    fn connect(&self, kubeconfig: &Path) -> Result<Rc<dyn ObjectStore>>;
}

/// Connects through `kubectl` using the context the provisioner wrote.
#[derive(Debug, Clone, Default)]
pub struct KubectlConnector;

impl Connector for KubectlConnector {
    fn connect(&self, kubeconfig: &Path) -> Result<Rc<dyn ObjectStore>> {
        let context = cluster_context();
        Ok(Rc::new(Kubectl::connect(Some(kubeconfig), Some(context.as_str()))?))
    }
}

/// The external systems the pipeline drives.
pub struct Collaborators<'a> {
    pub provisioner: &'a dyn ClusterProvisioner,
    pub deployer: &'a dyn PackageDeployer,
    pub runtime: &'a dyn ContainerRuntime,
    pub connector: &'a dyn Connector,
}

/// What the registry step had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryAction {
    AlreadyRunning,
    Restarted,
    Created,
}

/// Result of a completed bootstrap.
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub config: EffectiveConfig,
    pub secrets: SyncReport,
    pub registry: RegistryAction,
}

/// One bootstrap run.
pub struct BootstrapPipeline<'a> {
    resolver: &'a ConfigResolver,
    cache: &'a SecretsCache,
    collaborators: Collaborators<'a>,
    kubeconfig: PathBuf,
}

/// `v1/Secret` carrying the platform values, in `stringData` form.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValuesSecret {
    api_version: &'static str,
    kind: &'static str,
    metadata: ObjectMeta,
    string_data: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceManifest {
    api_version: &'static str,
    kind: &'static str,
    metadata: ObjectMeta,
}

/// Configuration sections the platform installer consumes.
///
/// Host-side settings (the local cluster and docker daemon) are dropped.
pub fn platform_values(config: &EffectiveConfig) -> Result<String> {
    let mut values = serde_yaml::to_value(config).map_err(ConfigError::Serialize)?;
    if let Some(map) = values.as_mapping_mut() {
        map.remove("localKindCluster");
        map.remove("dockerDaemon");
    }
    serde_yaml::to_string(&values).map_err(|e| ConfigError::Serialize(e).into())
}

fn values_document(config: &EffectiveConfig) -> Result<String> {
    let namespace = NamespaceManifest {
        api_version: "v1",
        kind: "Namespace",
        metadata: ObjectMeta::named(constants::INSTALLER_NAMESPACE),
    };
    let secret = ValuesSecret {
        api_version: "v1",
        kind: "Secret",
        metadata: ObjectMeta::namespaced(
            constants::INSTALLER_NAMESPACE,
            constants::INSTALLER_VALUES_SECRET,
        ),
        string_data: [("values.yaml".to_string(), platform_values(config)?)].into(),
    };
    let encode = ConfigError::Serialize;
    Ok(format!(
        "{}---\n{}",
        serde_yaml::to_string(&namespace).map_err(encode)?,
        serde_yaml::to_string(&secret).map_err(encode)?
    ))
}

fn ports_occupied(message: &str) -> bool {
    message.contains("already allocated") || message.contains("address already in use")
}

fn deployment(app: &str, sources: Vec<ManifestSource>) -> Deployment {
    Deployment {
        app: app.to_string(),
        namespace: constants::DEPLOY_APP_NAMESPACE.to_string(),
        sources,
        wait_timeout: Duration::from_secs(constants::DEPLOY_WAIT_TIMEOUT_SECS),
        wait_concurrency: constants::DEPLOY_WAIT_CONCURRENCY,
        apply_concurrency: constants::DEPLOY_APPLY_CONCURRENCY,
        apply_budget: Duration::from_secs(constants::DEPLOY_APPLY_BUDGET_SECS),
    }
}

impl<'a> BootstrapPipeline<'a> {
    pub fn new(
        resolver: &'a ConfigResolver,
        cache: &'a SecretsCache,
        collaborators: Collaborators<'a>,
        kubeconfig: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver,
            cache,
            collaborators,
            kubeconfig: kubeconfig.into(),
        }
    }

    /// Run every step in order.
    ///
    /// # Errors
    ///
    /// The first failing step's error, wrapped in `Error::Step`.
    pub fn run(&self, config_file: Option<&Path>, domain: Option<&str>) -> Result<BootstrapReport> {
        let config = self
            .resolve(config_file, domain)
            .map_err(|e| e.in_step(STEPS[0]))?;
        self.check_ports(&config).map_err(|e| e.in_step(STEPS[1]))?;
        self.create_cluster(&config)
            .map_err(|e| e.in_step(STEPS[2]))?;

        let (store, secrets) = self.sync_secrets().map_err(|e| e.in_step(STEPS[3]))?;
        self.deploy_package_controller()
            .map_err(|e| e.in_step(STEPS[4]))?;
        let registry = self
            .deploy_registry(store.as_ref())
            .map_err(|e| e.in_step(STEPS[5]))?;
        self.deploy_platform(&config)
            .map_err(|e| e.in_step(STEPS[6]))?;

        info!(domain = %config.cluster_ingress.domain, "environment ready");
        Ok(BootstrapReport {
            config,
            secrets,
            registry,
        })
    }

    /// Effective configuration with the ingress transform applied.
    pub fn resolve(&self, config_file: Option<&Path>, domain: Option<&str>) -> Result<EffectiveConfig> {
        let config = self
            .resolver
            .resolve(config_file)?
            .with_ingress_domain(domain, |d| self.cache.lookup_by_domain(d));
        Ok(config)
    }

    fn check_ports(&self, config: &EffectiveConfig) -> Result<()> {
        let runtime = self.collaborators.runtime;
        let probe = constants::PORT_PROBE_CONTAINER;

        runtime.pull(constants::PORT_PROBE_IMAGE)?;
        if runtime.inspect(probe)?.is_some() {
            debug!(probe, "removing leftover port probe");
            runtime.remove(probe)?;
        }

        let host_ip = config.local_kind_cluster.listen_address.clone();
        runtime.create(&ContainerSpec {
            name: probe.to_string(),
            image: constants::PORT_PROBE_IMAGE.to_string(),
            command: vec!["sleep".to_string(), "1".to_string()],
            ports: constants::INGRESS_PORTS
                .iter()
                .map(|&port| PortBinding {
                    host_ip: host_ip.clone(),
                    host_port: port,
                    container_port: port,
                })
                .collect(),
            ..Default::default()
        })?;

        let started = runtime.start(probe);
        let inspected = runtime.inspect(probe);
        let removed = runtime.remove(probe);

        let in_use = || ConflictError::PortsInUse {
            ports: constants::INGRESS_PORTS.to_vec(),
        };
        match started {
            Err(e) if ports_occupied(&e.to_string()) => return Err(in_use().into()),
            Err(e) => return Err(e),
            Ok(()) => {}
        }
        if let Some(message) = inspected?.and_then(|info| info.error) {
            if ports_occupied(&message) {
                return Err(in_use().into());
            }
            return Err(RemoteError::new("probe", "ports", message).into());
        }
        removed?;

        debug!(ports = ?constants::INGRESS_PORTS, "ingress ports free");
        Ok(())
    }

    fn create_cluster(&self, config: &EffectiveConfig) -> Result<()> {
        let provisioner = self.collaborators.provisioner;
        if provisioner
            .list()?
            .iter()
            .any(|name| name == constants::CLUSTER_NAME)
        {
            return Err(ConflictError::ClusterExists(constants::CLUSTER_NAME.to_string()).into());
        }

        let raw = cluster_config::render(config)?;
        provisioner.create(
            constants::CLUSTER_NAME,
            &raw,
            &config.local_kind_cluster.node_image,
            Duration::from_secs(constants::CLUSTER_READY_TIMEOUT_SECS),
            &self.kubeconfig,
        )
    }

    fn sync_secrets(&self) -> Result<(Rc<dyn ObjectStore>, SyncReport)> {
        let store = self.collaborators.connector.connect(&self.kubeconfig)?;
        let report = self.cache.sync_to_cluster(store.as_ref())?;
        Ok((store, report))
    }

    fn deploy_package_controller(&self) -> Result<()> {
        self.collaborators.deployer.deploy(
            &deployment(
                "kapp-controller",
                vec![ManifestSource::Url(constants::KAPP_CONTROLLER_MANIFEST.to_string())],
            ),
            &self.kubeconfig,
        )
    }

    fn deploy_registry(&self, store: &dyn ObjectStore) -> Result<RegistryAction> {
        let runtime = self.collaborators.runtime;
        let name = constants::REGISTRY_CONTAINER;

        let action = match runtime.inspect(name)? {
            Some(info) if info.running => RegistryAction::AlreadyRunning,
            Some(_) => {
                runtime.start(name)?;
                RegistryAction::Restarted
            }
            None => {
                runtime.pull(constants::REGISTRY_IMAGE)?;
                runtime.create(&ContainerSpec {
                    name: name.to_string(),
                    image: constants::REGISTRY_IMAGE.to_string(),
                    ports: vec![PortBinding {
                        host_ip: Some("127.0.0.1".to_string()),
                        host_port: constants::REGISTRY_PORT,
                        container_port: constants::REGISTRY_CONTAINER_PORT,
                    }],
                    restart: RestartPolicy::Always,
                    ..Default::default()
                })?;
                runtime.start(name)?;
                RegistryAction::Created
            }
        };
        debug!(?action, "registry container");

        let attached = runtime
            .inspect(name)?
            .map(|info| info.networks.iter().any(|n| n == constants::CLUSTER_NETWORK))
            .unwrap_or(false);
        if !attached {
            runtime.connect_network(constants::CLUSTER_NETWORK, name)?;
        }

        let namespace = constants::REGISTRY_NAMESPACE;
        if !store.namespace_exists(namespace)? {
            store.create_namespace(namespace)?;
        }
        if store.get_service(namespace, "registry")?.is_none() {
            store.create_service(
                namespace,
                &ServiceManifest::external_name(
                    namespace,
                    "registry",
                    name,
                    constants::REGISTRY_CONTAINER_PORT,
                ),
            )?;
        } else {
            debug!("registry service already present");
        }

        Ok(action)
    }

    fn deploy_platform(&self, config: &EffectiveConfig) -> Result<()> {
        let packages = &config.cluster_packages;
        if !packages.contour.enabled && !packages.educates.enabled {
            warn!("all platform packages disabled, skipping platform deploy");
            return Ok(());
        }

        let installer = constants::INSTALLER_MANIFEST.replace("{version}", &config.version);
        self.collaborators.deployer.deploy(
            &deployment(
                "educates-installer",
                vec![
                    ManifestSource::Url(installer),
                    ManifestSource::Inline {
                        name: constants::INSTALLER_VALUES_SECRET.to_string(),
                        contents: values_document(config)?,
                    },
                ],
            ),
            &self.kubeconfig,
        )
    }
}

/// Delete the local cluster. Returns whether it existed.
pub fn delete_cluster(provisioner: &dyn ClusterProvisioner, kubeconfig: &Path) -> Result<bool> {
    if !provisioner
        .list()?
        .iter()
        .any(|name| name == constants::CLUSTER_NAME)
    {
        return Ok(false);
    }
    provisioner.delete(constants::CLUSTER_NAME, kubeconfig)?;
    info!(name = constants::CLUSTER_NAME, "cluster deleted");
    Ok(true)
}
