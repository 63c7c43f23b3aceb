//! Constants used throughout educates-local.
//!
//! Centralizes resource names, annotation keys, and fixed tuning values.

/// API group/version of the training custom resources.
pub const API_VERSION: &str = "training.educates.dev/v1beta1";

/// Kind of a workshop definition.
pub const WORKSHOP_KIND: &str = "Workshop";

/// Kind of the portal aggregate.
pub const PORTAL_KIND: &str = "TrainingPortal";

/// Annotation recording which ingress domain a cached secret is valid for.
pub const DOMAIN_ANNOTATION: &str = "training.educates.dev/domain";

/// Annotation holding a workshop's originally declared name.
pub const WORKSHOP_ANNOTATION: &str = "training.educates.dev/workshop";

/// Annotation holding the canonical source location of a workshop.
pub const SOURCE_ANNOTATION: &str = "training.educates.dev/source";

/// Field-ownership tag used for every write this tool makes.
pub const FIELD_MANAGER: &str = "educates-cli";

/// Portal used when none is named.
pub const DEFAULT_PORTAL: &str = "educates-cli";

/// Prefix of derived workshop identities.
pub const WORKSHOP_PREFIX: &str = "educates";

/// Descriptor location inside a workshop directory.
pub const WORKSHOP_FILE: &str = "resources/workshop.yaml";

/// Namespace cached secrets are synchronized into.
pub const SECRETS_NAMESPACE: &str = "educates-secrets";

/// Data directory name below the user data directory.
pub const DATA_DIR: &str = "educates";

/// Persisted effective configuration, inside the data directory.
pub const VALUES_FILE: &str = "values.yaml";

/// Secrets cache directory, inside the data directory.
pub const SECRETS_DIR: &str = "secrets";

/// Per-workshop state directory, inside the data directory.
pub const WORKSHOPS_DIR: &str = "workshops";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "EDUCATES_LOCAL_DATA_DIR";

/// Local cluster name.
pub const CLUSTER_NAME: &str = "educates";

/// Default node image for the local cluster.
pub const NODE_IMAGE: &str = "kindest/node:v1.31.0";

/// Seconds to wait for the cluster control plane.
pub const CLUSTER_READY_TIMEOUT_SECS: u64 = 300;

/// Ingress ports that must be free on the host.
pub const INGRESS_PORTS: [u16; 2] = [80, 443];

/// Throwaway container used to probe the ingress ports.
pub const PORT_PROBE_CONTAINER: &str = "educates-port-check";

/// Image for the port probe.
pub const PORT_PROBE_IMAGE: &str = "docker.io/library/busybox:latest";

/// Local registry container.
pub const REGISTRY_CONTAINER: &str = "educates-registry";

/// Local registry image.
pub const REGISTRY_IMAGE: &str = "docker.io/library/registry:2.8.3";

/// Host port the registry listens on.
pub const REGISTRY_PORT: u16 = 5001;

/// Container network the cluster nodes live on.
pub const CLUSTER_NETWORK: &str = "kind";

/// Namespace holding the in-cluster registry service.
pub const REGISTRY_NAMESPACE: &str = "registry";

/// Package-deployment engine release manifest.
pub const KAPP_CONTROLLER_MANIFEST: &str =
    "https://github.com/carvel-dev/kapp-controller/releases/latest/download/release.yml";

/// Platform installer bundle; `{version}` is substituted.
pub const INSTALLER_MANIFEST: &str =
    "https://github.com/educates/educates-training-platform/releases/download/{version}/educates-installer-app.yaml";

/// Namespace the platform installer deploys into.
pub const INSTALLER_NAMESPACE: &str = "educates-installer";

/// Seconds the package engine waits for resources to settle.
pub const DEPLOY_WAIT_TIMEOUT_SECS: u64 = 300;

/// Parallel readiness checks during a deploy.
pub const DEPLOY_WAIT_CONCURRENCY: u32 = 4;

/// Parallel resource applies during a deploy.
pub const DEPLOY_APPLY_CONCURRENCY: u32 = 4;

/// Seconds allowed for applying all changes of one deploy.
pub const DEPLOY_APPLY_BUDGET_SECS: u64 = 600;

/// Default image for standalone workshop content.
pub const WORKSHOP_BASE_IMAGE: &str = "ghcr.io/educates/base-environment:latest";

/// Readiness poll for a standalone workshop container.
pub const READINESS_ATTEMPTS: u32 = 30;

/// Milliseconds between readiness attempts.
pub const READINESS_INTERVAL_MS: u64 = 1000;

/// Portal password length.
pub const PASSWORD_LENGTH: usize = 12;

/// Session duration when a workshop declares none.
pub const DEFAULT_EXPIRES: &str = "60m";

/// Retention window for orphaned sessions.
pub const DEFAULT_ORPHANED: &str = "15m";

/// Seconds allowed to connect when fetching a remote workshop definition.
pub const FETCH_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Seconds allowed for a whole remote workshop definition fetch.
pub const FETCH_TIMEOUT_SECS: u64 = 60;

/// Port the workshop content gateway listens on inside its container.
pub const WORKSHOP_CONTAINER_PORT: u16 = 10081;

/// Where the standalone container reads its workshop definition.
pub const WORKSHOP_CONFIG_MOUNT: &str = "/opt/eduk8s/config/workshop.yaml";

/// Port the registry listens on inside its container.
pub const REGISTRY_CONTAINER_PORT: u16 = 5000;

/// Secret carrying the platform installer values.
pub const INSTALLER_VALUES_SECRET: &str = "educates-installer-values";

/// Namespace kapp records its applications in.
pub const DEPLOY_APP_NAMESPACE: &str = "default";
