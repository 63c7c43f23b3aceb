//! Remote object store.
//!
//! The narrow interface this tool uses to read and write cluster objects:
//! typed access to namespaces, secrets and services, and untyped access to
//! the two training custom resources.
//!
//! ## Implementations
//!
//! - [`Kubectl`]: shells out to `kubectl` against a kubeconfig context.
//! - [`MemoryStore`]: in-process store that records every call.

use serde::{Deserialize, Serialize};

use crate::core::constants;
use crate::core::domain::{ObjectMeta, SecretManifest};
use crate::error::Result;

mod kubectl;
pub mod memory;

pub use kubectl::Kubectl;
pub use memory::MemoryStore;

/// The training custom resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CustomResource {
    Workshops,
    TrainingPortals,
}

impl CustomResource {
    /// Plural resource name.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Workshops => "workshops",
            Self::TrainingPortals => "trainingportals",
        }
    }

    /// Kind of the objects.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Workshops => constants::WORKSHOP_KIND,
            Self::TrainingPortals => constants::PORTAL_KIND,
        }
    }

    /// `<plural>.<group>`, unambiguous across API groups.
    pub fn qualified(&self) -> String {
        let group = constants::API_VERSION
            .split('/')
            .next()
            .unwrap_or(constants::API_VERSION);
        format!("{}.{}", self.plural(), group)
    }
}

/// A `v1/Service`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceManifest {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ServicePort>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u16>,
}

impl ServiceManifest {
    /// An `ExternalName` service pointing at `host`.
    pub fn external_name(namespace: &str, name: &str, host: &str, port: u16) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            metadata: ObjectMeta::namespaced(namespace, name),
            spec: ServiceSpec {
                service_type: "ExternalName".to_string(),
                external_name: Some(host.to_string()),
                ports: vec![ServicePort {
                    port,
                    target_port: Some(port),
                }],
                extra: serde_json::Map::new(),
            },
        }
    }
}

/// Object-store client for one cluster.
///
/// `get_*` return `Ok(None)` for an absent object; every other failure is a
/// `RemoteError` naming the operation and the object.
pub trait ObjectStore {
    fn namespace_exists(&self, name: &str) -> Result<bool>;

    fn create_namespace(&self, name: &str) -> Result<()>;

    fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<SecretManifest>>;

    /// Whether a secret named `name` exists, whatever its type.
    fn secret_exists(&self, namespace: &str, name: &str) -> Result<bool>;

    fn create_secret(&self, namespace: &str, secret: &SecretManifest) -> Result<()>;

    /// Server-side apply of `patch` with forced ownership under `field_manager`.
    fn patch_secret(&self, namespace: &str, patch: &SecretManifest, field_manager: &str)
        -> Result<()>;

    fn get_service(&self, namespace: &str, name: &str) -> Result<Option<ServiceManifest>>;

    fn create_service(&self, namespace: &str, service: &ServiceManifest) -> Result<()>;

    fn update_service(&self, namespace: &str, service: &ServiceManifest) -> Result<()>;

    fn get_custom(&self, resource: CustomResource, name: &str)
        -> Result<Option<serde_json::Value>>;

    fn create_custom(
        &self,
        resource: CustomResource,
        object: &serde_json::Value,
        field_manager: &str,
    ) -> Result<()>;

    /// Replace an existing object.
    fn update_custom(
        &self,
        resource: CustomResource,
        object: &serde_json::Value,
        field_manager: &str,
    ) -> Result<()>;

    /// Server-side apply with forced ownership; creates the object if absent.
    fn apply_custom(
        &self,
        resource: CustomResource,
        object: &serde_json::Value,
        field_manager: &str,
    ) -> Result<()>;

    /// Delete an object. Returns whether it existed.
    fn delete_custom(&self, resource: CustomResource, name: &str) -> Result<bool>;
}

/// Name of an untyped object, for error context.
pub(crate) fn object_name(object: &serde_json::Value) -> &str {
    object
        .pointer("/metadata/name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("<unnamed>")
}
