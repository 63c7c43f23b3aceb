//! In-memory object store.
//!
//! Holds objects in process and records every mutating call, so the
//! reconcilers can be exercised without a cluster.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::domain::SecretManifest;
use crate::core::remote::{object_name, CustomResource, ObjectStore, ServiceManifest};
use crate::error::{RemoteError, Result};

/// A mutating call made against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: &'static str,
    pub object: String,
}

#[derive(Debug, Default)]
struct State {
    namespaces: BTreeSet<String>,
    secrets: BTreeMap<(String, String), SecretManifest>,
    services: BTreeMap<(String, String), ServiceManifest>,
    custom: BTreeMap<(CustomResource, String), serde_json::Value>,
    calls: Vec<Call>,
    failing: BTreeSet<&'static str>,
}

/// Object store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `operation` fail with a `RemoteError`.
    pub fn fail_on(&self, operation: &'static str) {
        self.state.borrow_mut().failing.insert(operation);
    }

    /// Mutating calls in the order they were made.
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Number of calls of `operation`.
    pub fn count(&self, operation: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Seed an object without recording a call.
    pub fn insert_secret(&self, namespace: &str, secret: SecretManifest) {
        let mut state = self.state.borrow_mut();
        state.namespaces.insert(namespace.to_string());
        state.secrets.insert(
            (namespace.to_string(), secret.metadata.name.clone()),
            secret,
        );
    }

    /// Seed a custom object without recording a call.
    pub fn insert_custom(&self, resource: CustomResource, object: serde_json::Value) {
        let name = object_name(&object).to_string();
        self.state
            .borrow_mut()
            .custom
            .insert((resource, name), object);
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<SecretManifest> {
        self.state
            .borrow()
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn custom(&self, resource: CustomResource, name: &str) -> Option<serde_json::Value> {
        self.state
            .borrow()
            .custom
            .get(&(resource, name.to_string()))
            .cloned()
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.state.borrow().namespaces.contains(name)
    }

    fn record(&self, operation: &'static str, object: impl Into<String>) -> Result<()> {
        let object = object.into();
        let mut state = self.state.borrow_mut();
        if state.failing.contains(operation) {
            return Err(RemoteError::new(operation, object, "injected failure").into());
        }
        state.calls.push(Call { operation, object });
        Ok(())
    }
}

impl ObjectStore for MemoryStore {
    fn namespace_exists(&self, name: &str) -> Result<bool> {
        Ok(self.has_namespace(name))
    }

    fn create_namespace(&self, name: &str) -> Result<()> {
        self.record("create_namespace", name)?;
        let mut state = self.state.borrow_mut();
        if !state.namespaces.insert(name.to_string()) {
            return Err(RemoteError::new("create", format!("namespace/{}", name), "already exists").into());
        }
        Ok(())
    }

    fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<SecretManifest>> {
        Ok(self.secret(namespace, name))
    }

    fn secret_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        Ok(self.secret(namespace, name).is_some())
    }

    fn create_secret(&self, namespace: &str, secret: &SecretManifest) -> Result<()> {
        let name = secret.metadata.name.clone();
        self.record("create_secret", name.clone())?;
        let mut state = self.state.borrow_mut();
        let key = (namespace.to_string(), name.clone());
        if state.secrets.contains_key(&key) {
            return Err(RemoteError::new("create", format!("secret/{}", name), "already exists").into());
        }
        let mut secret = secret.clone();
        secret.metadata.namespace = Some(namespace.to_string());
        state.secrets.insert(key, secret);
        Ok(())
    }

    fn patch_secret(
        &self,
        namespace: &str,
        patch: &SecretManifest,
        _field_manager: &str,
    ) -> Result<()> {
        let name = patch.metadata.name.clone();
        self.record("patch_secret", name.clone())?;
        let mut state = self.state.borrow_mut();
        let key = (namespace.to_string(), name);
        match state.secrets.get_mut(&key) {
            Some(existing) => {
                existing.secret_type = patch.secret_type;
                for (slot, bytes) in &patch.data {
                    existing.data.insert(slot.clone(), bytes.clone());
                }
            }
            None => {
                let mut secret = patch.clone();
                secret.metadata.namespace = Some(namespace.to_string());
                state.secrets.insert(key, secret);
            }
        }
        Ok(())
    }

    fn get_service(&self, namespace: &str, name: &str) -> Result<Option<ServiceManifest>> {
        Ok(self
            .state
            .borrow()
            .services
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    fn create_service(&self, namespace: &str, service: &ServiceManifest) -> Result<()> {
        let name = service.metadata.name.clone();
        self.record("create_service", name.clone())?;
        let mut state = self.state.borrow_mut();
        let key = (namespace.to_string(), name.clone());
        if state.services.contains_key(&key) {
            return Err(RemoteError::new("create", format!("service/{}", name), "already exists").into());
        }
        state.services.insert(key, service.clone());
        Ok(())
    }

    fn update_service(&self, namespace: &str, service: &ServiceManifest) -> Result<()> {
        let name = service.metadata.name.clone();
        self.record("update_service", name.clone())?;
        self.state
            .borrow_mut()
            .services
            .insert((namespace.to_string(), name), service.clone());
        Ok(())
    }

    fn get_custom(
        &self,
        resource: CustomResource,
        name: &str,
    ) -> Result<Option<serde_json::Value>> {
        Ok(self.custom(resource, name))
    }

    fn create_custom(
        &self,
        resource: CustomResource,
        object: &serde_json::Value,
        _field_manager: &str,
    ) -> Result<()> {
        let name = object_name(object).to_string();
        self.record("create_custom", format!("{}/{}", resource.plural(), name))?;
        let mut state = self.state.borrow_mut();
        let key = (resource, name.clone());
        if state.custom.contains_key(&key) {
            return Err(RemoteError::new(
                "create",
                format!("{}/{}", resource.plural(), name),
                "already exists",
            )
            .into());
        }
        state.custom.insert(key, object.clone());
        Ok(())
    }

    fn update_custom(
        &self,
        resource: CustomResource,
        object: &serde_json::Value,
        _field_manager: &str,
    ) -> Result<()> {
        let name = object_name(object).to_string();
        self.record("update_custom", format!("{}/{}", resource.plural(), name))?;
        let mut state = self.state.borrow_mut();
        let key = (resource, name.clone());
        if !state.custom.contains_key(&key) {
            return Err(RemoteError::new(
                "update",
                format!("{}/{}", resource.plural(), name),
                "not found",
            )
            .into());
        }
        state.custom.insert(key, object.clone());
        Ok(())
    }

    fn apply_custom(
        &self,
        resource: CustomResource,
        object: &serde_json::Value,
        _field_manager: &str,
    ) -> Result<()> {
        let name = object_name(object).to_string();
        self.record("apply_custom", format!("{}/{}", resource.plural(), name))?;
        self.state
            .borrow_mut()
            .custom
            .insert((resource, name), object.clone());
        Ok(())
    }

    fn delete_custom(&self, resource: CustomResource, name: &str) -> Result<bool> {
        self.record("delete_custom", format!("{}/{}", resource.plural(), name))?;
        Ok(self
            .state
            .borrow_mut()
            .custom
            .remove(&(resource, name.to_string()))
            .is_some())
    }
}
