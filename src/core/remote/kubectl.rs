//! `kubectl`-backed object store.
//!
//! ## Requirements
//!
//! - `kubectl` CLI must be installed
//! - The kubeconfig must contain a context for the target cluster

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::core::domain::SecretManifest;
use crate::core::process::Tool;
use crate::core::remote::{object_name, CustomResource, ObjectStore, ServiceManifest};
use crate::error::{RemoteError, Result};

/// Object store talking to a cluster through `kubectl`.
#[derive(Debug, Clone)]
pub struct Kubectl {
    tool: Tool,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl Kubectl {
    /// Locate `kubectl` and target `context` in `kubeconfig`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if `kubectl` is not installed.
    pub fn connect(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Self> {
        Ok(Self {
            tool: Tool::locate("kubectl")?,
            kubeconfig: kubeconfig.map(Path::to_path_buf),
            context: context.map(str::to_string),
        })
    }

    fn args(&self, rest: &[&str]) -> Vec<String> {
        let mut args = Vec::with_capacity(rest.len() + 4);
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.display().to_string());
        }
        if let Some(context) = &self.context {
            args.push("--context".to_string());
            args.push(context.clone());
        }
        args.extend(rest.iter().map(|s| s.to_string()));
        args
    }

    fn get<T: DeserializeOwned>(
        &self,
        kind: &str,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<T>> {
        let resource = format!("{}/{}", kind, name);
        let mut rest = vec!["get", kind, name, "-o", "json", "--ignore-not-found"];
        if let Some(ns) = namespace {
            rest.extend(["-n", ns]);
        }
        let stdout = self.tool.run("get", &resource, self.args(&rest), None)?;
        if stdout.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&stdout)
            .map(Some)
            .map_err(|e| RemoteError::new("decode", resource, e.to_string()).into())
    }

    fn send<T: Serialize>(
        &self,
        operation: &str,
        resource: &str,
        verb: &[&str],
        object: &T,
    ) -> Result<()> {
        let body = serde_json::to_vec(object)
            .map_err(|e| RemoteError::new("encode", resource, e.to_string()))?;
        let mut rest = verb.to_vec();
        rest.extend(["-f", "-"]);
        self.tool
            .run(operation, resource, self.args(&rest), Some(&body))?;
        debug!(operation, resource, "kubectl write");
        Ok(())
    }
}

impl ObjectStore for Kubectl {
    fn namespace_exists(&self, name: &str) -> Result<bool> {
        let stdout = self.tool.run(
            "get",
            &format!("namespace/{}", name),
            self.args(&["get", "namespace", name, "-o", "name", "--ignore-not-found"]),
            None,
        )?;
        Ok(!stdout.trim().is_empty())
    }

    fn create_namespace(&self, name: &str) -> Result<()> {
        self.tool.run(
            "create",
            &format!("namespace/{}", name),
            self.args(&["create", "namespace", name]),
            None,
        )?;
        Ok(())
    }

    fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<SecretManifest>> {
        self.get("secret", Some(namespace), name)
    }

    fn secret_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        let stdout = self.tool.run(
            "get",
            &format!("secret/{}", name),
            self.args(&["get", "secret", name, "-n", namespace, "-o", "name", "--ignore-not-found"]),
            None,
        )?;
        Ok(!stdout.trim().is_empty())
    }

    fn create_secret(&self, namespace: &str, secret: &SecretManifest) -> Result<()> {
        let resource = format!("secret/{}", secret.metadata.name);
        self.send("create", &resource, &["create", "-n", namespace], secret)
    }

    fn patch_secret(
        &self,
        namespace: &str,
        patch: &SecretManifest,
        field_manager: &str,
    ) -> Result<()> {
        let resource = format!("secret/{}", patch.metadata.name);
        let manager = format!("--field-manager={}", field_manager);
        self.send(
            "patch",
            &resource,
            &["apply", "--server-side", "--force-conflicts", manager.as_str(), "-n", namespace],
            patch,
        )
    }

    fn get_service(&self, namespace: &str, name: &str) -> Result<Option<ServiceManifest>> {
        self.get("service", Some(namespace), name)
    }

    fn create_service(&self, namespace: &str, service: &ServiceManifest) -> Result<()> {
        let resource = format!("service/{}", service.metadata.name);
        self.send("create", &resource, &["create", "-n", namespace], service)
    }

    fn update_service(&self, namespace: &str, service: &ServiceManifest) -> Result<()> {
        let resource = format!("service/{}", service.metadata.name);
        self.send("update", &resource, &["replace", "-n", namespace], service)
    }

    fn get_custom(
        &self,
        resource: CustomResource,
        name: &str,
    ) -> Result<Option<serde_json::Value>> {
        self.get(&resource.qualified(), None, name)
    }

    fn create_custom(
        &self,
        resource: CustomResource,
        object: &serde_json::Value,
        field_manager: &str,
    ) -> Result<()> {
        let target = format!("{}/{}", resource.plural(), object_name(object));
        let manager = format!("--field-manager={}", field_manager);
        self.send("create", &target, &["create", manager.as_str()], object)
    }

    fn update_custom(
        &self,
        resource: CustomResource,
        object: &serde_json::Value,
        field_manager: &str,
    ) -> Result<()> {
        let target = format!("{}/{}", resource.plural(), object_name(object));
        let manager = format!("--field-manager={}", field_manager);
        self.send("update", &target, &["replace", manager.as_str()], object)
    }

    fn apply_custom(
        &self,
        resource: CustomResource,
        object: &serde_json::Value,
        field_manager: &str,
    ) -> Result<()> {
        let target = format!("{}/{}", resource.plural(), object_name(object));
        let manager = format!("--field-manager={}", field_manager);
        self.send(
            "apply",
            &target,
            &["apply", "--server-side", "--force-conflicts", manager.as_str()],
            object,
        )
    }

    fn delete_custom(&self, resource: CustomResource, name: &str) -> Result<bool> {
        let qualified = resource.qualified();
        let stdout = self.tool.run(
            "delete",
            &format!("{}/{}", resource.plural(), name),
            self.args(&["delete", qualified.as_str(), name, "-o", "name", "--ignore-not-found"]),
            None,
        )?;
        Ok(!stdout.trim().is_empty())
    }
}
