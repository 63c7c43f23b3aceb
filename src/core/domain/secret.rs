//! Secret record.
//!
//! A cached secret: name, kind tag, raw byte slots, and an optional ingress
//! domain. On disk and on the wire it is a `v1/Secret` document whose `data`
//! slots are base64 encoded; in memory the slots are raw bytes.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::core::constants;
use crate::core::domain::ObjectMeta;
use crate::core::types::{Domain, ResourceName};

/// Slot holding the certificate of a TLS secret.
pub const TLS_CERT_SLOT: &str = "tls.crt";

/// Slot holding the private key of a TLS secret.
pub const TLS_KEY_SLOT: &str = "tls.key";

/// Slot holding a registry credential bundle.
pub const DOCKER_CONFIG_SLOT: &str = ".dockerconfigjson";

/// What a secret holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretKind {
    /// Certificate and private key.
    #[serde(rename = "kubernetes.io/tls")]
    Tls,
    /// Registry credentials.
    #[serde(rename = "kubernetes.io/dockerconfigjson")]
    DockerConfigJson,
}

impl SecretKind {
    /// The wire type tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tls => "kubernetes.io/tls",
            Self::DockerConfigJson => "kubernetes.io/dockerconfigjson",
        }
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw secret bytes, zeroed on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes(Zeroizing<Vec<u8>>);

impl SecretBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes([REDACTED; {}])", self.0.len())
    }
}

impl Serialize for SecretBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = Zeroizing::new(base64::engine::general_purpose::STANDARD.encode(&*self.0));
        serializer.serialize_str(&encoded)
    }
}

impl<'de> Deserialize<'de> for SecretBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = Zeroizing::new(String::deserialize(deserializer)?);
        base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map(Self::new)
            .map_err(D::Error::custom)
    }
}

/// The `v1/Secret` document as stored in the cache and sent to the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretManifest {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(rename = "type")]
    pub secret_type: SecretKind,
    #[serde(default)]
    pub data: BTreeMap<String, SecretBytes>,
}

/// A cached secret.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretRecord {
    pub name: ResourceName,
    pub kind: SecretKind,
    pub data: BTreeMap<String, SecretBytes>,
    pub domain: Option<Domain>,
}

impl SecretRecord {
    /// A TLS certificate pair.
    pub fn tls(
        name: impl Into<ResourceName>,
        certificate: impl Into<Vec<u8>>,
        private_key: impl Into<Vec<u8>>,
    ) -> Self {
        let mut data = BTreeMap::new();
        data.insert(TLS_CERT_SLOT.to_string(), SecretBytes::new(certificate));
        data.insert(TLS_KEY_SLOT.to_string(), SecretBytes::new(private_key));
        Self {
            name: name.into(),
            kind: SecretKind::Tls,
            data,
            domain: None,
        }
    }

    /// Registry credentials for one server, in `.dockerconfigjson` form.
    pub fn registry(
        name: impl Into<ResourceName>,
        server: &str,
        username: &str,
        password: &str,
    ) -> Self {
        let auth = Zeroizing::new(
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}")),
        );
        let bundle = serde_json::json!({
            "auths": {
                server: {
                    "username": username,
                    "password": password,
                    "auth": auth.as_str(),
                }
            }
        });

        let mut data = BTreeMap::new();
        data.insert(
            DOCKER_CONFIG_SLOT.to_string(),
            SecretBytes::new(bundle.to_string()),
        );
        Self {
            name: name.into(),
            kind: SecretKind::DockerConfigJson,
            data,
            domain: None,
        }
    }

    /// Tag the record with the ingress domain it is valid for.
    pub fn with_domain(mut self, domain: impl Into<Domain>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Bytes held in a slot.
    pub fn slot(&self, slot: &str) -> Option<&[u8]> {
        self.data.get(slot).map(SecretBytes::as_bytes)
    }

    /// Full document, optionally placed in a namespace.
    pub fn to_manifest(&self, namespace: Option<&str>) -> SecretManifest {
        let mut metadata = ObjectMeta::named(self.name.clone());
        metadata.namespace = namespace.map(str::to_string);
        if let Some(domain) = &self.domain {
            metadata
                .annotations
                .insert(constants::DOMAIN_ANNOTATION.to_string(), domain.clone());
        }
        SecretManifest {
            api_version: "v1".to_string(),
            kind: "Secret".to_string(),
            metadata,
            secret_type: self.kind,
            data: self.data.clone(),
        }
    }

    /// Patch carrying only the kind tag and payload.
    ///
    /// Annotations and labels on the remote object are left alone.
    pub fn to_patch(&self, namespace: &str) -> SecretManifest {
        SecretManifest {
            api_version: "v1".to_string(),
            kind: "Secret".to_string(),
            metadata: ObjectMeta::namespaced(namespace, self.name.clone()),
            secret_type: self.kind,
            data: self.data.clone(),
        }
    }

    /// Rebuild a record from a document.
    pub fn from_manifest(manifest: SecretManifest) -> Self {
        let domain = manifest
            .metadata
            .annotation(constants::DOMAIN_ANNOTATION)
            .map(str::to_string);
        Self {
            name: manifest.metadata.name,
            kind: manifest.secret_type,
            data: manifest.data,
            domain,
        }
    }

    /// Encode as a YAML `v1/Secret` document.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.to_manifest(None))
    }

    /// Decode a YAML `v1/Secret` document.
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        let manifest: SecretManifest = serde_yaml::from_str(contents)?;
        if manifest.kind != "Secret" {
            return Err(serde_yaml::Error::custom(format!(
                "expected kind Secret, found {}",
                manifest.kind
            )));
        }
        Ok(Self::from_manifest(manifest))
    }
}
