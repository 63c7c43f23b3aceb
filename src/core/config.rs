//! Effective configuration.
//!
//! Resolves the built-in defaults, an explicit config file, and the
//! persisted `values.yaml` into one [`EffectiveConfig`]. Every section is
//! `#[serde(default)]`, so a document only needs the fields it overrides:
//! a missing sub-field falls back to that sub-field's default.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::constants;
use crate::error::{ConfigError, Result};

/// Platform release installed when the config does not pin one.
pub const DEFAULT_PLATFORM_VERSION: &str = "3.2.1";

/// Policy engine used when the config does not name one.
pub const DEFAULT_POLICY_ENGINE: &str = "kyverno";

/// The fully merged configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectiveConfig {
    pub cluster_infrastructure: InfrastructureConfig,
    pub cluster_packages: PackagesConfig,
    pub cluster_security: SecurityConfig,
    pub cluster_ingress: IngressConfig,
    pub cluster_storage: StorageConfig,
    pub cluster_network: NetworkConfig,
    pub local_kind_cluster: KindClusterConfig,
    pub image_registry: RegistryConfig,
    pub version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_versions: Vec<ImageVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workshop_analytics: Option<AnalyticsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_styling: Option<StylingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_daemon: Option<DockerDaemonConfig>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            cluster_infrastructure: InfrastructureConfig::default(),
            cluster_packages: PackagesConfig::default(),
            cluster_security: SecurityConfig::default(),
            cluster_ingress: IngressConfig::default(),
            cluster_storage: StorageConfig::default(),
            cluster_network: NetworkConfig::default(),
            local_kind_cluster: KindClusterConfig::default(),
            image_registry: RegistryConfig::default(),
            version: DEFAULT_PLATFORM_VERSION.to_string(),
            image_versions: Vec::new(),
            workshop_analytics: None,
            website_styling: None,
            docker_daemon: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InfrastructureConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackagesConfig {
    pub contour: PackageToggle,
    pub educates: PackageToggle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageToggle {
    pub enabled: bool,
    /// Package-specific settings, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_yaml::Mapping>,
}

impl Default for PackageToggle {
    fn default() -> Self {
        Self {
            enabled: true,
            settings: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityConfig {
    pub policy_engine: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            policy_engine: DEFAULT_POLICY_ENGINE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngressConfig {
    /// Wildcard ingress domain. Empty means "derive from the host address".
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_certificate_ref: Option<SecretRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_certificate: Option<TlsCertificate>,
}

/// Reference to a secret in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
}

/// An inline certificate pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsCertificate {
    #[serde(rename = "tls.crt")]
    pub certificate: String,
    #[serde(rename = "tls.key")]
    pub private_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    /// Egress destinations workshop sessions may not reach.
    #[serde(rename = "blockCIDRs")]
    pub block_cidrs: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            block_cidrs: vec![
                "169.254.169.254/32".to_string(),
                "fd00:ec2::254/128".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KindClusterConfig {
    pub node_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_address: Option<String>,
}

impl Default for KindClusterConfig {
    fn default() -> Self {
        Self {
            node_image: constants::NODE_IMAGE.to_string(),
            listen_address: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVersion {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google: Option<TrackingId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarity: Option<TrackingId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackingId {
    pub tracking_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookConfig {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StylingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workshop_dashboard: Option<ThemeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workshop_instructions: Option<ThemeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_portal: Option<ThemeRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeRef {
    pub html: String,
    pub script: String,
    pub style: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DockerDaemonConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_mtu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rootless: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_cache: Option<ProxyCacheConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyCacheConfig {
    #[serde(rename = "remoteURL")]
    pub remote_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl EffectiveConfig {
    /// Compiled-in defaults with the ingress domain derived from `host`.
    pub fn defaults_for(host: IpAddr) -> Self {
        let mut config = Self::default();
        config.cluster_ingress.domain = host_domain(host);
        config
    }

    /// Parse a YAML document over the defaults.
    ///
    /// An empty document yields the defaults unchanged.
    pub fn from_yaml(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Serialize(e).into())
    }

    /// Apply an ingress domain override and point ingress TLS at a cached
    /// secret valid for the effective domain.
    ///
    /// Overriding the domain drops any certificate configured for the old
    /// domain. When `lookup` finds a cached secret for the effective domain,
    /// the TLS reference names it and inline certificate fields are cleared.
    pub fn with_ingress_domain<F>(mut self, domain_override: Option<&str>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let ingress = &mut self.cluster_ingress;

        if let Some(domain) = domain_override.filter(|d| !d.is_empty()) {
            if ingress.domain != domain {
                ingress.tls_certificate_ref = None;
                ingress.tls_certificate = None;
            }
            ingress.domain = domain.to_string();
        }

        if ingress.domain.is_empty() {
            return self;
        }

        if let Some(name) = lookup(&ingress.domain) {
            debug!(domain = %ingress.domain, secret = %name, "using cached ingress certificate");
            ingress.tls_certificate_ref = Some(SecretRef {
                namespace: constants::SECRETS_NAMESPACE.to_string(),
                name,
            });
            ingress.tls_certificate = None;
        }

        self
    }

    /// Image reference for a named platform component, if pinned.
    pub fn image_version(&self, name: &str) -> Option<&str> {
        self.image_versions
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.image.as_str())
    }
}

/// Resolves the effective configuration for one invocation.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    data_dir: PathBuf,
    host_address: Option<IpAddr>,
}

impl ConfigResolver {
    /// Resolver reading persisted values from `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            host_address: None,
        }
    }

    /// Use a fixed host address instead of detecting the outbound one.
    pub fn with_host_address(mut self, address: IpAddr) -> Self {
        self.host_address = Some(address);
        self
    }

    /// Path of the persisted values file.
    pub fn values_path(&self) -> PathBuf {
        self.data_dir.join(constants::VALUES_FILE)
    }

    /// Resolve the effective configuration.
    ///
    /// With an explicit file, that file is the only overlay and any read or
    /// parse failure aborts resolution. Without one, the persisted values
    /// file is used if it exists and is non-empty.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` or `ConfigError::Parse`.
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<EffectiveConfig> {
        let explicit = explicit.filter(|p| !p.as_os_str().is_empty());

        let mut config = match explicit {
            Some(path) => {
                debug!(path = %path.display(), "loading explicit config");
                let contents = std::fs::read_to_string(path).map_err(|source| {
                    ConfigError::ReadFile {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                parse_document(path, &contents)?
            }
            None => self.load_values()?,
        };

        if config.cluster_ingress.domain.is_empty() {
            config.cluster_ingress.domain = host_domain(self.host_address());
        }

        debug!(domain = %config.cluster_ingress.domain, "config resolved");
        Ok(config)
    }

    /// Write the effective configuration to the values file.
    pub fn persist(&self, config: &EffectiveConfig) -> Result<PathBuf> {
        let path = self.values_path();
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::write(&path, config.to_yaml()?)?;
        debug!(path = %path.display(), "values persisted");
        Ok(path)
    }

    /// Remove the values file. Returns whether one existed.
    pub fn reset(&self) -> Result<bool> {
        let path = self.values_path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn load_values(&self) -> Result<EffectiveConfig> {
        let path = self.values_path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no persisted values, using defaults");
                return Ok(EffectiveConfig::default());
            }
            Err(source) => return Err(ConfigError::ReadFile { path, source }.into()),
        };
        debug!(path = %path.display(), "merging persisted values");
        parse_document(&path, &contents)
    }

    fn host_address(&self) -> IpAddr {
        self.host_address.unwrap_or_else(outbound_address)
    }
}

fn parse_document(path: &Path, contents: &str) -> Result<EffectiveConfig> {
    EffectiveConfig::from_yaml(contents).map_err(|source| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// `<ip-with-dashes>.nip.io` for a host address.
pub fn host_domain(address: IpAddr) -> String {
    let label: String = address
        .to_string()
        .chars()
        .map(|c| if c == '.' || c == ':' { '-' } else { c })
        .collect();
    format!("{}.nip.io", label)
}

/// Address of the interface used for outbound traffic.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
/// Falls back to loopback when there is no route.
pub fn outbound_address() -> IpAddr {
    let probe = UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| socket.connect("8.8.8.8:80").map(|_| socket))
        .and_then(|socket| socket.local_addr());

    match probe {
        Ok(addr) => addr.ip(),
        Err(e) => {
            warn!(error = %e, "cannot determine outbound address, using loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

/// Default data directory (`<user data dir>/educates`).
///
/// # Errors
///
/// Returns `ConfigError::NoDataDir` if the platform has no data directory.
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join(constants::DATA_DIR))
        .ok_or_else(|| ConfigError::NoDataDir.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn host() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10))
    }

    fn resolver(dir: &TempDir) -> ConfigResolver {
        ConfigResolver::new(dir.path()).with_host_address(host())
    }

    #[test]
    fn test_resolve_without_files_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = resolver(&dir).resolve(None).unwrap();

        assert_eq!(config, EffectiveConfig::defaults_for(host()));
        assert_eq!(config.cluster_ingress.domain, "192-168-1-10.nip.io");
        assert!(config.cluster_packages.contour.enabled);
        assert!(config.cluster_packages.educates.enabled);
        assert_eq!(config.cluster_security.policy_engine, "kyverno");
        assert!(config.cluster_infrastructure.provider.is_none());
    }

    #[test]
    fn test_empty_explicit_path_is_ignored() {
        let dir = TempDir::new().unwrap();
        let config = resolver(&dir).resolve(Some(Path::new(""))).unwrap();
        assert_eq!(config, EffectiveConfig::defaults_for(host()));
    }

    #[test]
    fn test_explicit_file_overrides_single_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "clusterIngress:\n  domain: workshops.example.com\nclusterPackages:\n  contour:\n    enabled: false\n",
        )
        .unwrap();

        let config = resolver(&dir).resolve(Some(&path)).unwrap();

        assert_eq!(config.cluster_ingress.domain, "workshops.example.com");
        assert!(!config.cluster_packages.contour.enabled);
        // Sibling fields keep their defaults.
        assert!(config.cluster_packages.educates.enabled);
        assert_eq!(config.cluster_security.policy_engine, "kyverno");
        assert_eq!(config.local_kind_cluster.node_image, constants::NODE_IMAGE);
    }

    #[test]
    fn test_explicit_file_parse_error_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "clusterIngress: [not, a, mapping").unwrap();

        let err = resolver(&dir).resolve(Some(&path)).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Config(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_explicit_file_missing_is_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.yaml");

        let err = resolver(&dir).resolve(Some(&path)).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Config(ConfigError::ReadFile { .. })
        ));
    }

    #[test]
    fn test_values_file_merges_over_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("values.yaml"),
            "clusterStorage:\n  class: standard\n",
        )
        .unwrap();

        let config = resolver(&dir).resolve(None).unwrap();
        assert_eq!(config.cluster_storage.class.as_deref(), Some("standard"));
        assert_eq!(config.cluster_ingress.domain, "192-168-1-10.nip.io");
    }

    #[test]
    fn test_empty_values_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("values.yaml"), "\n").unwrap();

        let config = resolver(&dir).resolve(None).unwrap();
        assert_eq!(config, EffectiveConfig::defaults_for(host()));
    }

    #[test]
    fn test_explicit_file_takes_precedence_over_values() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("values.yaml"),
            "clusterStorage:\n  class: from-values\n",
        )
        .unwrap();
        let path = dir.path().join("explicit.yaml");
        std::fs::write(&path, "version: 9.9.9\n").unwrap();

        let config = resolver(&dir).resolve(Some(&path)).unwrap();
        assert_eq!(config.version, "9.9.9");
        assert!(config.cluster_storage.class.is_none());
    }

    #[test]
    fn test_unset_optional_sections_serialize_to_nothing() {
        let yaml = EffectiveConfig::defaults_for(host()).to_yaml().unwrap();

        assert!(!yaml.contains("null"));
        assert!(!yaml.contains("workshopAnalytics"));
        assert!(!yaml.contains("dockerDaemon"));
        assert!(!yaml.contains("provider"));
        assert!(!yaml.contains("tlsCertificate"));
        assert!(yaml.contains("blockCIDRs"));
    }

    #[test]
    fn test_persist_then_resolve_roundtrip() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir);

        let mut config = EffectiveConfig::defaults_for(host());
        config.docker_daemon = Some(DockerDaemonConfig {
            network_mtu: Some(1400),
            ..Default::default()
        });
        resolver.persist(&config).unwrap();

        assert_eq!(resolver.resolve(None).unwrap(), config);
        assert!(resolver.reset().unwrap());
        assert!(!resolver.reset().unwrap());
    }

    #[test]
    fn test_ingress_override_uses_cached_secret() {
        let mut config = EffectiveConfig::defaults_for(host());
        config.cluster_ingress.tls_certificate = Some(TlsCertificate {
            certificate: "CERT".to_string(),
            private_key: "KEY".to_string(),
        });

        let config = config.with_ingress_domain(Some("labs.example.com"), |domain| {
            (domain == "labs.example.com").then(|| "labs-tls".to_string())
        });

        assert_eq!(config.cluster_ingress.domain, "labs.example.com");
        assert_eq!(
            config.cluster_ingress.tls_certificate_ref,
            Some(SecretRef {
                namespace: "educates-secrets".to_string(),
                name: "labs-tls".to_string(),
            })
        );
        assert!(config.cluster_ingress.tls_certificate.is_none());
    }

    #[test]
    fn test_ingress_without_cached_secret_keeps_inline_certificate() {
        let mut config = EffectiveConfig::defaults_for(host());
        let cert = TlsCertificate {
            certificate: "CERT".to_string(),
            private_key: "KEY".to_string(),
        };
        config.cluster_ingress.tls_certificate = Some(cert.clone());

        let config = config.with_ingress_domain(None, |_| None);

        assert_eq!(config.cluster_ingress.tls_certificate, Some(cert));
        assert!(config.cluster_ingress.tls_certificate_ref.is_none());
    }

    #[test]
    fn test_host_domain_replaces_dots() {
        assert_eq!(host_domain(host()), "192-168-1-10.nip.io");
        assert_eq!(
            host_domain(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            "127-0-0-1.nip.io"
        );
    }

    #[test]
    fn test_image_version_lookup() {
        let mut config = EffectiveConfig::default();
        config.image_versions.push(ImageVersion {
            name: "base-environment".to_string(),
            image: "registry.local/base:1.0".to_string(),
        });
        assert_eq!(
            config.image_version("base-environment"),
            Some("registry.local/base:1.0")
        );
        assert_eq!(config.image_version("missing"), None);
    }
}
