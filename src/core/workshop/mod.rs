//! Workshop definition loading.
//!
//! A workshop is addressed by a location: an `http(s)` URL of its definition,
//! or a filesystem path to either the definition file or a workshop directory
//! (whose definition lives at `resources/workshop.yaml`).
//!
//! Unless a name is given explicitly, a workshop's identity is derived from
//! its declared name and its location:
//!
//! ```text
//! educates--<declared name>-<last 7 hex chars of sha256(location)>
//! ```
//!
//! so the same source always maps to the same cluster resource, and two
//! sources declaring the same name do not collide.

mod deploy;
mod serve;

pub use deploy::{delete, deploy};
pub use serve::{serve, wait_until_ready, ServeOptions, Served};

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::core::constants;
use crate::core::domain::WorkshopDescriptor;
use crate::core::validation::validate_name;
use crate::error::{Result, WorkshopError};

/// Hex characters of the location hash kept in a derived identity.
const HASH_SUFFIX_LEN: usize = 7;

/// A classified workshop location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkshopLocation {
    /// An `http` or `https` URL of the definition.
    Remote {
        /// The URL exactly as given.
        literal: String,
        url: Url,
    },
    /// A local definition.
    Local {
        /// The absolute, cleaned location as given.
        location: PathBuf,
        /// The definition file itself.
        file: PathBuf,
    },
}

impl WorkshopLocation {
    /// Classify `location`, resolving relative paths against `base_dir`.
    pub fn classify(location: &str, base_dir: &Path) -> Self {
        if let Ok(url) = Url::parse(location) {
            if matches!(url.scheme(), "http" | "https") {
                return Self::Remote {
                    literal: location.to_string(),
                    url,
                };
            }
        }

        let path = Path::new(location);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        };
        let location = clean(&absolute);
        let file = if location.is_dir() {
            location.join(constants::WORKSHOP_FILE)
        } else {
            location.clone()
        };
        Self::Local { location, file }
    }

    /// The string the identity hash is computed over.
    pub fn key(&self) -> String {
        match self {
            Self::Remote { literal, .. } => literal.clone(),
            Self::Local { location, .. } => location.display().to_string(),
        }
    }

    /// Canonical source, as recorded in the source annotation.
    pub fn source(&self) -> String {
        match self {
            Self::Remote { literal, .. } => literal.clone(),
            Self::Local { location, .. } => Url::from_file_path(location)
                .map(String::from)
                .unwrap_or_else(|()| format!("file://{}", location.display())),
        }
    }
}

/// Lexically normalize a path: drop `.` and resolve `..` without touching
/// the filesystem.
fn clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(component);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

/// Deterministic identity for a workshop declared as `declared` at `key`.
pub fn derive_identity(key: &str, declared: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
    let suffix = &digest[digest.len() - HASH_SUFFIX_LEN..];
    format!("{}--{}-{}", constants::WORKSHOP_PREFIX, declared, suffix)
}

/// Loads workshop definitions from files and URLs.
#[derive(Debug, Clone)]
pub struct WorkshopLoader {
    base_dir: PathBuf,
    connect_timeout: Duration,
    timeout: Duration,
}

impl WorkshopLoader {
    /// Loader resolving relative paths against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            connect_timeout: Duration::from_secs(constants::FETCH_CONNECT_TIMEOUT_SECS),
            timeout: Duration::from_secs(constants::FETCH_TIMEOUT_SECS),
        }
    }

    /// Loader resolving relative paths against the working directory.
    pub fn from_current_dir() -> Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Override the network timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.connect_timeout = self.connect_timeout.min(timeout);
        self
    }

    /// Load a workshop definition and resolve its identity.
    ///
    /// An empty `explicit_name` counts as absent; an empty `portal` means the
    /// default portal.
    ///
    /// # Errors
    ///
    /// - `WorkshopError::Fetch` if the definition cannot be read or fetched
    /// - `WorkshopError::InvalidDescriptor` if it is not a `Workshop`
    /// - `ValidationError::InvalidName` if `explicit_name` is not a valid name
    pub fn load(
        &self,
        explicit_name: Option<&str>,
        location: &str,
        portal: Option<&str>,
    ) -> Result<WorkshopDescriptor> {
        let explicit_name = explicit_name.filter(|n| !n.is_empty());
        if let Some(name) = explicit_name {
            validate_name(name)?;
        }

        let classified = WorkshopLocation::classify(location, &self.base_dir);
        debug!(?classified, "loading workshop definition");
        let bytes = self.fetch(&classified)?;

        let mut descriptor = WorkshopDescriptor::decode(&bytes).map_err(|problem| {
            WorkshopError::InvalidDescriptor {
                location: location.to_string(),
                reason: problem.to_string(),
            }
        })?;

        descriptor.source = classified.source();
        descriptor.name = match explicit_name {
            Some(name) => name.to_string(),
            None => derive_identity(&classified.key(), &descriptor.declared_name),
        };
        if let Some(portal) = portal.filter(|p| !p.is_empty()) {
            descriptor.portal = portal.to_string();
        }

        info!(
            name = %descriptor.name,
            declared = %descriptor.declared_name,
            source = %descriptor.source,
            "loaded workshop"
        );
        Ok(descriptor)
    }

    fn fetch(&self, location: &WorkshopLocation) -> Result<Vec<u8>> {
        match location {
            WorkshopLocation::Local { file, .. } => fs::read(file).map_err(|e| {
                WorkshopError::Fetch {
                    location: file.display().to_string(),
                    reason: e.to_string(),
                }
                .into()
            }),
            WorkshopLocation::Remote { literal, url } => self.fetch_remote(literal, url),
        }
    }

    fn fetch_remote(&self, literal: &str, url: &Url) -> Result<Vec<u8>> {
        let failed = |reason: String| WorkshopError::Fetch {
            location: literal.to_string(),
            reason,
        };

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .build()
            .map_err(|e| failed(format!("failed to create HTTP client: {}", e)))?;

        let response = client
            .get(url.clone())
            .send()
            .map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("server responded {}", status)).into());
        }

        let body = response.bytes().map_err(|e| failed(e.to_string()))?;
        Ok(body.to_vec())
    }
}
