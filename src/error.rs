//! Error types.
//!
//! Each area of the tool has its own error enum; [`Error`] wraps them all so
//! callers can propagate with `?` and still match on the failing area.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Workshop(#[from] WorkshopError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A bootstrap step failed; the remaining steps were not run.
    #[error("{step}: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap an error with the name of the bootstrap step that produced it.
    pub fn in_step(self, step: &'static str) -> Self {
        Error::Step {
            step,
            source: Box::new(self),
        }
    }

    /// The innermost error, with any step context removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Configuration resolution errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("unable to determine the user data directory")]
    NoDataDir,
}

/// Input validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("invalid name '{name}': must match [a-z0-9]([.a-z0-9-]+)?[a-z0-9]")]
    InvalidName { name: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("malformed {resource}: {reason}")]
    Malformed { resource: String, reason: String },
}

/// Local secrets cache errors.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cannot list secrets cache {}: {source}", path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read cached secret {}: {source}", path.display())]
    ReadRecord {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed cached secret {}: {source}", path.display())]
    ParseRecord {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot write cached secret {}: {source}", path.display())]
    WriteRecord {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secret not found in cache: {0}")]
    NotFound(String),
}

/// Workshop descriptor loading errors.
#[derive(Error, Debug)]
pub enum WorkshopError {
    #[error("cannot fetch workshop definition from {location}: {reason}")]
    Fetch { location: String, reason: String },

    #[error("invalid workshop definition from {location}: {reason}")]
    InvalidDescriptor { location: String, reason: String },

    #[error("workshop content did not become ready at {address} after {attempts} attempts")]
    NotReady { address: String, attempts: u32 },
}

/// A resource is already in a state this tool refuses to overwrite.
#[derive(Error, Debug)]
pub enum ConflictError {
    #[error("cluster '{0}' already exists")]
    ClusterExists(String),

    #[error("container '{0}' is already running")]
    ContainerRunning(String),

    #[error("ports {ports:?} are already in use")]
    PortsInUse { ports: Vec<u16> },
}

/// A call into the cluster, object store, package engine or container runtime failed.
#[derive(Error, Debug)]
#[error("{operation} {resource}: {message}")]
pub struct RemoteError {
    pub operation: String,
    pub resource: String,
    pub message: String,
}

impl RemoteError {
    pub fn new(
        operation: impl Into<String>,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            resource: resource.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
