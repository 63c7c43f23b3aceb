//! Running workshop content in a standalone container.
//!
//! The container is named after the workshop identity. Its definition is
//! written to `<data dir>/workshops/<identity>--config.yaml` and mounted
//! read-only into the container.

use std::collections::BTreeMap;
use std::fs;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::constants;
use crate::core::domain::WorkshopDescriptor;
use crate::core::platform::{ContainerRuntime, ContainerSpec, Mount, PortBinding, RestartPolicy};
use crate::error::{ConflictError, RemoteError, Result, WorkshopError};

/// How to run the content container.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub data_dir: PathBuf,
    pub listen_address: String,
    pub host_port: u16,
    pub readiness_attempts: u32,
    pub readiness_interval: Duration,
}

impl ServeOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            listen_address: "127.0.0.1".to_string(),
            host_port: constants::WORKSHOP_CONTAINER_PORT,
            readiness_attempts: constants::READINESS_ATTEMPTS,
            readiness_interval: Duration::from_millis(constants::READINESS_INTERVAL_MS),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.host_port = port;
        self
    }

    fn state_file(&self, identity: &str) -> PathBuf {
        self.data_dir
            .join(constants::WORKSHOPS_DIR)
            .join(format!("{}--config.yaml", identity))
    }
}

/// A started content container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub container: String,
    pub url: String,
    pub state_file: PathBuf,
}

fn write_state_file(path: &Path, descriptor: &WorkshopDescriptor) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(&descriptor.to_resource()).map_err(|e| {
        WorkshopError::InvalidDescriptor {
            location: descriptor.source.clone(),
            reason: e.to_string(),
        }
    })?;
    fs::write(path, yaml)?;
    Ok(())
}

/// Start the content container for `descriptor` and wait until it accepts
/// connections.
///
/// A stopped container left by an earlier run is replaced.
///
/// # Errors
///
/// - `ConflictError::ContainerRunning` if the container is already running
/// - `RemoteError` if the runtime fails
/// - `WorkshopError::NotReady` if the readiness poll runs out
pub fn serve(
    runtime: &dyn ContainerRuntime,
    descriptor: &WorkshopDescriptor,
    options: &ServeOptions,
) -> Result<Served> {
    let name = descriptor.name.as_str();

    match runtime.inspect(name)? {
        Some(info) if info.running => {
            return Err(ConflictError::ContainerRunning(name.to_string()).into());
        }
        Some(_) => {
            debug!(name, "replacing stopped container");
            runtime.remove(name)?;
        }
        None => {}
    }

    let state_file = options.state_file(name);
    write_state_file(&state_file, descriptor)?;

    let image = descriptor.content_image();
    runtime.pull(image)?;

    let spec = ContainerSpec {
        name: name.to_string(),
        image: image.to_string(),
        ports: vec![PortBinding {
            host_ip: Some(options.listen_address.clone()),
            host_port: options.host_port,
            container_port: constants::WORKSHOP_CONTAINER_PORT,
        }],
        env: BTreeMap::from([
            ("WORKSHOP_NAME".to_string(), descriptor.declared_name.clone()),
            ("SESSION_NAME".to_string(), name.to_string()),
        ]),
        labels: BTreeMap::from([(
            constants::WORKSHOP_ANNOTATION.to_string(),
            descriptor.declared_name.clone(),
        )]),
        mounts: vec![Mount {
            source: state_file.clone(),
            target: constants::WORKSHOP_CONFIG_MOUNT.to_string(),
            read_only: true,
        }],
        restart: RestartPolicy::No,
        ..Default::default()
    };
    runtime.create(&spec)?;
    runtime.start(name)?;

    let address = format!("{}:{}", options.listen_address, options.host_port);
    wait_until_ready(&address, options.readiness_attempts, options.readiness_interval)?;

    let url = format!("http://{}", address);
    info!(name, %url, "workshop content ready");
    Ok(Served {
        container: name.to_string(),
        url,
        state_file,
    })
}

/// Poll `address` until a TCP connection succeeds.
///
/// Returns the attempt that succeeded.
pub fn wait_until_ready(address: &str, attempts: u32, interval: Duration) -> Result<u32> {
    let target: SocketAddr = address
        .to_socket_addrs()
        .map_err(|e| RemoteError::new("resolve", address, e.to_string()))?
        .next()
        .ok_or_else(|| RemoteError::new("resolve", address, "no addresses"))?;

    for attempt in 1..=attempts {
        match TcpStream::connect_timeout(&target, interval) {
            Ok(_) => {
                debug!(address, attempt, "reachable");
                return Ok(attempt);
            }
            Err(e) => {
                debug!(address, attempt, error = %e, "not reachable yet");
                if attempt < attempts {
                    thread::sleep(interval);
                }
            }
        }
    }

    warn!(address, attempts, "gave up waiting for workshop content");
    Err(WorkshopError::NotReady {
        address: address.to_string(),
        attempts,
    }
    .into())
}
