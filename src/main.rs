//! educates-local - Bring up a local Educates training environment.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use educates_local::cli::output;
use educates_local::cli::{execute, Cli};
use educates_local::error::{ConflictError, Error, RemoteError, WorkshopError};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env("EDUCATES_LOCAL_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("educates_local=debug")
        } else {
            EnvFilter::new("educates_local=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time())
        .init();

    if let Err(e) = execute(cli.command, &cli.global) {
        let suggestion = match e.root() {
            Error::Conflict(ConflictError::ClusterExists(_)) => {
                Some("run: educates-local cluster delete")
            }
            Error::Conflict(ConflictError::PortsInUse { .. }) => {
                Some("stop whatever is listening on ports 80 and 443")
            }
            Error::Conflict(ConflictError::ContainerRunning(_)) => {
                Some("stop the running container first")
            }
            Error::Workshop(WorkshopError::NotReady { .. }) => {
                Some("check the container logs with: docker logs <name>")
            }
            Error::Remote(RemoteError { operation, .. }) if operation == "locate" => {
                Some("install the missing tool and make sure it is on PATH")
            }
            _ => None,
        };

        output::error(&e.to_string());
        if let Some(hint) = suggestion {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
