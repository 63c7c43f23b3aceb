//! Command-line interface.

pub mod cluster;
pub mod completions;
pub mod config;
pub mod output;
pub mod secrets;
pub mod workshop;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::core::bootstrap::cluster_context;
use crate::core::constants;
use crate::core::remote::Kubectl;
use crate::error::Result;

/// educates-local - Bring up a local Educates training environment.
#[derive(Parser)]
#[command(
    name = "educates-local",
    about = "Bring up a local Educates training environment",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalArgs,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Data directory (default: <user data dir>/educates)
    #[arg(long, global = true, env = constants::DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Kubeconfig for the local cluster (default: ~/.kube/config)
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,
}

impl GlobalArgs {
    /// The data directory to use.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::core::config::default_data_dir(),
        }
    }

    /// The kubeconfig to use.
    pub fn kubeconfig(&self) -> PathBuf {
        if let Some(path) = &self.kubeconfig {
            return path.clone();
        }
        dirs::home_dir()
            .unwrap_or_default()
            .join(".kube")
            .join("config")
    }
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Create or delete the local environment
    Cluster {
        #[command(subcommand)]
        action: ClusterAction,
    },

    /// Manage the local secrets cache
    Secrets {
        #[command(subcommand)]
        action: SecretsAction,
    },

    /// Deploy, delete or serve workshops
    Workshop {
        #[command(subcommand)]
        action: WorkshopAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    View {
        /// Configuration file to use instead of the persisted values
        #[arg(long)]
        config: Option<PathBuf>,
        /// Ingress domain override
        #[arg(long)]
        domain: Option<String>,
    },

    /// Remove the persisted values
    Reset,
}

/// Cluster subcommands.
#[derive(Subcommand)]
pub enum ClusterAction {
    /// Create the local cluster and install the platform
    Create {
        /// Configuration file to use instead of the persisted values
        #[arg(long)]
        config: Option<PathBuf>,
        /// Ingress domain override
        #[arg(long)]
        domain: Option<String>,
    },

    /// Delete the local cluster
    Delete,
}

/// Secrets subcommands.
#[derive(Subcommand)]
pub enum SecretsAction {
    /// List cached secrets
    List,

    /// Add a secret to the cache
    Add {
        #[command(subcommand)]
        kind: AddSecret,
    },

    /// Remove a secret from the cache
    Remove {
        /// Secret name
        name: String,
    },

    /// Push cached secrets into the cluster
    Sync,

    /// Print the secret cached for an ingress domain
    Lookup {
        /// Ingress domain
        domain: String,
    },
}

/// Kinds of secret that can be cached.
#[derive(Subcommand)]
pub enum AddSecret {
    /// A TLS certificate and key
    Tls {
        /// Secret name
        name: String,
        /// PEM certificate file
        #[arg(long)]
        cert: PathBuf,
        /// PEM private key file
        #[arg(long)]
        key: PathBuf,
        /// Ingress domain the certificate is valid for
        #[arg(long)]
        domain: Option<String>,
    },

    /// Registry credentials
    DockerRegistry {
        /// Secret name
        name: String,
        /// Registry server
        #[arg(long)]
        server: String,
        /// Username
        #[arg(long)]
        username: String,
        /// Password
        #[arg(long, env = "EDUCATES_REGISTRY_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

/// Where a workshop comes from.
#[derive(Args, Debug, Clone)]
pub struct WorkshopSource {
    /// Workshop directory, definition file, or URL
    #[arg(short = 'f', long = "file", default_value = ".")]
    pub location: String,

    /// Name to use instead of the derived identity
    #[arg(long)]
    pub name: Option<String>,
}

/// Workshop subcommands.
#[derive(Subcommand)]
pub enum WorkshopAction {
    /// Deploy a workshop and register it with a portal
    Deploy {
        #[command(flatten)]
        source: WorkshopSource,
        /// Training portal
        #[arg(long, default_value = constants::DEFAULT_PORTAL)]
        portal: String,
    },

    /// Unregister a workshop and delete it
    Delete {
        #[command(flatten)]
        source: WorkshopSource,
        /// Training portal
        #[arg(long, default_value = constants::DEFAULT_PORTAL)]
        portal: String,
    },

    /// Run workshop content in a standalone container
    Serve {
        #[command(flatten)]
        source: WorkshopSource,
        /// Host port
        #[arg(long, default_value_t = constants::WORKSHOP_CONTAINER_PORT)]
        port: u16,
    },
}

/// Execute a command.
///
/// # Errors
///
/// Returns error if the command execution fails.
pub fn execute(command: Command, global: &GlobalArgs) -> Result<()> {
    match command {
        Command::Config { action } => match action {
            ConfigAction::View { config: file, domain } => {
                config::view(global, file.as_deref(), domain.as_deref())
            }
            ConfigAction::Reset => config::reset(global),
        },
        Command::Cluster { action } => match action {
            ClusterAction::Create { config: file, domain } => {
                cluster::create(global, file.as_deref(), domain.as_deref())
            }
            ClusterAction::Delete => cluster::delete(global),
        },
        Command::Secrets { action } => match action {
            SecretsAction::List => secrets::list(global),
            SecretsAction::Add { kind } => match kind {
                AddSecret::Tls {
                    name,
                    cert,
                    key,
                    domain,
                } => secrets::add_tls(global, &name, &cert, &key, domain.as_deref()),
                AddSecret::DockerRegistry {
                    name,
                    server,
                    username,
                    password,
                } => secrets::add_registry(global, &name, &server, &username, &password),
            },
            SecretsAction::Remove { name } => secrets::remove(global, &name),
            SecretsAction::Sync => secrets::sync(global),
            SecretsAction::Lookup { domain } => secrets::lookup(global, &domain),
        },
        Command::Workshop { action } => match action {
            WorkshopAction::Deploy { source, portal } => workshop::deploy(global, &source, &portal),
            WorkshopAction::Delete { source, portal } => workshop::delete(global, &source, &portal),
            WorkshopAction::Serve { source, port } => workshop::serve(global, &source, port),
        },
        Command::Completions { shell } => {
            completions::execute(shell, &mut std::io::stdout().lock())
        }
    }
}

/// Object store client for the local cluster.
pub(crate) fn connect(global: &GlobalArgs) -> Result<Kubectl> {
    let kubeconfig = global.kubeconfig();
    Kubectl::connect(Some(kubeconfig.as_path()), Some(cluster_context().as_str()))
}
