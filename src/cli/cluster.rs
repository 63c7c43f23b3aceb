//! Cluster lifecycle commands.

use std::path::Path;

use tracing::info;

use crate::cli::{output, GlobalArgs};
use crate::core::bootstrap::{self, BootstrapPipeline, Collaborators, KubectlConnector};
use crate::core::config::ConfigResolver;
use crate::core::platform::{Docker, Kapp, Kind};
use crate::core::secrets::SecretsCache;
use crate::error::Result;

/// Create the local environment, then persist the configuration it used.
pub fn create(global: &GlobalArgs, file: Option<&Path>, domain: Option<&str>) -> Result<()> {
    let data_dir = global.data_dir()?;
    let kubeconfig = global.kubeconfig();
    info!(data_dir = %data_dir.display(), kubeconfig = %kubeconfig.display(), "creating environment");

    let resolver = ConfigResolver::new(&data_dir);
    let cache = SecretsCache::in_data_dir(&data_dir);
    let provisioner = Kind::locate()?;
    let deployer = Kapp::locate()?;
    let runtime = Docker::locate()?;
    let connector = KubectlConnector;

    let pipeline = BootstrapPipeline::new(
        &resolver,
        &cache,
        Collaborators {
            provisioner: &provisioner,
            deployer: &deployer,
            runtime: &runtime,
            connector: &connector,
        },
        &kubeconfig,
    );
    let report = pipeline.run(file, domain)?;
    let values = resolver.persist(&report.config)?;

    output::success("environment ready");
    output::kv("domain:", &report.config.cluster_ingress.domain);
    output::kv(
        "secrets:",
        format!(
            "{} created, {} updated",
            report.secrets.created.len(),
            report.secrets.patched.len()
        ),
    );
    output::kv("values:", output::path(&values));
    Ok(())
}

/// Delete the local cluster.
pub fn delete(global: &GlobalArgs) -> Result<()> {
    let provisioner = Kind::locate()?;
    if bootstrap::delete_cluster(&provisioner, &global.kubeconfig())? {
        output::success("cluster deleted");
    } else {
        output::dimmed("no cluster to delete");
    }
    Ok(())
}
