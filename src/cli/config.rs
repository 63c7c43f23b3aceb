//! Configuration commands.

use std::path::Path;

use crate::cli::{output, GlobalArgs};
use crate::core::config::ConfigResolver;
use crate::core::secrets::SecretsCache;
use crate::error::Result;

/// Print the effective configuration.
pub fn view(global: &GlobalArgs, file: Option<&Path>, domain: Option<&str>) -> Result<()> {
    let data_dir = global.data_dir()?;
    let cache = SecretsCache::in_data_dir(&data_dir);
    let config = ConfigResolver::new(&data_dir)
        .resolve(file)?
        .with_ingress_domain(domain, |d| cache.lookup_by_domain(d));
    output::data(&config.to_yaml()?);
    Ok(())
}

/// Remove the persisted values file.
pub fn reset(global: &GlobalArgs) -> Result<()> {
    let resolver = ConfigResolver::new(global.data_dir()?);
    if resolver.reset()? {
        output::success(&format!("removed {}", output::path(&resolver.values_path())));
    } else {
        output::dimmed("no persisted values");
    }
    Ok(())
}
