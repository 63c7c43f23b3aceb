//! Secrets cache commands.
//!
//! Everything except `sync` works offline against the cache directory.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::cli::{connect, output, GlobalArgs};
use crate::core::domain::SecretRecord;
use crate::core::secrets::SecretsCache;
use crate::error::{CacheError, Result};

fn cache(global: &GlobalArgs) -> Result<SecretsCache> {
    Ok(SecretsCache::in_data_dir(&global.data_dir()?))
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| {
        CacheError::ReadRecord {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// List cached secrets.
pub fn list(global: &GlobalArgs) -> Result<()> {
    let cache = cache(global)?;
    let records = cache.records()?;

    if records.is_empty() {
        output::dimmed("no cached secrets");
        return Ok(());
    }

    output::section(&format!("{} cached secrets", records.len()));
    for record in records {
        let domain = record.domain.as_deref().unwrap_or("-");
        output::kv(&record.name, format!("{}  {}", record.kind, domain));
    }
    Ok(())
}

/// Cache a TLS certificate pair.
pub fn add_tls(
    global: &GlobalArgs,
    name: &str,
    cert: &Path,
    key: &Path,
    domain: Option<&str>,
) -> Result<()> {
    let mut record = SecretRecord::tls(name, read_pem(cert)?, read_pem(key)?);
    if let Some(domain) = domain {
        record = record.with_domain(domain);
    }
    cache(global)?.add(name, &record)?;
    info!(name, ?domain, "cached tls secret");
    output::success(&format!("cached {}", output::name(name)));
    Ok(())
}

/// Cache registry credentials.
pub fn add_registry(
    global: &GlobalArgs,
    name: &str,
    server: &str,
    username: &str,
    password: &str,
) -> Result<()> {
    let record = SecretRecord::registry(name, server, username, password);
    cache(global)?.add(name, &record)?;
    output::success(&format!("cached {}", output::name(name)));
    Ok(())
}

/// Remove a cached secret.
pub fn remove(global: &GlobalArgs, name: &str) -> Result<()> {
    if cache(global)?.remove(name)? {
        output::success(&format!("removed {}", output::name(name)));
    } else {
        output::dimmed(&format!("{} was not cached", name));
    }
    Ok(())
}

/// Push every cached secret into the cluster.
pub fn sync(global: &GlobalArgs) -> Result<()> {
    let store = connect(global)?;
    let report = cache(global)?.sync_to_cluster(&store)?;
    output::success(&format!(
        "synced {} secrets ({} created, {} updated)",
        report.total(),
        report.created.len(),
        report.patched.len()
    ));
    Ok(())
}

/// Print the name of the secret cached for `domain`.
pub fn lookup(global: &GlobalArgs, domain: &str) -> Result<()> {
    match cache(global)?.lookup_by_domain(domain) {
        Some(name) => output::data(&name),
        None => output::dimmed(&format!("no secret cached for {}", domain)),
    }
    Ok(())
}
