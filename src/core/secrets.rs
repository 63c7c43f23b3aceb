//! Local secrets cache.
//!
//! One YAML `v1/Secret` document per record in `<data dir>/secrets/`, named
//! `<name>.yaml`. The cache is the source of truth for secret material
//! across cluster re-creations; [`SecretsCache::sync_to_cluster`] pushes it
//! into a cluster without ever deleting anything there.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::constants;
use crate::core::domain::{SecretRecord, SyncReport};
use crate::core::remote::ObjectStore;
use crate::core::validation::{is_valid_name, validate_name};
use crate::error::{CacheError, RemoteError, Result};

const EXTENSION: &str = "yaml";

/// File-backed cache of secret records.
#[derive(Debug, Clone)]
pub struct SecretsCache {
    dir: PathBuf,
}

impl SecretsCache {
    /// Cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache inside a data directory (`<data dir>/secrets`).
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(constants::SECRETS_DIR))
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, EXTENSION))
    }

    /// Cached record files, sorted by name. Files whose stem is not a
    /// valid name are skipped.
    fn entries(&self) -> std::io::Result<Vec<(String, PathBuf)>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if is_valid_name(stem) => entries.push((stem.to_string(), path.clone())),
                _ => warn!(path = %path.display(), "ignoring cache file with an invalid name"),
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn read_record(name: &str, path: &Path) -> Result<SecretRecord> {
        let contents = fs::read_to_string(path).map_err(|source| CacheError::ReadRecord {
            path: path.to_path_buf(),
            source,
        })?;
        let mut record =
            SecretRecord::from_yaml(&contents).map_err(|source| CacheError::ParseRecord {
                path: path.to_path_buf(),
                source,
            })?;
        record.name = name.to_string();
        Ok(record)
    }

    /// Name of the cached secret whose domain annotation equals `domain`.
    ///
    /// Unreadable or malformed records are skipped. An unlistable cache
    /// yields `None`. If several records claim the domain, the first in
    /// name order wins and the ambiguity is logged.
    pub fn lookup_by_domain(&self, domain: &str) -> Option<String> {
        let entries = match self.entries() {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "secrets cache not listable");
                return None;
            }
        };

        let mut matches = entries.iter().filter_map(|(name, path)| {
            match Self::read_record(name, path) {
                Ok(record) if record.domain.as_deref() == Some(domain) => Some(record.name),
                Ok(_) => None,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable cached secret");
                    None
                }
            }
        });

        let first = matches.next()?;
        let others: Vec<String> = matches.collect();
        if !others.is_empty() {
            warn!(
                domain,
                chosen = %first,
                ignored = ?others,
                "multiple cached secrets claim the same domain"
            );
        }
        Some(first)
    }

    /// Store a record under `name`, replacing any existing record.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidName` before anything is written if
    /// `name` is not a valid identity.
    pub fn add(&self, name: &str, record: &SecretRecord) -> Result<PathBuf> {
        validate_name(name)?;

        let mut record = record.clone();
        record.name = name.to_string();
        let contents = record.to_yaml().map_err(|e| {
            crate::error::ValidationError::InvalidValue {
                field: "secret",
                reason: e.to_string(),
            }
        })?;

        fs::create_dir_all(&self.dir)?;
        let path = self.record_path(name);
        let write = |path: &Path| -> std::io::Result<()> {
            let mut file = fs::File::create(path)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()
        };
        write(&path).map_err(|source| CacheError::WriteRecord {
            path: path.clone(),
            source,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).map_err(|source| {
                CacheError::WriteRecord {
                    path: path.clone(),
                    source,
                }
            })?;
        }

        debug!(name, kind = %record.kind, "secret cached");
        Ok(path)
    }

    /// Remove the record named `name`. Removing an absent record succeeds.
    ///
    /// Returns whether a record was removed.
    pub fn remove(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        match fs::remove_file(self.record_path(name)) {
            Ok(()) => {
                debug!(name, "secret removed from cache");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Load one record.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::NotFound` if no record has that name.
    pub fn get(&self, name: &str) -> Result<SecretRecord> {
        validate_name(name)?;
        let path = self.record_path(name);
        if !path.exists() {
            return Err(CacheError::NotFound(name.to_string()).into());
        }
        Self::read_record(name, &path)
    }

    /// Names of all cached records, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        match self.entries() {
            Ok(entries) => Ok(entries.into_iter().map(|(name, _)| name).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(CacheError::ListDir {
                path: self.dir.clone(),
                source,
            }
            .into()),
        }
    }

    /// Every cached record, failing on the first unreadable one.
    pub fn records(&self) -> Result<Vec<SecretRecord>> {
        let entries = match self.entries() {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError::ListDir {
                    path: self.dir.clone(),
                    source,
                }
                .into())
            }
        };
        entries
            .iter()
            .map(|(name, path)| Self::read_record(name, path))
            .collect()
    }

    /// Push every cached record into the secrets namespace of a cluster.
    ///
    /// Creates the namespace if needed. Absent secrets are created; present
    /// ones get a patch of their type and data under forced ownership.
    /// Remote secrets with no cached counterpart are left alone.
    ///
    /// # Errors
    ///
    /// Aborts before touching the cluster on the first unreadable record
    /// (naming its file), or on the first failed remote write (naming the
    /// secret).
    pub fn sync_to_cluster(&self, store: &dyn ObjectStore) -> Result<SyncReport> {
        let namespace = constants::SECRETS_NAMESPACE;
        let mut report = SyncReport::default();
        let records = self.records()?;

        if !store.namespace_exists(namespace)? {
            store.create_namespace(namespace)?;
            report.namespace_created = true;
        }

        info!(count = records.len(), namespace, "syncing cached secrets");

        for record in &records {
            let context = |e: crate::error::Error| {
                RemoteError::new("sync", format!("secret/{}", record.name), e.to_string())
            };

            if !store
                .secret_exists(namespace, &record.name)
                .map_err(context)?
            {
                store
                    .create_secret(namespace, &record.to_manifest(Some(namespace)))
                    .map_err(context)?;
                report.created.push(record.name.clone());
            } else {
                store
                    .patch_secret(
                        namespace,
                        &record.to_patch(namespace),
                        constants::FIELD_MANAGER,
                    )
                    .map_err(context)?;
                report.patched.push(record.name.clone());
            }
        }

        Ok(report)
    }
}
