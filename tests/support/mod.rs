//! Test support utilities for educates-local integration tests.
//!
//! Provides isolated data directories, workshop fixtures, CLI helpers and
//! recording fakes for the external collaborators.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fakes;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fakes::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::Path;

use educates_local::core::config::ConfigResolver;
use educates_local::core::secrets::SecretsCache;
use tempfile::TempDir;

/// Fixed host address so the derived ingress domain is predictable.
pub const HOST: [u8; 4] = [192, 168, 1, 10];

/// Domain derived from [`HOST`].
pub const HOST_DOMAIN: &str = "192-168-1-10.nip.io";

/// Test environment with isolated temp directories.
///
/// `dir` is the working directory (where workshops live), `data` is the
/// tool's data directory. No process-global state is mutated; child
/// processes get both through `.current_dir()` and environment variables.
pub struct Test {
    pub dir: TempDir,
    pub data: TempDir,
    pub home: TempDir,
}

impl Test {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            data: TempDir::new().expect("failed to create temp data dir"),
            home: TempDir::new().expect("failed to create temp home"),
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.data.path()
    }

    /// Resolver over this environment's data directory with a fixed host address.
    pub fn resolver(&self) -> ConfigResolver {
        ConfigResolver::new(self.data.path()).with_host_address(HOST.into())
    }

    pub fn cache(&self) -> SecretsCache {
        SecretsCache::in_data_dir(self.data.path())
    }
}
