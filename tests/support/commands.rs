//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create an educates-local command isolated to this environment.
    ///
    /// - data directory set through `EDUCATES_LOCAL_DATA_DIR`
    /// - HOME set to the temporary home directory
    /// - current directory set to the test working directory
    /// - colors off
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd =
            Command::cargo_bin("educates-local").expect("failed to find educates-local binary");
        cmd.env("EDUCATES_LOCAL_DATA_DIR", self.data.path());
        cmd.env("HOME", self.home.path());
        cmd.env("USERPROFILE", self.home.path());
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("EDUCATES_LOCAL_LOG");
        cmd.current_dir(self.dir.path());
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .unwrap_or_else(|e| panic!("failed to run educates-local {:?}: {}", args, e))
    }

    /// Shortcut for `educates-local config view`.
    pub fn config_view(&self, extra: &[&str]) -> Output {
        let mut args = vec!["config", "view"];
        args.extend_from_slice(extra);
        self.run(&args)
    }

    /// Shortcut for `educates-local config reset`.
    pub fn config_reset(&self) -> Output {
        self.run(&["config", "reset"])
    }

    /// Shortcut for `educates-local secrets list`.
    pub fn secrets_list(&self) -> Output {
        self.run(&["secrets", "list"])
    }

    /// Shortcut for `educates-local secrets add tls`, using PEM fixtures.
    pub fn secrets_add_tls(&self, name: &str, domain: Option<&str>) -> Output {
        let (cert, key) = self.write_pem_pair();
        let (cert, key) = (cert.display().to_string(), key.display().to_string());
        let mut args = vec!["secrets", "add", "tls", name, "--cert", &cert, "--key", &key];
        if let Some(domain) = domain {
            args.extend(["--domain", domain]);
        }
        self.run(&args)
    }

    /// Shortcut for `educates-local secrets add docker-registry`.
    pub fn secrets_add_registry(&self, name: &str) -> Output {
        self.run(&[
            "secrets",
            "add",
            "docker-registry",
            name,
            "--server",
            "registry.example.com",
            "--username",
            "robot",
            "--password",
            "hunter2",
        ])
    }

    /// Shortcut for `educates-local secrets remove`.
    pub fn secrets_remove(&self, name: &str) -> Output {
        self.run(&["secrets", "remove", name])
    }

    /// Shortcut for `educates-local secrets lookup`.
    pub fn secrets_lookup(&self, domain: &str) -> Output {
        self.run(&["secrets", "lookup", domain])
    }
}
