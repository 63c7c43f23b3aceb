//! `kapp` package deployer.
//!
//! ## Requirements
//!
//! - `kapp` CLI must be installed
//!
//! Inline sources are concatenated into one multi-document stream and
//! passed on stdin as `-f -`.

use std::path::Path;

use tracing::info;

use super::{seconds, Deployment, ManifestSource, PackageDeployer};
use crate::core::process::Tool;
use crate::error::Result;

/// Package deployer using the `kapp` CLI.
#[derive(Debug, Clone)]
pub struct Kapp {
    tool: Tool,
}

impl Kapp {
    /// Locate `kapp` on `PATH`.
    pub fn locate() -> Result<Self> {
        Ok(Self {
            tool: Tool::locate("kapp")?,
        })
    }
}

/// Command-line arguments and stdin for a deployment.
fn deploy_args(deployment: &Deployment, kubeconfig: &Path) -> (Vec<String>, Option<String>) {
    let mut args: Vec<String> = [
        "deploy",
        "--app",
        deployment.app.as_str(),
        "--namespace",
        deployment.namespace.as_str(),
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut inline = Vec::new();
    for source in &deployment.sources {
        match source {
            ManifestSource::Url(url) => args.extend(["-f".to_string(), url.clone()]),
            ManifestSource::Path(path) => {
                args.extend(["-f".to_string(), path.display().to_string()])
            }
            ManifestSource::Inline { contents, .. } => inline.push(contents.as_str()),
        }
    }
    let stdin = if inline.is_empty() {
        None
    } else {
        args.extend(["-f".to_string(), "-".to_string()]);
        Some(inline.join("\n---\n"))
    };

    args.extend([
        format!("--wait-timeout={}", seconds(deployment.wait_timeout)),
        format!("--wait-concurrency={}", deployment.wait_concurrency),
        format!("--apply-concurrency={}", deployment.apply_concurrency),
        format!("--apply-timeout={}", seconds(deployment.apply_budget)),
        format!("--kubeconfig={}", kubeconfig.display()),
        "--yes".to_string(),
    ]);

    (args, stdin)
}

impl PackageDeployer for Kapp {
    fn deploy(&self, deployment: &Deployment, kubeconfig: &Path) -> Result<()> {
        info!(app = %deployment.app, namespace = %deployment.namespace, "deploying");
        let (args, stdin) = deploy_args(deployment, kubeconfig);
        self.tool.run(
            "deploy",
            &format!("app/{}", deployment.app),
            args,
            stdin.as_deref().map(str::as_bytes),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn deployment(sources: Vec<ManifestSource>) -> Deployment {
        Deployment {
            app: "kapp-controller".to_string(),
            namespace: "default".to_string(),
            sources,
            wait_timeout: Duration::from_secs(300),
            wait_concurrency: 4,
            apply_concurrency: 2,
            apply_budget: Duration::from_secs(600),
        }
    }

    #[test]
    fn test_urls_become_file_flags() {
        let (args, stdin) = deploy_args(
            &deployment(vec![ManifestSource::Url("https://x/release.yml".to_string())]),
            Path::new("/tmp/kubeconfig"),
        );

        assert!(stdin.is_none());
        assert!(args.windows(2).any(|w| w == ["-f", "https://x/release.yml"]));
        assert!(args.contains(&"--wait-timeout=300s".to_string()));
        assert!(args.contains(&"--apply-concurrency=2".to_string()));
        assert!(args.contains(&"--apply-timeout=600s".to_string()));
        assert!(args.contains(&"--kubeconfig=/tmp/kubeconfig".to_string()));
    }

    #[test]
    fn test_inline_sources_share_stdin() {
        let (args, stdin) = deploy_args(
            &deployment(vec![
                ManifestSource::Inline {
                    name: "a".to_string(),
                    contents: "kind: A".to_string(),
                },
                ManifestSource::Inline {
                    name: "b".to_string(),
                    contents: "kind: B".to_string(),
                },
            ]),
            Path::new("/tmp/kubeconfig"),
        );

        assert_eq!(stdin.as_deref(), Some("kind: A\n---\nkind: B"));
        assert_eq!(args.iter().filter(|a| *a == "-").count(), 1);
    }
}
