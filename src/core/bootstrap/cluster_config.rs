//! Rendering of the local cluster definition.

use serde::Serialize;

use crate::core::config::EffectiveConfig;
use crate::core::constants;
use crate::error::{ConfigError, Result};

const KIND_API_VERSION: &str = "kind.x-k8s.io/v1alpha4";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusterDocument {
    kind: &'static str,
    api_version: &'static str,
    containerd_config_patches: Vec<String>,
    nodes: Vec<Node>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Node {
    role: &'static str,
    kubeadm_config_patches: Vec<String>,
    extra_port_mappings: Vec<PortMapping>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PortMapping {
    container_port: u16,
    host_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    listen_address: Option<String>,
    protocol: &'static str,
}

const INGRESS_NODE_PATCH: &str = "kind: InitConfiguration
nodeRegistration:
  kubeletExtraArgs:
    node-labels: \"ingress-ready=true\"
";

fn registry_mirror_patch() -> String {
    format!(
        "[plugins.\"io.containerd.grpc.v1.cri\".registry.mirrors.\"localhost:{port}\"]\n  endpoint = [\"http://{name}:{internal}\"]\n",
        port = constants::REGISTRY_PORT,
        name = constants::REGISTRY_CONTAINER,
        internal = constants::REGISTRY_CONTAINER_PORT,
    )
}

/// Render the cluster definition handed to the provisioner.
///
/// A single control-plane node labelled for ingress, with the ingress ports
/// mapped to the host and image pulls for `localhost:<registry port>`
/// redirected to the local registry container.
pub fn render(config: &EffectiveConfig) -> Result<String> {
    let listen_address = config.local_kind_cluster.listen_address.clone();
    let document = ClusterDocument {
        kind: "Cluster",
        api_version: KIND_API_VERSION,
        containerd_config_patches: vec![registry_mirror_patch()],
        nodes: vec![Node {
            role: "control-plane",
            kubeadm_config_patches: vec![INGRESS_NODE_PATCH.to_string()],
            extra_port_mappings: constants::INGRESS_PORTS
                .iter()
                .map(|&port| PortMapping {
                    container_port: port,
                    host_port: port,
                    listen_address: listen_address.clone(),
                    protocol: "TCP",
                })
                .collect(),
        }],
    };
    serde_yaml::to_string(&document).map_err(|e| ConfigError::Serialize(e).into())
}
