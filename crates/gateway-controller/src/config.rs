//! Global controller configuration, loaded from CLI flags with environment
//! fallback (`clap`'s `env` feature) and validated with `garde`, mirroring
//! how the teacher validates its CRD specs with the same crate.

use clap::Args;
use garde::Validate;
use serde::{Deserialize, Serialize};

/// Mesh control-plane connection parameters.
#[derive(Args, Clone, Debug, Deserialize, Serialize, Validate)]
pub struct MeshConnectionConfig {
    #[arg(long, env = "MESH_ADDRESS", default_value = "mesh.service.local")]
    #[garde(length(min = 1))]
    pub address: String,

    #[arg(long, env = "MESH_GRPC_PORT", default_value_t = 8502)]
    #[garde(range(min = 1, max = 65535))]
    pub grpc_port: u16,

    #[arg(long, env = "MESH_HTTP_PORT", default_value_t = 8500)]
    #[garde(range(min = 1, max = 65535))]
    pub http_port: u16,

    /// Per-call timeout, in seconds, for mesh client requests.
    #[arg(long, env = "MESH_API_TIMEOUT_SECS", default_value_t = 5)]
    #[garde(range(min = 1))]
    pub api_timeout_secs: u64,
}

/// Global, Helm-style configuration shared across every Gateway this
/// controller materializes.
#[derive(Args, Clone, Debug, Deserialize, Serialize, Validate)]
pub struct Config {
    #[arg(long, env = "IMAGE_DATAPLANE")]
    #[garde(length(min = 1))]
    pub image_dataplane: String,

    #[arg(long, env = "IMAGE_CONTROL_PLANE")]
    #[garde(length(min = 1))]
    pub image_control_plane: String,

    #[arg(long, env = "GLOBAL_IMAGE_PULL_POLICY", default_value = "IfNotPresent")]
    #[garde(length(min = 1))]
    pub global_image_pull_policy: String,

    #[arg(long, env = "IMAGE_PULL_SECRETS", value_delimiter = ',')]
    #[garde(skip)]
    pub image_pull_secrets: Vec<String>,

    #[arg(long, env = "AUTH_METHOD")]
    #[garde(skip)]
    pub auth_method: Option<String>,

    #[arg(long, env = "MESH_PARTITION", default_value = "default")]
    #[garde(length(min = 1))]
    pub mesh_partition: String,

    #[arg(long, env = "ENABLE_NAMESPACES", default_value_t = false)]
    #[garde(skip)]
    pub enable_namespaces: bool,

    #[arg(long, env = "MESH_DESTINATION_NAMESPACE", default_value = "default")]
    #[garde(length(min = 1))]
    pub mesh_destination_namespace: String,

    #[arg(long, env = "ENABLE_NAMESPACE_MIRRORING", default_value_t = false)]
    #[garde(skip)]
    pub enable_namespace_mirroring: bool,

    #[arg(long, env = "NAMESPACE_MIRRORING_PREFIX", default_value = "")]
    #[garde(skip)]
    pub namespace_mirroring_prefix: String,

    #[arg(long, env = "TLS_ENABLED", default_value_t = false)]
    #[garde(skip)]
    pub tls_enabled: bool,

    #[arg(long, env = "MESH_TLS_SERVER_NAME")]
    #[garde(skip)]
    pub mesh_tls_server_name: Option<String>,

    #[arg(long, env = "MESH_CA_CERT")]
    #[garde(skip)]
    pub mesh_ca_cert: Option<String>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    #[garde(length(min = 1))]
    pub log_level: String,

    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    #[garde(skip)]
    pub log_json: bool,

    #[arg(long, env = "ENABLE_OPENSHIFT", default_value_t = false)]
    #[garde(skip)]
    pub enable_openshift: bool,

    /// 0 disables remapping of privileged listener ports to unprivileged
    /// container ports.
    #[arg(long, env = "MAP_PRIVILEGED_CONTAINER_PORTS", default_value_t = 0)]
    #[garde(skip)]
    pub map_privileged_container_ports: u16,

    #[command(flatten)]
    #[garde(dive)]
    pub mesh_config: MeshConnectionConfig,

    #[arg(long, env = "ENABLE_GATEWAY_METRICS", default_value_t = false)]
    #[garde(skip)]
    pub enable_gateway_metrics: bool,

    #[arg(long, env = "DEFAULT_PROMETHEUS_SCRAPE_PATH", default_value = "/metrics")]
    #[garde(length(min = 1))]
    pub default_prometheus_scrape_path: String,

    #[arg(long, env = "DEFAULT_PROMETHEUS_SCRAPE_PORT", default_value_t = 20200)]
    #[garde(range(min = 1, max = 65535))]
    pub default_prometheus_scrape_port: u16,
}

impl Config {
    /// Remap a listener's container port per `mapPrivilegedContainerPorts`:
    /// ports below 1024 are shifted by the configured offset when remapping
    /// is enabled (offset `0` disables it).
    pub fn to_container_port(&self, listener_port: u16) -> u16 {
        if self.map_privileged_container_ports == 0 || listener_port >= 1024 {
            listener_port
        } else {
            self.map_privileged_container_ports + listener_port
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            image_dataplane: "mesh/dataplane:1.0".to_string(),
            image_control_plane: "mesh/control-plane:1.0".to_string(),
            global_image_pull_policy: "IfNotPresent".to_string(),
            image_pull_secrets: vec![],
            auth_method: None,
            mesh_partition: "default".to_string(),
            enable_namespaces: false,
            mesh_destination_namespace: "default".to_string(),
            enable_namespace_mirroring: false,
            namespace_mirroring_prefix: String::new(),
            tls_enabled: false,
            mesh_tls_server_name: None,
            mesh_ca_cert: None,
            log_level: "info".to_string(),
            log_json: false,
            enable_openshift: false,
            map_privileged_container_ports: 0,
            mesh_config: MeshConnectionConfig {
                address: "mesh.service.local".to_string(),
                grpc_port: 8502,
                http_port: 8500,
                api_timeout_secs: 5,
            },
            enable_gateway_metrics: false,
            default_prometheus_scrape_path: "/metrics".to_string(),
            default_prometheus_scrape_port: 20200,
        }
    }

    #[test]
    fn privileged_port_unmapped_when_disabled() {
        let cfg = base_config();
        assert_eq!(cfg.to_container_port(443), 443);
    }

    #[test]
    fn privileged_port_remapped_when_enabled() {
        let mut cfg = base_config();
        cfg.map_privileged_container_ports = 20000;
        assert_eq!(cfg.to_container_port(443), 20443);
        assert_eq!(cfg.to_container_port(8080), 8080);
    }

    #[test]
    fn validation_rejects_empty_image() {
        let mut cfg = base_config();
        cfg.image_dataplane = String::new();
        assert!(cfg.validate().is_err());
    }
}
