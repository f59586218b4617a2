//! Materializes a Gateway as Kubernetes workloads: a ServiceAccount/Role/
//! RoleBinding/Secret quartet for mesh auth, a Service exposing each
//! listener port, and a Deployment running the dataplane image. Every write
//! goes through server-side apply, the same idempotent-upsert pattern the
//! teacher uses for its cluster RBAC and gateway hub resources.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Capabilities, Container, EnvVar, PodSpec, PodTemplateSpec, Probe, Secret, SecurityContext, Service, ServicePort, ServiceAccount,
    ServiceSpec,
};
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kcr_gateway_networking_k8s_io::v1::gateways::Gateway;
use kube::api::{DeleteParams, ObjectMeta, Patch, PatchParams};
use kube::{Api, Client};

use crate::api::GatewayClassConfigSpec;
use crate::config::Config;
use crate::{Error, Result};

const MANAGER_NAME: &str = "mesh-gateway-controller";
const ANNOTATION_GROUP: &str = "mesh-gateway.dev";

pub fn resource_name(gateway_name: &str) -> String {
    format!("mesh-gateway-{gateway_name}")
}

fn labels(name: &str) -> BTreeMap<String, String> {
    [("app.kubernetes.io/name".to_string(), name.to_string())].into()
}

pub struct Gatekeeper {
    client: Client,
}

impl Gatekeeper {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Idempotently upsert every child resource a Gateway needs, clamping
    /// replicas against whatever Deployment (if any) already exists.
    pub async fn upsert(
        &self,
        gw: &Gateway,
        class_config: &GatewayClassConfigSpec,
        config: &Config,
        owner_ref: OwnerReference,
    ) -> Result<()> {
        let namespace = gw.metadata.namespace.clone().unwrap_or_default();
        let gw_name = gw.metadata.name.clone().unwrap_or_default();
        let name = resource_name(&gw_name);
        let pp = PatchParams::apply(MANAGER_NAME);

        self.upsert_rbac(&namespace, &name, &owner_ref, &pp).await?;
        self.upsert_service(gw, class_config, config, &namespace, &name, &owner_ref, &pp).await?;
        self.upsert_deployment(gw, class_config, config, &namespace, &name, &owner_ref, &pp)
            .await?;

        Ok(())
    }

    async fn upsert_rbac(&self, namespace: &str, name: &str, owner_ref: &OwnerReference, pp: &PatchParams) -> Result<()> {
        let service_accounts = Api::<ServiceAccount>::namespaced(self.client.clone(), namespace);
        let roles = Api::<Role>::namespaced(self.client.clone(), namespace);
        let role_bindings = Api::<RoleBinding>::namespaced(self.client.clone(), namespace);
        let secrets = Api::<Secret>::namespaced(self.client.clone(), namespace);

        check_ownership(roles.get_opt(name).await?.as_ref().map(|r| &r.metadata), owner_ref, "Role", name)?;
        check_ownership(
            service_accounts.get_opt(name).await?.as_ref().map(|r| &r.metadata),
            owner_ref,
            "ServiceAccount",
            name,
        )?;
        check_ownership(
            role_bindings.get_opt(name).await?.as_ref().map(|r| &r.metadata),
            owner_ref,
            "RoleBinding",
            name,
        )?;
        check_ownership(secrets.get_opt(name).await?.as_ref().map(|r| &r.metadata), owner_ref, "Secret", name)?;

        roles
            .patch(
                name,
                pp,
                &Patch::Apply(Role {
                    metadata: ObjectMeta {
                        name: Some(name.to_string()),
                        namespace: Some(namespace.to_string()),
                        owner_references: Some(vec![owner_ref.clone()]),
                        ..Default::default()
                    },
                    rules: Some(vec![PolicyRule {
                        api_groups: Some(vec!["mesh-gateway.dev".to_string()]),
                        resources: Some(vec!["meshservices".to_string()]),
                        verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string()],
                        ..Default::default()
                    }]),
                }),
            )
            .await?;

        service_accounts
            .patch(
                name,
                pp,
                &Patch::Apply(ServiceAccount {
                    metadata: ObjectMeta {
                        name: Some(name.to_string()),
                        namespace: Some(namespace.to_string()),
                        owner_references: Some(vec![owner_ref.clone()]),
                        ..Default::default()
                    },
                    ..Default::default()
                }),
            )
            .await?;

        role_bindings
            .patch(
                name,
                pp,
                &Patch::Apply(RoleBinding {
                    metadata: ObjectMeta {
                        name: Some(name.to_string()),
                        namespace: Some(namespace.to_string()),
                        owner_references: Some(vec![owner_ref.clone()]),
                        ..Default::default()
                    },
                    role_ref: RoleRef {
                        kind: "Role".to_string(),
                        name: name.to_string(),
                        ..Default::default()
                    },
                    subjects: Some(vec![Subject {
                        kind: "ServiceAccount".to_string(),
                        name: name.to_string(),
                        namespace: Some(namespace.to_string()),
                        ..Default::default()
                    }]),
                }),
            )
            .await?;

        // One aggregated Secret carrying the mesh auth token, mirroring how
        // the service-account token secret is keyed.
        secrets
            .patch(
                name,
                pp,
                &Patch::Apply(Secret {
                    metadata: ObjectMeta {
                        name: Some(name.to_string()),
                        namespace: Some(namespace.to_string()),
                        owner_references: Some(vec![owner_ref.clone()]),
                        annotations: Some([("kubernetes.io/service-account.name".to_string(), name.to_string())].into()),
                        ..Default::default()
                    },
                    type_: Some("kubernetes.io/service-account-token".to_string()),
                    ..Default::default()
                }),
            )
            .await?;

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn upsert_service(
        &self,
        gw: &Gateway,
        class_config: &GatewayClassConfigSpec,
        config: &Config,
        namespace: &str,
        name: &str,
        owner_ref: &OwnerReference,
        pp: &PatchParams,
    ) -> Result<()> {
        let Some(service_type) = service_type_for(class_config) else {
            return Ok(());
        };

        let ports: Vec<ServicePort> = gw
            .spec
            .listeners
            .iter()
            .map(|l| ServicePort {
                name: Some(l.name.clone()),
                port: l.port,
                target_port: Some(IntOrString::Int(config.to_container_port(l.port as u16) as i32)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            })
            .collect();

        let services = Api::<Service>::namespaced(self.client.clone(), namespace);
        check_ownership(services.get_opt(name).await?.as_ref().map(|s| &s.metadata), owner_ref, "Service", name)?;
        services
            .patch(
                name,
                pp,
                &Patch::Apply(Service {
                    metadata: ObjectMeta {
                        name: Some(name.to_string()),
                        namespace: Some(namespace.to_string()),
                        owner_references: Some(vec![owner_ref.clone()]),
                        ..Default::default()
                    },
                    spec: Some(ServiceSpec {
                        selector: Some(labels(name)),
                        ports: Some(ports),
                        type_: Some(service_type),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
            )
            .await?;

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn upsert_deployment(
        &self,
        gw: &Gateway,
        class_config: &GatewayClassConfigSpec,
        config: &Config,
        namespace: &str,
        name: &str,
        owner_ref: &OwnerReference,
        pp: &PatchParams,
    ) -> Result<()> {
        let deployments = Api::<Deployment>::namespaced(self.client.clone(), namespace);
        let existing = deployments.get_opt(name).await?;
        check_ownership(existing.as_ref().map(|d| &d.metadata), owner_ref, "Deployment", name)?;
        let existing_replicas = existing.and_then(|d| d.spec.and_then(|s| s.replicas));
        let replicas = class_config.clamp_replicas(existing_replicas);

        let probes = annotation_probes(gw)?;
        let desired = desired_deployment(gw, class_config, config, namespace, name, owner_ref, replicas, &probes);
        deployments.patch(name, pp, &Patch::Apply(desired)).await?;

        Ok(())
    }

    /// Delete every child in the order role-binding, role, service, secret,
    /// service-account, deployment, swallowing not-found so a re-run (or a
    /// partially-materialized Gateway) is never an error.
    pub async fn delete(&self, gateway_name: &str, namespace: &str) -> Result<()> {
        let name = resource_name(gateway_name);
        let dp = DeleteParams::default();

        delete_ignoring_not_found(Api::<RoleBinding>::namespaced(self.client.clone(), namespace), &name, &dp).await?;
        delete_ignoring_not_found(Api::<Role>::namespaced(self.client.clone(), namespace), &name, &dp).await?;
        delete_ignoring_not_found(Api::<Service>::namespaced(self.client.clone(), namespace), &name, &dp).await?;
        delete_ignoring_not_found(Api::<Secret>::namespaced(self.client.clone(), namespace), &name, &dp).await?;
        delete_ignoring_not_found(Api::<ServiceAccount>::namespaced(self.client.clone(), namespace), &name, &dp).await?;
        delete_ignoring_not_found(Api::<Deployment>::namespaced(self.client.clone(), namespace), &name, &dp).await?;

        Ok(())
    }
}

async fn delete_ignoring_not_found<K>(api: Api<K>, name: &str, dp: &DeleteParams) -> Result<()>
where
    K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    match api.delete(name, dp).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// A child is only patched if it doesn't exist yet, or the existing object
/// already carries an owner reference back to this Gateway. An existing
/// child lacking that reference is left alone.
fn check_ownership(existing: Option<&ObjectMeta>, owner_ref: &OwnerReference, kind: &str, name: &str) -> Result<()> {
    let Some(meta) = existing else { return Ok(()) };
    let owned = meta
        .owner_references
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|r| r.uid == owner_ref.uid));
    if owned {
        Ok(())
    } else {
        Err(Error::OwnershipConflict(format!("{kind}/{name}")))
    }
}

/// The Service is only created when the GatewayClassConfig names a type.
fn service_type_for(class_config: &GatewayClassConfigSpec) -> Option<String> {
    class_config.service_type.clone()
}

/// Probe overrides read from the Gateway's `<group>/{liveness,readiness,startup}-probe`
/// annotations, each a JSON-encoded Kubernetes Probe object.
#[derive(Default)]
struct AnnotationProbes {
    liveness: Option<Probe>,
    readiness: Option<Probe>,
    startup: Option<Probe>,
}

fn annotation_probes(gw: &Gateway) -> Result<AnnotationProbes> {
    Ok(AnnotationProbes {
        liveness: parse_probe_annotation(gw, "liveness-probe", true)?,
        readiness: parse_probe_annotation(gw, "readiness-probe", false)?,
        startup: parse_probe_annotation(gw, "startup-probe", true)?,
    })
}

fn parse_probe_annotation(gw: &Gateway, key: &str, normalize_success_threshold: bool) -> Result<Option<Probe>> {
    let annotation_key = format!("{ANNOTATION_GROUP}/{key}");
    let Some(raw) = gw.metadata.annotations.as_ref().and_then(|a| a.get(&annotation_key)) else {
        return Ok(None);
    };

    let mut probe: Probe = serde_json::from_str(raw).map_err(|e| Error::ProbeParse(format!("{annotation_key}: {e}")))?;
    sanitize_probe(&mut probe, normalize_success_threshold).map_err(|e| Error::ProbeParse(format!("{annotation_key}: {e}")))?;
    Ok(Some(probe))
}

/// Exactly one handler is required; `successThreshold` must be 1 for
/// liveness/startup probes per the Kubernetes Probe schema.
fn sanitize_probe(probe: &mut Probe, normalize_success_threshold: bool) -> std::result::Result<(), String> {
    let handlers = [probe.http_get.is_some(), probe.tcp_socket.is_some(), probe.exec.is_some(), probe.grpc.is_some()];
    let handler_count = handlers.iter().filter(|h| **h).count();
    if handler_count != 1 {
        return Err(format!("probe must specify exactly one handler, found {handler_count}"));
    }

    if normalize_success_threshold {
        probe.success_threshold = Some(1);
    }

    Ok(())
}

/// Whether binding `container_port` on the pod requires the
/// `NET_BIND_SERVICE` capability: true when the listener's privileged port
/// (< 1024) was left unmapped (`mapPrivilegedContainerPorts` disabled).
fn needs_privileged_bind(listener_port: i32, container_port: u16) -> bool {
    listener_port < 1024 && listener_port as u16 == container_port
}

#[allow(clippy::too_many_arguments)]
fn desired_deployment(
    gw: &Gateway,
    class_config: &GatewayClassConfigSpec,
    config: &Config,
    namespace: &str,
    name: &str,
    owner_ref: &OwnerReference,
    replicas: i32,
    annotation_probes: &AnnotationProbes,
) -> Deployment {
    let labels = labels(name);
    let mut container_ports = Vec::new();
    let mut privileged = false;

    for listener in &gw.spec.listeners {
        let container_port = config.to_container_port(listener.port as u16);
        if needs_privileged_bind(listener.port, container_port) {
            privileged = true;
        }
        container_ports.push(k8s_openapi::api::core::v1::ContainerPort {
            container_port: container_port as i32,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        });
    }

    let security_context = privileged.then(|| SecurityContext {
        allow_privilege_escalation: Some(true),
        capabilities: Some(Capabilities {
            add: Some(vec!["NET_BIND_SERVICE".to_string()]),
            ..Default::default()
        }),
        ..Default::default()
    });

    let command = privileged.then(|| vec!["mesh-gateway-privileged-wrapper".to_string()]);

    let container = Container {
        name: "dataplane".to_string(),
        image: Some(config.image_dataplane.clone()),
        image_pull_policy: Some(config.global_image_pull_policy.clone()),
        command,
        ports: Some(container_ports),
        env: Some(vec![
            EnvVar {
                name: "MESH_ADDRESS".to_string(),
                value: Some(config.mesh_config.address.clone()),
                ..Default::default()
            },
            EnvVar {
                name: "MESH_GRPC_PORT".to_string(),
                value: Some(config.mesh_config.grpc_port.to_string()),
                ..Default::default()
            },
        ]),
        security_context,
        liveness_probe: annotation_probes
            .liveness
            .clone()
            .or_else(|| class_config.default_liveness_probe.clone())
            .or(Some(default_probe())),
        readiness_probe: annotation_probes
            .readiness
            .clone()
            .or_else(|| class_config.default_readiness_probe.clone())
            .or(Some(default_probe())),
        startup_probe: annotation_probes.startup.clone().or_else(|| class_config.default_startup_probe.clone()),
        ..Default::default()
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            owner_references: Some(vec![owner_ref.clone()]),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(name.to_string()),
                    node_selector: (!class_config.node_selector.is_empty()).then(|| class_config.node_selector.clone()),
                    tolerations: (!class_config.tolerations.is_empty()).then(|| class_config.tolerations.clone()),
                    containers: vec![container],
                    image_pull_secrets: (!config.image_pull_secrets.is_empty()).then(|| {
                        config
                            .image_pull_secrets
                            .iter()
                            .map(|n| k8s_openapi::api::core::v1::LocalObjectReference { name: n.clone() })
                            .collect()
                    }),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn default_probe() -> Probe {
    Probe {
        tcp_socket: Some(k8s_openapi::api::core::v1::TCPSocketAction {
            port: IntOrString::Int(20200),
            ..Default::default()
        }),
        initial_delay_seconds: Some(5),
        period_seconds: Some(10),
        ..Default::default()
    }
}

/// Field-by-field Deployment comparison ignoring anything Kubernetes sets
/// server-side (`resourceVersion`, `generation`, status). Used by tests to
/// pin down what "no-op upsert" means; production relies on server-side
/// apply for the same idempotence.
pub fn compare_deployments(a: &Deployment, b: &Deployment) -> bool {
    let (Some(spec_a), Some(spec_b)) = (&a.spec, &b.spec) else {
        return a.spec.is_none() && b.spec.is_none();
    };
    spec_a.replicas == spec_b.replicas
        && spec_a.selector == spec_b.selector
        && spec_a.template.spec.as_ref().map(|s| &s.containers) == spec_b.template.spec.as_ref().map(|s| &s.containers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshConnectionConfig;

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

    fn class_config(min: Option<i32>, max: Option<i32>, default: Option<i32>) -> GatewayClassConfigSpec {
        GatewayClassConfigSpec {
            min_instances: min,
            max_instances: max,
            default_instances: default,
            node_selector: Default::default(),
            tolerations: vec![],
            service_type: Some("ClusterIP".to_string()),
            openshift_scc_name: None,
            default_liveness_probe: None,
            default_readiness_probe: None,
            default_startup_probe: None,
        }
    }

    #[test]
    fn needs_privileged_bind_only_when_unmapped_and_low() {
        assert!(needs_privileged_bind(443, 443));
        assert!(!needs_privileged_bind(443, 20443));
        assert!(!needs_privileged_bind(8080, 8080));
    }

    #[test]
    fn replica_clamp_rewrites_existing_deployment() {
        let cc = class_config(Some(1), Some(3), Some(2));
        assert_eq!(cc.clamp_replicas(Some(5)), 3);
    }

    #[test]
    fn privileged_container_gets_security_context() {
        let gw = Gateway::new(
            "gw1",
            kcr_gateway_networking_k8s_io::v1::gateways::GatewaySpec {
                gateway_class_name: "mesh".to_string(),
                listeners: vec![kcr_gateway_networking_k8s_io::v1::gateways::GatewayListeners {
                    name: "https".to_string(),
                    port: 443,
                    protocol: "HTTPS".to_string(),
                    hostname: None,
                    tls: None,
                    allowed_routes: None,
                }],
                ..Default::default()
            },
        );
        let config = base_config();
        let cc = class_config(None, None, Some(1));
        let deployment = desired_deployment(
            &gw,
            &cc,
            &config,
            "n1",
            "mesh-gateway-gw1",
            &OwnerReference::default(),
            1,
            &AnnotationProbes::default(),
        );
        let container = &deployment.spec.unwrap().template.spec.unwrap().containers[0];
        assert!(container.security_context.as_ref().unwrap().allow_privilege_escalation.unwrap());
        assert!(container.command.is_some());
    }

    #[test]
    fn unprivileged_container_has_no_security_context() {
        let gw = Gateway::new(
            "gw1",
            kcr_gateway_networking_k8s_io::v1::gateways::GatewaySpec {
                gateway_class_name: "mesh".to_string(),
                listeners: vec![kcr_gateway_networking_k8s_io::v1::gateways::GatewayListeners {
                    name: "http".to_string(),
                    port: 8080,
                    protocol: "HTTP".to_string(),
                    hostname: None,
                    tls: None,
                    allowed_routes: None,
                }],
                ..Default::default()
            },
        );
        let config = base_config();
        let cc = class_config(None, None, Some(1));
        let deployment = desired_deployment(
            &gw,
            &cc,
            &config,
            "n1",
            "mesh-gateway-gw1",
            &OwnerReference::default(),
            1,
            &AnnotationProbes::default(),
        );
        let container = &deployment.spec.unwrap().template.spec.unwrap().containers[0];
        assert!(container.security_context.is_none());
    }

    #[test]
    fn service_target_port_follows_container_port_mapping() {
        let gw = Gateway::new(
            "gw1",
            kcr_gateway_networking_k8s_io::v1::gateways::GatewaySpec {
                gateway_class_name: "mesh".to_string(),
                listeners: vec![kcr_gateway_networking_k8s_io::v1::gateways::GatewayListeners {
                    name: "https".to_string(),
                    port: 443,
                    protocol: "HTTPS".to_string(),
                    hostname: None,
                    tls: None,
                    allowed_routes: None,
                }],
                ..Default::default()
            },
        );
        let mut config = base_config();
        config.map_privileged_container_ports = 20000;
        assert_eq!(config.to_container_port(443), 20443);

        let ports: Vec<ServicePort> = gw
            .spec
            .listeners
            .iter()
            .map(|l| ServicePort {
                target_port: Some(IntOrString::Int(config.to_container_port(l.port as u16) as i32)),
                ..Default::default()
            })
            .collect();
        assert_eq!(ports[0].target_port, Some(IntOrString::Int(20443)));
    }

    #[test]
    fn service_type_none_when_class_config_unset() {
        let mut cc = class_config(None, None, Some(1));
        cc.service_type = None;
        assert_eq!(service_type_for(&cc), None);
    }

    #[test]
    fn service_type_follows_class_config() {
        let mut cc = class_config(None, None, Some(1));
        cc.service_type = Some("LoadBalancer".to_string());
        assert_eq!(service_type_for(&cc), Some("LoadBalancer".to_string()));
    }

    #[test]
    fn probe_annotation_overrides_class_default() {
        let mut gw = Gateway::new("gw1", kcr_gateway_networking_k8s_io::v1::gateways::GatewaySpec::default());
        gw.metadata.annotations = Some(
            [(
                "mesh-gateway.dev/liveness-probe".to_string(),
                r#"{"tcpSocket": {"port": 9999}, "successThreshold": 5}"#.to_string(),
            )]
            .into(),
        );

        let probes = annotation_probes(&gw).unwrap();
        let liveness = probes.liveness.unwrap();
        assert_eq!(liveness.tcp_socket.unwrap().port, IntOrString::Int(9999));
        // Normalized: liveness probes must have successThreshold == 1.
        assert_eq!(liveness.success_threshold, Some(1));
    }

    #[test]
    fn probe_annotation_rejects_multiple_handlers() {
        let mut gw = Gateway::new("gw1", kcr_gateway_networking_k8s_io::v1::gateways::GatewaySpec::default());
        gw.metadata.annotations = Some(
            [(
                "mesh-gateway.dev/readiness-probe".to_string(),
                r#"{"tcpSocket": {"port": 1}, "httpGet": {"port": 2}}"#.to_string(),
            )]
            .into(),
        );

        assert!(matches!(annotation_probes(&gw), Err(Error::ProbeParse(_))));
    }

    #[test]
    fn probe_annotation_absent_yields_none() {
        let gw = Gateway::new("gw1", kcr_gateway_networking_k8s_io::v1::gateways::GatewaySpec::default());
        let probes = annotation_probes(&gw).unwrap();
        assert!(probes.liveness.is_none());
        assert!(probes.readiness.is_none());
        assert!(probes.startup.is_none());
    }

    #[test]
    fn check_ownership_allows_absent_child() {
        let owner_ref = OwnerReference {
            uid: "abc".to_string(),
            ..Default::default()
        };
        assert!(check_ownership(None, &owner_ref, "Service", "n1").is_ok());
    }

    #[test]
    fn check_ownership_allows_child_with_matching_owner() {
        let owner_ref = OwnerReference {
            uid: "abc".to_string(),
            ..Default::default()
        };
        let meta = ObjectMeta {
            owner_references: Some(vec![owner_ref.clone()]),
            ..Default::default()
        };
        assert!(check_ownership(Some(&meta), &owner_ref, "Service", "n1").is_ok());
    }

    #[test]
    fn check_ownership_rejects_child_without_owner_reference() {
        let owner_ref = OwnerReference {
            uid: "abc".to_string(),
            ..Default::default()
        };
        let meta = ObjectMeta::default();
        assert!(matches!(check_ownership(Some(&meta), &owner_ref, "Service", "n1"), Err(Error::OwnershipConflict(_))));
    }
}
