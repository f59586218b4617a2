//! The Gateway control loop: watches `Gateway`, the Deployment it owns, and
//! `HTTPRoute`/`TCPRoute` (which carry `parentRefs` rather than
//! `ownerReferences`, so they're wired via `watches` with a mapper instead of
//! `owns`). Each pass builds a [`ResourceMap`], asks the [`Binder`] to
//! compute mesh mutations and Kubernetes status, flushes both, and upserts
//! the Gateway's Kubernetes children via [`Gatekeeper`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Secret, Service};
use kcr_gateway_networking_k8s_io::v1::gateways::{
    Gateway, GatewayStatus, GatewayStatusListeners, GatewayStatusListenersSupportedKinds,
};
use kcr_gateway_networking_k8s_io::v1::httproutes::{
    HTTPRoute, HttpRouteStatus, HttpRouteStatusParents, HttpRouteStatusParentsParentRef,
};
use kcr_gateway_networking_k8s_io::v1alpha2::referencegrants::ReferenceGrant;
use kcr_gateway_networking_k8s_io::v1alpha2::tcproutes::{
    TCPRoute, TcpRouteStatus, TcpRouteStatusParents, TcpRouteStatusParentsParentRef,
};
use kube::api::{ListParams, Patch, PatchParams};
use kube::runtime::controller::{Action, Error as ControllerError};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::{watcher, Controller};
use kube::{Api, Client, Resource};
use serde_json::json;
use tracing::{instrument, Level};

use super::owner_ref_from_object_ref;
use crate::api::{GatewayClassConfig, GatewayClassConfigSpec, MeshService};
use crate::binder::{BindOutput, Binder};
use crate::config::Config;
use crate::gatekeeper::Gatekeeper;
use crate::mesh::{ConfigEntryBody, MeshClient};
use crate::refs::{conditions_equal, ConfigEntryKind, Reference};
use crate::resource_map::{Mutation, ResourceMap};
use crate::translate::TranslatorConfig;
use crate::{Error, Result};

const FINALIZER: &str = "gateway-finalizer.mesh-gateway.dev";
const CONTROLLER_NAME: &str = "mesh-gateway.dev/gateway-controller";
const GATEWAY_CLASS_CONFIG_ANNOTATION: &str = "mesh-gateway.dev/gateway-class-config";

pub struct Context {
    pub client: Client,
    pub mesh_client: Arc<dyn MeshClient>,
    pub config: Config,
}

pub fn control_loop(
    context: Arc<Context>,
) -> impl Stream<Item = std::result::Result<(ObjectRef<Gateway>, Action), ControllerError<Error, watcher::Error>>> {
    let client = context.client.clone();
    let gateways = Api::<Gateway>::all(client.clone());
    let deployments = Api::<Deployment>::all(client.clone());
    let http_routes = Api::<HTTPRoute>::all(client.clone());
    let tcp_routes = Api::<TCPRoute>::all(client.clone());

    Controller::new(gateways, watcher::Config::default())
        .owns(deployments, watcher::Config::default())
        .watches(http_routes, watcher::Config::default(), http_route_to_gateways)
        .watches(tcp_routes, watcher::Config::default(), tcp_route_to_gateways)
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
}

fn http_route_to_gateways(route: HTTPRoute) -> impl Iterator<Item = ObjectRef<Gateway>> {
    let route_namespace = route.metadata.namespace.clone().unwrap_or_default();
    route
        .spec
        .parent_refs
        .into_iter()
        .flatten()
        .filter(|p| p.kind.as_deref().unwrap_or("Gateway") == "Gateway")
        .map(move |p| ObjectRef::new(&p.name).within(p.namespace.as_deref().unwrap_or(&route_namespace)))
        .collect::<Vec<_>>()
        .into_iter()
}

fn tcp_route_to_gateways(route: TCPRoute) -> impl Iterator<Item = ObjectRef<Gateway>> {
    let route_namespace = route.metadata.namespace.clone().unwrap_or_default();
    route
        .spec
        .parent_refs
        .into_iter()
        .flatten()
        .filter(|p| p.kind.as_deref().unwrap_or("Gateway") == "Gateway")
        .map(move |p| ObjectRef::new(&p.name).within(p.namespace.as_deref().unwrap_or(&route_namespace)))
        .collect::<Vec<_>>()
        .into_iter()
}

#[instrument(level = Level::DEBUG, skip(context))]
async fn reconcile(gw: Arc<Gateway>, context: Arc<Context>) -> Result<Action> {
    let namespace = gw.metadata.namespace.clone().ok_or(Error::MissingField)?;
    let name = gw.metadata.name.clone().ok_or(Error::MissingField)?;
    let client = context.client.clone();
    let gateways = Api::<Gateway>::namespaced(client.clone(), &namespace);

    if gw.metadata.deletion_timestamp.is_some() {
        return delete_gateway(&gw, &namespace, &name, &context).await;
    }

    ensure_finalizer(&gateways, &gw).await?;

    let class_config = load_class_config(&client, &namespace, &gw).await?;

    let resource_map = ResourceMap::new();
    seed_resource_map(&context.mesh_client, &client, &namespace, &name, &resource_map).await?;

    let http_routes = Api::<HTTPRoute>::namespaced(client.clone(), &namespace)
        .list(&ListParams::default())
        .await?
        .items;
    let tcp_routes = Api::<TCPRoute>::namespaced(client.clone(), &namespace)
        .list(&ListParams::default())
        .await?
        .items;
    let grants = Api::<ReferenceGrant>::namespaced(client.clone(), &namespace)
        .list(&ListParams::default())
        .await?
        .items;
    let secrets: HashMap<(String, String), Secret> = Api::<Secret>::namespaced(client.clone(), &namespace)
        .list(&ListParams::default())
        .await?
        .items
        .into_iter()
        .map(|s| ((s.metadata.namespace.clone().unwrap_or_default(), s.metadata.name.clone().unwrap_or_default()), s))
        .collect();

    let translator_config = TranslatorConfig::from(&context.config);
    let binder = Binder::new(translator_config);
    let output = binder.bind(&gw, &resource_map, &http_routes, &tcp_routes, &grants, &secrets);

    let owner_ref = owner_ref_from_object_ref(&gw.object_ref(&()))?;
    let gatekeeper = Gatekeeper::new(client.clone());
    gatekeeper.upsert(&gw, &class_config, &context.config, owner_ref).await?;

    flush_mutations(&context.mesh_client, &resource_map).await;

    patch_gateway_status(&gateways, &gw, &output).await?;
    patch_http_route_statuses(&client, &http_routes, &output).await?;
    patch_tcp_route_statuses(&client, &tcp_routes, &output).await?;

    Ok(Action::requeue(Duration::from_secs(300)))
}

fn error_policy(_gw: Arc<Gateway>, error: &Error, _context: Arc<Context>) -> Action {
    tracing::warn!(%error, "reconcile failed, requeueing");
    Action::requeue(Duration::from_secs(10))
}

async fn ensure_finalizer(api: &Api<Gateway>, gw: &Gateway) -> Result<()> {
    if gw.metadata.finalizers.as_ref().is_some_and(|f| f.iter().any(|f| f == FINALIZER)) {
        return Ok(());
    }
    let mut finalizers = gw.metadata.finalizers.clone().unwrap_or_default();
    finalizers.push(FINALIZER.to_string());
    let name = gw.metadata.name.as_deref().unwrap_or_default();
    api.patch(name, &PatchParams::default(), &Patch::Merge(json!({ "metadata": { "finalizers": finalizers } })))
        .await?;
    Ok(())
}

async fn remove_finalizer(api: &Api<Gateway>, gw: &Gateway) -> Result<()> {
    let finalizers: Vec<String> = gw
        .metadata
        .finalizers
        .clone()
        .unwrap_or_default()
        .into_iter()
        .filter(|f| f != FINALIZER)
        .collect();
    let name = gw.metadata.name.as_deref().unwrap_or_default();
    api.patch(name, &PatchParams::default(), &Patch::Merge(json!({ "metadata": { "finalizers": finalizers } })))
        .await?;
    Ok(())
}

async fn load_class_config(client: &Client, namespace: &str, gw: &Gateway) -> Result<GatewayClassConfigSpec> {
    let Some(name) = gw.metadata.annotations.as_ref().and_then(|a| a.get(GATEWAY_CLASS_CONFIG_ANNOTATION)) else {
        return Ok(default_class_config());
    };
    let api = Api::<GatewayClassConfig>::namespaced(client.clone(), namespace);
    Ok(api.get_opt(name).await?.map(|c| c.spec).unwrap_or_else(default_class_config))
}

fn default_class_config() -> GatewayClassConfigSpec {
    GatewayClassConfigSpec {
        min_instances: None,
        max_instances: None,
        default_instances: None,
        node_selector: Default::default(),
        tolerations: vec![],
        service_type: Some("ClusterIP".to_string()),
        openshift_scc_name: None,
        default_liveness_probe: None,
        default_readiness_probe: None,
        default_startup_probe: None,
    }
}

fn cert_refs_of(entry: &crate::mesh::ConfigEntry) -> Vec<Reference> {
    match &entry.body {
        ConfigEntryBody::ApiGateway(g) => g.listeners.iter().flat_map(|l| l.tls_certificates.clone()).collect(),
        _ => vec![],
    }
}

/// Seed known backends and cross-Gateway parent counts so that the Binder
/// pass (which only sees this reconcile's own calls) can still GC a
/// certificate shared with another Gateway correctly: a cert stays live as
/// long as some *other* already-materialized Gateway references it.
async fn seed_resource_map(
    mesh_client: &Arc<dyn MeshClient>,
    client: &Client,
    namespace: &str,
    this_gateway_name: &str,
    resource_map: &ResourceMap,
) -> Result<()> {
    for entry in mesh_client.list(ConfigEntryKind::ApiGateway, namespace).await? {
        if entry.name == this_gateway_name {
            resource_map.reference_count_consul_api_gateway(entry);
            continue;
        }
        let other_gw_ref = entry.reference();
        resource_map.reference_count_gateway(&other_gw_ref, &cert_refs_of(&entry));
    }

    for entry in mesh_client.list(ConfigEntryKind::HttpRoute, namespace).await? {
        resource_map.reference_count_consul_http_route(entry);
    }
    for entry in mesh_client.list(ConfigEntryKind::TcpRoute, namespace).await? {
        resource_map.reference_count_consul_tcp_route(entry);
    }
    for entry in mesh_client.list(ConfigEntryKind::FileSystemCertificate, namespace).await? {
        resource_map.reference_count_consul_certificate(entry);
    }

    for service in Api::<Service>::namespaced(client.clone(), namespace).list(&ListParams::default()).await?.items {
        if let Some(name) = service.metadata.name.clone() {
            resource_map.add_service(Reference::new(ConfigEntryKind::ApiGateway, name.clone()).with_namespace(namespace.to_string()), name);
        }
    }
    for mesh_service in Api::<MeshService>::namespaced(client.clone(), namespace).list(&ListParams::default()).await?.items {
        let Some(k8s_name) = mesh_service.metadata.name.clone() else {
            continue;
        };
        let mesh_name = mesh_service.spec.mesh_name.clone().unwrap_or_else(|| mesh_service.spec.name.clone());
        resource_map.add_mesh_service(Reference::new(ConfigEntryKind::ApiGateway, k8s_name).with_namespace(namespace.to_string()), mesh_name);
    }

    Ok(())
}

async fn flush_mutations(mesh_client: &Arc<dyn MeshClient>, resource_map: &ResourceMap) {
    for mutation in resource_map.mutations() {
        let result = match mutation {
            Mutation::Upsert(entry) => mesh_client.write(entry).await,
            Mutation::Delete(kind, reference) => mesh_client.delete(kind, &reference).await,
        };
        if let Err(error) = result {
            tracing::error!(%error, "failed to flush mesh mutation");
        }
    }
}

/// Deletion bypasses the Binder entirely: `Binder::bind` would re-register
/// the dying Gateway as a parent of its own cert refs (via
/// `reference_count_gateway`), which defeats GC. Instead we seed parents from
/// every *other* Gateway, then directly unbind this Gateway's routes and
/// drop its certificates once no other parent remains.
async fn delete_gateway(gw: &Gateway, namespace: &str, name: &str, context: &Context) -> Result<Action> {
    let gatekeeper = Gatekeeper::new(context.client.clone());
    gatekeeper.delete(name, namespace).await?;

    let resource_map = ResourceMap::new();
    seed_resource_map(&context.mesh_client, &context.client, namespace, name, &resource_map).await?;

    let gw_ref = Reference::new(ConfigEntryKind::ApiGateway, name.to_string()).with_namespace(namespace.to_string());

    let own_cert_refs = context
        .mesh_client
        .list(ConfigEntryKind::ApiGateway, namespace)
        .await?
        .into_iter()
        .find(|e| e.name == name)
        .map(|e| cert_refs_of(&e))
        .unwrap_or_default();

    for entry in context.mesh_client.list(ConfigEntryKind::HttpRoute, namespace).await? {
        let route_ref = entry.reference();
        let ConfigEntryBody::HttpRoute(route) = &entry.body else { continue };
        if !route.parent_refs.iter().any(|p| p.normalize() == gw_ref.normalize()) {
            continue;
        }
        let mut mutated = entry.clone();
        if let ConfigEntryBody::HttpRoute(r) = &mut mutated.body {
            r.parent_refs.retain(|p| p.normalize() != gw_ref.normalize());
        }
        resource_map.mutate_http_route(&route_ref, mutated);
    }

    for entry in context.mesh_client.list(ConfigEntryKind::TcpRoute, namespace).await? {
        let route_ref = entry.reference();
        let ConfigEntryBody::TcpRoute(route) = &entry.body else { continue };
        if !route.parent_refs.iter().any(|p| p.normalize() == gw_ref.normalize()) {
            continue;
        }
        let mut mutated = entry.clone();
        if let ConfigEntryBody::TcpRoute(r) = &mut mutated.body {
            r.parent_refs.retain(|p| p.normalize() != gw_ref.normalize());
        }
        resource_map.mutate_tcp_route(&route_ref, mutated);
    }

    for cert_ref in own_cert_refs {
        if !resource_map.certificate_has_other_parents(&cert_ref) {
            resource_map.enqueue_delete(ConfigEntryKind::FileSystemCertificate, cert_ref);
        }
    }

    resource_map.enqueue_delete(ConfigEntryKind::ApiGateway, gw_ref);

    flush_mutations(&context.mesh_client, &resource_map).await;

    let gateways = Api::<Gateway>::namespaced(context.client.clone(), namespace);
    remove_finalizer(&gateways, gw).await?;

    Ok(Action::await_change())
}

async fn patch_gateway_status(api: &Api<Gateway>, gw: &Gateway, output: &BindOutput) -> Result<()> {
    let listeners: Vec<GatewayStatusListeners> = output
        .listener_statuses
        .iter()
        .map(|l| GatewayStatusListeners {
            attached_routes: 0,
            conditions: l.conditions.clone(),
            name: l.name.clone(),
            supported_kinds: vec![
                GatewayStatusListenersSupportedKinds {
                    group: Some("gateway.networking.k8s.io".to_string()),
                    kind: "HTTPRoute".to_string(),
                },
                GatewayStatusListenersSupportedKinds {
                    group: Some("gateway.networking.k8s.io".to_string()),
                    kind: "TCPRoute".to_string(),
                },
            ],
        })
        .collect();

    let new_status = GatewayStatus {
        addresses: None,
        attached_listeners: Some(listeners.len() as i32),
        conditions: Some(output.gateway_conditions.clone()),
        listeners: Some(listeners),
    };

    let unchanged = gw.status.as_ref().is_some_and(|existing| {
        conditions_equal(existing.conditions.as_deref().unwrap_or(&[]), new_status.conditions.as_deref().unwrap_or(&[]))
            && existing.listeners.as_ref().map(Vec::len).unwrap_or(0) == new_status.listeners.as_ref().map(Vec::len).unwrap_or(0)
    });
    if unchanged {
        return Ok(());
    }

    let name = gw.metadata.name.as_deref().unwrap_or_default();
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(json!({ "status": new_status }))).await?;
    Ok(())
}

async fn patch_http_route_statuses(client: &Client, routes: &[HTTPRoute], output: &BindOutput) -> Result<()> {
    for route in routes {
        let route_namespace = route.metadata.namespace.clone().unwrap_or_default();
        let route_name = route.metadata.name.clone().unwrap_or_default();
        let route_ref = Reference::new(ConfigEntryKind::HttpRoute, route_name.clone()).with_namespace(route_namespace.clone());

        let Some(parent_status) = output.http_route_statuses.get(&route_ref) else {
            continue;
        };
        let Some(parent_ref) = route.spec.parent_refs.iter().flatten().find(|p| p.kind.as_deref().unwrap_or("Gateway") == "Gateway") else {
            continue;
        };

        let new_parent = HttpRouteStatusParents {
            conditions: parent_status.conditions.clone(),
            controller_name: CONTROLLER_NAME.to_string(),
            parent_ref: HttpRouteStatusParentsParentRef {
                group: parent_ref.group.clone(),
                kind: parent_ref.kind.clone(),
                name: parent_ref.name.clone(),
                namespace: parent_ref.namespace.clone(),
                port: parent_ref.port,
                section_name: parent_ref.section_name.clone(),
            },
        };

        let unchanged = route.status.as_ref().is_some_and(|existing| {
            existing.parents.iter().any(|p| {
                p.controller_name == CONTROLLER_NAME && p.parent_ref == new_parent.parent_ref && conditions_equal(&p.conditions, &new_parent.conditions)
            })
        });
        if unchanged {
            continue;
        }

        let mut parents: Vec<HttpRouteStatusParents> = route.status.as_ref().map(|s| s.parents.clone()).unwrap_or_default();
        parents.retain(|p| p.controller_name != CONTROLLER_NAME);
        parents.push(new_parent);

        let api = Api::<HTTPRoute>::namespaced(client.clone(), &route_namespace);
        api.patch_status(&route_name, &PatchParams::default(), &Patch::Merge(json!({ "status": HttpRouteStatus { parents } })))
            .await?;
    }
    Ok(())
}

async fn patch_tcp_route_statuses(client: &Client, routes: &[TCPRoute], output: &BindOutput) -> Result<()> {
    for route in routes {
        let route_namespace = route.metadata.namespace.clone().unwrap_or_default();
        let route_name = route.metadata.name.clone().unwrap_or_default();
        let route_ref = Reference::new(ConfigEntryKind::TcpRoute, route_name.clone()).with_namespace(route_namespace.clone());

        let Some(parent_status) = output.tcp_route_statuses.get(&route_ref) else {
            continue;
        };
        let Some(parent_ref) = route.spec.parent_refs.iter().flatten().find(|p| p.kind.as_deref().unwrap_or("Gateway") == "Gateway") else {
            continue;
        };

        let new_parent = TcpRouteStatusParents {
            conditions: parent_status.conditions.clone(),
            controller_name: CONTROLLER_NAME.to_string(),
            parent_ref: TcpRouteStatusParentsParentRef {
                group: parent_ref.group.clone(),
                kind: parent_ref.kind.clone(),
                name: parent_ref.name.clone(),
                namespace: parent_ref.namespace.clone(),
                port: parent_ref.port,
                section_name: parent_ref.section_name.clone(),
            },
        };

        let unchanged = route.status.as_ref().is_some_and(|existing| {
            existing.parents.iter().any(|p| {
                p.controller_name == CONTROLLER_NAME && p.parent_ref == new_parent.parent_ref && conditions_equal(&p.conditions, &new_parent.conditions)
            })
        });
        if unchanged {
            continue;
        }

        let mut parents: Vec<TcpRouteStatusParents> = route.status.as_ref().map(|s| s.parents.clone()).unwrap_or_default();
        parents.retain(|p| p.controller_name != CONTROLLER_NAME);
        parents.push(new_parent);

        let api = Api::<TCPRoute>::namespaced(client.clone(), &route_namespace);
        api.patch_status(&route_name, &PatchParams::default(), &Patch::Merge(json!({ "status": TcpRouteStatus { parents } })))
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kcr_gateway_networking_k8s_io::v1::httproutes::HttpRouteParentRefs;
    use kcr_gateway_networking_k8s_io::v1alpha2::tcproutes::TcpRouteParentRefs;

    use super::*;
    use crate::mesh::{ApiGatewayEntry, ConfigEntry, ConfigEntryBody};

    fn http_route(namespace: &str, parents: Vec<HttpRouteParentRefs>) -> HTTPRoute {
        HTTPRoute {
            metadata: ObjectMeta {
                name: Some("r1".to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            spec: kcr_gateway_networking_k8s_io::v1::httproutes::HttpRouteSpec {
                parent_refs: Some(parents),
                ..Default::default()
            },
            status: None,
        }
    }

    fn tcp_route(namespace: &str, parents: Vec<TcpRouteParentRefs>) -> TCPRoute {
        TCPRoute {
            metadata: ObjectMeta {
                name: Some("r1".to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            spec: kcr_gateway_networking_k8s_io::v1alpha2::tcproutes::TcpRouteSpec {
                parent_refs: Some(parents),
                ..Default::default()
            },
            status: None,
        }
    }

    #[test]
    fn http_route_to_gateways_defaults_namespace_and_kind() {
        let route = http_route(
            "ns1",
            vec![HttpRouteParentRefs {
                group: None,
                kind: None,
                name: "gw1".to_string(),
                namespace: None,
                port: None,
                section_name: None,
            }],
        );
        let refs: Vec<_> = http_route_to_gateways(route).collect();
        assert_eq!(refs, vec![ObjectRef::new("gw1").within("ns1")]);
    }

    #[test]
    fn http_route_to_gateways_honors_explicit_namespace() {
        let route = http_route(
            "ns1",
            vec![HttpRouteParentRefs {
                group: None,
                kind: None,
                name: "gw1".to_string(),
                namespace: Some("other-ns".to_string()),
                port: None,
                section_name: None,
            }],
        );
        let refs: Vec<_> = http_route_to_gateways(route).collect();
        assert_eq!(refs, vec![ObjectRef::new("gw1").within("other-ns")]);
    }

    #[test]
    fn http_route_to_gateways_ignores_non_gateway_parents() {
        let route = http_route(
            "ns1",
            vec![HttpRouteParentRefs {
                group: None,
                kind: Some("Service".to_string()),
                name: "svc1".to_string(),
                namespace: None,
                port: None,
                section_name: None,
            }],
        );
        let refs: Vec<_> = http_route_to_gateways(route).collect();
        assert!(refs.is_empty());
    }

    #[test]
    fn tcp_route_to_gateways_defaults_namespace_and_kind() {
        let route = tcp_route(
            "ns1",
            vec![TcpRouteParentRefs {
                group: None,
                kind: None,
                name: "gw1".to_string(),
                namespace: None,
                port: None,
                section_name: None,
            }],
        );
        let refs: Vec<_> = tcp_route_to_gateways(route).collect();
        assert_eq!(refs, vec![ObjectRef::new("gw1").within("ns1")]);
    }

    #[test]
    fn default_class_config_uses_cluster_ip_service() {
        let config = default_class_config();
        assert_eq!(config.service_type.as_deref(), Some("ClusterIP"));
        assert!(config.tolerations.is_empty());
    }

    #[test]
    fn cert_refs_of_extracts_listener_certificates() {
        let cert_ref = Reference::new(ConfigEntryKind::FileSystemCertificate, "cert1".to_string()).with_namespace("ns1".to_string());
        let entry = ConfigEntry {
            kind: ConfigEntryKind::ApiGateway,
            name: "gw1".to_string(),
            namespace: "ns1".to_string(),
            partition: "default".to_string(),
            meta: Default::default(),
            body: ConfigEntryBody::ApiGateway(ApiGatewayEntry {
                listeners: vec![crate::mesh::ApiGatewayListener {
                    name: "listener1".to_string(),
                    port: 443,
                    protocol: "http".to_string(),
                    tls_certificates: vec![cert_ref.clone()],
                    tls_mode: Some("terminate".to_string()),
                }],
            }),
            modify_index: None,
        };

        assert_eq!(cert_refs_of(&entry), vec![cert_ref]);
    }

    #[test]
    fn cert_refs_of_empty_for_non_gateway_entries() {
        let entry = ConfigEntry {
            kind: ConfigEntryKind::HttpRoute,
            name: "r1".to_string(),
            namespace: "ns1".to_string(),
            partition: "default".to_string(),
            meta: Default::default(),
            body: ConfigEntryBody::HttpRoute(crate::mesh::HttpRouteEntry {
                parent_refs: vec![],
                hostnames: vec![],
                rules: vec![],
            }),
            modify_index: None,
        };

        assert!(cert_refs_of(&entry).is_empty());
    }
}
