//! Computes Route/Certificate admissibility against a Gateway and emits mesh
//! mutations (via the [`ResourceMap`]) plus the Kubernetes status
//! conditions that should be written back. Never touches the mesh client or
//! the Kubernetes API directly — the Reconciler flushes both queues.

use std::collections::{BTreeMap, HashMap};

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kcr_gateway_networking_k8s_io::v1::gateways::Gateway;
use kcr_gateway_networking_k8s_io::v1::httproutes::HTTPRoute;
use kcr_gateway_networking_k8s_io::v1alpha2::referencegrants::ReferenceGrant;
use kcr_gateway_networking_k8s_io::v1alpha2::tcproutes::TCPRoute;

use crate::mesh::ConfigEntryBody;
use crate::refs::{ConfigEntryKind, Reference};
use crate::resource_map::ResourceMap;
use crate::translate::{self, TranslatorConfig};

/// Per-(Route, parentRef-that-targets-this-Gateway) status.
#[derive(Clone, Debug)]
pub struct ParentStatus {
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug)]
pub struct ListenerStatus {
    pub name: String,
    pub conditions: Vec<Condition>,
}

#[derive(Default)]
pub struct BindOutput {
    pub gateway_conditions: Vec<Condition>,
    pub listener_statuses: Vec<ListenerStatus>,
    /// Keyed by route reference; only routes that target this Gateway
    /// appear here.
    pub http_route_statuses: HashMap<Reference, ParentStatus>,
    pub tcp_route_statuses: HashMap<Reference, ParentStatus>,
}

fn condition(type_: &str, true_: bool, reason: &str, message: &str, observed_generation: i64) -> Condition {
    Condition {
        last_transition_time: k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(
            chrono::DateTime::<chrono::Utc>::from_timestamp(0, 0).unwrap(),
        ),
        message: message.to_string(),
        observed_generation: Some(observed_generation),
        reason: reason.to_string(),
        status: if true_ { "True" } else { "False" }.to_string(),
        type_: type_.to_string(),
    }
}

fn gateway_ref(gw: &Gateway) -> Reference {
    Reference::new(ConfigEntryKind::ApiGateway, gw.metadata.name.clone().unwrap_or_default())
        .with_namespace(gw.metadata.namespace.clone().unwrap_or_default())
}

fn parent_ref_targets_gateway(parent_name: &str, parent_namespace: Option<&str>, route_namespace: &str, gw: &Gateway) -> bool {
    let gw_name = gw.metadata.name.as_deref().unwrap_or_default();
    let gw_namespace = gw.metadata.namespace.as_deref().unwrap_or_default();
    let effective_namespace = parent_namespace.unwrap_or(route_namespace);
    parent_name == gw_name && effective_namespace == gw_namespace
}

fn hostnames_intersect(route_hostnames: &[String], listener_hostname: Option<&str>) -> bool {
    let Some(listener_hostname) = listener_hostname else {
        return true;
    };
    if route_hostnames.is_empty() {
        return true;
    }
    route_hostnames.iter().any(|h| hostname_matches(h, listener_hostname) || hostname_matches(listener_hostname, h))
}

fn hostname_matches(pattern: &str, candidate: &str) -> bool {
    if pattern == candidate {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return candidate.ends_with(suffix) && candidate.len() > suffix.len();
    }
    false
}

pub struct Binder {
    pub translator_config: TranslatorConfig,
}

impl Binder {
    pub fn new(translator_config: TranslatorConfig) -> Self {
        Self { translator_config }
    }

    pub fn bind(
        &self,
        gw: &Gateway,
        resource_map: &ResourceMap,
        http_routes: &[HTTPRoute],
        tcp_routes: &[TCPRoute],
        grants: &[ReferenceGrant],
        secrets: &HashMap<(String, String), Secret>,
    ) -> BindOutput {
        let gw_ref = gateway_ref(gw);
        let gw_namespace = gw.metadata.namespace.clone().unwrap_or_default();
        let generation = gw.metadata.generation.unwrap_or(0);

        let (api_gw_entry, drops) = translate::to_api_gateway(gw, grants, |ns, name| {
            secrets.contains_key(&(ns.to_string(), name.to_string()))
        });
        for drop in &drops.0 {
            tracing::info!(gateway = %gw_ref.name, %drop, "translator dropped a reference");
        }

        let cert_refs: Vec<Reference> = api_gw_entry.listeners.iter().flat_map(|l| l.tls_certificates.clone()).collect();
        resource_map.reference_count_gateway(&gw_ref, &cert_refs);

        let mut listener_statuses = Vec::with_capacity(gw.spec.listeners.len());
        let mut all_accepted = true;
        let mut all_resolved = true;

        for (listener, entry_listener) in gw.spec.listeners.iter().zip(&api_gw_entry.listeners) {
            let protocol_supported = matches!(entry_listener.protocol.as_str(), "http" | "tcp");
            let certs_resolved = listener.tls.as_ref().map(|t| t.certificate_refs.as_ref().map(|c| c.len()).unwrap_or(0)).unwrap_or(0)
                == entry_listener.tls_certificates.len();

            all_accepted &= protocol_supported;
            all_resolved &= certs_resolved;

            listener_statuses.push(ListenerStatus {
                name: listener.name.clone(),
                conditions: vec![
                    condition("Accepted", protocol_supported, "Accepted", "listener protocol supported", generation),
                    condition(
                        "ResolvedRefs",
                        certs_resolved,
                        if certs_resolved { "ResolvedRefs" } else { "InvalidCertificateRef" },
                        "certificate references resolved",
                        generation,
                    ),
                    condition("Programmed", protocol_supported && certs_resolved, "Programmed", "listener programmed", generation),
                ],
            });
        }

        resource_map.upsert_api_gateway(crate::mesh::ConfigEntry {
            kind: ConfigEntryKind::ApiGateway,
            name: gw_ref.name.clone(),
            namespace: gw_namespace.clone(),
            partition: self.translator_config.partition.clone(),
            meta: BTreeMap::new(),
            body: ConfigEntryBody::ApiGateway(api_gw_entry),
            modify_index: None,
        });

        let mut output = BindOutput {
            gateway_conditions: vec![
                condition("Accepted", all_accepted, "Accepted", "gateway accepted", generation),
                condition("Programmed", all_accepted && all_resolved, "Programmed", "gateway programmed", generation),
            ],
            listener_statuses,
            http_route_statuses: HashMap::new(),
            tcp_route_statuses: HashMap::new(),
        };

        for route in http_routes {
            self.bind_http_route(route, gw, &gw_ref, resource_map, grants, secrets, &mut output);
        }
        for route in tcp_routes {
            self.bind_tcp_route(route, gw, &gw_ref, resource_map, grants, secrets, &mut output);
        }

        for cert_ref in &cert_refs {
            let Some((ns, name)) = secrets.keys().find(|(ns, name)| ns == &cert_ref.namespace && name == &cert_ref.name) else {
                continue;
            };
            let secret = &secrets[&(ns.clone(), name.clone())];
            match translate::to_file_system_certificate(secret, self.translator_config.fips_mode) {
                Ok(entry) => {
                    resource_map.translate_file_system_certificate(
                        cert_ref,
                        crate::mesh::ConfigEntry {
                            kind: ConfigEntryKind::FileSystemCertificate,
                            name: cert_ref.name.clone(),
                            namespace: cert_ref.namespace.clone(),
                            partition: self.translator_config.partition.clone(),
                            meta: BTreeMap::new(),
                            body: ConfigEntryBody::FileSystemCertificate(entry),
                            modify_index: None,
                        },
                    );
                }
                Err(e) => {
                    tracing::info!(certificate = %cert_ref.name, error = %e, "certificate translation failed");
                    // Exempt from GC without writing: a prior correct entry
                    // must be left untouched.
                    resource_map.exempt_certificate_from_gc(cert_ref);
                }
            }
        }

        for gc_ref in resource_map.resources_to_gc(&gw_ref) {
            resource_map.enqueue_delete(gc_ref.kind, gc_ref);
        }

        output
    }

    #[allow(clippy::too_many_arguments)]
    fn bind_http_route(
        &self,
        route: &HTTPRoute,
        gw: &Gateway,
        gw_ref: &Reference,
        resource_map: &ResourceMap,
        grants: &[ReferenceGrant],
        secrets: &HashMap<(String, String), Secret>,
        output: &mut BindOutput,
    ) {
        let route_namespace = route.metadata.namespace.clone().unwrap_or_default();
        let route_ref = Reference::new(ConfigEntryKind::HttpRoute, route.metadata.name.clone().unwrap_or_default())
            .with_namespace(route_namespace.clone());

        let targets_this_gateway = route.spec.parent_refs.iter().flatten().any(|p| {
            parent_ref_targets_gateway(&p.name, p.namespace.as_deref(), &route_namespace, gw)
        });
        if !targets_this_gateway {
            return;
        }

        resource_map.reference_count_http_route(&route_ref, std::slice::from_ref(gw_ref));

        let (translated, drops) = translate::to_http_route(route, grants, |ns, _group, kind, name| {
            if kind.eq_ignore_ascii_case("MeshService") {
                resource_map.has_mesh_service(&Reference::new(ConfigEntryKind::ApiGateway, name).with_namespace(ns))
            } else {
                resource_map.has_service(&Reference::new(ConfigEntryKind::ApiGateway, name).with_namespace(ns))
            }
        });
        let _ = secrets;
        for drop in &drops.0 {
            tracing::info!(route = %route_ref.name, %drop, "translator dropped a reference");
        }

        let route_hostnames = translated.hostnames.clone();
        let listener_hostnames_match = gw.spec.listeners.iter().any(|l| hostnames_intersect(&route_hostnames, l.hostname.as_deref()));
        let backends_resolve = translated.rules.iter().any(|r| !r.backend_refs.is_empty()) || translated.rules.is_empty();
        let accepted = listener_hostnames_match && backends_resolve;

        let old = resource_map.existing_http_route(&route_ref);
        if accepted {
            let new_entry = crate::mesh::ConfigEntry {
                kind: ConfigEntryKind::HttpRoute,
                name: route_ref.name.clone(),
                namespace: route_ref.namespace.clone(),
                partition: self.translator_config.partition.clone(),
                meta: BTreeMap::new(),
                body: ConfigEntryBody::HttpRoute(translated),
                modify_index: None,
            };
            let gw_ref_owned = gw_ref.clone();
            resource_map.translate_and_mutate_http_route(&route_ref, old, new_entry, move |old, mut new| {
                let mut parents: Vec<Reference> = old
                    .map(|o| match o.body {
                        ConfigEntryBody::HttpRoute(r) => r.parent_refs,
                        _ => vec![],
                    })
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|p| p.normalize() != gw_ref_owned.normalize())
                    .collect();
                parents.push(gw_ref_owned.clone());
                if let ConfigEntryBody::HttpRoute(r) = &mut new.body {
                    r.parent_refs = parents;
                }
                new
            });
        } else if let Some(existing) = old {
            if let ConfigEntryBody::HttpRoute(r) = &existing.body
                && r.parent_refs.iter().any(|p| p.normalize() == gw_ref.normalize())
            {
                let mut mutated = existing.clone();
                if let ConfigEntryBody::HttpRoute(r) = &mut mutated.body {
                    r.parent_refs.retain(|p| p.normalize() != gw_ref.normalize());
                }
                resource_map.mutate_http_route(&route_ref, mutated);
            }
            resource_map.unbind_http_route(&route_ref, gw_ref);
        }

        output.http_route_statuses.insert(
            route_ref,
            ParentStatus {
                conditions: vec![
                    condition("Accepted", accepted, if accepted { "Accepted" } else { "NoMatchingListenerHostname" }, "route accepted", 0),
                    condition("ResolvedRefs", backends_resolve, "ResolvedRefs", "backend references resolved", 0),
                ],
            },
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn bind_tcp_route(
        &self,
        route: &TCPRoute,
        gw: &Gateway,
        gw_ref: &Reference,
        resource_map: &ResourceMap,
        grants: &[ReferenceGrant],
        secrets: &HashMap<(String, String), Secret>,
        output: &mut BindOutput,
    ) {
        let _ = secrets;
        let route_namespace = route.metadata.namespace.clone().unwrap_or_default();
        let route_ref = Reference::new(ConfigEntryKind::TcpRoute, route.metadata.name.clone().unwrap_or_default())
            .with_namespace(route_namespace.clone());

        let targets_this_gateway = route.spec.parent_refs.iter().flatten().any(|p| {
            parent_ref_targets_gateway(&p.name, p.namespace.as_deref(), &route_namespace, gw)
        });
        if !targets_this_gateway {
            return;
        }

        resource_map.reference_count_tcp_route(&route_ref, std::slice::from_ref(gw_ref));

        let (translated, drops) = translate::to_tcp_route(route, grants, |ns, _group, kind, name| {
            if kind.eq_ignore_ascii_case("MeshService") {
                resource_map.has_mesh_service(&Reference::new(ConfigEntryKind::ApiGateway, name).with_namespace(ns))
            } else {
                resource_map.has_service(&Reference::new(ConfigEntryKind::ApiGateway, name).with_namespace(ns))
            }
        });
        for drop in &drops.0 {
            tracing::info!(route = %route_ref.name, %drop, "translator dropped a reference");
        }

        let backends_resolve = translated.rules.iter().any(|r| !r.backend_refs.is_empty()) || translated.rules.is_empty();
        let accepted = backends_resolve;

        let old = resource_map.existing_tcp_route(&route_ref);
        if accepted {
            let new_entry = crate::mesh::ConfigEntry {
                kind: ConfigEntryKind::TcpRoute,
                name: route_ref.name.clone(),
                namespace: route_ref.namespace.clone(),
                partition: self.translator_config.partition.clone(),
                meta: BTreeMap::new(),
                body: ConfigEntryBody::TcpRoute(translated),
                modify_index: None,
            };
            let gw_ref_owned = gw_ref.clone();
            resource_map.translate_and_mutate_tcp_route(&route_ref, old, new_entry, move |old, mut new| {
                let mut parents: Vec<Reference> = old
                    .map(|o| match o.body {
                        ConfigEntryBody::TcpRoute(r) => r.parent_refs,
                        _ => vec![],
                    })
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|p| p.normalize() != gw_ref_owned.normalize())
                    .collect();
                parents.push(gw_ref_owned.clone());
                if let ConfigEntryBody::TcpRoute(r) = &mut new.body {
                    r.parent_refs = parents;
                }
                new
            });
        } else if let Some(existing) = old {
            if let ConfigEntryBody::TcpRoute(r) = &existing.body
                && r.parent_refs.iter().any(|p| p.normalize() == gw_ref.normalize())
            {
                let mut mutated = existing.clone();
                if let ConfigEntryBody::TcpRoute(r) = &mut mutated.body {
                    r.parent_refs.retain(|p| p.normalize() != gw_ref.normalize());
                }
                resource_map.mutate_tcp_route(&route_ref, mutated);
            }
            resource_map.unbind_tcp_route(&route_ref, gw_ref);
        }

        output.tcp_route_statuses.insert(
            route_ref,
            ParentStatus {
                conditions: vec![condition("Accepted", accepted, if accepted { "Accepted" } else { "ResolvedRefs" }, "route accepted", 0)],
            },
        );
    }
}
