//! The per-reconcile workspace. Filled and drained by a single task; no
//! internal locking beyond what [`crate::refs::ReferenceMap`] already does
//! defensively.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::mesh::ConfigEntry;
use crate::refs::{ConfigEntryKind, NormalizedReference, Reference, ReferenceMap, ReferenceSet};

/// A queued write against the mesh control plane, in registration order.
#[derive(Clone, Debug)]
pub enum Mutation {
    Upsert(ConfigEntry),
    Delete(ConfigEntryKind, Reference),
}

/// A normalized-key parent graph: `reference -> set of referencing
/// Gateways`. Kept distinct from [`ReferenceMap`] because its value
/// (a plain `Vec`) needs no defensive locking of its own.
#[derive(Default)]
struct ParentGraph(Mutex<HashMap<NormalizedReference, Vec<Reference>>>);

impl ParentGraph {
    fn seed(&self, reference: &Reference) {
        self.0.lock().unwrap().entry(reference.normalize()).or_default();
    }

    fn add_parent(&self, reference: &Reference, parent: Reference) {
        let mut guard = self.0.lock().unwrap();
        let parents = guard.entry(reference.normalize()).or_default();
        if !parents.iter().any(|p| p.normalize() == parent.normalize()) {
            parents.push(parent);
        }
    }

    fn remove_parent(&self, reference: &Reference, parent: &Reference) {
        if let Some(parents) = self.0.lock().unwrap().get_mut(&reference.normalize()) {
            parents.retain(|p| p.normalize() != parent.normalize());
        }
    }

    fn count(&self, reference: &Reference) -> usize {
        self.0
            .lock()
            .unwrap()
            .get(&reference.normalize())
            .map(|p| p.len())
            .unwrap_or(0)
    }

}

/// Aggregates everything a [`crate::binder::Binder`] pass needs: known
/// backends, the binding graph (who references what), the mesh's existing
/// view, and the outgoing mutation queue. Constructed per reconcile,
/// discarded at the end.
#[derive(Default)]
pub struct ResourceMap {
    services: ReferenceMap<String>,
    mesh_services: ReferenceMap<String>,

    /// Certificate/route ref -> set of Gateways that reference it.
    certificate_parents: ParentGraph,
    http_route_parents: ParentGraph,
    tcp_route_parents: ParentGraph,

    /// Gateway ref -> set of mesh objects it has marked (certs + routes),
    /// used by `resources_to_gc`.
    gateway_marks: Mutex<HashMap<NormalizedReference, ReferenceSet>>,

    /// The mesh's existing view, seeded from a `MeshClient::list`. Entries
    /// still present here after a Binder pass had no `translate_and_mutate*`
    /// call made against them, and are therefore GC candidates.
    consul_http_routes: ReferenceMap<ConfigEntry>,
    consul_tcp_routes: ReferenceMap<ConfigEntry>,
    consul_certificates: ReferenceMap<ConfigEntry>,

    /// This Gateway's own existing ApiGateway entry, if the mesh already has
    /// one; used only to gate the upsert on `ConfigEntry::content_equal`, not
    /// for GC (ApiGateway entries are 1:1 with the owning Gateway).
    consul_api_gateway: ReferenceMap<ConfigEntry>,

    processed_certificates: ReferenceSet,

    mutations: Mutex<Vec<Mutation>>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn mark(&self, gateway_ref: &Reference, marked: Reference) {
        let mut guard = self.gateway_marks.lock().unwrap();
        guard.entry(gateway_ref.normalize()).or_default().mark(marked);
    }

    // --- known backends -----------------------------------------------

    pub fn add_service(&self, k8s_ref: Reference, service_name: String) {
        self.services.set(k8s_ref, service_name);
    }

    pub fn has_service(&self, k8s_ref: &Reference) -> bool {
        self.services.contains(k8s_ref)
    }

    pub fn service(&self, k8s_ref: &Reference) -> Option<String> {
        self.services.get(k8s_ref)
    }

    pub fn add_mesh_service(&self, mesh_ref: Reference, name: String) {
        self.mesh_services.set(mesh_ref, name);
    }

    pub fn has_mesh_service(&self, mesh_ref: &Reference) -> bool {
        self.mesh_services.contains(mesh_ref)
    }

    pub fn mesh_service(&self, mesh_ref: &Reference) -> Option<String> {
        self.mesh_services.get(mesh_ref)
    }

    // --- reference counting --------------------------------------------

    /// Seed a Certificate entry in the parent graph; parents are added
    /// later by `reference_count_gateway`.
    pub fn reference_count_certificate(&self, cert_ref: &Reference) {
        self.certificate_parents.seed(cert_ref);
    }

    /// Record that `gateway_ref` references each of `cert_refs`, and mark
    /// each certificate on the Gateway's own mark-set.
    pub fn reference_count_gateway(&self, gateway_ref: &Reference, cert_refs: &[Reference]) {
        for cert_ref in cert_refs {
            self.reference_count_certificate(cert_ref);
            self.certificate_parents.add_parent(cert_ref, gateway_ref.clone());
            self.mark(gateway_ref, cert_ref.clone());
        }
    }

    pub fn reference_count_http_route(&self, route_ref: &Reference, gateway_refs: &[Reference]) {
        self.http_route_parents.seed(route_ref);
        for gateway_ref in gateway_refs {
            self.http_route_parents.add_parent(route_ref, gateway_ref.clone());
            self.mark(gateway_ref, route_ref.clone());
        }
    }

    pub fn reference_count_tcp_route(&self, route_ref: &Reference, gateway_refs: &[Reference]) {
        self.tcp_route_parents.seed(route_ref);
        for gateway_ref in gateway_refs {
            self.tcp_route_parents.add_parent(route_ref, gateway_ref.clone());
            self.mark(gateway_ref, route_ref.clone());
        }
    }

    pub fn unbind_http_route(&self, route_ref: &Reference, gateway_ref: &Reference) {
        self.http_route_parents.remove_parent(route_ref, gateway_ref);
    }

    pub fn unbind_tcp_route(&self, route_ref: &Reference, gateway_ref: &Reference) {
        self.tcp_route_parents.remove_parent(route_ref, gateway_ref);
    }

    pub fn reference_count_consul_http_route(&self, entry: ConfigEntry) {
        self.consul_http_routes.set(entry.reference(), entry);
    }

    pub fn reference_count_consul_tcp_route(&self, entry: ConfigEntry) {
        self.consul_tcp_routes.set(entry.reference(), entry);
    }

    pub fn reference_count_consul_certificate(&self, entry: ConfigEntry) {
        self.consul_certificates.set(entry.reference(), entry);
    }

    /// Seed this Gateway's own existing ApiGateway entry, read back for the
    /// `content_equal` gate in `upsert_api_gateway`.
    pub fn reference_count_consul_api_gateway(&self, entry: ConfigEntry) {
        self.consul_api_gateway.set(entry.reference(), entry);
    }

    // --- GC --------------------------------------------------------------

    fn existing_entry_map(&self, kind: ConfigEntryKind) -> &ReferenceMap<ConfigEntry> {
        match kind {
            ConfigEntryKind::HttpRoute => &self.consul_http_routes,
            ConfigEntryKind::TcpRoute => &self.consul_tcp_routes,
            ConfigEntryKind::FileSystemCertificate => &self.consul_certificates,
            ConfigEntryKind::ApiGateway => unreachable!("api-gateway entries are never GC'd by reference count"),
        }
    }

    fn parent_graph_for(&self, kind: ConfigEntryKind) -> Option<&ParentGraph> {
        match kind {
            ConfigEntryKind::HttpRoute => Some(&self.http_route_parents),
            ConfigEntryKind::TcpRoute => Some(&self.tcp_route_parents),
            ConfigEntryKind::FileSystemCertificate => Some(&self.certificate_parents),
            ConfigEntryKind::ApiGateway => None,
        }
    }

    /// For each mesh object previously marked by `gateway_ref`, return those
    /// whose parent-set cardinality is `<= 1` (only this Gateway holds it)
    /// and which still sit in the mesh-side map (i.e. were not re-enqueued
    /// this pass via `translate_and_mutate*`).
    pub fn resources_to_gc(&self, gateway_ref: &Reference) -> Vec<Reference> {
        let Some(marks) = self.gateway_marks.lock().unwrap().get(&gateway_ref.normalize()).map(|s| s.ids()) else {
            return vec![];
        };

        marks
            .into_iter()
            .filter(|marked| {
                let parent_count = self.parent_graph_for(marked.kind).map(|g| g.count(marked)).unwrap_or(0);
                let still_pending = match marked.kind {
                    ConfigEntryKind::FileSystemCertificate => {
                        !self.processed_certificates.contains(marked) && self.existing_entry_map(marked.kind).contains(marked)
                    }
                    _ => self.existing_entry_map(marked.kind).contains(marked),
                };
                parent_count <= 1 && still_pending
            })
            .collect()
    }

    pub fn can_gc_http_route_on_unbind(&self, route_ref: &Reference) -> bool {
        self.http_route_parents.count(route_ref) <= 1
    }

    pub fn can_gc_tcp_route_on_unbind(&self, route_ref: &Reference) -> bool {
        self.tcp_route_parents.count(route_ref) <= 1
    }

    /// Whether any Gateway other than the one being deleted still references
    /// `cert_ref`, per parents seeded via `reference_count_gateway`.
    pub fn certificate_has_other_parents(&self, cert_ref: &Reference) -> bool {
        self.certificate_parents.count(cert_ref) > 0
    }

    // --- translate + mutate ----------------------------------------------

    /// `new_entry` is the output of `translate::to_http_route`. `mutate_fn`
    /// merges the requesting Gateway into its parent list (preserving
    /// parents on other Gateways already present in `old`). If the mutated
    /// entry still has parents, it's enqueued for upsert and removed from
    /// the GC candidate map; otherwise it's left in the map so
    /// `resources_to_gc` picks it up.
    pub fn translate_and_mutate_http_route(
        &self,
        route_ref: &Reference,
        old: Option<ConfigEntry>,
        new_entry: ConfigEntry,
        mutate_fn: impl FnOnce(Option<ConfigEntry>, ConfigEntry) -> ConfigEntry,
    ) {
        let mutated = mutate_fn(old, new_entry);
        self.mutate_route_result(route_ref, mutated, &self.consul_http_routes);
    }

    pub fn translate_and_mutate_tcp_route(
        &self,
        route_ref: &Reference,
        old: Option<ConfigEntry>,
        new_entry: ConfigEntry,
        mutate_fn: impl FnOnce(Option<ConfigEntry>, ConfigEntry) -> ConfigEntry,
    ) {
        let mutated = mutate_fn(old, new_entry);
        self.mutate_route_result(route_ref, mutated, &self.consul_tcp_routes);
    }

    fn mutate_route_result(&self, route_ref: &Reference, mutated: ConfigEntry, map: &ReferenceMap<ConfigEntry>) {
        let has_parents = match &mutated.body {
            crate::mesh::ConfigEntryBody::HttpRoute(r) => !r.parent_refs.is_empty(),
            crate::mesh::ConfigEntryBody::TcpRoute(r) => !r.parent_refs.is_empty(),
            _ => true,
        };

        // Read the existing entry before deleting it from the GC-candidate
        // map, so an unchanged route doesn't get rewritten every pass.
        let existing = map.get(route_ref);

        // Delete from the GC-candidate map BEFORE enqueueing, so a later
        // `resources_to_gc` call in this same pass doesn't also propose it.
        map.delete(route_ref);

        if has_parents {
            let unchanged = existing.is_some_and(|e| e.content_equal(&mutated));
            if !unchanged {
                self.mutations.lock().unwrap().push(Mutation::Upsert(mutated));
            }
        }
        // else: intentionally left out of `map` — it is now absent from the
        // GC-candidate set *and* not re-enqueued; an explicit delete
        // mutation, emitted by the Binder via `resources_to_gc`, is what
        // removes it from the mesh.
    }

    /// Same as `translate_and_mutate_*` but without a fresh translation —
    /// used when the only change is dropping a parent from an
    /// already-translated entry.
    pub fn mutate_http_route(&self, route_ref: &Reference, mutated: ConfigEntry) {
        self.mutate_route_result(route_ref, mutated, &self.consul_http_routes);
    }

    pub fn mutate_tcp_route(&self, route_ref: &Reference, mutated: ConfigEntry) {
        self.mutate_route_result(route_ref, mutated, &self.consul_tcp_routes);
    }

    /// Translate Secret -> Certificate entry, mark as processed (exempt from
    /// GC), and enqueue the upsert.
    pub fn translate_file_system_certificate(&self, cert_ref: &Reference, entry: ConfigEntry) {
        self.processed_certificates.mark(cert_ref.clone());
        let existing = self.consul_certificates.get(cert_ref);
        self.consul_certificates.delete(cert_ref);
        let unchanged = existing.is_some_and(|e| e.content_equal(&entry));
        if !unchanged {
            self.mutations.lock().unwrap().push(Mutation::Upsert(entry));
        }
    }

    pub fn enqueue_delete(&self, kind: ConfigEntryKind, reference: Reference) {
        self.mutations.lock().unwrap().push(Mutation::Delete(kind, reference));
    }

    /// Enqueue an API-Gateway entry write directly; these aren't reference
    /// counted (they're 1:1 with the owning Gateway), so there's no GC
    /// bookkeeping to do. Gated on `content_equal` against the entry seeded
    /// via `reference_count_consul_api_gateway` so an unchanged Gateway
    /// doesn't get rewritten every pass.
    pub fn upsert_api_gateway(&self, entry: ConfigEntry) {
        let existing = self.consul_api_gateway.get(&entry.reference());
        let unchanged = existing.is_some_and(|e| e.content_equal(&entry));
        if !unchanged {
            self.mutations.lock().unwrap().push(Mutation::Upsert(entry));
        }
    }

    /// Mark a certificate as handled this pass without writing it, so a
    /// translation failure doesn't cause `resources_to_gc` to delete a prior
    /// good entry.
    pub fn exempt_certificate_from_gc(&self, cert_ref: &Reference) {
        self.processed_certificates.mark(cert_ref.clone());
    }

    /// The queued upserts/deletes, in registration order.
    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn existing_http_route(&self, route_ref: &Reference) -> Option<ConfigEntry> {
        self.consul_http_routes.get(route_ref)
    }

    pub fn existing_tcp_route(&self, route_ref: &Reference) -> Option<ConfigEntry> {
        self.consul_tcp_routes.get(route_ref)
    }

    pub fn existing_api_gateway(&self, gw_ref: &Reference) -> Option<ConfigEntry> {
        self.consul_api_gateway.get(gw_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{ConfigEntryBody, HttpRouteEntry};
    use std::collections::BTreeMap;

    fn gw(name: &str) -> Reference {
        Reference::new(ConfigEntryKind::ApiGateway, name)
    }

    fn route(name: &str) -> Reference {
        Reference::new(ConfigEntryKind::HttpRoute, name)
    }

    fn http_entry(parents: Vec<Reference>) -> ConfigEntry {
        ConfigEntry {
            kind: ConfigEntryKind::HttpRoute,
            name: "r1".to_string(),
            namespace: "n1".to_string(),
            partition: String::new(),
            meta: BTreeMap::new(),
            body: ConfigEntryBody::HttpRoute(HttpRouteEntry {
                parent_refs: parents,
                hostnames: vec![],
                rules: vec![],
            }),
            modify_index: None,
        }
    }

    #[test]
    fn gc_when_only_parent_removed_and_not_reenqueued() {
        let map = ResourceMap::new();
        let route_ref = route("r1").with_namespace("n1");
        let gw_ref = gw("gw1").with_namespace("n1");

        map.reference_count_http_route(&route_ref, std::slice::from_ref(&gw_ref));
        map.reference_count_consul_http_route(http_entry(vec![gw_ref.clone()]));

        // Gateway unbinds: parent set shrinks to zero, route left in map.
        map.unbind_http_route(&route_ref, &gw_ref);

        let gc = map.resources_to_gc(&gw_ref);
        assert_eq!(gc, vec![route_ref]);
    }

    #[test]
    fn not_gc_when_reenqueued_this_pass() {
        let map = ResourceMap::new();
        let route_ref = route("r1").with_namespace("n1");
        let gw_ref = gw("gw1").with_namespace("n1");

        map.reference_count_http_route(&route_ref, std::slice::from_ref(&gw_ref));
        map.reference_count_consul_http_route(http_entry(vec![gw_ref.clone()]));

        map.translate_and_mutate_http_route(&route_ref, None, http_entry(vec![gw_ref.clone()]), |_, new| new);

        assert!(map.resources_to_gc(&gw_ref).is_empty());
    }

    #[test]
    fn can_gc_on_unbind_true_with_single_parent() {
        let map = ResourceMap::new();
        let route_ref = route("r1").with_namespace("n1");
        let gw_ref = gw("gw1").with_namespace("n1");
        map.reference_count_http_route(&route_ref, &[gw_ref]);
        assert!(map.can_gc_http_route_on_unbind(&route_ref));
    }

    #[test]
    fn unchanged_http_route_produces_no_mutation() {
        let map = ResourceMap::new();
        let route_ref = route("r1").with_namespace("n1");
        let gw_ref = gw("gw1").with_namespace("n1");

        map.reference_count_http_route(&route_ref, std::slice::from_ref(&gw_ref));
        map.reference_count_consul_http_route(http_entry(vec![gw_ref.clone()]));

        map.translate_and_mutate_http_route(&route_ref, None, http_entry(vec![gw_ref]), |_, new| new);

        assert!(map.mutations().is_empty());
    }

    #[test]
    fn changed_http_route_is_still_upserted() {
        let map = ResourceMap::new();
        let route_ref = route("r1").with_namespace("n1");
        let gw_ref = gw("gw1").with_namespace("n1");
        let other_gw_ref = gw("gw2").with_namespace("n1");

        map.reference_count_http_route(&route_ref, std::slice::from_ref(&gw_ref));
        map.reference_count_consul_http_route(http_entry(vec![gw_ref.clone()]));

        map.translate_and_mutate_http_route(&route_ref, None, http_entry(vec![gw_ref, other_gw_ref]), |_, new| new);

        assert_eq!(map.mutations().len(), 1);
    }

    fn api_gateway_entry(name: &str) -> ConfigEntry {
        ConfigEntry {
            kind: ConfigEntryKind::ApiGateway,
            name: name.to_string(),
            namespace: "n1".to_string(),
            partition: String::new(),
            meta: BTreeMap::new(),
            body: ConfigEntryBody::ApiGateway(crate::mesh::ApiGatewayEntry { listeners: vec![] }),
            modify_index: None,
        }
    }

    #[test]
    fn unchanged_api_gateway_produces_no_mutation() {
        let map = ResourceMap::new();
        map.reference_count_consul_api_gateway(api_gateway_entry("gw1"));

        map.upsert_api_gateway(api_gateway_entry("gw1"));

        assert!(map.mutations().is_empty());
    }

    #[test]
    fn new_api_gateway_is_upserted() {
        let map = ResourceMap::new();

        map.upsert_api_gateway(api_gateway_entry("gw1"));

        assert_eq!(map.mutations().len(), 1);
    }
}
