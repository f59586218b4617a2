//! The mesh control plane, abstracted behind a trait so the core has no
//! compile-time dependency on a concrete mesh SDK client. Modeled on the
//! teacher's pattern of threading an opaque client handle through a
//! `Context`, generalized to an injectable trait object.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::refs::{ConfigEntryKind, Reference};
use crate::Result;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiGatewayListener {
    pub name: String,
    pub port: u16,
    pub protocol: String,
    pub tls_certificates: Vec<Reference>,
    /// `"terminate"` or `"passthrough"`, lower-cased for case-insensitive compare.
    pub tls_mode: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiGatewayEntry {
    pub listeners: Vec<ApiGatewayListener>,
}

/// The merged request-header mutations for one rule. At most one of these
/// exists per rule: multiple source `RequestHeaderModifier` filters are
/// folded into it in encounter order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderFilter {
    pub add: Vec<(String, String)>,
    pub set: Vec<(String, String)>,
    pub remove: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteRule {
    /// Opaque, comparable descriptions of the source match predicates
    /// (method/path/headers/query-params), in source order.
    pub matches: Vec<String>,
    pub header_filter: Option<HeaderFilter>,
    /// Present only when the source filter was a prefix-match URL rewrite;
    /// full-path rewrites are dropped per the translator's documented
    /// behavior.
    pub url_rewrite_prefix: Option<String>,
    pub backend_refs: Vec<(Reference, i32)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRouteEntry {
    pub parent_refs: Vec<Reference>,
    pub hostnames: Vec<String>,
    pub rules: Vec<RouteRule>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpRouteEntry {
    pub parent_refs: Vec<Reference>,
    pub rules: Vec<RouteRule>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSystemCertificateEntry {
    pub certificate: String,
    pub private_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigEntryBody {
    ApiGateway(ApiGatewayEntry),
    HttpRoute(HttpRouteEntry),
    TcpRoute(TcpRouteEntry),
    FileSystemCertificate(FileSystemCertificateEntry),
}

/// A record in the mesh control plane, identified by its normalized
/// reference and carrying an opaque modify-index used to detect whether a
/// write is actually newer than what the controller already holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigEntry {
    pub kind: ConfigEntryKind,
    pub name: String,
    pub namespace: String,
    pub partition: String,
    pub meta: BTreeMap<String, String>,
    pub body: ConfigEntryBody,
    pub modify_index: Option<u64>,
}

impl ConfigEntry {
    pub fn reference(&self) -> Reference {
        Reference::new(self.kind, self.name.clone())
            .with_namespace(self.namespace.clone())
            .with_partition(self.partition.clone())
    }

    pub fn modify_index(&self) -> u64 {
        self.modify_index.unwrap_or(0)
    }

    /// Equality ignoring `modify_index`, mirroring [`crate::refs::conditions_equal`]'s
    /// "ignore the thing that always changes" approach, so the controller
    /// doesn't thrash writing back its own read.
    pub fn content_equal(&self, other: &ConfigEntry) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.namespace == other.namespace
            && self.partition == other.partition
            && self.meta == other.meta
            && self.body == other.body
    }
}

/// The mesh control plane's read/write surface, abstracted so the core
/// never links against a concrete mesh SDK.
#[async_trait]
pub trait MeshClient: Send + Sync {
    async fn list(&self, kind: ConfigEntryKind, namespace: &str) -> Result<Vec<ConfigEntry>>;
    async fn write(&self, entry: ConfigEntry) -> Result<()>;
    async fn delete(&self, kind: ConfigEntryKind, reference: &Reference) -> Result<()>;
}

/// A `dashmap`-backed fake used by reconciler tests and local/dev runs.
/// Production wires a real mesh SDK client behind [`MeshClient`].
#[derive(Default)]
pub struct InMemoryMeshClient {
    entries: DashMap<(ConfigEntryKind, String, String, String), ConfigEntry>,
    next_modify_index: std::sync::atomic::AtomicU64,
}

impl InMemoryMeshClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(kind: ConfigEntryKind, reference: &Reference) -> (ConfigEntryKind, String, String, String) {
        let normalized = reference.normalize();
        let raw = normalized.as_raw();
        (kind, raw.name.clone(), raw.namespace.clone(), raw.partition.clone())
    }
}

#[async_trait]
impl MeshClient for InMemoryMeshClient {
    async fn list(&self, kind: ConfigEntryKind, namespace: &str) -> Result<Vec<ConfigEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().0 == kind && e.namespace == namespace)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn write(&self, mut entry: ConfigEntry) -> Result<()> {
        let key = Self::key(entry.kind, &entry.reference());
        let index = self
            .next_modify_index
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        entry.modify_index = Some(index);
        self.entries.insert(key, entry);
        Ok(())
    }

    async fn delete(&self, kind: ConfigEntryKind, reference: &Reference) -> Result<()> {
        self.entries.remove(&Self::key(kind, reference));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_entry(name: &str) -> ConfigEntry {
        ConfigEntry {
            kind: ConfigEntryKind::ApiGateway,
            name: name.to_string(),
            namespace: "n1".to_string(),
            partition: String::new(),
            meta: BTreeMap::new(),
            body: ConfigEntryBody::ApiGateway(ApiGatewayEntry { listeners: vec![] }),
            modify_index: None,
        }
    }

    #[tokio::test]
    async fn write_then_list_round_trips() {
        let client = InMemoryMeshClient::new();
        client.write(gateway_entry("gw1")).await.unwrap();

        let listed = client.list(ConfigEntryKind::ApiGateway, "n1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "gw1");
        assert!(listed[0].modify_index.is_some());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let client = InMemoryMeshClient::new();
        client.write(gateway_entry("gw1")).await.unwrap();
        client
            .delete(ConfigEntryKind::ApiGateway, &Reference::new(ConfigEntryKind::ApiGateway, "gw1").with_namespace("n1"))
            .await
            .unwrap();

        let listed = client.list(ConfigEntryKind::ApiGateway, "n1").await.unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn content_equal_ignores_modify_index() {
        let mut a = gateway_entry("gw1");
        a.modify_index = Some(1);
        let mut b = gateway_entry("gw1");
        b.modify_index = Some(99);
        assert!(a.content_equal(&b));
    }
}
