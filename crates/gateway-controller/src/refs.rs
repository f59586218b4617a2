//! Keyed map/set primitives over mesh resource references, tolerant of the
//! `""` vs `"default"` namespace/partition ambiguity.

use std::collections::HashMap;
use std::sync::RwLock;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;

use crate::mesh::ConfigEntry;

pub const DEFAULT: &str = "default";

/// Identifies a mesh config-entry kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfigEntryKind {
    ApiGateway,
    HttpRoute,
    TcpRoute,
    FileSystemCertificate,
}

/// A reference to a mesh config entry, in its raw (possibly-empty) form.
///
/// Non-enterprise mesh deployments reject the literal `"default"` on the
/// wire, so writers must keep the original empty namespace/partition. Only
/// lookups go through [`Reference::normalize`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reference {
    pub kind: ConfigEntryKind,
    pub name: String,
    pub namespace: String,
    pub partition: String,
}

impl Reference {
    pub fn new(kind: ConfigEntryKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: String::new(),
            partition: String::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    pub fn normalize(&self) -> NormalizedReference {
        NormalizedReference(Reference {
            kind: self.kind,
            name: self.name.clone(),
            namespace: normalize_part(&self.namespace),
            partition: normalize_part(&self.partition),
        })
    }
}

fn normalize_part(s: &str) -> String {
    if s.is_empty() {
        DEFAULT.to_string()
    } else {
        s.to_string()
    }
}

/// A [`Reference`] that has gone through [`Reference::normalize`]. Used as a
/// map key so that `""` and `"default"` collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NormalizedReference(Reference);

impl NormalizedReference {
    pub fn as_raw(&self) -> &Reference {
        &self.0
    }
}

/// A thread-safe (many-reader, single-writer in practice — the lock is
/// defensive, since within one reconcile a `ResourceMap` is used from a
/// single task) map keyed by normalized reference, storing both the raw key
/// used for round-tripping to the mesh and the caller's value.
pub struct ReferenceMap<V> {
    inner: RwLock<HashMap<NormalizedReference, (Reference, V)>>,
}

// Hand-written so constructing an empty map never requires `V: Default`
// (the derive macro would add that bound even though the field doesn't need it).
impl<V> Default for ReferenceMap<V> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone> ReferenceMap<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn set(&self, reference: Reference, value: V) {
        let normalized = reference.normalize();
        self.inner
            .write()
            .unwrap()
            .insert(normalized, (reference, value));
    }

    pub fn get(&self, reference: &Reference) -> Option<V> {
        self.inner
            .read()
            .unwrap()
            .get(&reference.normalize())
            .map(|(_, v)| v.clone())
    }

    pub fn contains(&self, reference: &Reference) -> bool {
        self.inner.read().unwrap().contains_key(&reference.normalize())
    }

    pub fn delete(&self, reference: &Reference) -> Option<V> {
        self.inner
            .write()
            .unwrap()
            .remove(&reference.normalize())
            .map(|(_, v)| v)
    }

    /// All (raw reference, value) pairs, in unspecified order.
    pub fn entries(&self) -> Vec<(Reference, V)> {
        self.inner
            .read()
            .unwrap()
            .values()
            .map(|(r, v)| (r.clone(), v.clone()))
            .collect()
    }

    /// The non-normalized original keys, so callers can round-trip writes to
    /// the mesh without smuggling the literal `"default"` into a
    /// non-enterprise deployment.
    pub fn ids(&self) -> Vec<Reference> {
        self.inner.read().unwrap().values().map(|(r, _)| r.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReferenceMap<ConfigEntry> {
    /// Entries present in `other` but missing from `self`, plus entries
    /// present in both where `other`'s modify-index is greater — a delta
    /// suitable for mesh writes.
    pub fn diff(&self, other: &ReferenceMap<ConfigEntry>) -> Vec<ConfigEntry> {
        let mine = self.inner.read().unwrap();
        let theirs = other.inner.read().unwrap();

        theirs
            .iter()
            .filter_map(|(key, (_, their_entry))| match mine.get(key) {
                None => Some(their_entry.clone()),
                Some((_, my_entry)) => {
                    if their_entry.modify_index() > my_entry.modify_index() {
                        Some(their_entry.clone())
                    } else {
                        None
                    }
                }
            })
            .collect()
    }
}

/// A [`ReferenceMap`] without values, for tracking "this Gateway has marked
/// these mesh objects" without caring about their content.
#[derive(Default)]
pub struct ReferenceSet {
    inner: ReferenceMap<()>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self {
            inner: ReferenceMap::new(),
        }
    }

    pub fn mark(&self, reference: Reference) {
        self.inner.set(reference, ());
    }

    pub fn contains(&self, reference: &Reference) -> bool {
        self.inner.contains(reference)
    }

    pub fn remove(&self, reference: &Reference) {
        self.inner.delete(reference);
    }

    pub fn ids(&self) -> Vec<Reference> {
        self.inner.ids()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Condition-set equality that ignores `lastTransitionTime`, per the
/// invariant that the controller must not thrash on a status update whose
/// only change is a timestamp.
pub fn conditions_equal(a: &[Condition], b: &[Condition]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().all(|ca| {
        b.iter().any(|cb| {
            ca.type_ == cb.type_
                && ca.status == cb.status
                && ca.reason == cb.reason
                && ca.message == cb.message
                && ca.observed_generation == cb.observed_generation
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gw_ref(name: &str) -> Reference {
        Reference::new(ConfigEntryKind::ApiGateway, name)
    }

    #[test]
    fn normalize_is_idempotent() {
        let r = gw_ref("gw1");
        assert_eq!(r.normalize(), r.normalize().as_raw().normalize());
    }

    #[test]
    fn empty_and_default_namespace_collide() {
        let with_empty = gw_ref("gw1");
        let with_default = gw_ref("gw1").with_namespace(DEFAULT);
        assert_eq!(with_empty.normalize(), with_default.normalize());
    }

    #[test]
    fn map_round_trips_raw_keys() {
        let map = ReferenceMap::new();
        map.set(gw_ref("gw1"), "value".to_string());
        assert_eq!(map.get(&gw_ref("gw1")), Some("value".to_string()));
        // raw key preserved, not rewritten to "default"
        assert_eq!(map.ids()[0].namespace, "");
    }

    #[test]
    fn map_delete_is_normalized() {
        let map = ReferenceMap::new();
        map.set(gw_ref("gw1").with_namespace(""), "v".to_string());
        assert!(map.delete(&gw_ref("gw1").with_namespace(DEFAULT)).is_some());
        assert!(map.is_empty());
    }

    #[test]
    fn reference_set_mark_contains_remove() {
        let set = ReferenceSet::new();
        set.mark(gw_ref("cert1"));
        assert!(set.contains(&gw_ref("cert1").with_namespace(DEFAULT)));
        set.remove(&gw_ref("cert1"));
        assert!(!set.contains(&gw_ref("cert1")));
    }

    #[test]
    fn conditions_equal_ignores_transition_time() {
        use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
        use chrono::{DateTime, Utc};

        let t1 = Time(DateTime::<Utc>::from_timestamp(0, 0).unwrap());
        let t2 = Time(DateTime::<Utc>::from_timestamp(100, 0).unwrap());

        let a = Condition {
            last_transition_time: t1,
            message: "ok".to_string(),
            observed_generation: Some(1),
            reason: "Ready".to_string(),
            status: "True".to_string(),
            type_: "Accepted".to_string(),
        };
        let mut b = a.clone();
        b.last_transition_time = t2;

        assert!(conditions_equal(std::slice::from_ref(&a), std::slice::from_ref(&b)));

        let mut c = a.clone();
        c.status = "False".to_string();
        assert!(!conditions_equal(std::slice::from_ref(&a), std::slice::from_ref(&c)));
    }
}
