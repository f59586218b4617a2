/// K8s API objects (project-local CRDs: `MeshService`, `GatewayClassConfig`)
pub mod api;
/// The Gateway-materialization half of the controller: idempotent
/// upsert/delete of owned Kubernetes children.
pub mod binder;
/// Global controller configuration.
pub mod config;
/// Typed errors shared by every component.
pub mod error;
/// Idempotent Kubernetes child-resource lifecycle for a Gateway.
pub mod gatekeeper;
/// The mesh control plane, abstracted behind a trait.
pub mod mesh;
/// Reconciler entry points, one per watched kind.
pub mod reconcile;
/// Keyed map/set primitives over mesh resource references.
pub mod refs;
/// The per-reconcile workspace.
pub mod resource_map;
/// Pure Kubernetes-object -> mesh-config-entry translation.
pub mod translate;

pub use error::{Error, Result};
