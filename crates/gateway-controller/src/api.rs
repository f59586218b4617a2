use std::collections::BTreeMap;

use garde::Validate;
use k8s_openapi::api::core::v1::{Toleration, Probe};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A user-declared reference to a service that lives in the mesh but is not
/// a Kubernetes Service. Identity only; never owned by the controller.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Validate, JsonSchema)]
#[kube(group = "mesh-gateway.dev", version = "v1alpha1", kind = "MeshService", namespaced)]
pub struct MeshServiceSpec {
    #[garde(length(min = 1))]
    pub name: String,

    /// Overrides `name` as the identifier used on the mesh side, if set.
    #[garde(skip)]
    pub mesh_name: Option<String>,
}

/// Per-class deployment parameters for Gateways selected via the
/// `<group>/gateway-class-config` annotation.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Validate, JsonSchema)]
#[kube(
    group = "mesh-gateway.dev",
    version = "v1alpha1",
    kind = "GatewayClassConfig",
    namespaced
)]
pub struct GatewayClassConfigSpec {
    #[garde(skip)]
    pub min_instances: Option<i32>,
    #[garde(skip)]
    pub max_instances: Option<i32>,
    #[garde(skip)]
    pub default_instances: Option<i32>,

    #[garde(skip)]
    pub node_selector: BTreeMap<String, String>,
    #[garde(skip)]
    pub tolerations: Vec<Toleration>,

    /// `ClusterIP`, `NodePort`, or `LoadBalancer`. Absent means no Service
    /// is materialized.
    #[garde(skip)]
    pub service_type: Option<String>,

    #[garde(skip)]
    pub openshift_scc_name: Option<String>,

    #[garde(skip)]
    pub default_liveness_probe: Option<Probe>,
    #[garde(skip)]
    pub default_readiness_probe: Option<Probe>,
    #[garde(skip)]
    pub default_startup_probe: Option<Probe>,
}

impl GatewayClassConfigSpec {
    pub fn clamp_replicas(&self, existing: Option<i32>) -> i32 {
        clamp_replicas(
            existing,
            self.min_instances,
            self.max_instances,
            self.default_instances.unwrap_or(1),
        )
    }
}

/// `clamp(replicas, min, max)` per the controller's replica-clamping
/// invariant: always within `[min, max]` when both are set; when one bound
/// is unset only the other is enforced; when neither is set the existing
/// replica count (or `default`) passes through unchanged.
pub fn clamp_replicas(existing: Option<i32>, min: Option<i32>, max: Option<i32>, default: i32) -> i32 {
    let value = existing.unwrap_or(default);
    match (min, max) {
        (Some(min), Some(max)) => value.clamp(min, max),
        (Some(min), None) => value.max(min),
        (None, Some(max)) => value.min(max),
        (None, None) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_within_both_bounds() {
        assert_eq!(clamp_replicas(Some(5), Some(1), Some(3), 2), 3);
        assert_eq!(clamp_replicas(Some(0), Some(1), Some(3), 2), 1);
    }

    #[test]
    fn enforces_only_set_bound() {
        assert_eq!(clamp_replicas(Some(5), Some(1), None, 2), 5);
        assert_eq!(clamp_replicas(Some(5), None, Some(3), 2), 3);
    }

    #[test]
    fn passes_through_when_unbounded() {
        assert_eq!(clamp_replicas(Some(7), None, None, 2), 7);
        assert_eq!(clamp_replicas(None, None, None, 2), 2);
    }
}
