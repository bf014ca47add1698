use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The externally-owned Cluster API `Cluster` kind this controller creates
/// and watches, but never defines the CRD for (that ships with the Cluster
/// API provider, out of scope per spec.md §1). Modeled as a typed
/// `kube::CustomResource` rather than a `DynamicObject` so it fits the same
/// `Store<K>` reflector pattern as every other watched kind.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[kube(
    group = "cluster.x-k8s.io",
    version = "v1beta1",
    kind = "Cluster",
    plural = "clusters",
    namespaced,
    status = "ClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_ref: Option<ObjectReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_ref: Option<ObjectReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub control_plane_ready: bool,
    #[serde(default)]
    pub infrastructure_ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

/// Alias under the name this domain uses elsewhere; the Kubernetes-side kind
/// remains `Cluster` (group `cluster.x-k8s.io`), set by the `#[kube(kind=..)]`
/// attribute above.
pub type CapiCluster = Cluster;
pub type CapiClusterSpec = ClusterSpec;
pub type CapiClusterStatus = ClusterStatus;

/// Value of `HostedClusterAnnotation`, identifying the owning HC (spec.md §4.H).
pub const HOSTED_CLUSTER_ANNOTATION: &str = "hypershift.openshift.io/cluster";

pub fn hosted_cluster_annotation_value(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}
