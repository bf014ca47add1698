use crate::crd::common::{EtcdSpec, Networking, PlatformSpec, Release, ServicePublishingStrategy};
use crate::crd::ids::{ClusterId, InfraId};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::CustomResource;
#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const FORCE_UPGRADE_TO_ANNOTATION: &str = "hypershift.openshift.io/force-upgrade-to";
pub const SKIP_RELEASE_IMAGE_VALIDATION_ANNOTATION: &str =
    "hypershift.openshift.io/skip-release-image-validation";
pub const RESTART_DATE_ANNOTATION: &str = "hypershift.openshift.io/restart-date";
pub const DISABLE_CLUSTER_AUTOSCALER_ANNOTATION: &str =
    "hypershift.openshift.io/disable-cluster-autoscaler";
pub const DEBUG_DEPLOYMENTS_ANNOTATION: &str = "hypershift.openshift.io/debug-deployments";
pub const ETCD_PRIORITY_CLASS_ANNOTATION: &str = "hypershift.openshift.io/etcd-priority-class";
pub const GO_AWAY_CHANCE_ANNOTATION: &str = "hypershift.openshift.io/go-away-chance";
pub const REQUEST_SERVING_NODE_SELECTOR_ANNOTATION: &str =
    "hypershift.openshift.io/request-serving-node-selector";
pub const IDENTITY_PROVIDER_OVERRIDES_ANNOTATION_PREFIX: &str =
    "idp-override.hypershift.openshift.io/";
pub const RESOURCE_REQUEST_OVERRIDE_ANNOTATION_PREFIX: &str =
    "resource-request-override.hypershift.openshift.io/";

/// Known HC annotations mirrored verbatim onto the HCP (spec.md §9
/// "Annotation propagation").
pub const KNOWN_HCP_ANNOTATIONS: &[&str] = &[
    RESTART_DATE_ANNOTATION,
    DEBUG_DEPLOYMENTS_ANNOTATION,
    ETCD_PRIORITY_CLASS_ANNOTATION,
    GO_AWAY_CHANCE_ANNOTATION,
    REQUEST_SERVING_NODE_SELECTOR_ANNOTATION,
];

/// Declarative user-facing description of a tenant control plane. The
/// operator converges the cluster toward this spec by maintaining a derived
/// `HostedControlPlane` in a dedicated namespace.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[cfg_attr(
    not(doctest),
    kube(
        doc = "The `HostedCluster` custom resource declares the desired state of a tenant \
    control plane hosted on this management cluster. The operator derives a \
    `HostedControlPlane` from it, projects companion Cluster API resources, and \
    reconciles upgrades and teardown."
    )
)]
#[kube(
    group = "hypershift.openshift.io",
    version = "v1beta1",
    kind = "HostedCluster",
    plural = "hostedclusters",
    singular = "hostedcluster",
    shortname = "hc",
    namespaced,
    status = "HostedClusterStatus",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".status.version.history[0].version"}"#,
    printcolumn = r#"{"name":"KubeConfig","type":"string","jsonPath":".status.kubeConfig.name"}"#,
    printcolumn = r#"{"name":"Progress","type":"string","jsonPath":".status.version.history[0].state"}"#,
    printcolumn = r#"{"name":"Available","type":"string","jsonPath":".status.conditions[?(@.type == \"HostedClusterAvailable\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HostedClusterSpec {
    /// Desired release image and the per-kind configuration needed to reach it.
    pub release: Release,

    /// Tagged platform variant this cluster's infrastructure runs on.
    pub platform: PlatformSpec,

    pub networking: Networking,

    /// Ordered list of service publishing strategies; order is preserved so
    /// hostname-collision errors can cite deterministic service ordering.
    #[serde(default)]
    pub services: Vec<ServicePublishingStrategy>,

    /// Name of a Secret in the same namespace holding the pull secret used to
    /// resolve `release.image`.
    pub pull_secret: String,

    /// Opaque cluster-config block passed through to the HostedControlPlane
    /// verbatim; the core does not interpret its contents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_json::Value>,

    pub etcd: EtcdSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_encryption: Option<SecretEncryptionSpec>,

    /// Defaulted once on first reconcile; immutable afterward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<ClusterId>,

    /// Defaulted once on first reconcile; immutable afterward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infra_id: Option<InfraId>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct SecretEncryptionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aescbc_active_key_secret_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_secret_ref: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "PascalCase")]
pub enum HistoryState {
    Partial,
    Completed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct UpdateHistoryEntry {
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub state: HistoryState,
    pub started_time: Time,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<Time>,
}

/// Invariant (spec.md §3.2): ordered newest-first, at most one `Partial`
/// entry, and if present it is at index 0.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClusterVersionStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired: Option<Release>,
    #[serde(default)]
    pub history: Vec<UpdateHistoryEntry>,
}

impl ClusterVersionStatus {
    pub fn active(&self) -> Option<&UpdateHistoryEntry> {
        self.history.first()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct HostedClusterStatus {
    #[serde(default)]
    pub version: ClusterVersionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignition_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_config: Option<String>,
}
