use crate::crd::common::{Networking, PlatformSpec};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::CustomResource;
#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Derived, 1:1 with its owning `HostedCluster`. Lives in a namespace named
/// `<hc.namespace>-<hc.name>` by convention (spec.md §3.1).
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[cfg_attr(
    not(doctest),
    kube(
        doc = "The `HostedControlPlane` custom resource is the internal, derived description \
    of a tenant control plane. It is created and owned by the HostedCluster controller \
    and should not be edited directly."
    )
)]
#[kube(
    group = "hypershift.openshift.io",
    version = "v1beta1",
    kind = "HostedControlPlane",
    plural = "hostedcontrolplanes",
    singular = "hostedcontrolplane",
    shortname = "hcp",
    namespaced,
    status = "HostedControlPlaneStatus",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".status.version"}"#,
    printcolumn = r#"{"name":"Available","type":"string","jsonPath":".status.conditions[?(@.type == \"HostedControlPlaneAvailable\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HostedControlPlaneSpec {
    pub release_image: String,

    pub networking: Networking,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_json::Value>,

    /// RFC3339 timestamp string, or "true" to pause indefinitely. Absent
    /// means not paused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_until: Option<String>,

    pub platform: PlatformSpec,

    pub infra_id: String,

    pub cluster_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct HostedControlPlaneStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_release_image_transition_time: Option<Time>,
}

impl HostedControlPlane {
    pub fn is_paused(&self) -> bool {
        self.spec
            .paused_until
            .as_deref()
            .map(|v| v == "true" || is_future_timestamp(v))
            .unwrap_or(false)
    }
}

fn is_future_timestamp(value: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|t| t > chrono::Utc::now())
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;

    fn hcp_with_paused_until(paused_until: Option<&str>) -> HostedControlPlane {
        let mut hcp = HostedControlPlane::new(
            "test",
            HostedControlPlaneSpec {
                release_image: "a".to_string(),
                networking: Networking::default(),
                configuration: None,
                paused_until: paused_until.map(str::to_string),
                platform: PlatformSpec::None,
                infra_id: "infra".to_string(),
                cluster_id: "cluster".to_string(),
            },
        );
        hcp.metadata.namespace = Some("default".to_string());
        hcp
    }

    #[test]
    fn not_paused_when_field_absent() {
        assert!(!hcp_with_paused_until(None).is_paused());
    }

    #[test]
    fn paused_when_set_to_true() {
        assert!(hcp_with_paused_until(Some("true")).is_paused());
    }

    #[test]
    fn not_paused_when_timestamp_in_past() {
        assert!(!hcp_with_paused_until(Some("2000-01-01T00:00:00Z")).is_paused());
    }
}
