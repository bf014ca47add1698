use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Per-endpoint condition holder the HCP's AWS infrastructure controller
/// creates one of for each private endpoint service it manages (out of scope
/// per spec.md §1 — this controller only reads them back, never creates or
/// watches one, so it isn't in `Stores`/`define_stores!`). Used by §4.F when
/// aggregating `CloudResourcesDestroyed` for AWS-platform clusters.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[kube(
    group = "hypershift.openshift.io",
    version = "v1alpha1",
    kind = "AWSEndpointService",
    plural = "awsendpointservices",
    namespaced,
    status = "AwsEndpointServiceStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct AwsEndpointServiceSpec {
    pub endpoint_service_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct AwsEndpointServiceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}
