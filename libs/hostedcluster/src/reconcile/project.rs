//! §4.H Desired-State Projector.

use crate::crd::capi_cluster::{hosted_cluster_annotation_value, CapiCluster, HOSTED_CLUSTER_ANNOTATION};
use crate::crd::hosted_cluster::{
    HostedCluster, DISABLE_CLUSTER_AUTOSCALER_ANNOTATION, IDENTITY_PROVIDER_OVERRIDES_ANNOTATION_PREFIX,
    KNOWN_HCP_ANNOTATIONS, RESOURCE_REQUEST_OVERRIDE_ANNOTATION_PREFIX,
};
use crate::crd::hosted_control_plane::{HostedControlPlane, HostedControlPlaneSpec};
use crate::error::Error;
use crate::platform::adapter_for;

use std::collections::BTreeMap;

use hcop_k8s_util::resources::{project_annotation_prefix, project_known_annotations};

use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role};
use kube::api::{Api, Patch, PatchParams};
use kube::core::{NamespaceResourceScope, ObjectMeta};
use kube::{Client, Resource, ResourceExt};
use serde::{de::DeserializeOwned, Serialize};

pub const FIELD_MANAGER: &str = "hcop-hostedcluster";

pub fn hcp_namespace_name(hc: &HostedCluster) -> String {
    format!("{}-{}", hc.namespace().unwrap_or_default(), hc.name_any())
}

/// Applies `resource` via server-side apply; on a 422 (immutable-field
/// conflict) deletes and recreates, mirroring the teacher's retry shape.
pub async fn patch_resource<K>(client: &Client, namespace: &str, resource: K) -> Result<K, Error>
where
    K: Resource<Scope = NamespaceResourceScope> + Serialize + Clone + std::fmt::Debug + DeserializeOwned,
    <K as Resource>::DynamicType: Default,
{
    let api = Api::<K>::namespaced(client.clone(), namespace);
    let name = resource.name_any();
    let params = PatchParams::apply(FIELD_MANAGER).force();
    match api.patch(&name, &params, &Patch::Apply(&resource)).await {
        Ok(applied) => Ok(applied),
        Err(kube::Error::Api(ae)) if ae.code == 422 => {
            api.delete(&name, &Default::default())
                .await
                .map_err(|e| Error::KubeError("failed to delete for recreate".to_string(), e))?;
            api.patch(&name, &params, &Patch::Apply(&resource))
                .await
                .map_err(|e| Error::KubeError("failed to recreate after delete".to_string(), e))
        }
        Err(e) => Err(Error::KubeError(format!("failed to patch {}", std::any::type_name::<K>()), e)),
    }
}

fn is_autoscaling(hc: &HostedCluster) -> bool {
    // Autoscaling configuration lives in the opaque `configuration` block;
    // the core doesn't interpret it beyond this capability check.
    hc.spec
        .configuration
        .as_ref()
        .and_then(|c| c.get("autoscaling"))
        .is_some()
}

/// Builds the desired `HostedControlPlane` object to apply. `release_image`
/// is the output of the Upgrade Policy Engine (§4.D), already validated.
pub fn reconcile_hosted_control_plane(
    hc: &HostedCluster,
    existing: Option<&HostedControlPlane>,
    release_image: &str,
) -> HostedControlPlane {
    let namespace = hcp_namespace_name(hc);
    let name = hc.name_any();
    let hc_annotations = hc.annotations();

    let mut annotations = project_known_annotations(
        existing.map(|e| e.annotations().clone()),
        hc_annotations,
        KNOWN_HCP_ANNOTATIONS,
    );
    annotations = project_annotation_prefix(
        Some(annotations),
        hc_annotations,
        IDENTITY_PROVIDER_OVERRIDES_ANNOTATION_PREFIX,
    );
    annotations = project_annotation_prefix(
        Some(annotations),
        hc_annotations,
        RESOURCE_REQUEST_OVERRIDE_ANNOTATION_PREFIX,
    );
    if is_autoscaling(hc) {
        annotations.remove(DISABLE_CLUSTER_AUTOSCALER_ANNOTATION);
    } else {
        annotations.insert(DISABLE_CLUSTER_AUTOSCALER_ANNOTATION.to_string(), "true".to_string());
    }

    let cluster_id = hc.spec.cluster_id.as_ref().map(|v| v.0.clone()).unwrap_or_default();
    let infra_id = hc.spec.infra_id.as_ref().map(|v| v.0.clone()).unwrap_or_default();

    let mut hcp = HostedControlPlane::new(
        &name,
        HostedControlPlaneSpec {
            release_image: release_image.to_string(),
            networking: hc.spec.networking.clone(),
            configuration: hc.spec.configuration.clone(),
            paused_until: existing.and_then(|e| e.spec.paused_until.clone()),
            platform: hc.spec.platform.clone(),
            infra_id,
            cluster_id,
        },
    );
    hcp.meta_mut().namespace = Some(namespace);
    hcp.meta_mut().annotations = Some(annotations);
    hcp
}

/// §4.H `reconcileCAPICluster`.
pub fn reconcile_capi_cluster(
    hc: &HostedCluster,
    hcp_namespace: &str,
    infra_cr_kind: &str,
    infra_cr_api_version: &str,
    infra_cr_name: &str,
) -> CapiCluster {
    let mut annotations = BTreeMap::new();
    annotations.insert(
        HOSTED_CLUSTER_ANNOTATION.to_string(),
        hosted_cluster_annotation_value(&hc.namespace().unwrap_or_default(), &hc.name_any()),
    );

    let control_plane_ref = ObjectReference {
        kind: Some("HostedControlPlane".to_string()),
        api_version: Some("hypershift.openshift.io/v1beta1".to_string()),
        name: Some(hc.name_any()),
        namespace: Some(hcp_namespace.to_string()),
        ..Default::default()
    };
    let infrastructure_ref = ObjectReference {
        kind: Some(infra_cr_kind.to_string()),
        api_version: Some(infra_cr_api_version.to_string()),
        name: Some(infra_cr_name.to_string()),
        namespace: Some(hcp_namespace.to_string()),
        ..Default::default()
    };

    let mut capi = CapiCluster::new(
        &hc.name_any(),
        crate::crd::capi_cluster::CapiClusterSpec {
            control_plane_ref: Some(control_plane_ref),
            infrastructure_ref: Some(infrastructure_ref),
            paused: None,
        },
    );
    capi.meta_mut().namespace = Some(hcp_namespace.to_string());
    capi.meta_mut().annotations = Some(annotations);
    capi
}

const BASE_PROVIDER_RULES_API_GROUPS: &[&str] =
    &["cluster.x-k8s.io", "hypershift.openshift.io", "coordination.k8s.io"];

/// §4.H `reconcileCAPIProviderRole`: base RBAC rules plus the platform's own.
pub fn reconcile_capi_provider_role(hc: &HostedCluster, namespace: &str) -> Role {
    let mut rules = vec![
        PolicyRule {
            api_groups: Some(vec!["".to_string()]),
            resources: Some(vec!["events".to_string(), "secrets".to_string(), "configmaps".to_string()]),
            verbs: vec!["get", "list", "watch", "create", "update", "patch", "delete"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            ..Default::default()
        },
        PolicyRule {
            api_groups: Some(BASE_PROVIDER_RULES_API_GROUPS.iter().map(|s| s.to_string()).collect()),
            resources: Some(vec!["*".to_string()]),
            verbs: vec!["get", "list", "watch", "create", "update", "patch", "delete"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            ..Default::default()
        },
    ];
    rules.extend(adapter_for(&hc.spec.platform).capi_provider_policy_rules());

    Role {
        metadata: ObjectMeta {
            name: Some(format!("{}-capi-provider", hc.name_any())),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        rules: Some(rules),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crd::common::{EtcdManagementType, EtcdSpec, PlatformSpec, Release};
    use crate::crd::hosted_cluster::{HostedClusterSpec, RESTART_DATE_ANNOTATION};

    fn hc() -> HostedCluster {
        let mut hc = HostedCluster::new(
            "my-cluster",
            HostedClusterSpec {
                release: Release {
                    image: "image-a".to_string(),
                },
                platform: PlatformSpec::None,
                networking: Default::default(),
                services: vec![],
                pull_secret: "pull-secret".to_string(),
                configuration: None,
                etcd: EtcdSpec {
                    management_type: EtcdManagementType::Managed,
                },
                secret_encryption: None,
                cluster_id: None,
                infra_id: None,
            },
        );
        hc.meta_mut().namespace = Some("clusters".to_string());
        let mut annotations = BTreeMap::new();
        annotations.insert(RESTART_DATE_ANNOTATION.to_string(), "2026-01-01".to_string());
        hc.meta_mut().annotations = Some(annotations);
        hc
    }

    #[test]
    fn hcp_namespace_follows_convention() {
        assert_eq!(hcp_namespace_name(&hc()), "clusters-my-cluster");
    }

    #[test]
    fn known_annotation_is_propagated_and_autoscaler_disabled_by_default() {
        let hcp = reconcile_hosted_control_plane(&hc(), None, "image-a");
        let annotations = hcp.annotations();
        assert_eq!(annotations.get(RESTART_DATE_ANNOTATION), Some(&"2026-01-01".to_string()));
        assert_eq!(annotations.get(DISABLE_CLUSTER_AUTOSCALER_ANNOTATION), Some(&"true".to_string()));
    }

    #[test]
    fn capi_cluster_carries_hosted_cluster_annotation() {
        let capi = reconcile_capi_cluster(&hc(), "clusters-my-cluster", "AWSCluster", "v1beta2", "my-cluster");
        assert_eq!(
            capi.annotations().get(HOSTED_CLUSTER_ANNOTATION),
            Some(&"clusters/my-cluster".to_string())
        );
    }
}
