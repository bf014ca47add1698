use super::PlatformAdapter;
use crate::crd::hosted_cluster::HostedCluster;
use crate::error::Error;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::rbac::v1::PolicyRule;

pub(crate) struct KubeVirt;

impl PlatformAdapter for KubeVirt {
    fn required_credential_keys(&self) -> &'static [&'static str] {
        &[]
    }

    fn capi_provider_policy_rules(&self) -> Vec<PolicyRule> {
        vec![PolicyRule {
            api_groups: Some(vec!["kubevirt.io".to_string()]),
            resources: Some(vec!["virtualmachines".to_string(), "virtualmachineinstances".to_string()]),
            verbs: vec!["get", "list", "watch", "create", "update", "patch", "delete"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            ..Default::default()
        }]
    }

    fn infra_cr_kind(&self) -> Option<&'static str> {
        Some("KubevirtCluster")
    }

    fn infra_cr_api_version(&self) -> Option<&'static str> {
        Some("infrastructure.cluster.x-k8s.io/v1alpha1")
    }

    /// KubeVirt has no cloud credential secret to validate.
    fn validate_credentials_shape(&self, _secret: &Secret) -> Result<(), Error> {
        Ok(())
    }

    fn reconcile_defaults(&self, _hc: &mut HostedCluster) {}

    /// spec.md §4.G note: KubeVirt always requires an encryption key since
    /// its storage backend provides no encryption-at-rest guarantee of its own.
    fn etcd_encryption_key_required(&self) -> bool {
        true
    }
}
