use super::PlatformAdapter;
use crate::crd::hosted_cluster::HostedCluster;
use crate::error::Error;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::rbac::v1::PolicyRule;

pub(crate) struct PowerVs;

const REQUIRED_KEYS: &[&str] = &["ibmcloud_api_key"];

impl PlatformAdapter for PowerVs {
    fn required_credential_keys(&self) -> &'static [&'static str] {
        REQUIRED_KEYS
    }

    fn capi_provider_policy_rules(&self) -> Vec<PolicyRule> {
        vec![PolicyRule {
            api_groups: Some(vec!["".to_string()]),
            resources: Some(vec!["secrets".to_string()]),
            verbs: vec!["get", "list", "watch"].into_iter().map(str::to_string).collect(),
            ..Default::default()
        }]
    }

    fn infra_cr_kind(&self) -> Option<&'static str> {
        Some("IBMPowerVSCluster")
    }

    fn infra_cr_api_version(&self) -> Option<&'static str> {
        Some("infrastructure.cluster.x-k8s.io/v1beta2")
    }

    fn validate_credentials_shape(&self, secret: &Secret) -> Result<(), Error> {
        super::require_secret_keys(secret, REQUIRED_KEYS)
    }

    fn reconcile_defaults(&self, _hc: &mut HostedCluster) {}
}
