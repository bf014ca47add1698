use super::PlatformAdapter;
use crate::crd::hosted_cluster::HostedCluster;
use crate::error::Error;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::rbac::v1::PolicyRule;

pub(crate) struct Agent;

impl PlatformAdapter for Agent {
    fn required_credential_keys(&self) -> &'static [&'static str] {
        &[]
    }

    fn capi_provider_policy_rules(&self) -> Vec<PolicyRule> {
        vec![PolicyRule {
            api_groups: Some(vec!["agent-install.openshift.io".to_string()]),
            resources: Some(vec!["agents".to_string()]),
            verbs: vec!["get", "list", "watch", "update", "patch"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            ..Default::default()
        }]
    }

    fn infra_cr_kind(&self) -> Option<&'static str> {
        Some("AgentCluster")
    }

    fn infra_cr_api_version(&self) -> Option<&'static str> {
        Some("capi-provider.agent-install.openshift.io/v1alpha1")
    }

    /// Agent has no cloud credential secret to validate; bare-metal hosts are
    /// supplied out of band.
    fn validate_credentials_shape(&self, _secret: &Secret) -> Result<(), Error> {
        Ok(())
    }

    fn reconcile_defaults(&self, _hc: &mut HostedCluster) {}
}
