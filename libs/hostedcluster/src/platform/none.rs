use super::PlatformAdapter;
use crate::crd::hosted_cluster::HostedCluster;
use crate::error::Error;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::rbac::v1::PolicyRule;

/// The bare-metal/self-managed placeholder platform: no cloud provider, no
/// Cluster API infrastructure CR.
pub(crate) struct NonePlatform;

impl PlatformAdapter for NonePlatform {
    fn required_credential_keys(&self) -> &'static [&'static str] {
        &[]
    }

    fn capi_provider_policy_rules(&self) -> Vec<PolicyRule> {
        Vec::new()
    }

    fn validate_credentials_shape(&self, _secret: &Secret) -> Result<(), Error> {
        Ok(())
    }

    fn reconcile_defaults(&self, _hc: &mut HostedCluster) {}
}
