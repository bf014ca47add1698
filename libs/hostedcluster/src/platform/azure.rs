use super::PlatformAdapter;
use crate::crd::hosted_cluster::HostedCluster;
use crate::error::Error;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::rbac::v1::PolicyRule;

pub(crate) struct Azure;

const REQUIRED_KEYS: &[&str] = &[
    "AZURE_CLIENT_ID",
    "AZURE_CLIENT_SECRET",
    "AZURE_SUBSCRIPTION_ID",
    "AZURE_TENANT_ID",
];

impl PlatformAdapter for Azure {
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
        Some("AzureCluster")
    }

    fn infra_cr_api_version(&self) -> Option<&'static str> {
        Some("infrastructure.cluster.x-k8s.io/v1beta1")
    }

    /// §4.B: a secret missing more than one key reports all of them in a
    /// single message, not just the first found.
    fn validate_credentials_shape(&self, secret: &Secret) -> Result<(), Error> {
        super::require_secret_keys(secret, REQUIRED_KEYS)
    }

    fn reconcile_defaults(&self, _hc: &mut HostedCluster) {}
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;

    fn secret_with_keys(keys: &[&str]) -> Secret {
        let mut data = BTreeMap::new();
        for key in keys {
            data.insert(key.to_string(), k8s_openapi::ByteString(vec![]));
        }
        Secret {
            data: Some(data),
            ..Default::default()
        }
    }

    #[test]
    fn reports_every_missing_key_at_once() {
        let secret = secret_with_keys(&["AZURE_CLIENT_ID"]);
        let err = Azure.validate_credentials_shape(&secret).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("AZURE_CLIENT_SECRET"));
        assert!(message.contains("AZURE_SUBSCRIPTION_ID"));
        assert!(message.contains("AZURE_TENANT_ID"));
        assert!(!message.contains("AZURE_CLIENT_ID,"));
    }

    #[test]
    fn passes_when_all_keys_present() {
        let secret = secret_with_keys(REQUIRED_KEYS);
        assert!(Azure.validate_credentials_shape(&secret).is_ok());
    }
}
