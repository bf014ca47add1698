//! §4.G Platform Adapter: a tagged variant + capability set, not an
//! inheritance hierarchy. Each platform is a zero-sized unit struct
//! implementing [`PlatformAdapter`]; [`adapter_for`] is the single
//! dispatch point, returning a `&'static dyn` so callers never allocate.

mod agent;
mod aws;
mod azure;
mod ibmcloud;
mod kubevirt;
mod none;
mod powervs;

use crate::crd::common::PlatformSpec;
use crate::crd::hosted_cluster::HostedCluster;
use crate::error::Error;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::rbac::v1::PolicyRule;

pub trait PlatformAdapter: Send + Sync {
    /// Keys that must be present in the referenced credentials `Secret`.
    fn required_credential_keys(&self) -> &'static [&'static str];

    /// RBAC rules the generated Cluster API provider role needs, beyond the
    /// cross-platform baseline (spec.md §4.H).
    fn capi_provider_policy_rules(&self) -> Vec<PolicyRule>;

    /// `Kind`/`apiVersion` used when populating the Cluster API `Cluster`'s
    /// `infrastructureRef` (spec.md §4.H). `None` when this platform has no
    /// infrastructure CR to reference.
    fn infra_cr_kind(&self) -> Option<&'static str> {
        None
    }
    fn infra_cr_api_version(&self) -> Option<&'static str> {
        None
    }

    /// Checks the shape of the referenced credentials secret, aggregating
    /// every missing key into a single error (spec.md §4.B).
    fn validate_credentials_shape(&self, secret: &Secret) -> Result<(), Error>;

    /// Applies platform-specific defaulting in place, e.g. AWS resource tags
    /// (Invariant 6).
    fn reconcile_defaults(&self, hc: &mut HostedCluster);

    /// Whether this platform requires `Spec.SecretEncryption` to be set
    /// (KubeVirt, per spec.md §4.G note).
    fn etcd_encryption_key_required(&self) -> bool {
        false
    }
}

/// Name of the Secret the orchestrator must fetch to run
/// `validate_credentials_shape`, or `None` for platforms without one
/// (Agent, PowerVS, KubeVirt, None).
pub fn credentials_secret_name(platform: &PlatformSpec) -> Option<&str> {
    match platform {
        PlatformSpec::AWS(p) => p.credentials_secret_ref.as_deref(),
        PlatformSpec::Azure(p) => p.credentials_secret_ref.as_deref(),
        PlatformSpec::IBMCloud(p) => p.credentials_secret_ref.as_deref(),
        PlatformSpec::PowerVS(p) => p.credentials_secret_ref.as_deref(),
        PlatformSpec::KubeVirt(_) | PlatformSpec::Agent(_) | PlatformSpec::None => None,
    }
}

pub fn adapter_for(platform: &PlatformSpec) -> &'static dyn PlatformAdapter {
    match platform {
        PlatformSpec::AWS(_) => &aws::Aws,
        PlatformSpec::Azure(_) => &azure::Azure,
        PlatformSpec::IBMCloud(_) => &ibmcloud::IbmCloud,
        PlatformSpec::KubeVirt(_) => &kubevirt::KubeVirt,
        PlatformSpec::Agent(_) => &agent::Agent,
        PlatformSpec::PowerVS(_) => &powervs::PowerVs,
        PlatformSpec::None => &none::NonePlatform,
    }
}

/// Shared by every adapter's `validate_credentials_shape`: collects every
/// missing key into one `Error::InputValidation` rather than failing on the
/// first (spec.md §4.B Azure example).
pub(crate) fn require_secret_keys(secret: &Secret, keys: &[&str]) -> Result<(), Error> {
    let present = secret.data.as_ref();
    let missing: Vec<&str> = keys
        .iter()
        .filter(|key| !present.is_some_and(|data| data.contains_key(**key)))
        .copied()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::InputValidation {
            reason: "InvalidPlatformCredentials".to_string(),
            message: format!(
                "secret {:?} is missing required key(s): {}",
                secret.metadata.name.as_deref().unwrap_or(""),
                missing.join(", ")
            ),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crd::common::{AwsPlatformSpec, AzurePlatformSpec};

    #[test]
    fn dispatch_picks_matching_adapter() {
        let aws_spec = PlatformSpec::AWS(AwsPlatformSpec::default());
        assert_eq!(adapter_for(&aws_spec).infra_cr_kind(), Some("AWSCluster"));

        let azure_spec = PlatformSpec::Azure(AzurePlatformSpec::default());
        assert_eq!(
            adapter_for(&azure_spec).required_credential_keys(),
            &["AZURE_CLIENT_ID", "AZURE_CLIENT_SECRET", "AZURE_SUBSCRIPTION_ID", "AZURE_TENANT_ID"]
        );
    }
}
