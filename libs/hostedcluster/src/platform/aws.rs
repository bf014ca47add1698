use super::PlatformAdapter;
use crate::crd::common::PlatformSpec;
use crate::crd::hosted_cluster::HostedCluster;
use crate::error::Error;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::rbac::v1::PolicyRule;

pub(crate) struct Aws;

const REQUIRED_KEYS: &[&str] = &["aws_access_key_id", "aws_secret_access_key"];

fn owned_tag_key(infra_id: &str) -> String {
    format!("kubernetes.io/cluster/{infra_id}")
}

impl PlatformAdapter for Aws {
    fn required_credential_keys(&self) -> &'static [&'static str] {
        REQUIRED_KEYS
    }

    fn capi_provider_policy_rules(&self) -> Vec<PolicyRule> {
        vec![PolicyRule {
            api_groups: Some(vec!["".to_string()]),
            resources: Some(vec!["secrets".to_string(), "events".to_string()]),
            verbs: vec!["get", "list", "watch", "create", "update", "patch"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            ..Default::default()
        }]
    }

    fn infra_cr_kind(&self) -> Option<&'static str> {
        Some("AWSCluster")
    }

    fn infra_cr_api_version(&self) -> Option<&'static str> {
        Some("infrastructure.cluster.x-k8s.io/v1beta2")
    }

    fn validate_credentials_shape(&self, secret: &Secret) -> Result<(), Error> {
        super::require_secret_keys(secret, REQUIRED_KEYS)
    }

    /// Invariant 6: the controller must ensure
    /// `kubernetes.io/cluster/<InfraID>: owned` is present in
    /// `Platform.AWS.ResourceTags`, adding or correcting it if absent or
    /// wrong, without disturbing any other tag the user set.
    fn reconcile_defaults(&self, hc: &mut HostedCluster) {
        let infra_id = match hc.spec.infra_id.as_ref() {
            Some(id) => id.0.clone(),
            None => return,
        };
        if let PlatformSpec::AWS(aws) = &mut hc.spec.platform {
            let tags = aws.resource_tags.get_or_insert_with(Default::default);
            let key = owned_tag_key(&infra_id);
            if tags.get(&key).map(String::as_str) != Some("owned") {
                tags.insert(key, "owned".to_string());
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crd::common::AwsPlatformSpec;
    use crate::crd::hosted_cluster::HostedClusterSpec;
    use crate::crd::ids::InfraId;
    use std::collections::BTreeMap;

    fn hc_with_infra_id(infra_id: &str, existing_tags: BTreeMap<String, String>) -> HostedCluster {
        let mut hc = HostedCluster::new(
            "test",
            HostedClusterSpec {
                release: crate::crd::common::Release {
                    image: "img".to_string(),
                },
                platform: PlatformSpec::AWS(AwsPlatformSpec {
                    region: "us-east-1".to_string(),
                    credentials_secret_ref: None,
                    resource_tags: Some(existing_tags),
                }),
                networking: Default::default(),
                services: vec![],
                pull_secret: "pull-secret".to_string(),
                configuration: None,
                etcd: crate::crd::common::EtcdSpec {
                    management_type: crate::crd::common::EtcdManagementType::Managed,
                },
                secret_encryption: None,
                cluster_id: None,
                infra_id: Some(InfraId(infra_id.to_string())),
            },
        );
        hc.metadata.namespace = Some("default".to_string());
        hc
    }

    #[test]
    fn adds_owned_tag_when_absent() {
        let mut hc = hc_with_infra_id("mycluster-ab12c", BTreeMap::new());
        Aws.reconcile_defaults(&mut hc);
        let PlatformSpec::AWS(aws) = &hc.spec.platform else {
            unreachable!()
        };
        assert_eq!(
            aws.resource_tags.as_ref().unwrap().get("kubernetes.io/cluster/mycluster-ab12c"),
            Some(&"owned".to_string())
        );
    }

    #[test]
    fn corrects_wrong_owned_tag_without_disturbing_others() {
        let mut tags = BTreeMap::new();
        tags.insert("kubernetes.io/cluster/mycluster-ab12c".to_string(), "shared".to_string());
        tags.insert("team".to_string(), "infra".to_string());
        let mut hc = hc_with_infra_id("mycluster-ab12c", tags);
        Aws.reconcile_defaults(&mut hc);
        let PlatformSpec::AWS(aws) = &hc.spec.platform else {
            unreachable!()
        };
        let tags = aws.resource_tags.as_ref().unwrap();
        assert_eq!(tags.get("kubernetes.io/cluster/mycluster-ab12c"), Some(&"owned".to_string()));
        assert_eq!(tags.get("team"), Some(&"infra".to_string()));
    }
}
