//! §4.C Release Resolver.

use crate::crd::hosted_cluster::{HostedCluster, SKIP_RELEASE_IMAGE_VALIDATION_ANNOTATION};
use crate::error::Error;

use hcop_operator::release::{ReleaseImage, ReleaseLookupError, ReleaseProvider};

use k8s_openapi::api::core::v1::Secret;

const DOCKER_CONFIG_KEY: &str = ".dockerconfigjson";

pub fn pull_secret_bytes(secret: &Secret) -> Result<Vec<u8>, Error> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(DOCKER_CONFIG_KEY))
        .map(|b| b.0.clone())
        .ok_or_else(|| Error::ReleaseLookup {
            reason: "InvalidPullSecret".to_string(),
            message: format!("pull secret is missing the {DOCKER_CONFIG_KEY:?} key"),
        })
}

fn skips_release_validation(hc: &HostedCluster) -> bool {
    hc.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(SKIP_RELEASE_IMAGE_VALIDATION_ANNOTATION))
        .is_some_and(|v| v == "true")
}

/// Returns `None` when validation is bypassed via the skip annotation,
/// short-circuiting both this lookup and the upgrade policy gate (§4.C).
pub async fn resolve_release<P: ReleaseProvider>(
    hc: &HostedCluster,
    provider: &P,
    pull_secret: &Secret,
) -> Result<Option<ReleaseImage>, Error> {
    if skips_release_validation(hc) {
        return Ok(None);
    }
    let pull_secret_bytes = pull_secret_bytes(pull_secret)?;
    let release = provider
        .lookup(&hc.spec.release.image, &pull_secret_bytes)
        .await
        .map_err(|err| match err {
            ReleaseLookupError::Transient(message) => Error::ReleaseLookup {
                reason: "ReleaseLookupTransientFailure".to_string(),
                message,
            },
            other => Error::ReleaseLookup {
                reason: "InvalidImage".to_string(),
                message: other.to_string(),
            },
        })?;
    Ok(Some(release))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crd::common::{EtcdManagementType, EtcdSpec, PlatformSpec, Release};
    use crate::crd::hosted_cluster::HostedClusterSpec;
    use hcop_operator::release::StaticReleaseProvider;
    use semver::Version;
    use std::collections::BTreeMap;

    fn hc_with_image(image: &str, skip_validation: bool) -> HostedCluster {
        let mut hc = HostedCluster::new(
            "test",
            HostedClusterSpec {
                release: Release {
                    image: image.to_string(),
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
        if skip_validation {
            let mut annotations = BTreeMap::new();
            annotations.insert(
                SKIP_RELEASE_IMAGE_VALIDATION_ANNOTATION.to_string(),
                "true".to_string(),
            );
            hc.metadata.annotations = Some(annotations);
        }
        hc
    }

    fn secret_with_docker_config() -> Secret {
        let mut data = BTreeMap::new();
        data.insert(
            DOCKER_CONFIG_KEY.to_string(),
            k8s_openapi::ByteString(b"{}".to_vec()),
        );
        Secret {
            data: Some(data),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn skip_annotation_bypasses_lookup() {
        let hc = hc_with_image("image-a", true);
        let provider = StaticReleaseProvider::new();
        let secret = secret_with_docker_config();
        let resolved = resolve_release(&hc, &provider, &secret).await.unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn missing_pull_secret_key_is_a_release_lookup_error() {
        let hc = hc_with_image("image-a", false);
        let provider = StaticReleaseProvider::new();
        let secret = Secret::default();
        let err = resolve_release(&hc, &provider, &secret).await.unwrap_err();
        assert_eq!(err.reason(), "InvalidPullSecret");
    }

    #[tokio::test]
    async fn resolves_known_image() {
        let hc = hc_with_image("image-a", false);
        let provider = StaticReleaseProvider::new().with_image(ReleaseImage {
            image: "image-a".to_string(),
            version: Version::parse("4.12.0").unwrap(),
            digest: None,
            component_versions: Default::default(),
        });
        let secret = secret_with_docker_config();
        let resolved = resolve_release(&hc, &provider, &secret).await.unwrap();
        assert_eq!(resolved.unwrap().version, Version::parse("4.12.0").unwrap());
    }
}
