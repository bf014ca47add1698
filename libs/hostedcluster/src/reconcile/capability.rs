//! §4.B Capability Gate.

use crate::crd::common::{PublishingStrategyType, ServicePublishingStrategy};
use crate::crd::hosted_cluster::HostedCluster;
use crate::error::Error;
use crate::platform::adapter_for;

use hcop_operator::capability::{Capability, CapabilityChecker};

use k8s_openapi::api::core::v1::Secret;

pub async fn check_route_capability<C: CapabilityChecker>(
    hc: &HostedCluster,
    capability_checker: &C,
) -> Result<(), Error> {
    let publishes_route = hc
        .spec
        .services
        .iter()
        .any(|s| s.type_ == PublishingStrategyType::Route);
    if publishes_route && !capability_checker.has(Capability::Routes).await {
        return Err(Error::InputValidation {
            reason: "UnsupportedHostedClusterConfiguration".to_string(),
            message:
                "the management cluster does not advertise the Routes capability, but a \
                service is published with type Route"
                    .to_string(),
        });
    }
    Ok(())
}

/// Delegates the actual key-set check to the platform adapter so the rule
/// generalizes past Azure's specific four keys.
pub fn check_credentials_shape(hc: &HostedCluster, credentials_secret: &Secret) -> Result<(), Error> {
    adapter_for(&hc.spec.platform).validate_credentials_shape(credentials_secret)
}

pub fn check_cluster_id(hc: &HostedCluster) -> Result<(), Error> {
    if let Some(cluster_id) = hc.spec.cluster_id.as_ref() {
        if !cluster_id.0.is_empty() {
            cluster_id.parse().map_err(|_| Error::InputValidation {
                reason: "InvalidConfiguration".to_string(),
                message: format!("spec.clusterID {:?} is not a valid UUID", cluster_id.0),
            })?;
        }
    }
    Ok(())
}

/// §8 Scenario S6: message names the *later* service in spec order as the
/// one that "can't be published", citing the earlier one it collides with.
pub fn check_hostname_collisions(hc: &HostedCluster) -> Result<(), Error> {
    let services = &hc.spec.services;
    for i in 0..services.len() {
        for j in (i + 1)..services.len() {
            if let Some((hostname, earlier, later)) = colliding_hostname(&services[i], &services[j])
            {
                return Err(Error::InputValidation {
                    reason: "InvalidConfiguration".to_string(),
                    message: format!(
                        "service type {later:?} can't be published with the same hostname \
                        {hostname} as service type {earlier:?}"
                    ),
                });
            }
        }
    }
    Ok(())
}

fn colliding_hostname<'a>(
    a: &'a ServicePublishingStrategy,
    b: &'a ServicePublishingStrategy,
) -> Option<(&'a str, crate::crd::common::ServiceType, crate::crd::common::ServiceType)> {
    if a.type_ != PublishingStrategyType::Route || b.type_ != PublishingStrategyType::Route {
        return None;
    }
    let hostname_a = a.route.as_ref()?.hostname.as_deref()?;
    let hostname_b = b.route.as_ref()?.hostname.as_deref()?;
    if hostname_a == hostname_b {
        Some((hostname_a, a.service, b.service))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crd::common::{RoutePublishingStrategy, ServiceType};

    fn route_service(service: ServiceType, hostname: &str) -> ServicePublishingStrategy {
        ServicePublishingStrategy {
            service,
            type_: PublishingStrategyType::Route,
            node_port: None,
            route: Some(RoutePublishingStrategy {
                hostname: Some(hostname.to_string()),
            }),
        }
    }

    #[test]
    fn reports_hostname_collision_naming_both_services() {
        let services = vec![
            route_service(ServiceType::APIServer, "api.example.com"),
            route_service(ServiceType::OAuthServer, "api.example.com"),
        ];
        let err = colliding_hostname(&services[0], &services[1]).unwrap();
        assert_eq!(err.0, "api.example.com");
        assert_eq!(err.1, ServiceType::APIServer);
        assert_eq!(err.2, ServiceType::OAuthServer);
    }

    #[test]
    fn distinct_hostnames_do_not_collide() {
        let services = vec![
            route_service(ServiceType::APIServer, "api.example.com"),
            route_service(ServiceType::OAuthServer, "oauth.example.com"),
        ];
        assert!(colliding_hostname(&services[0], &services[1]).is_none());
    }
}
