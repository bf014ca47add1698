//! §4.F Availability Aggregator.

use crate::crd::conditions::{
    find_condition, merge_condition, STATUS_FALSE, STATUS_TRUE, TYPE_HOSTED_CLUSTER_AVAILABLE,
    TYPE_HOSTED_CONTROL_PLANE_AVAILABLE,
};
use crate::crd::hosted_control_plane::HostedControlPlane;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;

pub fn compute_hosted_cluster_availability(
    existing: Option<&Condition>,
    hcp: Option<&HostedControlPlane>,
    observed_generation: i64,
) -> Condition {
    let Some(hcp) = hcp else {
        return merge_condition(
            existing,
            TYPE_HOSTED_CLUSTER_AVAILABLE,
            STATUS_FALSE,
            "WaitingForAvailable",
            "waiting for the HostedControlPlane to be created",
            Some(observed_generation),
        );
    };

    let sub_condition = hcp
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_deref())
        .and_then(|conditions| find_condition(conditions, TYPE_HOSTED_CONTROL_PLANE_AVAILABLE));

    let (status, reason, message): (&str, &str, &str) = match sub_condition {
        Some(condition) => (&condition.status, &condition.reason, &condition.message),
        None => (
            STATUS_FALSE,
            "HostedControlPlaneAvailableConditionNotFound",
            "the HostedControlPlane does not yet report an Available condition",
        ),
    };

    merge_condition(
        existing,
        TYPE_HOSTED_CLUSTER_AVAILABLE,
        status,
        reason,
        message,
        Some(observed_generation),
    )
}

pub struct EndpointStatus {
    pub status: String,
    pub message: String,
}

/// §4.F / S8: when every endpoint service reports `True`, aggregate `True`
/// with a canonical message; otherwise join every failing message with
/// `"; "` and surface the first failing reason.
pub fn compute_aws_endpoint_service_condition(
    existing: Option<&Condition>,
    endpoints: &[EndpointStatus],
    condition_type: &str,
    observed_generation: i64,
) -> Condition {
    let failing: Vec<&EndpointStatus> = endpoints.iter().filter(|e| e.status != STATUS_TRUE).collect();

    let (status, reason, message) = if failing.is_empty() {
        (
            STATUS_TRUE,
            "AllEndpointServicesAvailable",
            "all AWS endpoint services are available".to_string(),
        )
    } else {
        let joined = failing
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        (STATUS_FALSE, "EndpointServiceNotAvailable", joined)
    };

    merge_condition(
        existing,
        condition_type,
        status,
        reason,
        &message,
        Some(observed_generation),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_hcp_yields_waiting_for_available() {
        let condition = compute_hosted_cluster_availability(None, None, 1);
        assert_eq!(condition.status, STATUS_FALSE);
        assert_eq!(condition.reason, "WaitingForAvailable");
    }

    /// S8.
    #[test]
    fn aggregates_first_failing_message() {
        let endpoints = vec![
            EndpointStatus {
                status: STATUS_TRUE.to_string(),
                message: "ok".to_string(),
            },
            EndpointStatus {
                status: STATUS_FALSE.to_string(),
                message: "error message B".to_string(),
            },
        ];
        let condition =
            compute_aws_endpoint_service_condition(None, &endpoints, "AWSEndpointAvailable", 1);
        assert_eq!(condition.status, STATUS_FALSE);
        assert_eq!(condition.message, "error message B");
    }

    #[test]
    fn all_true_yields_canonical_message() {
        let endpoints = vec![
            EndpointStatus {
                status: STATUS_TRUE.to_string(),
                message: "ok".to_string(),
            },
            EndpointStatus {
                status: STATUS_TRUE.to_string(),
                message: "ok".to_string(),
            },
        ];
        let condition =
            compute_aws_endpoint_service_condition(None, &endpoints, "AWSEndpointAvailable", 1);
        assert_eq!(condition.status, STATUS_TRUE);
    }
}
