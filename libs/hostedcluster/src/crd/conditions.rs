use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};

pub const TYPE_HOSTED_CLUSTER_AVAILABLE: &str = "HostedClusterAvailable";
pub const TYPE_VALID_HOSTED_CLUSTER_CONFIGURATION: &str = "ValidHostedClusterConfiguration";
pub const TYPE_VALID_RELEASE_IMAGE: &str = "ValidReleaseImage";
pub const TYPE_CLUSTER_VERSION_UPGRADEABLE: &str = "ClusterVersionUpgradeable";
pub const TYPE_CLUSTER_VERSION_PROGRESSING: &str = "ClusterVersionProgressing";
pub const TYPE_RECONCILIATION_SUCCEEDED: &str = "ReconciliationSucceeded";
pub const TYPE_CLOUD_RESOURCES_DESTROYED: &str = "CloudResourcesDestroyed";
pub const TYPE_AWS_ENDPOINT_AVAILABLE: &str = "AWSEndpointAvailable";
pub const TYPE_HOSTED_CONTROL_PLANE_AVAILABLE: &str = "HostedControlPlaneAvailable";

pub const STATUS_TRUE: &str = "True";
pub const STATUS_FALSE: &str = "False";
pub const STATUS_UNKNOWN: &str = "Unknown";

/// Builds the next value of a condition, advancing `lastTransitionTime` only
/// when `status` actually changes relative to `existing`.
pub fn merge_condition(
    existing: Option<&Condition>,
    type_: &str,
    status: &str,
    reason: &str,
    message: &str,
    observed_generation: Option<i64>,
) -> Condition {
    let last_transition_time = match existing {
        Some(e) if e.status == status => e.last_transition_time.clone(),
        _ => Time(Utc::now()),
    };
    Condition {
        type_: type_.to_string(),
        status: status.to_string(),
        reason: reason.to_string(),
        message: message.to_string(),
        last_transition_time,
        observed_generation,
    }
}

/// Replaces the condition of the same `type_` in `previous`, or appends it,
/// preserving every other condition untouched.
pub fn update_conditions(previous: Vec<Condition>, new_condition: Condition) -> Vec<Condition> {
    let mut result: Vec<Condition> = previous
        .into_iter()
        .filter(|c| c.type_ != new_condition.type_)
        .collect();
    result.push(new_condition);
    result
}

pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

#[cfg(test)]
mod test {
    use super::*;

    fn condition(type_: &str, status: &str) -> Condition {
        Condition {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: String::new(),
            message: String::new(),
            last_transition_time: Time(Utc::now()),
            observed_generation: None,
        }
    }

    #[test]
    fn merge_condition_keeps_transition_time_when_status_unchanged() {
        let existing = condition(TYPE_HOSTED_CLUSTER_AVAILABLE, STATUS_TRUE);
        let merged = merge_condition(
            Some(&existing),
            TYPE_HOSTED_CLUSTER_AVAILABLE,
            STATUS_TRUE,
            "Ready",
            "ok",
            Some(2),
        );
        assert_eq!(merged.last_transition_time, existing.last_transition_time);
        assert_eq!(merged.observed_generation, Some(2));
    }

    #[test]
    fn merge_condition_advances_transition_time_on_status_change() {
        let existing = condition(TYPE_HOSTED_CLUSTER_AVAILABLE, STATUS_TRUE);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let merged = merge_condition(
            Some(&existing),
            TYPE_HOSTED_CLUSTER_AVAILABLE,
            STATUS_FALSE,
            "WaitingForAvailable",
            "not yet",
            None,
        );
        assert_ne!(merged.last_transition_time, existing.last_transition_time);
    }

    #[test]
    fn update_conditions_replaces_same_type_and_keeps_others() {
        let previous = vec![
            condition(TYPE_HOSTED_CLUSTER_AVAILABLE, STATUS_TRUE),
            condition(TYPE_RECONCILIATION_SUCCEEDED, STATUS_TRUE),
        ];
        let updated = update_conditions(
            previous,
            condition(TYPE_HOSTED_CLUSTER_AVAILABLE, STATUS_FALSE),
        );
        assert_eq!(updated.len(), 2);
        assert!(
            updated
                .iter()
                .any(|c| c.type_ == TYPE_HOSTED_CLUSTER_AVAILABLE && c.status == STATUS_FALSE)
        );
        assert!(
            updated
                .iter()
                .any(|c| c.type_ == TYPE_RECONCILIATION_SUCCEEDED && c.status == STATUS_TRUE)
        );
    }
}
