//! §4.E Version Status Engine.

use crate::crd::common::Release;
use crate::crd::hosted_cluster::{ClusterVersionStatus, HistoryState, UpdateHistoryEntry};
use crate::crd::hosted_control_plane::HostedControlPlaneStatus;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

/// Invariant 2: idempotent given the same `(desired_image, hcp_status, now)`
/// — calling this twice in a row with its own output as `current` is a
/// no-op the second time.
pub fn compute_cluster_version_status(
    now: Time,
    desired_release: &Release,
    hcp_status: Option<&HostedControlPlaneStatus>,
    current: &ClusterVersionStatus,
) -> ClusterVersionStatus {
    if current.history.is_empty() {
        return ClusterVersionStatus {
            desired: Some(desired_release.clone()),
            history: vec![UpdateHistoryEntry {
                image: desired_release.image.clone(),
                version: None,
                state: HistoryState::Partial,
                started_time: now,
                completion_time: None,
            }],
        };
    }

    let mut history = current.history.clone();
    let mut desired = current.desired.clone();
    let active = &mut history[0];

    if active.state == HistoryState::Partial {
        if let Some(hcp_status) = hcp_status {
            if hcp_status.release_image.as_deref() == Some(active.image.as_str()) {
                if let Some(transition_time) = hcp_status.last_release_image_transition_time.clone() {
                    active.state = HistoryState::Completed;
                    active.completion_time = Some(transition_time);
                    active.version = hcp_status.version.clone();
                }
            }
        }
    }

    let desired_image_matches = desired.as_ref().is_some_and(|d| d.image == desired_release.image);
    if !desired_image_matches {
        if history[0].state == HistoryState::Completed {
            history.insert(
                0,
                UpdateHistoryEntry {
                    image: desired_release.image.clone(),
                    version: None,
                    state: HistoryState::Partial,
                    started_time: now,
                    completion_time: None,
                },
            );
            desired = Some(desired_release.clone());
        }
        // else: active entry still Partial, defer — neither Desired nor
        // History changes until the current rollout completes.
    }

    ClusterVersionStatus { desired, history }
}

#[cfg(test)]
mod test {
    use super::*;

    fn time(seconds: i64) -> Time {
        Time(chrono::DateTime::from_timestamp(seconds, 0).unwrap())
    }

    /// S1.
    #[test]
    fn initial_rollout_produces_partial_history() {
        let release = Release {
            image: "a".to_string(),
        };
        let result = compute_cluster_version_status(
            time(100),
            &release,
            None,
            &ClusterVersionStatus::default(),
        );
        assert_eq!(result.desired, Some(release));
        assert_eq!(result.history.len(), 1);
        assert_eq!(result.history[0].state, HistoryState::Partial);
        assert_eq!(result.history[0].image, "a");
    }

    /// S2.
    #[test]
    fn deferred_upgrade_keeps_desired_and_history_unchanged() {
        let current = ClusterVersionStatus {
            desired: Some(Release {
                image: "a".to_string(),
            }),
            history: vec![UpdateHistoryEntry {
                image: "a".to_string(),
                version: None,
                state: HistoryState::Partial,
                started_time: time(100),
                completion_time: None,
            }],
        };
        let hcp_status = HostedControlPlaneStatus {
            release_image: Some("a".to_string()),
            version: None,
            conditions: None,
            last_release_image_transition_time: None,
        };
        let next_release = Release {
            image: "b".to_string(),
        };
        let result =
            compute_cluster_version_status(time(200), &next_release, Some(&hcp_status), &current);
        assert_eq!(result.desired.unwrap().image, "a");
        assert_eq!(result.history.len(), 1);
        assert_eq!(result.history[0].image, "a");
        assert_eq!(result.history[0].state, HistoryState::Partial);
    }

    /// S3.
    #[test]
    fn upgrade_proceeds_once_active_entry_completes() {
        let current = ClusterVersionStatus {
            desired: Some(Release {
                image: "a".to_string(),
            }),
            history: vec![UpdateHistoryEntry {
                image: "a".to_string(),
                version: None,
                state: HistoryState::Partial,
                started_time: time(100),
                completion_time: None,
            }],
        };
        let hcp_status = HostedControlPlaneStatus {
            release_image: Some("a".to_string()),
            version: Some("4.12.0".to_string()),
            conditions: None,
            last_release_image_transition_time: Some(time(150)),
        };
        let next_release = Release {
            image: "b".to_string(),
        };
        let result =
            compute_cluster_version_status(time(200), &next_release, Some(&hcp_status), &current);
        assert_eq!(result.desired.unwrap().image, "b");
        assert_eq!(result.history.len(), 2);
        assert_eq!(result.history[0].image, "b");
        assert_eq!(result.history[0].state, HistoryState::Partial);
        assert_eq!(result.history[1].image, "a");
        assert_eq!(result.history[1].state, HistoryState::Completed);
    }

    /// Invariant 3.
    #[test]
    fn no_new_entry_prepended_when_image_already_active_and_completed() {
        let current = ClusterVersionStatus {
            desired: Some(Release {
                image: "a".to_string(),
            }),
            history: vec![UpdateHistoryEntry {
                image: "a".to_string(),
                version: Some("4.12.0".to_string()),
                state: HistoryState::Completed,
                started_time: time(100),
                completion_time: Some(time(150)),
            }],
        };
        let hcp_status = HostedControlPlaneStatus {
            release_image: Some("a".to_string()),
            version: Some("4.12.0".to_string()),
            conditions: None,
            last_release_image_transition_time: Some(time(150)),
        };
        let same_release = Release {
            image: "a".to_string(),
        };
        let result =
            compute_cluster_version_status(time(200), &same_release, Some(&hcp_status), &current);
        assert_eq!(result.history.len(), 1);
        assert_eq!(result, current);
    }

    /// Invariant 2.
    #[test]
    fn computation_is_idempotent() {
        let release = Release {
            image: "a".to_string(),
        };
        let first = compute_cluster_version_status(
            time(100),
            &release,
            None,
            &ClusterVersionStatus::default(),
        );
        let second = compute_cluster_version_status(time(100), &release, None, &first);
        assert_eq!(first, second);
    }
}
