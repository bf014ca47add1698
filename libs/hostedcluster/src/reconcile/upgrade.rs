//! §4.D Upgrade Policy Engine.

use crate::crd::common::NetworkType;
use crate::error::Error;

use semver::Version;

/// The 7 ordered rules of §4.D, first failure wins. `current` is `None` on
/// the very first rollout, when only the operator-supported bounds apply.
pub fn evaluate_version_rules(
    current: Option<&Version>,
    next: &Version,
    network_type: NetworkType,
    is_power_vs: bool,
    min_supported: &Version,
    max_supported: &Version,
) -> Result<(), Error> {
    const FLOOR: (u64, u64, u64) = (4, 8, 0);
    if (next.major, next.minor, next.patch) < FLOOR {
        return Err(Error::UpgradePolicy {
            reason: "UnsupportedHostedClusterVersion".to_string(),
            message: format!("release image version \"{next}\" is below the minimum supported version 4.8.0"),
        });
    }

    if let Some(current) = current {
        if current.major == next.major && current.minor == next.minor {
            return Ok(());
        }
        if next.minor < current.minor {
            return Err(Error::UpgradePolicy {
                reason: "UnsupportedHostedClusterVersion".to_string(),
                message: format!(
                    "y-stream downgrade from \"{current}\" to \"{next}\" is not supported"
                ),
            });
        }
        if next.minor > current.minor && network_type == NetworkType::OpenShiftSDN && !is_power_vs {
            return Err(Error::UpgradePolicy {
                reason: "UnsupportedHostedClusterVersion".to_string(),
                message: format!(
                    "y-stream upgrade from \"{current}\" to \"{next}\" is not for OpenShiftSDN"
                ),
            });
        }
    }

    if next > max_supported {
        return Err(Error::UpgradePolicy {
            reason: "UnsupportedHostedClusterVersion".to_string(),
            message: format!("release image version \"{next}\" is newer than the versions this operator supports (max {max_supported})"),
        });
    }
    if next < min_supported {
        return Err(Error::UpgradePolicy {
            reason: "UnsupportedHostedClusterVersion".to_string(),
            message: format!("release image version \"{next}\" is older than the versions this operator supports (min {min_supported})"),
        });
    }

    Ok(())
}

/// Full gate: a `ForceUpgradeToAnnotation` matching the target image bypasses
/// everything; otherwise `ClusterVersionUpgradeable=False` blocks any change
/// of image; otherwise the ordered version rules apply.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_upgrade(
    current: Option<&Version>,
    next: &Version,
    network_type: NetworkType,
    is_power_vs: bool,
    min_supported: &Version,
    max_supported: &Version,
    cluster_version_upgradeable: bool,
    force_upgrade_to: Option<&str>,
    current_desired_image: &str,
    next_image: &str,
) -> Result<(), Error> {
    if let Some(forced) = force_upgrade_to {
        if forced == next_image {
            return Ok(());
        }
    }
    if !cluster_version_upgradeable && next_image != current_desired_image {
        return Err(Error::UpgradePolicy {
            reason: "ClusterVersionUpgradeableFalse".to_string(),
            message: "upgrade blocked by ClusterVersionUpgradeable".to_string(),
        });
    }
    evaluate_version_rules(current, next, network_type, is_power_vs, min_supported, max_supported)
}

#[cfg(test)]
mod test {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn below_floor_is_rejected() {
        let err = evaluate_version_rules(None, &v("4.7.9"), NetworkType::OVNKubernetes, false, &v("4.8.0"), &v("4.20.0"))
            .unwrap_err();
        assert_eq!(err.reason(), "UnsupportedHostedClusterVersion");
    }

    #[test]
    fn z_stream_is_allowed() {
        assert!(evaluate_version_rules(
            Some(&v("4.12.3")),
            &v("4.12.7"),
            NetworkType::OpenShiftSDN,
            false,
            &v("4.8.0"),
            &v("4.20.0")
        )
        .is_ok());
    }

    #[test]
    fn y_stream_downgrade_is_rejected() {
        let err = evaluate_version_rules(
            Some(&v("4.13.0")),
            &v("4.12.0"),
            NetworkType::OVNKubernetes,
            false,
            &v("4.8.0"),
            &v("4.20.0"),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "UnsupportedHostedClusterVersion: y-stream downgrade from \"4.13.0\" to \"4.12.0\" is not supported"
        );
    }

    /// S4.
    #[test]
    fn sdn_y_stream_upgrade_is_rejected() {
        let err = evaluate_version_rules(
            Some(&v("4.12.0")),
            &v("4.15.0"),
            NetworkType::OpenShiftSDN,
            false,
            &v("4.8.0"),
            &v("4.20.0"),
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("y-stream upgrade from \"4.12.0\" to \"4.15.0\" is not for OpenShiftSDN"));
    }

    #[test]
    fn sdn_y_stream_upgrade_allowed_on_power_vs() {
        assert!(evaluate_version_rules(
            Some(&v("4.12.0")),
            &v("4.15.0"),
            NetworkType::OpenShiftSDN,
            true,
            &v("4.8.0"),
            &v("4.20.0")
        )
        .is_ok());
    }

    #[test]
    fn above_max_supported_is_rejected() {
        let err = evaluate_version_rules(None, &v("4.25.0"), NetworkType::OVNKubernetes, false, &v("4.8.0"), &v("4.20.0"))
            .unwrap_err();
        assert_eq!(err.reason(), "UnsupportedHostedClusterVersion");
    }

    /// S7.
    #[test]
    fn force_upgrade_annotation_bypasses_upgradeable_gate() {
        let result = evaluate_upgrade(
            Some(&v("4.12.0")),
            &v("4.13.0"),
            NetworkType::OVNKubernetes,
            false,
            &v("4.8.0"),
            &v("4.20.0"),
            false,
            Some("image-4.13.0"),
            "image-4.12.0",
            "image-4.13.0",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn upgradeable_false_blocks_change_without_force_annotation() {
        let result = evaluate_upgrade(
            Some(&v("4.12.0")),
            &v("4.13.0"),
            NetworkType::OVNKubernetes,
            false,
            &v("4.8.0"),
            &v("4.20.0"),
            false,
            None,
            "image-4.12.0",
            "image-4.13.0",
        );
        let err = result.unwrap_err();
        assert_eq!(err.reason(), "ClusterVersionUpgradeableFalse");
    }
}
