//! §4.A Network & Address Validator: pure functions over a `Networking`
//! block, returning a structured `Error::InputValidation` on failure.

use crate::crd::common::Networking;
use crate::error::Error;

use std::net::IpAddr;

use ipnetwork::IpNetwork;

const DEFAULT_ADVERTISE_ADDRESS_V4: &str = "172.20.0.1";
const DEFAULT_ADVERTISE_ADDRESS_V6: &str = "::1";

fn parse_cidr(label: &str, cidr: &str) -> Result<IpNetwork, Error> {
    cidr.parse().map_err(|_| Error::InputValidation {
        reason: "ConfigurationInvalid".to_string(),
        message: format!("{label} CIDR {cidr:?} is not a valid network address"),
    })
}

fn named_networks(networking: &Networking) -> Result<Vec<(&'static str, IpNetwork)>, Error> {
    let mut out = Vec::new();
    for entry in &networking.machine_network {
        out.push(("machine", parse_cidr("machine", &entry.cidr)?));
    }
    for entry in &networking.cluster_network {
        out.push(("cluster", parse_cidr("cluster", &entry.cidr)?));
    }
    for entry in &networking.service_network {
        out.push(("service", parse_cidr("service", &entry.cidr)?));
    }
    Ok(out)
}

/// Two CIDRs overlap iff either contains the other's network address.
fn cidrs_overlap(a: &IpNetwork, b: &IpNetwork) -> bool {
    a.contains(b.network()) || b.contains(a.network())
}

pub fn validate_slice_network_cidrs(networking: &Networking) -> Result<(), Error> {
    let networks = named_networks(networking)?;
    for i in 0..networks.len() {
        for j in (i + 1)..networks.len() {
            let (label_a, net_a) = &networks[i];
            let (label_b, net_b) = &networks[j];
            if cidrs_overlap(net_a, net_b) {
                return Err(Error::InputValidation {
                    reason: "ConfigurationInvalid".to_string(),
                    message: format!(
                        "{label_a} CIDR {net_a} overlaps with {label_b} CIDR {net_b}"
                    ),
                });
            }
        }
    }
    Ok(())
}

pub fn find_advertise_address(networking: &Networking) -> Result<IpAddr, Error> {
    if let Some(explicit) = networking
        .api_server
        .as_ref()
        .and_then(|a| a.advertise_address.as_deref())
    {
        return explicit.parse().map_err(|_| Error::InputValidation {
            reason: "ConfigurationInvalid".to_string(),
            message: format!("advertise address {explicit:?} is not a valid IP address"),
        });
    }

    let first_cluster_cidr = networking
        .cluster_network
        .first()
        .ok_or_else(|| Error::InputValidation {
            reason: "ConfigurationInvalid".to_string(),
            message: "networking.clusterNetwork must have at least one entry".to_string(),
        })?;
    let parsed = parse_cidr("cluster", &first_cluster_cidr.cidr)?;
    let default = match parsed {
        IpNetwork::V4(_) => DEFAULT_ADVERTISE_ADDRESS_V4,
        IpNetwork::V6(_) => DEFAULT_ADVERTISE_ADDRESS_V6,
    };
    // safe unwrap: the constants above are valid IP literals
    Ok(default.parse().unwrap())
}

pub fn check_advertise_address_overlapping(networking: &Networking) -> Result<(), Error> {
    let advertise_address = find_advertise_address(networking)?;
    for (label, network) in named_networks(networking)? {
        if network.contains(advertise_address) {
            return Err(Error::InputValidation {
                reason: "ConfigurationInvalid".to_string(),
                message: format!(
                    "advertise address {advertise_address} falls inside {label} CIDR {network}"
                ),
            });
        }
    }
    Ok(())
}

pub fn validate_network_stack_addresses(networking: &Networking) -> Result<(), Error> {
    let advertise_address = find_advertise_address(networking)?;
    let mut families = named_networks(networking)?
        .into_iter()
        .map(|(_, n)| n.is_ipv4())
        .collect::<Vec<_>>();
    families.push(advertise_address.is_ipv4());

    let all_v4 = families.iter().all(|is_v4| *is_v4);
    let all_v6 = families.iter().all(|is_v4| !*is_v4);
    if all_v4 || all_v6 {
        Ok(())
    } else {
        Err(Error::InputValidation {
            reason: "ConfigurationInvalid".to_string(),
            message: "machine, cluster and service networks and the advertise address must \
                all share a single IP family"
                .to_string(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crd::common::ClusterNetworkEntry;

    fn networking(machine: &str, cluster: &str, service: &str) -> Networking {
        Networking {
            api_server: None,
            cluster_network: vec![ClusterNetworkEntry {
                cidr: cluster.to_string(),
            }],
            service_network: vec![ClusterNetworkEntry {
                cidr: service.to_string(),
            }],
            machine_network: vec![ClusterNetworkEntry {
                cidr: machine.to_string(),
            }],
            network_type: None,
        }
    }

    #[test]
    fn overlapping_cidrs_are_rejected() {
        // S5: Machine=172.16.1.0/24, Service=172.16.1.252/32
        let net = networking("172.16.1.0/24", "10.0.0.0/16", "172.16.1.252/32");
        let err = validate_slice_network_cidrs(&net).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("172.16.1.0/24"));
        assert!(message.contains("172.16.1.252/32"));
    }

    #[test]
    fn non_overlapping_cidrs_pass() {
        let net = networking("10.0.0.0/16", "10.1.0.0/16", "10.2.0.0/16");
        assert!(validate_slice_network_cidrs(&net).is_ok());
    }

    #[test]
    fn default_advertise_address_follows_cluster_network_family() {
        let net = networking("10.0.0.0/16", "10.1.0.0/16", "10.2.0.0/16");
        let addr = find_advertise_address(&net).unwrap();
        assert_eq!(addr.to_string(), DEFAULT_ADVERTISE_ADDRESS_V4);
    }

    #[test]
    fn advertise_address_inside_a_cidr_is_rejected() {
        let mut net = networking("10.0.0.0/16", "10.1.0.0/16", "10.2.0.0/16");
        net.api_server = Some(crate::crd::common::ApiServerNetworking {
            port: None,
            advertise_address: Some("10.1.0.5".to_string()),
        });
        assert!(check_advertise_address_overlapping(&net).is_err());
    }

    #[test]
    fn mixed_ip_families_are_rejected() {
        let net = networking("10.0.0.0/16", "fd00::/64", "10.2.0.0/16");
        assert!(validate_network_stack_addresses(&net).is_err());
    }
}
