pub mod aws_endpoint_service;
pub mod capi_cluster;
pub mod common;
pub mod conditions;
pub mod hosted_cluster;
pub mod hosted_control_plane;
pub mod ids;

pub use aws_endpoint_service::{AWSEndpointService, AwsEndpointServiceSpec, AwsEndpointServiceStatus};
pub use capi_cluster::{CapiCluster, CapiClusterSpec, CapiClusterStatus};
pub use hosted_cluster::{
    ClusterVersionStatus, HistoryState, HostedCluster, HostedClusterSpec, HostedClusterStatus,
    UpdateHistoryEntry,
};
pub use hosted_control_plane::{
    HostedControlPlane, HostedControlPlaneSpec, HostedControlPlaneStatus,
};
pub use ids::{ClusterId, InfraId};
