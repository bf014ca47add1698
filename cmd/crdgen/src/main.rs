use hcop_hostedcluster::crd::hosted_cluster::HostedCluster;
use hcop_hostedcluster::crd::hosted_control_plane::HostedControlPlane;

use kube::CustomResourceExt;

fn main() {
    for crd in vec![HostedCluster::crd(), HostedControlPlane::crd()] {
        // safe unwrap: we know CRD is serializable
        print!("---\n{}\n", serde_yaml::to_string(&crd).unwrap());
    }
}
