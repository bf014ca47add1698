//! §4.B Capability Gate's external collaborator: whether the management
//! cluster advertises a given feature.

use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Capability {
    Routes,
    Ingress,
    Proxy,
    Infrastructure,
}

#[allow(async_fn_in_trait)]
pub trait CapabilityChecker: Send + Sync {
    async fn has(&self, capability: Capability) -> bool;
}

/// A fixed, process-wide capability set. The management cluster's feature
/// set doesn't change at runtime in any deployment this operator targets,
/// so there's no need for a polling/subscription-based checker.
#[derive(Clone, Debug, Default)]
pub struct StaticCapabilityChecker(HashSet<Capability>);

impl StaticCapabilityChecker {
    pub fn new(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self(capabilities.into_iter().collect())
    }
}

impl CapabilityChecker for StaticCapabilityChecker {
    async fn has(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn reports_only_registered_capabilities() {
        let checker = StaticCapabilityChecker::new([Capability::Routes]);
        assert!(checker.has(Capability::Routes).await);
        assert!(!checker.has(Capability::Ingress).await);
    }
}
