use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const INFRA_ID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const INFRA_ID_LEN: usize = 5;

/// Defaulted once on first reconcile, then immutable (spec.md §3.2).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(transparent)]
pub struct ClusterId(pub String);

impl ClusterId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn parse(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.0)
    }
}

/// A short, random, DNS-label-safe suffix used to namespace cloud resources
/// for a single hosted cluster. Defaulted once, then immutable.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(transparent)]
pub struct InfraId(pub String);

impl InfraId {
    pub fn generate(cluster_name: &str) -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..INFRA_ID_LEN)
            .map(|_| INFRA_ID_CHARS[rng.random_range(0..INFRA_ID_CHARS.len())] as char)
            .collect();
        Self(format!("{cluster_name}-{suffix}"))
    }
}

/// Defaults `cluster_id`/`infra_id` in place if empty. Returns whether either
/// field was just defaulted, so the caller knows to persist the spec.
pub fn default_ids_if_empty(
    cluster_id: &mut Option<ClusterId>,
    infra_id: &mut Option<InfraId>,
    cluster_name: &str,
) -> bool {
    let mut changed = false;
    if cluster_id.is_none() {
        *cluster_id = Some(ClusterId::generate());
        changed = true;
    }
    if infra_id.is_none() {
        *infra_id = Some(InfraId::generate(cluster_name));
        changed = true;
    }
    changed
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_ids_only_fills_empty_fields() {
        let mut cluster_id = Some(ClusterId("existing".to_string()));
        let mut infra_id = None;
        let changed = default_ids_if_empty(&mut cluster_id, &mut infra_id, "my-cluster");
        assert!(changed);
        assert_eq!(cluster_id, Some(ClusterId("existing".to_string())));
        assert!(infra_id.is_some());
    }

    #[test]
    fn default_ids_is_noop_once_both_set() {
        let mut cluster_id = Some(ClusterId("a".to_string()));
        let mut infra_id = Some(InfraId("b".to_string()));
        let changed = default_ids_if_empty(&mut cluster_id, &mut infra_id, "my-cluster");
        assert!(!changed);
        assert_eq!(cluster_id, Some(ClusterId("a".to_string())));
        assert_eq!(infra_id, Some(InfraId("b".to_string())));
    }
}
