//! §4.I Reconciliation Orchestrator: wires the pure validators and
//! projectors in the sibling modules into the single entry point the
//! controller hands to `kube::runtime::Controller`.

pub mod availability;
pub mod capability;
pub mod finalize;
pub mod network;
pub mod project;
pub mod release;
pub mod upgrade;
pub mod version;

use crate::crd::capi_cluster::CapiCluster;
use crate::crd::common::NetworkType;
use crate::crd::conditions::{
    find_condition, merge_condition, update_conditions, STATUS_FALSE, STATUS_TRUE,
    TYPE_CLUSTER_VERSION_PROGRESSING, TYPE_CLUSTER_VERSION_UPGRADEABLE, TYPE_RECONCILIATION_SUCCEEDED,
    TYPE_VALID_HOSTED_CLUSTER_CONFIGURATION, TYPE_VALID_RELEASE_IMAGE,
};
use crate::crd::hosted_cluster::{HostedCluster, FORCE_UPGRADE_TO_ANNOTATION};
use crate::crd::hosted_control_plane::HostedControlPlane;
use crate::crd::ids::default_ids_if_empty;
use crate::error::Error;
use crate::platform::{adapter_for, credentials_secret_name};
use crate::reconcile::project::{hcp_namespace_name, patch_resource};

use std::sync::Arc;

use hcop_operator::controller::Context;
use hcop_operator::release::ReleaseProvider;

use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{Api, ObjectMeta, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use semver::Version;
use tracing::instrument;

const FIELD_MANAGER: &str = "hcop-hostedcluster";
const MIN_SUPPORTED_VERSION: (u64, u64, u64) = (4, 8, 0);
const MAX_SUPPORTED_VERSION: (u64, u64, u64) = (4, 20, 0);

/// The watched-resource stores plus the two external collaborators
/// (§6.2/§6.3) whose production implementations are out of scope (spec.md
/// §1); `P` is the release-metadata lookup in use for this process.
pub struct Resources<P: ReleaseProvider> {
    pub stores: crate::controller::Stores,
    pub capability_checker: hcop_operator::capability::StaticCapabilityChecker,
    pub release_provider: P,
}

impl<P: ReleaseProvider> std::ops::Deref for Resources<P> {
    type Target = crate::controller::Stores;
    fn deref(&self) -> &crate::controller::Stores {
        &self.stores
    }
}

fn min_supported_version() -> Version {
    Version::new(MIN_SUPPORTED_VERSION.0, MIN_SUPPORTED_VERSION.1, MIN_SUPPORTED_VERSION.2)
}

fn max_supported_version() -> Version {
    Version::new(MAX_SUPPORTED_VERSION.0, MAX_SUPPORTED_VERSION.1, MAX_SUPPORTED_VERSION.2)
}

async fn fetch_secret(client: &Client, namespace: &str, name: &str) -> Result<Secret, Error> {
    Api::<Secret>::namespaced(client.clone(), namespace)
        .get(name)
        .await
        .map_err(|e| Error::KubeError(format!("failed to fetch secret {name:?}"), e))
}

async fn ensure_namespace(client: &Client, namespace: &str) -> Result<(), Error> {
    let api: Api<Namespace> = Api::all(client.clone());
    if api.get_opt(namespace).await.map_err(|e| Error::KubeError("failed to check namespace".to_string(), e))?.is_some() {
        return Ok(());
    }
    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    api.patch(namespace, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&ns))
        .await
        .map_err(|e| Error::KubeError("failed to create HostedControlPlane namespace".to_string(), e))?;
    Ok(())
}

/// Persists the whole HC (spec + status) via server-side apply.
async fn persist_spec(client: &Client, hc: &HostedCluster) -> Result<(), Error> {
    let api: Api<HostedCluster> = Api::namespaced(client.clone(), &hc.namespace().unwrap_or_default());
    api.patch(&hc.name_any(), &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(hc))
        .await
        .map_err(|e| Error::KubeError("failed to persist HostedCluster spec".to_string(), e))?;
    Ok(())
}

async fn persist_status(client: &Client, hc: &HostedCluster) -> Result<(), Error> {
    let api: Api<HostedCluster> = Api::namespaced(client.clone(), &hc.namespace().unwrap_or_default());
    api.patch_status(&hc.name_any(), &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(hc))
        .await
        .map_err(|e| Error::KubeError("failed to persist HostedCluster status".to_string(), e))?;
    Ok(())
}

fn network_type(hc: &HostedCluster) -> NetworkType {
    hc.spec.networking.network_type.unwrap_or(NetworkType::OVNKubernetes)
}

fn is_power_vs(hc: &HostedCluster) -> bool {
    matches!(hc.spec.platform, crate::crd::common::PlatformSpec::PowerVS(_))
}

/// §4.A-§4.D, run in order; the first failure short-circuits the rest.
async fn validate_configuration_and_release<P: ReleaseProvider>(
    hc: &HostedCluster,
    client: &Client,
    capability_checker: &impl hcop_operator::capability::CapabilityChecker,
    release_provider: &P,
) -> Result<Option<hcop_operator::release::ReleaseImage>, Error> {
    network::validate_slice_network_cidrs(&hc.spec.networking)?;
    network::check_advertise_address_overlapping(&hc.spec.networking)?;
    network::validate_network_stack_addresses(&hc.spec.networking)?;

    capability::check_route_capability(hc, capability_checker).await?;
    if let Some(secret_name) = credentials_secret_name(&hc.spec.platform) {
        let namespace = hc.namespace().unwrap_or_default();
        let credentials_secret = fetch_secret(client, &namespace, secret_name).await?;
        capability::check_credentials_shape(hc, &credentials_secret)?;
    }
    capability::check_cluster_id(hc)?;
    capability::check_hostname_collisions(hc)?;

    let pull_secret = fetch_secret(client, &hc.namespace().unwrap_or_default(), &hc.spec.pull_secret).await?;
    let release = release::resolve_release(hc, release_provider, &pull_secret).await?;

    if let Some(release) = &release {
        let current = hc
            .status
            .as_ref()
            .and_then(|s| s.version.active())
            .and_then(|active| active.version.as_deref())
            .and_then(|v| Version::parse(v).ok());
        let cluster_version_upgradeable = hc
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_deref())
            .and_then(|cs| find_condition(cs, TYPE_CLUSTER_VERSION_UPGRADEABLE))
            .is_none_or(|c| c.status == STATUS_TRUE);
        let force_upgrade_to = hc
            .annotations()
            .get(FORCE_UPGRADE_TO_ANNOTATION)
            .map(String::as_str);
        let current_desired_image = hc
            .status
            .as_ref()
            .and_then(|s| s.version.desired.as_ref())
            .map(|d| d.image.as_str())
            .unwrap_or_default();

        upgrade::evaluate_upgrade(
            current.as_ref(),
            &release.version,
            network_type(hc),
            is_power_vs(hc),
            &min_supported_version(),
            &max_supported_version(),
            cluster_version_upgradeable,
            force_upgrade_to,
            current_desired_image,
            &hc.spec.release.image,
        )?;
    }

    Ok(release)
}

/// Top-level entry point handed to `kube::runtime::Controller::run`.
#[instrument(skip_all, fields(namespace = %hc.namespace().unwrap_or_default(), name = %hc.name_any()))]
pub async fn reconcile_hosted_cluster<P>(
    hc: Arc<HostedCluster>,
    ctx: Arc<Context<HostedCluster, Resources<P>>>,
) -> Result<Action, Error>
where
    P: ReleaseProvider + 'static,
{
    if hc.meta().deletion_timestamp.is_some() {
        return finalize::reconcile_deletion(&ctx.client, &hc).await;
    }

    finalize::ensure_finalizer(&ctx.client, &hc).await?;

    let mut hc = (*hc).clone();
    let observed_generation = hc.meta().generation.unwrap_or(0);

    if default_ids_if_empty(&mut hc.spec.cluster_id, &mut hc.spec.infra_id, &hc.name_any()) {
        persist_spec(&ctx.client, &hc).await?;
    }

    let validation = validate_configuration_and_release(
        &hc,
        &ctx.client,
        &ctx.stores.capability_checker,
        &ctx.stores.release_provider,
    )
    .await;

    let release_image = match validation {
        Ok(release) => release,
        Err(error) => {
            let (condition_type, reason) = match &error {
                Error::ReleaseLookup { reason, .. } | Error::UpgradePolicy { reason, .. } => {
                    (TYPE_VALID_RELEASE_IMAGE, reason.clone())
                }
                other => (TYPE_VALID_HOSTED_CLUSTER_CONFIGURATION, other.reason().to_string()),
            };
            let existing = hc
                .status
                .as_ref()
                .and_then(|s| s.conditions.as_deref())
                .and_then(|cs| find_condition(cs, condition_type));
            let condition = merge_condition(
                existing,
                condition_type,
                STATUS_FALSE,
                &reason,
                &error.to_string(),
                Some(observed_generation),
            );
            let mut conditions = hc.status.as_ref().and_then(|s| s.conditions.clone()).unwrap_or_default();
            conditions = update_conditions(conditions, condition);

            // §4.I step 10 is unconditional: a failing reconcile must not
            // leave a stale `ReconciliationSucceeded=True` from an earlier
            // successful one in place.
            let reconciliation_existing = find_condition(&conditions, TYPE_RECONCILIATION_SUCCEEDED);
            let reconciliation_condition = merge_condition(
                reconciliation_existing,
                TYPE_RECONCILIATION_SUCCEEDED,
                STATUS_FALSE,
                "ReconciliationFailed",
                &error.to_string(),
                Some(observed_generation),
            );
            conditions = update_conditions(conditions, reconciliation_condition);

            let mut status = hc.status.clone().unwrap_or_default();
            status.conditions = Some(conditions);
            hc.status = Some(status);
            persist_status(&ctx.client, &hc).await?;
            return Err(error);
        }
    };

    adapter_for(&hc.spec.platform).reconcile_defaults(&mut hc);
    persist_spec(&ctx.client, &hc).await?;

    let hcp_namespace = hcp_namespace_name(&hc);
    ensure_namespace(&ctx.client, &hcp_namespace).await?;

    let existing_hcp = ctx.stores.hosted_control_plane_store().get(&kube::runtime::reflector::ObjectRef::new(&hc.name_any()).within(&hcp_namespace));
    let hcp_paused = existing_hcp.as_deref().is_some_and(HostedControlPlane::is_paused);

    if !hcp_paused {
        // Invariant 4: while the active history entry is still `Partial`, the
        // in-flight rollout owns `spec.releaseImage` — a newly resolved
        // target must wait for it to complete rather than pre-empting it.
        let active_entry = hc.status.as_ref().and_then(|s| s.version.active());
        let release_image_str = match active_entry {
            Some(entry) if entry.state == crate::crd::hosted_cluster::HistoryState::Partial => entry.image.clone(),
            _ => release_image
                .as_ref()
                .map(|r| r.image.clone())
                .unwrap_or_else(|| hc.spec.release.image.clone()),
        };
        let desired_hcp = project::reconcile_hosted_control_plane(&hc, existing_hcp.as_deref(), &release_image_str);
        patch_resource(&ctx.client, &hcp_namespace, desired_hcp).await?;

        let adapter = adapter_for(&hc.spec.platform);
        if let (Some(kind), Some(api_version)) = (adapter.infra_cr_kind(), adapter.infra_cr_api_version()) {
            let desired_capi = project::reconcile_capi_cluster(&hc, &hcp_namespace, kind, api_version, &hc.name_any());
            patch_resource::<CapiCluster>(&ctx.client, &hcp_namespace, desired_capi).await?;
        }

        let role = project::reconcile_capi_provider_role(&hc, &hcp_namespace);
        patch_resource(&ctx.client, &hcp_namespace, role).await?;
    }

    let hcp_status = existing_hcp.as_ref().and_then(|h| h.status.as_ref());
    let mut status = hc.status.clone().unwrap_or_default();
    if let Some(release) = &release_image {
        let desired = crate::crd::common::Release {
            image: release.image.clone(),
        };
        status.version = version::compute_cluster_version_status(
            Time(chrono::Utc::now()),
            &desired,
            hcp_status,
            &status.version,
        );
    }

    let mut conditions = status.conditions.clone().unwrap_or_default();
    let availability_condition = availability::compute_hosted_cluster_availability(
        find_condition(&conditions, crate::crd::conditions::TYPE_HOSTED_CLUSTER_AVAILABLE),
        existing_hcp.as_deref(),
        observed_generation,
    );
    conditions = update_conditions(conditions, availability_condition);

    let progressing = status
        .version
        .active()
        .is_some_and(|entry| entry.state == crate::crd::hosted_cluster::HistoryState::Partial);
    let progressing_existing = find_condition(&conditions, TYPE_CLUSTER_VERSION_PROGRESSING);
    let progressing_condition = merge_condition(
        progressing_existing,
        TYPE_CLUSTER_VERSION_PROGRESSING,
        if progressing { STATUS_TRUE } else { STATUS_FALSE },
        if progressing { "RolloutInProgress" } else { "RolloutComplete" },
        if progressing {
            "a rollout is in flight"
        } else {
            "no rollout in flight"
        },
        Some(observed_generation),
    );
    conditions = update_conditions(conditions, progressing_condition);

    let reconciliation_existing = find_condition(&conditions, TYPE_RECONCILIATION_SUCCEEDED);
    let reconciliation_condition = merge_condition(
        reconciliation_existing,
        TYPE_RECONCILIATION_SUCCEEDED,
        STATUS_TRUE,
        "ReconciliationSucceeded",
        "reconciliation succeeded",
        Some(observed_generation),
    );
    conditions = update_conditions(conditions, reconciliation_condition);

    status.conditions = Some(conditions);
    hc.status = Some(status);
    persist_status(&ctx.client, &hc).await?;

    Ok(Action::requeue(hcop_operator::controller::DEFAULT_RECONCILE_INTERVAL))
}
