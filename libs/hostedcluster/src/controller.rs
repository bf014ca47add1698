use crate::crd::capi_cluster::CapiCluster;
use crate::crd::hosted_cluster::HostedCluster;
use crate::crd::hosted_control_plane::HostedControlPlane;
use crate::reconcile::{reconcile_hosted_cluster, Resources};

use std::sync::Arc;

use futures::channel::mpsc;
use futures::{FutureExt, StreamExt};
use hcop_operator::capability::StaticCapabilityChecker;
use hcop_operator::controller::{check_api_queryable, create_subscriber, create_watch, ControllerId, State};
use hcop_operator::release::ReleaseProvider;
use hcop_operator::{backoff_reconciler, define_stores};

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::rbac::v1::Role;
use kube::client::Client;
use kube::runtime::controller::Controller;
use kube::runtime::watcher;
use tracing::info;

pub const CONTROLLER_ID: ControllerId = "hostedcluster";
const SUBSCRIBE_BUFFER_SIZE: usize = 256;
const RELOAD_BUFFER_SIZE: usize = 16;
const DEBOUNCE: std::time::Duration = std::time::Duration::from_millis(500);

define_stores!(
    hosted_control_plane_store => Store<HostedControlPlane>,
    capi_cluster_store => Store<CapiCluster>,
    role_store => Store<Role>,
    secret_store => Store<Secret>,
);

pub async fn run<P>(state: State, client: Client, capability_checker: StaticCapabilityChecker, release_provider: P)
where
    P: ReleaseProvider + Send + Sync + 'static,
{
    let hosted_cluster_api = check_api_queryable::<HostedCluster>(client.clone()).await;
    let hcp_api = check_api_queryable::<HostedControlPlane>(client.clone()).await;
    let capi_cluster_api = check_api_queryable::<CapiCluster>(client.clone()).await;
    let role_api = check_api_queryable::<Role>(client.clone()).await;
    let secret_api = check_api_queryable::<Secret>(client.clone()).await;

    let hcp_r = create_subscriber::<HostedControlPlane>(SUBSCRIBE_BUFFER_SIZE);
    let capi_cluster_r = create_subscriber::<CapiCluster>(SUBSCRIBE_BUFFER_SIZE);
    let role_r = create_subscriber::<Role>(SUBSCRIBE_BUFFER_SIZE);
    let secret_r = create_subscriber::<Secret>(SUBSCRIBE_BUFFER_SIZE);

    let (reload_tx, reload_rx) = mpsc::channel(RELOAD_BUFFER_SIZE);

    let stores = Stores::new(
        Some(hcp_r.store),
        Some(capi_cluster_r.store),
        Some(role_r.store),
        Some(secret_r.store),
    );
    let resources = Resources {
        stores,
        capability_checker,
        release_provider,
    };
    let ctx = state.to_context(client, CONTROLLER_ID, resources);

    let hcp_watch = create_watch(hcp_api, hcp_r.writer, reload_tx.clone(), ctx.metrics.clone(), None);
    let capi_cluster_watch = create_watch(
        capi_cluster_api,
        capi_cluster_r.writer,
        reload_tx.clone(),
        ctx.metrics.clone(),
        None,
    );
    let role_watch = create_watch(role_api, role_r.writer, reload_tx.clone(), ctx.metrics.clone(), None);
    let secret_watch = create_watch(
        secret_api,
        secret_r.writer,
        reload_tx.clone(),
        ctx.metrics.clone(),
        None,
    );

    info!(msg = "starting hostedcluster controller");
    let hosted_cluster_controller = Controller::new(hosted_cluster_api, watcher::Config::default().any_semantic())
        .with_config(kube::runtime::controller::Config::default().debounce(DEBOUNCE))
        .owns_shared_stream(hcp_r.subscriber)
        .owns_shared_stream(capi_cluster_r.subscriber)
        .owns_shared_stream(role_r.subscriber)
        .owns_shared_stream(secret_r.subscriber)
        .reconcile_all_on(reload_rx.map(|_| ()))
        .shutdown_on_signal()
        .run(
            backoff_reconciler!(reconcile_hosted_cluster),
            hcop_operator::controller::error_policy,
            ctx.clone(),
        )
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()));

    ctx.metrics.ready_set(1);
    tokio::select! {
        _ = hosted_cluster_controller => {},
        _ = hcp_watch => {},
        _ = capi_cluster_watch => {},
        _ = role_watch => {},
        _ = secret_watch => {},
    }
}
