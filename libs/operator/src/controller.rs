use crate::error::Error;
use crate::metrics::{self, ControllerMetrics, Metrics};

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use hcop_k8s_util::events::Recorder;
use hcop_k8s_util::types::short_type_name;
use kube::api::{Api, ListParams};
use kube::client::Client;
use kube::runtime::controller::Action;
use kube::runtime::reflector::store::Writer;
use kube::runtime::reflector::{Lookup, ObjectRef, ReflectHandle, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tracing::{debug, error, trace};

pub type ControllerId = &'static str;
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const SUBSCRIBE_BUFFER_SIZE: usize = 256;

/// Defines a `Stores` struct holding one `Option<Store<K>>` per watched child
/// kind, following the same shape regardless of how many kinds are
/// registered. Each controller crate instantiates this for its own set of
/// children, e.g.:
/// ```ignore
/// hcop_operator::define_stores!(
///     hosted_control_plane_store => Store<HostedControlPlane>,
///     secret_store => Store<Secret>,
/// );
/// ```
#[macro_export]
macro_rules! define_stores {
    ($($variant:ident => $store:ident<$type:ty>),* $(,)?) => {
        #[derive(Clone, Default)]
        pub struct Stores {
            $(pub $variant: Option<$store<$type>>),*
        }

        impl Stores {
            pub fn new($($variant: Option<$store<$type>>),*) -> Self {
                Stores {
                    $($variant),*
                }
            }

            $(
                pub fn $variant(&self) -> &$store<$type> {
                    self.$variant
                        .as_ref()
                        .unwrap_or_else(|| panic!("{} store is not initialized", stringify!($variant)))
                }
            )*
        }
    }
}

/// Shared state for a single watched resource stream: the reflector store
/// used for reads, the writer fed by the watch loop, and a shared-stream
/// subscriber handed to `Controller::owns_shared_stream`.
pub struct ResourceReflector<K>
where
    K: Resource + Lookup + Clone + 'static,
    <K as Lookup>::DynamicType: Eq + std::hash::Hash + Clone,
{
    pub store: Store<K>,
    pub writer: Writer<K>,
    pub subscriber: ReflectHandle<K>,
}

pub fn create_subscriber<K>(buffer_size: usize) -> ResourceReflector<K>
where
    K: Resource + Lookup + Clone + 'static,
    <K as Lookup>::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    let (store, writer) = kube::runtime::reflector::store_shared(buffer_size);
    let subscriber = writer
        .subscribe()
        .expect("subscribers can only be created from shared stores");

    ResourceReflector {
        store,
        writer,
        subscriber,
    }
}

/// Watches `K`, feeding `writer` and triggering a reconcile-all on every
/// event via `reload_tx`. Takes the controller's metrics directly (rather
/// than a full `Context`) so it doesn't need to know the reconciled type.
pub fn create_watch<K>(
    api: Api<K>,
    writer: Writer<K>,
    reload_tx: mpsc::Sender<()>,
    metrics: Arc<ControllerMetrics>,
    label_selector: Option<String>,
) -> BoxFuture<'static, ()>
where
    K: Resource + Lookup + Clone + DeserializeOwned + Send + Sync + Debug + 'static,
    <K as Lookup>::DynamicType: Default + Eq + std::hash::Hash + Clone + Send + Sync,
    <K as Resource>::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    let resource_name = short_type_name::<K>().unwrap_or("Unknown");
    let mut config = watcher::Config::default();
    if let Some(selector) = label_selector {
        config = config.labels(&selector);
    }

    watcher(api, config)
        .default_backoff()
        .reflect_shared(writer)
        .for_each(move |res| {
            let metrics = metrics.clone();
            let mut reload_tx = reload_tx.clone();
            async move {
                match res {
                    Ok(event) => {
                        trace!(msg = "watched event", ?event);
                        match event {
                            watcher::Event::Delete(d) => {
                                debug!(
                                    msg = format!("delete event for {resource_name} trigger reconcile"),
                                    namespace = d.namespace().unwrap_or_default(),
                                    name = d.name_any()
                                );
                                let _ignore_errors = reload_tx.try_send(()).map_err(
                                    |e| error!(msg = "failed to trigger reconcile on delete", %e),
                                );
                                metrics.triggered_inc(metrics::Action::Delete, resource_name);
                            }
                            watcher::Event::Apply(d) => {
                                debug!(
                                    msg = format!("apply event for {resource_name} trigger reconcile"),
                                    namespace = d.namespace().unwrap_or_default(),
                                    name = d.name_any()
                                );
                                metrics.triggered_inc(metrics::Action::Apply, resource_name);
                            }
                            _ => {}
                        }
                    }
                    Err(e) => {
                        error!(msg = format!("unexpected error when watching {resource_name}"), %e);
                        metrics.watch_operations_failed_inc();
                    }
                }
            }
        })
        .boxed()
}

/// State shared between every controller and the web server.
#[derive(Clone)]
pub struct State {
    metrics: Arc<Metrics>,
}

impl State {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics: Arc::new(metrics),
        }
    }

    /// Create a reconcile `Context` bound to a specific controller and its
    /// watched-resource stores. `S` is the concrete per-controller `Stores`
    /// struct produced by [`define_stores!`].
    pub fn to_context<K, S>(
        &self,
        client: Client,
        controller_id: ControllerId,
        stores: S,
    ) -> Arc<Context<K, S>>
    where
        K: Resource + Lookup + Clone + 'static,
        <K as Lookup>::DynamicType: Default + Eq + std::hash::Hash + Clone,
    {
        Arc::new(Context {
            controller_id,
            recorder: Recorder::new(client.clone(), controller_id.into()),
            client,
            metrics: self
                .metrics
                .controllers
                .get(controller_id)
                .expect("all controller ids must be registered with Metrics::new")
                .clone(),
            stores: Arc::new(stores),
            error_backoff_policy: Arc::default(),
        })
    }
}

/// Context handed to every reconcile invocation.
#[derive(Clone)]
pub struct Context<K: Resource, S> {
    pub controller_id: ControllerId,
    pub client: Client,
    pub metrics: Arc<ControllerMetrics>,
    pub stores: Arc<S>,
    pub recorder: Recorder,
    error_backoff_policy: Arc<RwLock<HashMap<ObjectRef<K>, RwLock<ExponentialBackoff>>>>,
}

impl<K, S> Context<K, S>
where
    K: Resource<DynamicType = ()> + ResourceExt + Lookup + Clone + 'static,
    <K as Lookup>::DynamicType: Eq + std::hash::Hash + Clone,
{
    /// Return the next duration of the backoff policy for the given object,
    /// creating one (1s, 2s, 4s, ... capped at [`DEFAULT_RECONCILE_INTERVAL`])
    /// on first use.
    pub async fn get_backoff(&self, obj_ref: ObjectRef<K>) -> Duration {
        {
            let read_guard = self.error_backoff_policy.read().await;
            if let Some(backoff) = read_guard.get(&obj_ref)
                && let Some(duration) = backoff.write().await.next()
            {
                return duration;
            }
        }

        let mut backoff = ExponentialBuilder::default()
            .with_max_delay(DEFAULT_RECONCILE_INTERVAL)
            .without_max_times()
            .build();
        // safe unwrap: first backoff is always Some(Duration)
        let duration = backoff.next().unwrap();
        self.error_backoff_policy
            .write()
            .await
            .insert(obj_ref.clone(), RwLock::new(backoff));
        trace!(
            msg = "recreate backoff policy",
            namespace = obj_ref.namespace.as_deref().unwrap_or_default(),
            name = obj_ref.name,
        );
        duration
    }

    /// Clear the backoff policy for the given object after a successful
    /// reconcile.
    pub async fn reset_backoff(&self, obj_ref: ObjectRef<K>) {
        let read_guard = self.error_backoff_policy.read().await;
        if read_guard.get(&obj_ref).is_some() {
            drop(read_guard);
            trace!(
                msg = "reset backoff policy",
                namespace = obj_ref.namespace.as_deref().unwrap_or_default(),
                name = obj_ref.name
            );
            self.error_backoff_policy.write().await.remove(&obj_ref);
        }
    }
}

pub async fn check_api_queryable<K>(client: Client) -> Api<K>
where
    K: Resource + Clone + DeserializeOwned + Debug,
    <K as Resource>::DynamicType: Default,
{
    let api = Api::<K>::all(client.clone());
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!(
            "{} is not queryable; {e:?}. Check controller permissions",
            short_type_name::<K>().unwrap_or("Unknown resource"),
        );
        std::process::exit(1);
    }
    api
}

pub fn error_policy<K, S>(_obj: Arc<K>, _error: &Error, _ctx: Arc<Context<K, S>>) -> Action
where
    K: Resource + Lookup + Clone + 'static,
    <K as Lookup>::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    unreachable!("handled by the backoff_reconciler! wrapper instead")
}

/// Wrap a reconciler function so success resets the object's backoff policy
/// and failure requeues it after the next exponential backoff duration,
/// instead of `kube::runtime::Controller`'s default fixed error policy.
#[macro_export]
macro_rules! backoff_reconciler {
    ($inner_reconciler:ident) => {
        |obj, ctx| async move {
            match $inner_reconciler(obj.clone(), ctx.clone()).await {
                Ok(action) => {
                    ctx.reset_backoff(kube::runtime::reflector::ObjectRef::from(obj.as_ref()))
                        .await;
                    Ok(action)
                }
                Err(error) => {
                    let namespace = kube::ResourceExt::namespace(obj.as_ref()).unwrap_or_default();
                    let name = kube::ResourceExt::name_any(obj.as_ref());
                    tracing::error!(msg = "failed reconciliation", %namespace, %name, %error);
                    ctx.metrics.reconcile_failure_inc();
                    let backoff_duration = ctx
                        .get_backoff(kube::runtime::reflector::ObjectRef::from(obj.as_ref()))
                        .await;
                    tracing::trace!(
                        msg = format!("backoff duration: {backoff_duration:?}"),
                        %namespace,
                        %name,
                    );
                    Ok(kube::runtime::controller::Action::requeue(backoff_duration))
                }
            }
        }
    };
}
