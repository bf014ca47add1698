use hcop_hostedcluster::controller as hostedcluster_controller;
use hcop_k8s_util::client::new_client_with_metrics;
use hcop_operator::capability::{Capability, StaticCapabilityChecker};
use hcop_operator::controller::State;
use hcop_operator::release::StaticReleaseProvider;
use hcop_operator::telemetry;

use axum::response::{IntoResponse, Json};
use axum::routing::{Router, get};
use clap::{Parser, crate_authors, crate_description, crate_version};
use kube::Config;
use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};

async fn health() -> impl IntoResponse {
    Json("healthy")
}

#[derive(Parser, Debug)]
#[command(
    name="hcop",
    about = crate_description!(),
    version = crate_version!(),
    author = crate_authors!("\n"),
)]
struct Args {
    /// Listen on given port
    #[arg(short, long, default_value_t = 8080, env)]
    port: u16,

    /// Set logging filter directive for `tracing_subscriber::filter::EnvFilter`. Example: "info,kube=debug,hcop=debug"
    #[arg(long, default_value = "info", env)]
    log_filter: String,

    /// Set log format
    #[arg(long, value_enum, default_value_t = telemetry::LogFormat::Text, env)]
    log_format: telemetry::LogFormat,

    /// URL for the OpenTelemetry tracing/metrics endpoint.
    ///
    /// This optional argument specifies the URL to which traces and metrics
    /// will be sent using OpenTelemetry. If not provided, both stay local.
    #[arg(short, long, env = "OPENTELEMETRY_ENDPOINT_URL")]
    tracing_url: Option<String>,

    /// Sampling ratio for tracing.
    ///
    /// Specifies the ratio of traces to sample. A value of `1.0` will sample all traces,
    /// while a lower value will sample fewer traces. The default is `0.1`, meaning 10%
    /// of traces are sampled.
    #[arg(short, long, default_value_t = 0.1, env)]
    sample_ratio: f64,

    /// Capabilities the management cluster advertises (repeatable).
    ///
    /// Records which optional management-cluster features this deployment
    /// has (OpenShift Routes, Ingress, outbound proxy, Infrastructure CR),
    /// so the capability gate can reject configurations that need one the
    /// cluster doesn't have.
    #[arg(long = "capability", value_enum, env = "HCOP_CAPABILITIES", value_delimiter = ',')]
    capabilities: Vec<Capability>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = Args::parse();

    telemetry::init(
        &args.log_filter,
        args.log_format,
        args.tracing_url.as_deref(),
        args.sample_ratio,
    )
    .await?;

    let meter_provider = telemetry::build_meter_provider(args.tracing_url.as_deref())?;
    opentelemetry::global::set_meter_provider(meter_provider.clone());
    let meter = opentelemetry::global::meter("hcop");

    let config = Config::infer().await?;
    let client = new_client_with_metrics(config, &meter).await?;
    let controllers = [hostedcluster_controller::CONTROLLER_ID];

    let controller_metrics = hcop_operator::metrics::Metrics::new(&meter, &controllers);
    let state = State::new(controller_metrics);

    let capability_checker = StaticCapabilityChecker::new(args.capabilities.iter().copied());
    let release_provider = StaticReleaseProvider::new();

    let hostedcluster_c = hostedcluster_controller::run(state.clone(), client, capability_checker, release_provider);

    let app = Router::new().route("/health", get(health));

    let listener = TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    tokio::join!(hostedcluster_c, server).1?;
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM signal handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
    }
}
