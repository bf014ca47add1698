//! Structured logging and distributed tracing bootstrap.
//!
//! Every controller binary calls [`init`] exactly once at startup. Tracing
//! export is optional: without a `tracing_url`, spans stay local to
//! `tracing-subscriber`'s fmt layer and no OTLP exporter is installed.

use clap::ValueEnum;
use opentelemetry::trace::TraceError;
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

fn build_tracer_provider(
    tracing_url: &str,
    sample_ratio: f64,
) -> std::result::Result<SdkTracerProvider, TraceError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(tracing_url)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_sampler(Sampler::TraceIdRatioBased(sample_ratio))
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_attributes([KeyValue::new("service.name", "hcop")])
                .build(),
        )
        .build())
}

/// Build the process' meter provider: pushed periodically to the same OTLP
/// collector as traces when `tracing_url` is set, in-memory-only otherwise
/// (the controllers still record counters/gauges, there's just nowhere for
/// them to be scraped or pushed).
pub fn build_meter_provider(tracing_url: Option<&str>) -> std::result::Result<SdkMeterProvider, TraceError> {
    let resource = Resource::builder()
        .with_attributes([KeyValue::new("service.name", "hcop")])
        .build();

    match tracing_url {
        Some(url) => {
            let exporter = opentelemetry_otlp::MetricExporter::builder()
                .with_tonic()
                .with_endpoint(url)
                .build()
                .map_err(|e| TraceError::Other(Box::new(e)))?;
            Ok(SdkMeterProvider::builder()
                .with_periodic_reader(exporter)
                .with_resource(resource)
                .build())
        }
        None => Ok(SdkMeterProvider::builder().with_resource(resource).build()),
    }
}

/// Install the global `tracing` subscriber, optionally bridged to an OTLP
/// collector, for the remainder of the process' lifetime.
pub async fn init(
    log_filter: &str,
    log_format: LogFormat,
    tracing_url: Option<&str>,
    sample_ratio: f64,
) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = match log_format {
        LogFormat::Text => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };

    let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer);

    match tracing_url {
        Some(url) => {
            let provider = build_tracer_provider(url, sample_ratio)?;
            let tracer = provider.tracer("hcop");
            opentelemetry::global::set_tracer_provider(provider);
            registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init()?;
        }
        None => {
            registry.try_init()?;
        }
    }

    Ok(())
}

/// Return the trace ID of the current span, formatted as lowercase hex, for
/// tagging error responses and log lines that need to be correlated back to
/// a trace.
pub fn get_trace_id() -> Result<String> {
    use opentelemetry::trace::TraceContextExt;

    let context = Span::current().context();
    let trace_id = context.span().span_context().trace_id();
    if trace_id == opentelemetry::trace::TraceId::INVALID {
        return Err(Error::InvalidTraceId);
    }
    Ok(format!("{trace_id:032x}"))
}
