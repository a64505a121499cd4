//! One-time tracing pipeline initialization.
//!
//! Builds the exporter pipeline (console exporter for local debugging plus
//! a logged OTLP wire exporter), installs the W3C trace-context propagator
//! and the `tracing` → OpenTelemetry bridge, and emits a single diagnostic
//! span to confirm the pipeline is wired.
//!
//! Initialization failures are logged and swallowed: the host process must
//! come up and serve traffic even with tracing fully broken. The degraded
//! path is a provider with no exporters, so span creation stays valid and
//! cheap everywhere else in the crate.

use opentelemetry::global;
use opentelemetry::trace::{Span, SpanKind, Status, Tracer, TracerProvider};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing::{debug, error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::TelemetryConfig;
use crate::error::TelemetryError;
use crate::export::LoggingSpanExporter;

/// Default log filter. Transport internals are silenced the same way the
/// noisy low-level instrumentations are disabled in the collector stack.
const DEFAULT_LOG_FILTER: &str = "info,h2=warn,hyper=warn,tonic=warn";

/// RAII owner of the tracer provider.
///
/// Hold for the process lifetime; call [`TelemetryGuard::shutdown`] during
/// graceful shutdown to flush pending spans. Dropping without an explicit
/// shutdown still flushes best-effort via the provider's own drop.
pub struct TelemetryGuard {
    provider: SdkTracerProvider,
}

impl TelemetryGuard {
    /// The underlying provider, e.g. for constructing a
    /// [`crate::context::TraceContextManager`].
    pub fn provider(&self) -> &SdkTracerProvider {
        &self.provider
    }

    /// Flush pending spans to all exporters.
    pub fn force_flush(&self) -> Result<(), TelemetryError> {
        self.provider
            .force_flush()
            .map_err(|e| TelemetryError::Flush {
                reason: e.to_string(),
            })
    }

    /// Flush and shut down the exporter pipeline.
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        self.provider
            .shutdown()
            .map_err(|e| TelemetryError::Shutdown {
                reason: e.to_string(),
            })
    }
}

/// Build the tracer provider: service resource, 100% sampling, console
/// processor (immediate) and logged OTLP processor (batched), each gated
/// by its config switch.
pub fn build_tracer_provider(
    config: &TelemetryConfig,
) -> Result<SdkTracerProvider, TelemetryError> {
    let mut builder = SdkTracerProvider::builder()
        .with_resource(build_resource(config))
        .with_sampler(Sampler::AlwaysOn);

    if config.console_export {
        builder = builder.with_simple_exporter(opentelemetry_stdout::SpanExporter::default());
    }

    if config.enabled {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&config.otlp_endpoint)
            .build()
            .map_err(|e| TelemetryError::ExporterBuild {
                endpoint: config.otlp_endpoint.clone(),
                reason: e.to_string(),
            })?;
        builder = builder
            .with_batch_exporter(LoggingSpanExporter::new(exporter, &config.otlp_endpoint));
    }

    Ok(builder.build())
}

/// Initialize the tracing pipeline for the whole process.
///
/// Installs the W3C propagator, builds the provider (degrading to an
/// export-less provider on failure), registers it globally, wires the
/// fmt + OpenTelemetry subscriber stack, and emits the startup diagnostic
/// span. Never panics and never returns an error.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryGuard {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let (provider, build_error) = match build_tracer_provider(config) {
        Ok(provider) => (provider, None),
        Err(err) => {
            let fallback = SdkTracerProvider::builder()
                .with_resource(build_resource(config))
                .build();
            (fallback, Some(err))
        }
    };

    global::set_tracer_provider(provider.clone());
    init_subscriber(&provider);

    match build_error {
        Some(err) => error!(error = %err, "trace pipeline init failed, spans will not be exported"),
        None => info!(
            endpoint = %config.otlp_endpoint,
            service = %config.service_name,
            wire_export = config.enabled,
            console_export = config.console_export,
            "trace pipeline started"
        ),
    }

    run_startup_check(&provider, config);

    TelemetryGuard { provider }
}

fn build_resource(config: &TelemetryConfig) -> Resource {
    Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attribute(KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")))
        .build()
}

/// Install the fmt + env-filter + OpenTelemetry bridge subscriber. An
/// already-installed subscriber (tests, embedding hosts) is left in place.
fn init_subscriber(provider: &SdkTracerProvider) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let bridge =
        tracing_opentelemetry::layer().with_tracer(provider.tracer("goalseek-telemetry"));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(bridge)
        .try_init();
    if installed.is_err() {
        debug!("tracing subscriber already installed, keeping the existing one");
    }
}

/// Immediate pipeline self-test: create, tag, and close one diagnostic
/// span so a broken exporter shows up in the logs at startup rather than
/// on the first real request.
fn run_startup_check(provider: &SdkTracerProvider, config: &TelemetryConfig) {
    let tracer = provider.tracer("startup-check");
    let mut span = tracer
        .span_builder("telemetry.startup_check")
        .with_kind(SpanKind::Internal)
        .with_attributes(vec![
            KeyValue::new(SERVICE_NAME, config.service_name.clone()),
            KeyValue::new("check.id", Uuid::new_v4().to_string()),
        ])
        .start(&tracer);
    span.set_status(Status::Ok);
    let sc = span.span_context().clone();
    span.end();

    info!(
        trace_id = %sc.trace_id(),
        span_id = %sc.span_id(),
        "🔍 TRACE startup check span emitted"
    );
}
