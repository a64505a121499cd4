//! Pipeline smoke tool.
//!
//! Initializes the tracing pipeline, drives one representative traced
//! conversation flow (conversation → agent → validation → goal-seeking),
//! performs a header inject/extract round-trip, and prints the observed
//! trace identifiers as JSON. Point it at a collector to verify wiring end
//! to end:
//!
//! ```text
//! tracecheck --endpoint http://localhost:4317 --service-name goalseek-dev
//! ```

use anyhow::Result;
use clap::Parser;
use uuid::Uuid;

use goalseek_telemetry::config::TelemetryConfig;
use goalseek_telemetry::context::TraceContextManager;
use goalseek_telemetry::init::init_telemetry;
use goalseek_telemetry::spans::{
    agent_span, conversation_span, goal_seeking_span, validation_span, UserState,
};

#[derive(Parser, Debug)]
#[command(name = "tracecheck", about = "Smoke-test the goalseek tracing pipeline")]
struct Args {
    /// OTLP/gRPC collector endpoint.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    endpoint: Option<String>,

    /// Logical service name advertised in exported spans.
    #[arg(long, env = "OTEL_SERVICE_NAME")]
    service_name: Option<String>,

    /// Disable the wire exporter (console only).
    #[arg(long)]
    no_export: bool,

    /// Disable the console exporter.
    #[arg(long)]
    no_console: bool,

    /// Conversation id to tag the demo spans with; random if omitted.
    #[arg(long)]
    conversation_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TelemetryConfig::from_env();
    if let Some(endpoint) = args.endpoint {
        config.otlp_endpoint = endpoint;
    }
    if let Some(service_name) = args.service_name {
        config.service_name = service_name;
    }
    if args.no_export {
        config.enabled = false;
    }
    if args.no_console {
        config.console_export = false;
    }

    let guard = init_telemetry(&config);
    let manager = TraceContextManager::new(guard.provider(), &config.service_name);

    let conversation_id = args
        .conversation_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let user_id = "smoke-user";

    let root = conversation_span(&manager, &conversation_id, "process_message", Some(user_id));
    let inner = manager.clone();
    let conv = conversation_id.clone();
    manager
        .with_span(root, async move {
            let agent = agent_span(
                &inner,
                "joke",
                "process_message",
                Some(&conv),
                Some(user_id),
            );
            inner
                .with_span(agent, async {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    Ok::<_, anyhow::Error>(())
                })
                .await?;

            let validation = validation_span(&inner, &conv, Some("joke"), Some(user_id));
            inner.with_span(validation, async { Ok::<_, anyhow::Error>(()) }).await?;

            let state = UserState::new("exploring", 0.7, 0.8);
            let goal = goal_seeking_span(&inner, &conv, Some(&state), Some(user_id));
            inner.with_span(goal, async { Ok::<_, anyhow::Error>(()) }).await?;

            // Round-trip the active context through a header map, the way
            // it would cross a service boundary.
            let headers = inner.inject_context_into_headers(None);
            let remote = inner.extract_context_from_headers(&headers);
            let remote_trace = {
                use opentelemetry::trace::TraceContextExt;
                remote.span().span_context().trace_id().to_string()
            };

            let info = inner.current_trace_info();
            println!(
                "{}",
                serde_json::json!({
                    "conversation_id": conv,
                    "active": info,
                    "headers": headers,
                    "round_trip_trace_id": remote_trace,
                })
            );

            Ok::<_, anyhow::Error>(())
        })
        .await?;

    guard.force_flush()?;
    guard.shutdown()?;
    Ok(())
}
