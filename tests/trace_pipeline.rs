//! End-to-end pipeline tests over an in-memory exporter.
//!
//! These drive the same call pattern the chat backend uses: a conversation
//! entry span, nested agent/validation/goal-seeking spans, context
//! propagation across a simulated service boundary, and callbacks bound to
//! a captured context.

use std::collections::HashMap;
use std::time::Duration;

use opentelemetry::trace::{Span as _, SpanKind, Status, TraceContextExt};
use opentelemetry::Context;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};

use goalseek_telemetry::context::TraceContextManager;
use goalseek_telemetry::spans::{
    agent_span, conversation_span, goal_seeking_span, validation_span,
};

fn test_manager() -> (SdkTracerProvider, InMemorySpanExporter, TraceContextManager) {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    let manager = TraceContextManager::new(&provider, "goalseek-test");
    (provider, exporter, manager)
}

fn finished(provider: &SdkTracerProvider, exporter: &InMemorySpanExporter) -> Vec<SpanData> {
    provider.force_flush().expect("flush");
    exporter.get_finished_spans().expect("finished spans")
}

fn by_name<'a>(spans: &'a [SpanData], name: &str) -> &'a SpanData {
    spans
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("span {name} not exported"))
}

#[tokio::test]
async fn test_full_conversation_flow_shares_one_trace() {
    let (provider, exporter, manager) = test_manager();

    let root = conversation_span(&manager, "conv123", "process_message", Some("user123"));
    let inner = manager.clone();
    let result: Result<(), String> = manager
        .with_span(root, async move {
            let agent = agent_span(&inner, "joke", "process_message", Some("conv123"), None);
            inner
                .with_span(agent, async {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    Ok::<_, String>(())
                })
                .await?;

            let validation = validation_span(&inner, "conv123", Some("joke"), None);
            inner.with_span(validation, async { Ok::<_, String>(()) }).await?;

            let goal = goal_seeking_span(&inner, "conv123", None, None);
            inner.with_span(goal, async { Ok::<_, String>(()) }).await?;
            Ok(())
        })
        .await;
    result.expect("flow succeeds");

    let spans = finished(&provider, &exporter);
    assert_eq!(spans.len(), 4);

    let root = by_name(&spans, "conversation.process_message");
    assert_eq!(root.span_kind, SpanKind::Server);
    assert_eq!(root.status, Status::Ok);

    let trace_id = root.span_context.trace_id();
    for name in [
        "agent.joke.process_message",
        "validation.validate_response",
        "goal_seeking.process",
    ] {
        let span = by_name(&spans, name);
        assert_eq!(span.span_context.trace_id(), trace_id, "{name} shares the trace");
        assert_eq!(span.status, Status::Ok);
    }

    // Nested spans parent to the conversation span or to a sibling within
    // the same trace, never to a foreign trace.
    let agent = by_name(&spans, "agent.joke.process_message");
    assert_eq!(agent.parent_span_id, root.span_context.span_id());
}

#[tokio::test]
async fn test_inner_failure_marks_only_inner_span() {
    let (provider, exporter, manager) = test_manager();

    let root = conversation_span(&manager, "conv123", "process_message", None);
    let inner = manager.clone();
    let result: Result<(), String> = manager
        .with_span(root, async move {
            let validation = validation_span(&inner, "conv123", None, None);
            let failed: Result<(), String> = inner
                .with_span(validation, async { Err("low quality response".to_string()) })
                .await;
            // Recovered: the conversation still completes.
            assert!(failed.is_err());
            Ok(())
        })
        .await;
    result.expect("outer flow succeeds");

    let spans = finished(&provider, &exporter);
    assert_eq!(spans.len(), 2, "each span ended exactly once");

    let validation = by_name(&spans, "validation.validate_response");
    assert_eq!(validation.status, Status::error("low quality response".to_string()));
    assert!(validation.events.iter().any(|e| e.name == "exception"));

    let root = by_name(&spans, "conversation.process_message");
    assert_eq!(root.status, Status::Ok);
}

#[tokio::test]
async fn test_propagated_error_fails_both_spans() {
    let (provider, exporter, manager) = test_manager();

    let root = conversation_span(&manager, "conv123", "process_message", None);
    let inner = manager.clone();
    let result: Result<(), String> = manager
        .with_span(root, async move {
            let agent = agent_span(&inner, "trivia", "process_message", Some("conv123"), None);
            inner
                .with_span(agent, async { Err("model unavailable".to_string()) })
                .await
        })
        .await;
    assert_eq!(result.unwrap_err(), "model unavailable");

    let spans = finished(&provider, &exporter);
    for name in ["agent.trivia.process_message", "conversation.process_message"] {
        assert_eq!(
            by_name(&spans, name).status,
            Status::error("model unavailable".to_string())
        );
    }
}

#[tokio::test]
async fn test_header_boundary_continues_the_trace() {
    let (provider, exporter, manager) = test_manager();

    // Service A: conversation span active, inject into outgoing headers.
    let root = conversation_span(&manager, "conv123", "route_message", None);
    let inner = manager.clone();
    let headers: Result<HashMap<String, String>, String> = manager
        .with_span(root, async move {
            Ok(inner.inject_context_into_headers(None))
        })
        .await;
    let headers = headers.expect("inject");
    assert!(headers.contains_key("traceparent"));

    // Service B: extract, continue the trace with a child span.
    let remote = manager.extract_context_from_headers(&headers);
    assert!(remote.span().span_context().is_remote());
    let mut child = manager.child_span("agent.remote.process_message", Some(&remote));
    child.end();

    let spans = finished(&provider, &exporter);
    let root = by_name(&spans, "conversation.route_message");
    let child = by_name(&spans, "agent.remote.process_message");
    assert_eq!(child.span_context.trace_id(), root.span_context.trace_id());
    assert_eq!(child.parent_span_id, root.span_context.span_id());
}

#[tokio::test]
async fn test_bound_callback_after_timer_keeps_trace() {
    let (provider, exporter, manager) = test_manager();

    let span = conversation_span(&manager, "conv123", "deferred_reply", None);
    let bound_trace = span.span_context().trace_id().to_string();
    let sc = span.span_context().clone();

    let inner = manager.clone();
    let result: Result<(), String> = manager.with_span(span, async { Ok(()) }).await;
    result.unwrap();

    // The conversation span is long gone; a timer fires later and the
    // bound callback must still observe the original trace id.
    let callback = manager.bind_fn(
        move || inner.current_trace_info().map(|info| info.trace_id),
        Some(&sc),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(manager.current_trace_info().is_none());
    assert_eq!(callback(), Some(bound_trace));

    let spans = finished(&provider, &exporter);
    assert_eq!(spans.len(), 1);
}

#[tokio::test]
async fn test_with_context_restores_captured_context() {
    let (provider, exporter, manager) = test_manager();

    let span = conversation_span(&manager, "conv123", "capture", None);
    let trace_id = span.span_context().trace_id().to_string();
    let captured = Context::current_with_span(span);

    let inner = manager.clone();
    let observed = manager
        .with_context(Some(captured.clone()), async move {
            inner.current_trace_info().map(|info| info.trace_id)
        })
        .await;
    assert_eq!(observed, Some(trace_id));

    captured.span().end();
    let spans = finished(&provider, &exporter);
    assert_eq!(spans.len(), 1);
}
