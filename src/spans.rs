//! Domain span factories.
//!
//! One helper per traced domain event, so call sites never repeat the
//! attribute-naming logic:
//!
//! **Span naming**: hierarchical dotted strings.
//! - `conversation.{operation}`: entry span for a conversation operation
//! - `agent.{agent_type}.{operation}`: personality agent work
//! - `validation.validate_response`: response quality validation
//! - `goal_seeking.process`: goal-seeking pass over the user state
//!
//! Identifier values are embedded verbatim: empty strings, `/`, and very
//! long values pass through unsanitized and untruncated.
//!
//! Every factory merges the standard attribute set (service identity,
//! version, timestamp, correlation fields) and emits a `🔍 TRACE` debug
//! line with the currently active trace identifiers. None of them can
//! fail; a missing argument degrades to a default.
//!
//! # Example
//!
//! ```rust,ignore
//! use goalseek_telemetry::spans::agent_span;
//!
//! let span = agent_span(&manager, "joke", "process_message", Some("conv123"), None);
//! let result = manager.with_span(span, handle_message(msg)).await?;
//! ```

use opentelemetry::trace::{SpanKind, Tracer};
use opentelemetry::KeyValue;
use opentelemetry_sdk::trace::Span as SdkSpan;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attrs::{self, standard_attributes, CorrelationFields};
use crate::context::TraceContextManager;

/// Goal-seeking view of the user, carried by the conversation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserState {
    /// Coarse state label (e.g. `exploring`, `frustrated`, `satisfied`).
    pub state: String,
    /// Engagement level estimate.
    pub engagement: f64,
    /// Satisfaction score estimate.
    pub satisfaction: f64,
}

impl UserState {
    pub fn new(state: impl Into<String>, engagement: f64, satisfaction: f64) -> Self {
        Self {
            state: state.into(),
            engagement,
            satisfaction,
        }
    }
}

/// Entry-kind span for a conversation-level operation, named
/// `conversation.{operation}`.
pub fn conversation_span(
    manager: &TraceContextManager,
    conversation_id: &str,
    operation: &str,
    user_id: Option<&str>,
) -> SdkSpan {
    let name = format!("conversation.{operation}");
    let fields = CorrelationFields {
        user_id: user_id.map(str::to_string),
        ..CorrelationFields::conversation(conversation_id, operation)
    };
    let span = build_span(manager, name.clone(), SpanKind::Server, &fields, Vec::new());
    log_trace_debug(manager, &name);
    span
}

/// Internal span for personality-agent work, named
/// `agent.{agent_type}.{operation}`.
pub fn agent_span(
    manager: &TraceContextManager,
    agent_type: &str,
    operation: &str,
    conversation_id: Option<&str>,
    user_id: Option<&str>,
) -> SdkSpan {
    let name = format!("agent.{agent_type}.{operation}");
    let fields = CorrelationFields {
        user_id: user_id.map(str::to_string),
        conversation_id: conversation_id.map(str::to_string),
        agent_type: Some(agent_type.to_string()),
        ..CorrelationFields::default()
    };
    let extra = vec![KeyValue::new(attrs::AGENT_OPERATION, operation.to_string())];
    let span = build_span(manager, name.clone(), SpanKind::Internal, &fields, extra);
    log_trace_debug(manager, &name);
    span
}

/// Internal span for response validation, named
/// `validation.validate_response`. The `agent.type` attribute is present
/// only when an agent type is supplied.
pub fn validation_span(
    manager: &TraceContextManager,
    conversation_id: &str,
    agent_type: Option<&str>,
    user_id: Option<&str>,
) -> SdkSpan {
    let name = "validation.validate_response";
    let fields = CorrelationFields {
        user_id: user_id.map(str::to_string),
        conversation_id: Some(conversation_id.to_string()),
        agent_type: agent_type.map(str::to_string),
        ..CorrelationFields::default()
    };
    let extra = vec![KeyValue::new(
        attrs::VALIDATION_OPERATION,
        "validate_response",
    )];
    let span = build_span(manager, name, SpanKind::Internal, &fields, extra);
    log_trace_debug(manager, name);
    span
}

/// Internal span for a goal-seeking pass, named `goal_seeking.process`.
///
/// A missing `user_state` degrades to `unknown` / `0.0` / `0.0` rather
/// than failing the call.
pub fn goal_seeking_span(
    manager: &TraceContextManager,
    conversation_id: &str,
    user_state: Option<&UserState>,
    user_id: Option<&str>,
) -> SdkSpan {
    let name = "goal_seeking.process";
    let (state, engagement, satisfaction) = match user_state {
        Some(s) => (s.state.clone(), s.engagement, s.satisfaction),
        None => ("unknown".to_string(), 0.0, 0.0),
    };
    let fields = CorrelationFields {
        user_id: user_id.map(str::to_string),
        conversation_id: Some(conversation_id.to_string()),
        ..CorrelationFields::default()
    };
    let extra = vec![
        KeyValue::new(attrs::USER_STATE, state),
        KeyValue::new(attrs::USER_ENGAGEMENT, engagement),
        KeyValue::new(attrs::USER_SATISFACTION, satisfaction),
    ];
    let span = build_span(manager, name, SpanKind::Internal, &fields, extra);
    log_trace_debug(manager, name);
    span
}

fn build_span(
    manager: &TraceContextManager,
    name: impl Into<std::borrow::Cow<'static, str>>,
    kind: SpanKind,
    fields: &CorrelationFields,
    extra: Vec<KeyValue>,
) -> SdkSpan {
    let mut attributes = standard_attributes(manager.service_name(), fields);
    attributes.extend(extra);
    let tracer = manager.tracer();
    tracer
        .span_builder(name)
        .with_kind(kind)
        .with_attributes(attributes)
        .start(tracer)
}

/// Debug line with the trace identifiers active at creation time. A local
/// debugging aid, not structured logging.
fn log_trace_debug(manager: &TraceContextManager, span_name: &str) {
    match manager.current_trace_info() {
        Some(info) => debug!(
            "🔍 TRACE {} trace_id={} span_id={}",
            span_name, info.trace_id, info.span_id
        ),
        None => debug!("🔍 TRACE {} (no active trace)", span_name),
    }
}
