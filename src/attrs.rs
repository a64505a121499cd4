//! Correlation attribute vocabulary.
//!
//! Every span emitted by this crate draws its attributes from the fixed set
//! of keys below so queries across span names stay joinable in the trace
//! backend. The keys are denormalized tags, not relational keys.
//!
//! `standard_attributes` is deliberately pure: it builds the merged
//! attribute set without touching a span, so the side-effecting pieces
//! (attaching to a span, debug logging) stay separable and independently
//! testable.

use chrono::Utc;
use opentelemetry::trace::Span;
use opentelemetry::KeyValue;
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};

/// ISO-8601 creation timestamp, set on every span.
pub const TIMESTAMP: &str = "timestamp";

/// End-user identifier.
pub const USER_ID: &str = "user.id";

/// Conversation identifier shared by every span of one chat exchange.
pub const CONVERSATION_ID: &str = "conversation.id";

/// Personality agent label (e.g. `joke`, `trivia`, `account_support`).
pub const AGENT_TYPE: &str = "agent.type";

/// Operation performed by an agent (e.g. `process_message`).
pub const AGENT_OPERATION: &str = "agent.operation";

/// Generic operation label for conversation-level spans.
pub const OPERATION_NAME: &str = "operation.name";

/// Operation label on validation spans; always `validate_response`.
pub const VALIDATION_OPERATION: &str = "validation.operation";

/// Goal-seeking user state label.
pub const USER_STATE: &str = "user.state";

/// Goal-seeking engagement level.
pub const USER_ENGAGEMENT: &str = "user.engagement";

/// Goal-seeking satisfaction score.
pub const USER_SATISFACTION: &str = "user.satisfaction";

/// Trace id of the context that was active when a span was installed.
pub const PARENT_TRACE_ID: &str = "trace.id";

/// Span id of the context that was active when a span was installed.
pub const PARENT_SPAN_ID: &str = "span.id";

/// Optional correlation fields merged into the standard attribute set.
///
/// Absent fields are omitted from the result entirely; `extra` entries pass
/// through untouched except that they may not shadow the fixed service
/// identity keys.
#[derive(Debug, Clone, Default)]
pub struct CorrelationFields {
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
    pub agent_type: Option<String>,
    pub operation: Option<String>,
    /// Pass-through attributes outside the fixed vocabulary.
    pub extra: Vec<KeyValue>,
}

impl CorrelationFields {
    pub fn conversation(conversation_id: &str, operation: &str) -> Self {
        Self {
            conversation_id: Some(conversation_id.to_string()),
            operation: Some(operation.to_string()),
            ..Self::default()
        }
    }
}

/// Build the standard attribute set: service identity, version, creation
/// timestamp, plus whichever correlation fields are present.
///
/// Caller-supplied `extra` entries never overwrite `service.name` or
/// `service.version`.
pub fn standard_attributes(service_name: &str, fields: &CorrelationFields) -> Vec<KeyValue> {
    let mut attributes = vec![
        KeyValue::new(SERVICE_NAME, service_name.to_string()),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        KeyValue::new(TIMESTAMP, Utc::now().to_rfc3339()),
    ];

    if let Some(ref user_id) = fields.user_id {
        attributes.push(KeyValue::new(USER_ID, user_id.clone()));
    }
    if let Some(ref conversation_id) = fields.conversation_id {
        attributes.push(KeyValue::new(CONVERSATION_ID, conversation_id.clone()));
    }
    if let Some(ref agent_type) = fields.agent_type {
        attributes.push(KeyValue::new(AGENT_TYPE, agent_type.clone()));
    }
    if let Some(ref operation) = fields.operation {
        attributes.push(KeyValue::new(OPERATION_NAME, operation.clone()));
    }

    for kv in &fields.extra {
        let key = kv.key.as_str();
        if key == SERVICE_NAME || key == SERVICE_VERSION {
            continue;
        }
        attributes.push(kv.clone());
    }

    attributes
}

/// Apply the standard attribute set to an open span.
pub fn apply_standard_attributes(
    span: &mut impl Span,
    service_name: &str,
    fields: &CorrelationFields,
) {
    for kv in standard_attributes(service_name, fields) {
        span.set_attribute(kv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(attrs: &[KeyValue]) -> Vec<&str> {
        attrs.iter().map(|kv| kv.key.as_str()).collect()
    }

    #[test]
    fn test_base_fields_always_present() {
        let attrs = standard_attributes("svc", &CorrelationFields::default());
        let keys = keys(&attrs);
        assert!(keys.contains(&SERVICE_NAME));
        assert!(keys.contains(&SERVICE_VERSION));
        assert!(keys.contains(&TIMESTAMP));
        assert_eq!(attrs.len(), 3);
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let fields = CorrelationFields {
            conversation_id: Some("conv123".to_string()),
            ..CorrelationFields::default()
        };
        let attrs = standard_attributes("svc", &fields);
        let keys = keys(&attrs);
        assert!(keys.contains(&CONVERSATION_ID));
        assert!(!keys.contains(&USER_ID));
        assert!(!keys.contains(&AGENT_TYPE));
        assert!(!keys.contains(&OPERATION_NAME));
    }

    #[test]
    fn test_extra_cannot_shadow_service_identity() {
        let fields = CorrelationFields {
            extra: vec![
                KeyValue::new(SERVICE_NAME, "spoofed"),
                KeyValue::new(SERVICE_VERSION, "0.0.0"),
                KeyValue::new("deployment.environment", "test"),
            ],
            ..CorrelationFields::default()
        };
        let attrs = standard_attributes("svc", &fields);

        let service_names: Vec<_> = attrs
            .iter()
            .filter(|kv| kv.key.as_str() == SERVICE_NAME)
            .collect();
        assert_eq!(service_names.len(), 1);
        assert_eq!(service_names[0].value.as_str(), "svc");
        assert!(keys(&attrs).contains(&"deployment.environment"));
    }

    #[test]
    fn test_all_correlation_fields_mapped() {
        let fields = CorrelationFields {
            user_id: Some("user123".to_string()),
            conversation_id: Some("conv123".to_string()),
            agent_type: Some("joke".to_string()),
            operation: Some("process_message".to_string()),
            extra: Vec::new(),
        };
        let attrs = standard_attributes("svc", &fields);
        let keys = keys(&attrs);
        for key in [USER_ID, CONVERSATION_ID, AGENT_TYPE, OPERATION_NAME] {
            assert!(keys.contains(&key), "missing {key}");
        }
    }
}
