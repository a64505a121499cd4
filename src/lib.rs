//! Distributed tracing core for the AI goal-seeking chat backend.
//!
//! Three layers, leaves first:
//!
//! - **Span factories** ([`spans`]): one helper per traced domain event,
//!   each producing a span with the fixed correlation attribute schema.
//! - **Context manager** ([`context`]): the one component that talks to
//!   the OpenTelemetry active-context mechanism: current trace
//!   identifiers, running futures inside a span, W3C header propagation,
//!   binding callbacks to a captured context.
//! - **Bootstrap** ([`init`]): one-time pipeline construction: console
//!   exporter, logged OTLP exporter, propagator, subscriber bridge, and a
//!   startup diagnostic span.
//!
//! # Span naming
//!
//! Hierarchical dotted strings:
//! - `conversation.{operation}` (server kind, request entry)
//! - `agent.{agent_type}.{operation}` (internal)
//! - `validation.validate_response` (internal)
//! - `goal_seeking.process` (internal)
//!
//! # Correlation attributes
//!
//! Every span carries `service.name`, `service.version`, and `timestamp`,
//! plus whichever of `conversation.id`, `user.id`, `agent.type`,
//! `operation.name` apply. See [`attrs`] for the full vocabulary.
//!
//! # Example
//!
//! ```rust,ignore
//! use goalseek_telemetry::{
//!     config::TelemetryConfig, context::TraceContextManager, init::init_telemetry,
//!     spans::agent_span,
//! };
//!
//! let config = TelemetryConfig::from_env();
//! let guard = init_telemetry(&config);
//! let manager = TraceContextManager::new(guard.provider(), &config.service_name);
//!
//! let span = agent_span(&manager, "joke", "process_message", Some("conv123"), None);
//! let reply = manager.with_span(span, respond_to_user(msg)).await?;
//! ```

pub mod attrs;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod init;
pub mod spans;

pub use attrs::{standard_attributes, CorrelationFields};
pub use config::TelemetryConfig;
pub use context::{TraceContextManager, TraceInfo};
pub use error::TelemetryError;
pub use export::LoggingSpanExporter;
pub use init::{init_telemetry, TelemetryGuard};
pub use spans::{
    agent_span, conversation_span, goal_seeking_span, validation_span, UserState,
};
