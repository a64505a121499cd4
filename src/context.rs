//! Trace context management.
//!
//! [`TraceContextManager`] is the only component that talks to the
//! OpenTelemetry active-context mechanism directly; the span factories and
//! all callers go through it for cross-cutting concerns: reading the
//! currently active trace identifiers, running futures inside a span's
//! context, carrying W3C trace context across header maps, and binding
//! callbacks to a captured context so they survive timer and channel
//! boundaries.
//!
//! One manager is constructed from the tracer provider at process start and
//! passed by reference to whatever needs tracing. It holds its own tracer
//! and W3C propagator, so nothing here depends on hidden global state.
//!
//! # Failure semantics
//!
//! No operation on the manager surfaces a tracing failure to the caller.
//! The single exception is [`TraceContextManager::with_span`], which
//! re-returns the *caller's* error unchanged after annotating the span.

use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;

use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{
    FutureExt, Link, Span, SpanContext, SpanKind, Status, TraceContextExt, Tracer, TracerProvider,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider, Span as SdkSpan};
use serde::Serialize;
use tracing::info;

use crate::attrs::{self, CorrelationFields};

/// Identifiers of the currently active span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceInfo {
    /// 32-hex-char trace id.
    pub trace_id: String,
    /// 16-hex-char span id.
    pub span_id: String,
    /// W3C trace flags byte (bit 0 = sampled).
    pub trace_flags: u8,
    /// Whether the active context was propagated from a remote parent.
    pub is_remote: bool,
}

/// Facade over the OpenTelemetry active-span mechanism.
///
/// Construct once per process from the provider built by
/// [`crate::init::init_telemetry`] and share by reference (or cheap clone).
pub struct TraceContextManager {
    tracer: SdkTracer,
    propagator: TraceContextPropagator,
    service_name: String,
}

impl std::fmt::Debug for TraceContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceContextManager")
            .field("service_name", &self.service_name)
            .finish()
    }
}

impl Clone for TraceContextManager {
    fn clone(&self) -> Self {
        Self {
            tracer: self.tracer.clone(),
            propagator: TraceContextPropagator::new(),
            service_name: self.service_name.clone(),
        }
    }
}

impl TraceContextManager {
    /// Create a manager backed by `provider`.
    pub fn new(provider: &SdkTracerProvider, service_name: impl Into<String>) -> Self {
        Self {
            tracer: provider.tracer("goalseek-telemetry"),
            propagator: TraceContextPropagator::new(),
            service_name: service_name.into(),
        }
    }

    /// Logical service name stamped onto every span's standard attributes.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub(crate) fn tracer(&self) -> &SdkTracer {
        &self.tracer
    }

    /// Identifiers of the currently active span, or `None` when no valid
    /// span context is active. Never fails.
    pub fn current_trace_info(&self) -> Option<TraceInfo> {
        let cx = Context::current();
        let span = cx.span();
        let sc = span.span_context();
        if !sc.is_valid() {
            return None;
        }
        Some(TraceInfo {
            trace_id: sc.trace_id().to_string(),
            span_id: sc.span_id().to_string(),
            trace_flags: sc.trace_flags().to_u8(),
            is_remote: sc.is_remote(),
        })
    }

    /// Raw identifying context of the active span, or `None` if none.
    pub fn current_span_context(&self) -> Option<SpanContext> {
        let cx = Context::current();
        let span = cx.span();
        let sc = span.span_context();
        if sc.is_valid() {
            Some(sc.clone())
        } else {
            None
        }
    }

    /// Start an internal span nested under `parent`, or under whatever
    /// context is currently active when no parent is given.
    pub fn child_span(
        &self,
        name: impl Into<Cow<'static, str>>,
        parent: Option<&Context>,
    ) -> SdkSpan {
        let parent_cx = match parent {
            Some(cx) => cx.clone(),
            None => Context::current(),
        };
        self.tracer
            .span_builder(name)
            .with_kind(SpanKind::Internal)
            .start_with_context(&self.tracer, &parent_cx)
    }

    /// Start a top-level server span unconditionally, ignoring any active
    /// context, for use at a true request boundary. The new trace/span id
    /// pair is logged for operator visibility.
    pub fn root_span(
        &self,
        name: impl Into<Cow<'static, str>>,
        attributes: Vec<KeyValue>,
    ) -> SdkSpan {
        let span = self
            .tracer
            .span_builder(name)
            .with_kind(SpanKind::Server)
            .with_attributes(attributes)
            .start_with_context(&self.tracer, &Context::new());
        let sc = span.span_context();
        info!(
            trace_id = %sc.trace_id(),
            span_id = %sc.span_id(),
            "🔍 TRACE root span started"
        );
        span
    }

    /// Start a server span that references other traces by link rather
    /// than parent/child, for correlating logically related but
    /// independent traces. Invalid link contexts are skipped.
    pub fn linked_span(
        &self,
        name: impl Into<Cow<'static, str>>,
        links: &[SpanContext],
    ) -> SdkSpan {
        let links: Vec<Link> = links
            .iter()
            .filter(|sc| sc.is_valid())
            .map(|sc| Link::new(sc.clone(), Vec::new(), 0))
            .collect();
        self.tracer
            .span_builder(name)
            .with_kind(SpanKind::Server)
            .with_links(links)
            .start_with_context(&self.tracer, &Context::new())
    }

    /// Run `fut` with `span` installed as the active span, surviving every
    /// `.await` inside it.
    ///
    /// The identifiers of the previously active context (if any) are copied
    /// onto the span before the future runs. On `Ok` the span status is set
    /// to Ok; on `Err` an `exception` event and an error status carrying
    /// the error's message are recorded and the same error is returned
    /// unchanged. Either way the span is ended exactly once.
    pub async fn with_span<F, T, E>(&self, span: SdkSpan, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let ambient = self.current_trace_info();
        let cx = Context::current_with_span(span);

        if let Some(info) = ambient {
            let span_ref = cx.span();
            span_ref.set_attribute(KeyValue::new(attrs::PARENT_TRACE_ID, info.trace_id));
            span_ref.set_attribute(KeyValue::new(attrs::PARENT_SPAN_ID, info.span_id));
        }

        let result = fut.with_context(cx.clone()).await;

        let span_ref = cx.span();
        match &result {
            Ok(_) => span_ref.set_status(Status::Ok),
            Err(err) => {
                span_ref.add_event(
                    "exception",
                    vec![KeyValue::new("exception.message", err.to_string())],
                );
                span_ref.set_status(Status::error(err.to_string()));
            }
        }
        span_ref.end();

        result
    }

    /// Run `fut` with a previously captured context re-installed as active,
    /// falling back to the current context when none is given.
    pub async fn with_context<F>(&self, context: Option<Context>, fut: F) -> F::Output
    where
        F: Future,
    {
        let cx = context.unwrap_or_else(Context::current);
        fut.with_context(cx).await
    }

    /// Wrap `f` so that, whenever it is invoked, the captured context is
    /// re-installed as active first: the supplied span context when given
    /// and valid, otherwise whatever context is active at bind time.
    ///
    /// This keeps a trace alive across timer and callback boundaries where
    /// the original calling context would otherwise be lost.
    pub fn bind_fn<T, F>(&self, f: F, span_context: Option<&SpanContext>) -> impl FnOnce() -> T
    where
        F: FnOnce() -> T,
    {
        let cx = match span_context {
            Some(sc) if sc.is_valid() => Context::current().with_remote_span_context(sc.clone()),
            _ => Context::current(),
        };
        move || {
            let _guard = cx.attach();
            f()
        }
    }

    /// Bind a future to the context active at bind time.
    pub fn bind_future<F>(&self, fut: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        fut.with_context(Context::current())
    }

    /// Read a context out of an incoming header map (W3C `traceparent` /
    /// `tracestate`). Absent or malformed headers yield a context without
    /// a valid remote span, never an error.
    pub fn extract_context_from_headers(&self, headers: &HashMap<String, String>) -> Context {
        self.propagator.extract(headers)
    }

    /// Write the currently active context into an outgoing header map,
    /// defaulting to an empty map, and return the mutated map.
    pub fn inject_context_into_headers(
        &self,
        headers: Option<HashMap<String, String>>,
    ) -> HashMap<String, String> {
        let mut headers = headers.unwrap_or_default();
        self.propagator
            .inject_context(&Context::current(), &mut headers);
        headers
    }

    /// Merge the standard attribute set (service identity, timestamp, and
    /// any present correlation fields) onto an open span.
    pub fn add_standard_attributes(&self, span: &mut impl Span, fields: &CorrelationFields) {
        attrs::apply_standard_attributes(span, &self.service_name, fields);
    }
}
