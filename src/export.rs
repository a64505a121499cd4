//! Wire-exporter decorator.
//!
//! [`LoggingSpanExporter`] wraps the OTLP exporter so every batch leaving
//! the process is visible locally: batch size and a per-span summary before
//! the export, outcome after it. The decorator is a pure pass-through
//! (spans are never dropped, mutated, or reordered), which keeps the
//! debug-logging concern out of the export path proper.

use std::future::Future;

use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::trace::{SpanData, SpanExporter};
use opentelemetry_sdk::Resource;
use tracing::{debug, warn};

/// Decorator that logs span batches on their way to the wrapped exporter.
#[derive(Debug)]
pub struct LoggingSpanExporter<E> {
    inner: E,
    endpoint: String,
}

impl<E: SpanExporter> LoggingSpanExporter<E> {
    /// Wrap `inner`, labelling log lines with the destination `endpoint`.
    pub fn new(inner: E, endpoint: impl Into<String>) -> Self {
        Self {
            inner,
            endpoint: endpoint.into(),
        }
    }
}

impl<E: SpanExporter> SpanExporter for LoggingSpanExporter<E> {
    fn export(&self, batch: Vec<SpanData>) -> impl Future<Output = OTelSdkResult> + Send {
        debug!(
            batch_size = batch.len(),
            endpoint = %self.endpoint,
            "exporting span batch"
        );
        for span in &batch {
            debug!(
                "🔍 TRACE export {} trace_id={} status={:?}",
                span.name,
                span.span_context.trace_id(),
                span.status
            );
        }

        let fut = self.inner.export(batch);
        let endpoint = self.endpoint.clone();
        async move {
            let result = fut.await;
            match &result {
                Ok(()) => debug!(endpoint = %endpoint, "span batch export complete"),
                Err(err) => warn!(endpoint = %endpoint, error = %err, "span batch export failed"),
            }
            result
        }
    }

    fn shutdown(&mut self) -> OTelSdkResult {
        self.inner.shutdown()
    }

    fn force_flush(&mut self) -> OTelSdkResult {
        self.inner.force_flush()
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.inner.set_resource(resource);
    }
}
