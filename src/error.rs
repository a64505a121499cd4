//! Error types for the telemetry pipeline.
//!
//! Tracing failures are confined to the bootstrap and shutdown boundaries:
//! nothing in the span-creation or context-propagation paths returns an
//! error, and `init_telemetry` downgrades these to log lines so the host
//! process always comes up.

use thiserror::Error;

/// Errors raised while building or tearing down the tracing pipeline.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The wire (OTLP) span exporter could not be constructed.
    #[error("failed to build OTLP span exporter for {endpoint}: {reason}")]
    ExporterBuild { endpoint: String, reason: String },

    /// Flushing pending spans failed.
    #[error("trace pipeline flush failed: {reason}")]
    Flush { reason: String },

    /// Shutting down the tracer provider failed.
    #[error("tracer provider shutdown failed: {reason}")]
    Shutdown { reason: String },
}
