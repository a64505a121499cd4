//! Telemetry configuration.
//!
//! All knobs are environment-driven with explicit defaults so the tracing
//! layer works out of the box inside the compose stack:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | `http://otel-collector:4317` | OTLP/gRPC collector endpoint |
//! | `OTEL_SERVICE_NAME` | `ai-goal-seeking-backend` | `service.name` resource attribute |
//! | `GOALSEEK_TELEMETRY_ENABLED` | `true` | Master switch for the wire exporter |
//! | `GOALSEEK_TRACE_CONSOLE` | `true` | Console (stdout) exporter for local debugging |

use serde::{Deserialize, Serialize};

/// Default logical service name advertised in every exported span.
pub const DEFAULT_SERVICE_NAME: &str = "ai-goal-seeking-backend";

/// Default collector endpoint (OTLP/gRPC).
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://otel-collector:4317";

/// Configuration for [`crate::init::init_telemetry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Master switch for the wire exporter. When false, spans are still
    /// created (and printed to the console if `console_export` is set) but
    /// nothing leaves the process.
    pub enabled: bool,

    /// OTLP/gRPC endpoint the batch exporter ships spans to.
    pub otlp_endpoint: String,

    /// `service.name` resource attribute.
    pub service_name: String,

    /// Mirror finished spans to stdout via the console exporter.
    pub console_export: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            console_export: true,
        }
    }
}

impl TelemetryConfig {
    /// Build configuration from environment variables, falling back to the
    /// defaults documented in the module header.
    pub fn from_env() -> Self {
        let enabled = env_flag("GOALSEEK_TELEMETRY_ENABLED", true);
        let console_export = env_flag("GOALSEEK_TRACE_CONSOLE", true);

        let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_OTLP_ENDPOINT.to_string());

        let service_name = std::env::var("OTEL_SERVICE_NAME")
            .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

        Self {
            enabled,
            otlp_endpoint,
            service_name,
            console_export,
        }
    }
}

/// Parse a boolean env var; unset or unparseable values take the default.
fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TelemetryConfig::default();
        assert!(config.enabled);
        assert!(config.console_export);
        assert_eq!(config.otlp_endpoint, DEFAULT_OTLP_ENDPOINT);
        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
    }

    #[test]
    fn test_env_flag_parsing() {
        std::env::set_var("GOALSEEK_TEST_FLAG_ON", "true");
        std::env::set_var("GOALSEEK_TEST_FLAG_OFF", "0");
        assert!(env_flag("GOALSEEK_TEST_FLAG_ON", false));
        assert!(!env_flag("GOALSEEK_TEST_FLAG_OFF", true));
        assert!(env_flag("GOALSEEK_TEST_FLAG_UNSET", true));
        std::env::remove_var("GOALSEEK_TEST_FLAG_ON");
        std::env::remove_var("GOALSEEK_TEST_FLAG_OFF");
    }
}
