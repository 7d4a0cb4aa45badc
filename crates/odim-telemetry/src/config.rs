//! Telemetry configuration from environment variables.

use std::env;

/// Default service name when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "odimra";

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Process (pod) name, also stamped into request contexts
    pub process_name: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to write logs to stdout at all
    pub console_output: bool,

    /// JSON lines instead of human readable output
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            process_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ODIM_SERVICE_NAME`: Service name (default: odimra)
    /// - `POD_NAME`: Process name (default: the service name)
    /// - `ODIM_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `ODIM_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `ODIM_JSON_LOGS`: Enable JSON logs (default: true inside Kubernetes)
    #[must_use]
    pub fn from_env() -> Self {
        let in_cluster = env::var("KUBERNETES_SERVICE_HOST").is_ok();
        let service_name =
            env::var("ODIM_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

        Self {
            process_name: env::var("POD_NAME").unwrap_or_else(|_| service_name.clone()),
            service_name,

            log_level: env::var("ODIM_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("ODIM_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            json_logs: env::var("ODIM_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(in_cluster),
        }
    }

    /// Configuration for a named service, e.g. `svc-task`.
    ///
    /// An explicit `ODIM_SERVICE_NAME` is replaced; `POD_NAME` still wins for
    /// the process name.
    #[must_use]
    pub fn for_service(service_name: &str) -> Self {
        let mut config = Self::from_env();
        if env::var("POD_NAME").is_err() {
            config.process_name = service_name.to_string();
        }
        config.service_name = service_name.to_string();
        config
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
