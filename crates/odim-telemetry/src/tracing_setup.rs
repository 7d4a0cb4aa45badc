//! Subscriber installation.
//!
//! Installs one global `tracing` subscriber: an `EnvFilter` followed by
//! either a JSON or a pretty `fmt` layer. Log shipping (Loki, Fluent Bit)
//! reads the JSON lines from stdout.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Marks the subscriber as installed for the lifetime of the guard.
#[derive(Debug)]
pub struct TracingGuard {
    service_name: String,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        tracing::debug!(service = %self.service_name, "Tracing guard released");
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
///
/// `TelemetryError::TracerInit` for an invalid filter or when a global
/// subscriber is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    // JSON output for containers
    let json_layer = (config.console_output && config.json_logs).then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    // Pretty output for development
    let pretty_layer = (config.console_output && !config.json_logs).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        process = %config.process_name,
        json_logs = config.json_logs,
        "Tracing initialized"
    );

    Ok(TracingGuard {
        service_name: config.service_name.clone(),
    })
}
