//! # ODIM Telemetry
//!
//! Logging and metrics for ODIM services.
//!
//! ## Components
//!
//! - **Logs**: a global `tracing` subscriber writing JSON lines (containers)
//!   or pretty output (development) to stdout
//! - **Metrics**: Prometheus counters for the task-event pipeline, rendered
//!   through [`MetricsHandle::gather_text`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use odim_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::for_service("svc-task"))?;
//!     // Logs and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ODIM_SERVICE_NAME` | `odimra` | Service name in logs |
//! | `POD_NAME` | service name | Process name |
//! | `ODIM_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `ODIM_JSON_LOGS` | `true` in Kubernetes | JSON log lines |
//! | `ODIM_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod metrics;
mod tracing_setup;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use metrics::{
    register_metrics, HistogramTimer, MetricsHandle, REGISTRY, TASK_DISPATCH_WAIT,
    TASK_EVENTS_DISPATCHED, TASK_EVENTS_DROPPED, TASK_EVENTS_PROCESSED, TASK_EVENTS_RECEIVED,
    TASK_SUBSCRIPTIONS_ACTIVE,
};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
///
/// # Errors
///
/// `TelemetryError` when the log filter is invalid, a subscriber is already
/// installed, or metric registration fails.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so early log lines can already be counted
    let metrics = register_metrics()?;
    let tracing = tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard {
        _tracing: tracing,
        metrics,
        config,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    metrics: MetricsHandle,
    config: TelemetryConfig,
}

impl TelemetryGuard {
    #[must_use]
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    #[must_use]
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.config.service_name, "Shutting down telemetry...");
    }
}
