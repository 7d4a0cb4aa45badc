//! Prometheus metrics for the task-event pipeline.
//!
//! All metrics follow the naming convention: `odim_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: events received, dispatched, dropped and processed
//! - **Gauge**: live bus subscriptions
//! - **Histogram**: time spent waiting on a full dispatch queue

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};
use std::time::Instant;

use crate::TelemetryError;

lazy_static! {
    /// Crate-level metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Raw messages handed over by the bus client
    pub static ref TASK_EVENTS_RECEIVED: IntCounter = IntCounter::new(
        "odim_task_events_received_total",
        "Total task-event messages received from the message bus"
    ).expect("metric creation failed");

    /// Decoded events placed on the dispatch queue
    pub static ref TASK_EVENTS_DISPATCHED: IntCounter = IntCounter::new(
        "odim_task_events_dispatched_total",
        "Total task events placed on the dispatch queue"
    ).expect("metric creation failed");

    /// Messages dropped because they could not be decoded
    pub static ref TASK_EVENTS_DROPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("odim_task_events_dropped_total", "Task-event messages dropped by decode stage"),
        &["stage"]  // stage: outer/inner
    ).expect("metric creation failed");

    /// Events handed to a task processor by a worker
    pub static ref TASK_EVENTS_PROCESSED: IntCounterVec = IntCounterVec::new(
        Opts::new("odim_task_events_processed_total", "Task events handled by workers"),
        &["outcome"]  // outcome: ok/error
    ).expect("metric creation failed");

    /// Live bus subscriptions held by the service
    pub static ref TASK_SUBSCRIPTIONS_ACTIVE: IntGauge = IntGauge::new(
        "odim_task_subscriptions_active",
        "Number of active task-event bus subscriptions"
    ).expect("metric creation failed");

    /// Time a bus callback waited for room on the dispatch queue
    pub static ref TASK_DISPATCH_WAIT: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "odim_task_dispatch_wait_seconds",
            "Time spent waiting for room on the dispatch queue"
        ).buckets(exponential_buckets(0.0001, 2.0, 15).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Read access to the registered metrics.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    registry: Registry,
}

impl MetricsHandle {
    /// Render every registered metric in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// `TelemetryError::MetricsInit` if encoding fails.
    pub fn gather_text(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

/// Register all metrics with the crate registry.
///
/// Safe to call more than once.
///
/// # Errors
///
/// `TelemetryError::MetricsInit` if a collector is rejected for a reason
/// other than being registered already.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(TASK_EVENTS_RECEIVED.clone()),
        Box::new(TASK_EVENTS_DISPATCHED.clone()),
        Box::new(TASK_EVENTS_DROPPED.clone()),
        Box::new(TASK_EVENTS_PROCESSED.clone()),
        Box::new(TASK_SUBSCRIPTIONS_ACTIVE.clone()),
        Box::new(TASK_DISPATCH_WAIT.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: REGISTRY.clone(),
    })
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    #[must_use]
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
