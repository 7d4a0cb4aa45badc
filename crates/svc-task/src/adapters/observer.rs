//! Drop observers.

use crate::domain::{DecodeError, DropStage};
use crate::ports::DropObserver;
use odim_telemetry::TASK_EVENTS_DROPPED;

/// Ignores drops. The consumer logs them regardless.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDropObserver;

impl DropObserver for NoopDropObserver {
    fn on_drop(&self, _stage: DropStage, _error: &DecodeError) {}
}

/// Counts drops in `odim_task_events_dropped_total{stage}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsDropObserver;

impl DropObserver for MetricsDropObserver {
    fn on_drop(&self, stage: DropStage, _error: &DecodeError) {
        TASK_EVENTS_DROPPED.with_label_values(&[stage.as_str()]).inc();
    }
}
