//! # Task Workers
//!
//! Workers drain the dispatch queue and hand each event to the task
//! processor. With several workers the queue is shared: each event goes to
//! exactly one of them, in arrival order of `recv` calls.

use crate::domain::DispatchReceiver;
use crate::ports::TaskEventProcessor;
use odim_telemetry::TASK_EVENTS_PROCESSED;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Process events until the queue is closed and empty.
///
/// Returns the number of events this worker handled.
pub async fn run_worker(
    id: usize,
    queue: Arc<DispatchReceiver>,
    processor: Arc<dyn TaskEventProcessor>,
) -> u64 {
    debug!(worker = id, "Task worker started");
    let mut handled = 0;

    while let Some(event) = queue.recv().await {
        let task_id = event.task_id.clone();
        match processor.process(event).await {
            Ok(()) => TASK_EVENTS_PROCESSED.with_label_values(&["ok"]).inc(),
            Err(e) => {
                TASK_EVENTS_PROCESSED.with_label_values(&["error"]).inc();
                warn!(worker = id, task_id = %task_id, error = %e, "Task event processing failed");
            }
        }
        handled += 1;
    }

    info!(worker = id, handled, "Task worker stopped");
    handled
}

/// Spawn `count` workers sharing one queue.
#[must_use]
pub fn spawn_workers(
    count: usize,
    queue: Arc<DispatchReceiver>,
    processor: Arc<dyn TaskEventProcessor>,
) -> Vec<JoinHandle<u64>> {
    (0..count.max(1))
        .map(|id| tokio::spawn(run_worker(id, Arc::clone(&queue), Arc::clone(&processor))))
        .collect()
}
