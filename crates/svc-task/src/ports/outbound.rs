//! Outbound (Driven) ports for the task service.
//!
//! These traits define what the service hands work and diagnostics to.

use crate::domain::{DecodeError, DropStage, ProcessError};
use async_trait::async_trait;
use shared_types::TaskEvent;

/// Task-state processing behind the dispatch queue.
///
/// Implementations update task records, notify clients and so on; the
/// service only guarantees each event is handed to exactly one processor
/// call.
#[async_trait]
pub trait TaskEventProcessor: Send + Sync {
    /// Handle one task event.
    ///
    /// # Errors
    ///
    /// A `ProcessError` is logged by the worker; the event is not retried.
    async fn process(&self, event: TaskEvent) -> Result<(), ProcessError>;
}

/// Notified for every bus message the decoder rejects.
///
/// Called on the bus callback task, so implementations must not block.
pub trait DropObserver: Send + Sync {
    fn on_drop(&self, stage: DropStage, error: &DecodeError);
}
