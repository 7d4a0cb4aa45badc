//! Default task processor.

use crate::domain::ProcessError;
use crate::ports::TaskEventProcessor;
use async_trait::async_trait;
use shared_types::TaskEvent;
use tracing::info;

/// Logs each task event. Used until a task-state store is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProcessor;

#[async_trait]
impl TaskEventProcessor for LoggingProcessor {
    async fn process(&self, event: TaskEvent) -> Result<(), ProcessError> {
        info!(
            task_id = %event.task_id,
            status = %event.status,
            task_state = event.task_state.as_deref().unwrap_or_default(),
            percent_complete = event.percent_complete,
            "Task event received"
        );
        Ok(())
    }
}
