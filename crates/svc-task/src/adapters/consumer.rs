//! # Task Event Consumer
//!
//! The decode-and-dispatch callback registered with the message bus.
//!
//! ```text
//! handle(message)
//!   ├── decode ──Err──→ log + DropObserver::on_drop   (message dropped)
//!   └── Ok(event) ──→ DispatchSender::send().await    (waits while full)
//! ```

use crate::domain::{decode, DispatchSender};
use crate::ports::DropObserver;
use async_trait::async_trait;
use odim_telemetry::{TASK_EVENTS_DISPATCHED, TASK_EVENTS_RECEIVED};
use shared_bus::{BusMessage, MessageHandler};
use std::sync::Arc;
use tracing::{debug, error};

/// Bus callback feeding the dispatch queue.
pub struct TaskEventConsumer {
    queue: DispatchSender,
    observer: Arc<dyn DropObserver>,
}

impl TaskEventConsumer {
    pub fn new(queue: DispatchSender, observer: Arc<dyn DropObserver>) -> Self {
        Self { queue, observer }
    }
}

#[async_trait]
impl MessageHandler for TaskEventConsumer {
    async fn handle(&self, message: BusMessage) {
        TASK_EVENTS_RECEIVED.inc();

        let event = match decode(&message) {
            Ok(event) => event,
            Err(e) => {
                error!(stage = %e.stage(), error = %e, "Error while consuming task events");
                self.observer.on_drop(e.stage(), &e);
                return;
            }
        };

        let task_id = event.task_id.clone();
        match self.queue.send(event).await {
            Ok(()) => {
                TASK_EVENTS_DISPATCHED.inc();
                debug!(task_id = %task_id, "Task event dispatched");
            }
            Err(e) => error!(task_id = %task_id, error = %e, "Task event not dispatched"),
        }
    }
}
