//! # Task Service (svc-task)
//!
//! Consumes task-status events from the message bus and hands them to task
//! workers.
//!
//! ## Pipeline
//!
//! ```text
//! Message bus ──accept──→ TaskEventConsumer ──decode──→ DispatchQueue ──→ workers
//!  (topic)                 (bus callback task)    │      (bounded FIFO)    (TaskEventProcessor)
//!                                                 └──Err──→ log + DropObserver
//! ```
//!
//! ## Guarantees
//!
//! | Property | Where |
//! |----------|-------|
//! | One subscription per topic | `subscription::SubscriptionManager::subscribe` |
//! | Malformed messages dropped, never panicking | `domain::decoder::decode` |
//! | Full queue waits, never drops | `domain::dispatch::DispatchSender::send` |
//! | Arrival order for a single worker | `domain::dispatch` (FIFO) |
//!
//! ## Outbound Dependencies
//!
//! | Port | Purpose |
//! |------|---------|
//! | `TaskEventProcessor` | Task-state handling behind the queue |
//! | `DropObserver` | Accounting for rejected bus messages |
//! | `shared_bus::CommunicatorFactory` | Bus client construction |

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod subscription;
pub mod worker;

pub use adapters::{factory_for, LoggingProcessor, MetricsDropObserver, NoopDropObserver, TaskEventConsumer};
pub use config::{ServiceConfig, SharedConfig};
pub use domain::{
    bounded, decode, ConfigError, DecodeError, DispatchError, DispatchReceiver, DispatchSender,
    DropStage, ProcessError, SubscribeError,
};
pub use ports::{DropObserver, TaskEventProcessor};
pub use subscription::SubscriptionManager;
pub use worker::{run_worker, spawn_workers};

/// Thread name this service stamps on request contexts.
pub const SERVICE_NAME: &str = shared_types::context::service::TASK_SERVICE;
