//! # Communicator
//!
//! The seam between services and a concrete message bus client.
//!
//! ```text
//! CommunicatorFactory ──communicator(type, config, topic)──→ Communicator
//!                                                               │
//!                               accept(handler) ────────────────┤
//!                                    │                          │
//!                             AcceptHandle            distribute(message)
//! ```
//!
//! The bus client owns the task that calls `MessageHandler::handle`, once per
//! message and in arrival order. A handler that takes long to return slows
//! delivery for its subscription; it never causes messages to be dropped.

use crate::message::{BusMessage, MessageBusType};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors from bus setup and delivery.
#[derive(Debug, Error)]
pub enum BusError {
    /// The factory cannot build a client for this backend.
    #[error("unsupported message bus type: {0}")]
    UnsupportedBusType(MessageBusType),

    /// The backend configuration file is missing or unreadable.
    #[error("message bus configuration {path} unavailable: {reason}")]
    Config { path: PathBuf, reason: String },

    /// The client could not connect or register.
    #[error("connection to topic '{topic}' failed: {reason}")]
    Connection { topic: String, reason: String },

    /// The communicator was closed.
    #[error("communicator for topic '{0}' is closed")]
    Closed(String),
}

/// Callback invoked by the bus client for each inbound message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: BusMessage);
}

/// A connection to a single topic.
#[async_trait]
pub trait Communicator: Send + Sync {
    /// Topic this communicator is bound to.
    fn topic(&self) -> &str;

    /// Register `handler` for every message on the topic.
    ///
    /// Delivery continues until the returned handle is dropped or the
    /// communicator is closed.
    async fn accept(&self, handler: Arc<dyn MessageHandler>) -> Result<AcceptHandle, BusError>;

    /// Publish a message to every registered handler of the topic.
    ///
    /// Returns the number of subscriptions that received it.
    async fn distribute(&self, message: BusMessage) -> Result<usize, BusError>;

    /// Stop delivery and refuse further publishing.
    async fn close(&self);
}

/// Builds communicators from the bus settings.
pub trait CommunicatorFactory: Send + Sync {
    /// Open a communicator for `topic` on the given backend.
    ///
    /// # Errors
    ///
    /// `BusError` when the backend is unsupported or the connection fails.
    fn communicator(
        &self,
        bus_type: MessageBusType,
        config_path: &Path,
        topic: &str,
    ) -> Result<Arc<dyn Communicator>, BusError>;
}

type Release = Box<dyn FnOnce() + Send + Sync>;

/// Keeps a registered handler alive.
///
/// When dropped, the registration is released. Messages already queued for
/// the handler are still delivered before its task ends.
pub struct AcceptHandle {
    topic: String,
    task: Option<JoinHandle<()>>,
    release: Option<Release>,
}

impl AcceptHandle {
    /// Wrap the delivery task of a registration.
    ///
    /// `release` runs exactly once, on `shutdown` or drop.
    pub fn new(
        topic: impl Into<String>,
        task: JoinHandle<()>,
        release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            topic: topic.into(),
            task: Some(task),
            release: Some(Box::new(release)),
        }
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether the delivery task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Release the registration and wait for queued messages to be handled.
    pub async fn shutdown(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(topic = %self.topic, error = %e, "Delivery task ended abnormally");
            }
        }
    }
}

impl Drop for AcceptHandle {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        tracing::debug!(topic = %self.topic, "Accept handle dropped");
    }
}

impl std::fmt::Debug for AcceptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptHandle")
            .field("topic", &self.topic)
            .field("finished", &self.is_finished())
            .finish()
    }
}
