//! Error types for the task service.

use shared_bus::BusError;
use shared_types::TaskEvent;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Decode step at which a bus message was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropStage {
    /// The outer `Events` envelope.
    Outer,
    /// The nested `Request` payload.
    Inner,
}

impl DropStage {
    /// Label value used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Outer => "outer",
            Self::Inner => "inner",
        }
    }
}

impl fmt::Display for DropStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bus message that could not be turned into a `TaskEvent`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed task event envelope: {0}")]
    Outer(#[source] serde_json::Error),

    #[error("malformed task event in Request payload: {0}")]
    Inner(#[source] serde_json::Error),
}

impl DecodeError {
    #[must_use]
    pub fn stage(&self) -> DropStage {
        match self {
            Self::Outer(_) => DropStage::Outer,
            Self::Inner(_) => DropStage::Inner,
        }
    }
}

/// The dispatch queue cannot accept events anymore.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Every receiver is gone; the event is handed back.
    #[error("dispatch queue closed, task {} not delivered", .0.task_id)]
    Closed(TaskEvent),
}

/// Subscription setup failures. Never retried here.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("topic name is empty")]
    EmptyTopic,

    #[error("unable to subscribe to '{topic}': {source}")]
    Bus {
        topic: String,
        #[source]
        source: BusError,
    },
}

/// Failure reported by a task processor.
#[derive(Debug, Error)]
#[error("task event processing failed: {0}")]
pub struct ProcessError(pub String);

/// Service configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
