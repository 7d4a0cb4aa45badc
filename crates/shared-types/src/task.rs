//! # Task Event Types
//!
//! Wire shapes for task status changes published on the message bus.
//!
//! ```text
//! {"EventType": "TaskEvent", "Request": "{\"TaskID\":\"T1\",\"Status\":\"Completed\"}"}
//!  └─────────── Events ──────────────┘   └──────────── TaskEvent (nested JSON) ──────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type stamped on task-event envelopes.
pub const TASK_EVENT_TYPE: &str = "TaskEvent";

/// Nested payload of an [`Events`] envelope.
///
/// Publishers send a JSON string, a base64 string of JSON, or a raw byte
/// array. `as_bytes` returns the payload as sent; decoding is left to the
/// consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestPayload {
    Text(String),
    Bytes(Vec<u8>),
}

impl RequestPayload {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

/// Outer bus envelope.
///
/// Only `Request` is required; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Events {
    #[serde(rename = "IP", default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(rename = "Request")]
    pub request: RequestPayload,

    #[serde(rename = "EventType", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    #[serde(rename = "EventUniqueID", default, skip_serializing_if = "Option::is_none")]
    pub event_unique_id: Option<String>,
}

impl Events {
    /// Wrap a task event for publishing.
    ///
    /// # Errors
    ///
    /// Fails if the task event cannot be serialized.
    pub fn wrap(event: &TaskEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            ip: None,
            request: RequestPayload::Text(serde_json::to_string(event)?),
            event_type: Some(TASK_EVENT_TYPE.to_string()),
            event_unique_id: None,
        })
    }
}

/// A task's status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    #[serde(rename = "TaskID")]
    pub task_id: String,

    #[serde(rename = "Status")]
    pub status: String,

    #[serde(rename = "TaskState", default, skip_serializing_if = "Option::is_none")]
    pub task_state: Option<String>,

    #[serde(rename = "PercentComplete", default, skip_serializing_if = "Option::is_none")]
    pub percent_complete: Option<i32>,

    #[serde(rename = "EndTime", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Payload associated with the task (e.g. the originating request).
    #[serde(rename = "Payload", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl TaskEvent {
    #[must_use]
    pub fn new(task_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: status.into(),
            task_state: None,
            percent_complete: None,
            end_time: None,
            payload: None,
        }
    }
}
