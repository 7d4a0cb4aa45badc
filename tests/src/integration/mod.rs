//! Cross-crate integration flows.

pub mod request_flow;
pub mod task_events;
