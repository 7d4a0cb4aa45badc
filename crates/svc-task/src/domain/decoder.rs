//! # Event Decoder
//!
//! Turns a raw bus message into a `TaskEvent` in two steps:
//!
//! ```text
//! BusMessage ──to bytes──→ Events { Request, .. } ──Request bytes──→ TaskEvent
//!                  │                                     │
//!            DecodeError::Outer                   DecodeError::Inner
//! ```
//!
//! Structured messages are serialized first so that every bus backend goes
//! through the same byte-level parse. Malformed input yields an error, never
//! a panic and never a partially filled event.
//!
//! A `Request` string is read as JSON text first. Publishers that marshal
//! the payload as a byte slice send it base64-encoded, so a string that is
//! not JSON but is valid base64 is decoded and parsed again.

use crate::domain::errors::DecodeError;
use base64::{engine::general_purpose::STANDARD, Engine};
use shared_bus::BusMessage;
use shared_types::{Events, RequestPayload, TaskEvent};

/// Decode one bus message.
///
/// # Errors
///
/// `DecodeError::Outer` when the message is not an `Events` envelope,
/// `DecodeError::Inner` when its `Request` payload is not a `TaskEvent`.
pub fn decode(message: &BusMessage) -> Result<TaskEvent, DecodeError> {
    let bytes = message.to_bytes().map_err(DecodeError::Outer)?;
    let envelope: Events = serde_json::from_slice(&bytes).map_err(DecodeError::Outer)?;
    decode_request(&envelope.request)
}

fn decode_request(request: &RequestPayload) -> Result<TaskEvent, DecodeError> {
    match serde_json::from_slice(request.as_bytes()) {
        Ok(event) => Ok(event),
        Err(e) => match request {
            RequestPayload::Text(text) => match STANDARD.decode(text.trim()) {
                Ok(raw) => serde_json::from_slice(&raw).map_err(DecodeError::Inner),
                Err(_) => Err(DecodeError::Inner(e)),
            },
            RequestPayload::Bytes(_) => Err(DecodeError::Inner(e)),
        },
    }
}
