//! # Shared Bus - Message Bus Access for ODIM Services
//!
//! Services never talk to Kafka or Redis Streams directly. They ask a
//! `CommunicatorFactory` for a `Communicator` bound to one topic, then
//! `accept` a handler or `distribute` messages on it.
//!
//! ```text
//! ┌──────────────┐  distribute()  ┌──────────────┐  handle()   ┌──────────────┐
//! │  Publisher   │ ─────────────→ │ Communicator │ ──────────→ │   Handler    │
//! │  (any svc)   │                │  (per topic) │  in order   │  (svc-task)  │
//! └──────────────┘                └──────────────┘             └──────────────┘
//! ```
//!
//! ## Delivery Guarantees
//!
//! - One delivery task per accepted handler, messages handled in order.
//! - A slow handler applies backpressure to `distribute`; nothing is dropped
//!   inside the bus client.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod communicator;
pub mod memory;
pub mod message;

// Re-export main types
pub use communicator::{AcceptHandle, BusError, Communicator, CommunicatorFactory, MessageHandler};
pub use memory::{InMemoryCommunicator, InMemoryMessageBus};
pub use message::{BusMessage, MessageBusType, ParseBusTypeError};

/// Messages buffered per subscription before `distribute` waits.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
