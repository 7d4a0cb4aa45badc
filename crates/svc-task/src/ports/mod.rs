//! Ports layer for the task service.
//!
//! Inbound messages arrive through `shared_bus::MessageHandler`; only the
//! outbound (driven) ports are defined here.

pub mod outbound;

pub use outbound::*;
