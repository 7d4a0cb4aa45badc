//! # Bus Client Selection
//!
//! Picks the `CommunicatorFactory` for the configured backend.
//!
//! | `MessageBusType` | Factory |
//! |------------------|---------|
//! | `InMemory` | `InMemoryMessageBus` (in-process, nothing external publishes to it) |
//! | `Kafka` | not linked in this build |
//! | `RedisStreams` | not linked in this build |
//!
//! External clients implement `CommunicatorFactory` and get a match arm here.

use shared_bus::{BusError, CommunicatorFactory, InMemoryMessageBus, MessageBusType};
use std::sync::Arc;

/// Factory for `bus_type`.
///
/// # Errors
///
/// `BusError::UnsupportedBusType` when no client for the backend is linked.
pub fn factory_for(bus_type: MessageBusType) -> Result<Arc<dyn CommunicatorFactory>, BusError> {
    match bus_type {
        MessageBusType::InMemory => Ok(Arc::new(InMemoryMessageBus::new())),
        MessageBusType::Kafka | MessageBusType::RedisStreams => {
            Err(BusError::UnsupportedBusType(bus_type))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_in_memory_factory_opens_communicators() {
        let factory = factory_for(MessageBusType::InMemory).unwrap();
        let communicator = factory
            .communicator(MessageBusType::InMemory, Path::new("unused"), "t")
            .unwrap();
        assert_eq!(communicator.topic(), "t");
    }

    #[test]
    fn test_external_backends_are_not_linked() {
        for bus_type in [MessageBusType::Kafka, MessageBusType::RedisStreams] {
            assert!(matches!(
                factory_for(bus_type),
                Err(BusError::UnsupportedBusType(t)) if t == bus_type
            ));
        }
    }
}
