//! Adapters connecting the task service to the bus, metrics and logs.

pub mod bus;
pub mod consumer;
pub mod observer;
pub mod processor;

pub use bus::factory_for;
pub use consumer::TaskEventConsumer;
pub use observer::{MetricsDropObserver, NoopDropObserver};
pub use processor::LoggingProcessor;
