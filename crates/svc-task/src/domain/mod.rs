//! Domain layer for the task service.
//!
//! - `decoder`: bus message to `TaskEvent`
//! - `dispatch`: the bounded queue between bus callback and workers
//! - `errors`: error types shared by all layers

pub mod decoder;
pub mod dispatch;
pub mod errors;

pub use decoder::decode;
pub use dispatch::{bounded, DispatchReceiver, DispatchSender};
pub use errors::{ConfigError, DecodeError, DispatchError, DropStage, ProcessError, SubscribeError};
