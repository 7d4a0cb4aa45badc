//! # Shared Types Crate
//!
//! Types that cross service boundaries in ODIM.
//!
//! ## Modules
//!
//! - **context**: `RequestContext`, the six-field request identity, and its
//!   translation to and from transport metadata.
//! - **response**: `ResponseEnvelope`, the standard header set, canned
//!   failure responses and the `rewrite` step to the wire `RpcResponse`.
//! - **rpc**: the `Authorizer` collaborator and the `authorized` gate every
//!   RPC handler runs through.
//! - **task**: the task-event envelope published on the message bus.
//!
//! ## Design Principles
//!
//! - **Immutable contexts**: every hop derives a new `RequestContext`.
//! - **All six or none**: a context never carries a partial identity.
//! - **Failures are responses**: recoverable errors become a well-shaped
//!   envelope instead of a transport error.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod context;
pub mod errors;
pub mod response;
pub mod rpc;
pub mod task;

pub use context::{Metadata, RequestContext, RequestContextBuilder, RequestIdentity};
pub use errors::{AuthError, ContextError};
pub use response::{
    rewrite, rewrite_with, set_response_headers, set_standard_headers, standard_headers,
    HeaderMap, ResponseBody, ResponseEnvelope, RpcResponse, STANDARD_HEADERS,
};
pub use rpc::{authorized, Authorizer};
pub use task::{Events, RequestPayload, TaskEvent};
