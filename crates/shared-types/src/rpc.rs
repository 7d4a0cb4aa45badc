//! # RPC Authorization Gate
//!
//! Every RPC handler follows the same shape:
//!
//! ```text
//! inbound metadata → RequestContext → authorize(token, privileges)
//!                                          │
//!                      non-200 / error ────┤──── 200
//!                              │           │
//!                      auth envelope    connector call ──Err──→ 500 envelope
//!                              │           │
//!                              └──────→ rewrite() → RpcResponse
//! ```
//!
//! Failures are encoded in the envelope's status fields; the handler itself
//! always returns a response.

use crate::context::RequestContext;
use crate::errors::AuthError;
use crate::response::ResponseEnvelope;
use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use tracing::Instrument;

/// Redfish privilege names.
pub mod privilege {
    pub const LOGIN: &str = "Login";
    pub const CONFIGURE_MANAGER: &str = "ConfigureManager";
    pub const CONFIGURE_USERS: &str = "ConfigureUsers";
    pub const CONFIGURE_SELF: &str = "ConfigureSelf";
    pub const CONFIGURE_COMPONENTS: &str = "ConfigureComponents";
}

/// Session authorization collaborator.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Check that `session_token` holds the given privileges.
    ///
    /// Returns a 200 envelope when authorized and a failure envelope
    /// (typically 401 or 403) otherwise.
    async fn authorize(
        &self,
        session_token: &str,
        privileges: &[&str],
        oem_privileges: &[&str],
    ) -> Result<ResponseEnvelope, AuthError>;
}

/// Authorize the session, then run `call`.
///
/// - authorizer error → 401 `InvalidSession`
/// - non-200 authorizer answer → that answer, unchanged
/// - `call` error → 500 `FailedDependencyCall` carrying the error text
pub async fn authorized<A, F, Fut, E>(
    ctx: &RequestContext,
    authorizer: &A,
    session_token: &str,
    privileges: &[&str],
    call: F,
) -> ResponseEnvelope
where
    A: Authorizer + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<ResponseEnvelope, E>>,
    E: Display,
{
    let span = ctx.span("authorized_call");
    async move {
        let auth = match authorizer.authorize(session_token, privileges, &[]).await {
            Ok(auth) => auth,
            Err(e) => {
                tracing::error!(error = %e, "Error while authorizing the session token");
                return ResponseEnvelope::invalid_session(&e.to_string());
            }
        };

        if !auth.is_success() {
            tracing::debug!(
                status_code = auth.status_code,
                status_message = %auth.status_message,
                "Session not authorized"
            );
            return auth;
        }

        match call().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(error = %e, "Dependency call failed");
                ResponseEnvelope::failed_dependency_call(&e.to_string())
            }
        }
    }
    .instrument(span)
    .await
}
