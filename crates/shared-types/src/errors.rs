//! # Error Types
//!
//! Errors shared by the request plumbing.

use thiserror::Error;

/// Errors from building a request context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Some identity fields were set but not all six.
    #[error("incomplete request context, missing: {}", missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },
}

/// Errors from the authorization collaborator.
///
/// A failed authorization with a well-formed answer is not an error; it is a
/// non-200 `ResponseEnvelope`. These variants cover the call itself failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The authorization service could not be reached.
    #[error("authorization service unavailable: {0}")]
    Unavailable(String),

    /// The session token could not be evaluated.
    #[error("invalid session token: {0}")]
    InvalidToken(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_lists_missing_fields() {
        let err = ContextError::Incomplete {
            missing: vec!["actionid", "threadid"],
        };
        assert_eq!(
            err.to_string(),
            "incomplete request context, missing: actionid, threadid"
        );
    }
}
