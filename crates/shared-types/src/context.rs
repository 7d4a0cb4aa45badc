//! # Request Context
//!
//! Per-request identity carried across process and transport boundaries.
//!
//! ## Boundaries
//!
//! ```text
//! inbound metadata ──from_inbound()──→ RequestContext ──to_outbound()──→ outbound metadata
//!                                            │
//!                                            └──rebase()──→ detached copy for background work
//! ```
//!
//! ## Invariants
//!
//! - The six identity fields are either all present or all absent. An absent
//!   identity is `None`, never six empty strings.
//! - A context is never mutated in place. Every hop derives a new value.

use crate::errors::ContextError;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Well-known transport metadata keys.
///
/// gRPC metadata keys are lowercase ASCII, so these are stored lowercase.
pub mod keys {
    /// Transaction identifier. Its presence decides whether a context exists.
    pub const TRANSACTION_ID: &str = "transactionid";
    /// Action identifier.
    pub const ACTION_ID: &str = "actionid";
    /// Action name.
    pub const ACTION_NAME: &str = "actionname";
    /// Thread identifier.
    pub const THREAD_ID: &str = "threadid";
    /// Thread name (the service handling the request).
    pub const THREAD_NAME: &str = "threadname";
    /// Process name (usually the pod name).
    pub const PROCESS_NAME: &str = "processname";

    /// All identity keys, in canonical order.
    pub const ALL: [&str; 6] = [
        TRANSACTION_ID,
        ACTION_ID,
        ACTION_NAME,
        THREAD_ID,
        THREAD_NAME,
        PROCESS_NAME,
    ];
}

/// Thread names stamped on the context by each service.
pub mod service {
    pub const LICENSE_SERVICE: &str = "svc-licenses";
    pub const MANAGER_SERVICE: &str = "svc-managers";
    pub const SYSTEM_SERVICE: &str = "svc-systems";
    pub const TASK_SERVICE: &str = "svc-task";
}

/// Transport metadata: key → repeated string values.
///
/// Keys are normalised to lowercase on every access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, Vec<String>>,
}

impl Metadata {
    /// Create empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all values of `key` with a single value.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .insert(key.to_ascii_lowercase(), vec![value.into()]);
    }

    /// Append a value to `key`.
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// All values of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    /// First value of `key`.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (key, value) in iter {
            metadata.append(key.as_ref(), value);
        }
        metadata
    }
}

/// The six identity fields of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity {
    pub transaction_id: String,
    pub action_id: String,
    pub action_name: String,
    pub thread_id: String,
    pub thread_name: String,
    pub process_name: String,
}

/// Immutable per-request context.
///
/// Cloning is the only way to share it; derived contexts are new values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    identity: Option<RequestIdentity>,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context with no identity and no deadline.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a context field by field.
    #[must_use]
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    /// Fresh root context for work that did not arrive with a transaction.
    ///
    /// Generates a new transaction id; the thread id of a root is `0`.
    #[must_use]
    pub fn new_root(
        action_id: impl Into<String>,
        action_name: impl Into<String>,
        thread_name: impl Into<String>,
        process_name: impl Into<String>,
    ) -> Self {
        Self {
            identity: Some(RequestIdentity {
                transaction_id: Uuid::new_v4().to_string(),
                action_id: action_id.into(),
                action_name: action_name.into(),
                thread_id: "0".to_string(),
                thread_name: thread_name.into(),
                process_name: process_name.into(),
            }),
            deadline: None,
        }
    }

    /// Build a context from inbound transport metadata.
    ///
    /// The identity is copied only when the transaction id is present and
    /// non-empty and every other identity key is present too. Anything less
    /// yields an empty context.
    #[must_use]
    pub fn from_inbound(metadata: &Metadata) -> Self {
        let Some(transaction_id) = metadata
            .first(keys::TRANSACTION_ID)
            .filter(|value| !value.is_empty())
        else {
            return Self::empty();
        };

        let builder = RequestContextBuilder {
            transaction_id: Some(transaction_id.to_string()),
            action_id: metadata.first(keys::ACTION_ID).map(str::to_owned),
            action_name: metadata.first(keys::ACTION_NAME).map(str::to_owned),
            thread_id: metadata.first(keys::THREAD_ID).map(str::to_owned),
            thread_name: metadata.first(keys::THREAD_NAME).map(str::to_owned),
            process_name: metadata.first(keys::PROCESS_NAME).map(str::to_owned),
        };

        match builder.build() {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(
                    transaction_id = %transaction_id,
                    error = %e,
                    "Dropping partial request context from inbound metadata"
                );
                Self::empty()
            }
        }
    }

    /// Export the identity as outbound metadata.
    ///
    /// An empty context exports empty metadata.
    #[must_use]
    pub fn to_outbound(&self) -> Metadata {
        let mut metadata = Metadata::new();
        if let Some(id) = &self.identity {
            metadata.insert(keys::TRANSACTION_ID, id.transaction_id.as_str());
            metadata.insert(keys::ACTION_ID, id.action_id.as_str());
            metadata.insert(keys::ACTION_NAME, id.action_name.as_str());
            metadata.insert(keys::THREAD_ID, id.thread_id.as_str());
            metadata.insert(keys::THREAD_NAME, id.thread_name.as_str());
            metadata.insert(keys::PROCESS_NAME, id.process_name.as_str());
        }
        metadata
    }

    /// Copy the identity into a context with no deadline.
    ///
    /// Used when spawning background work that outlives the request.
    #[must_use]
    pub fn rebase(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            deadline: None,
        }
    }

    /// Derive a context stamped with the handling service and process.
    ///
    /// An empty context stays empty.
    #[must_use]
    pub fn for_service(&self, thread_name: &str, process_name: &str) -> Self {
        let identity = self.identity.as_ref().map(|id| RequestIdentity {
            thread_name: thread_name.to_string(),
            process_name: process_name.to_string(),
            ..id.clone()
        });
        Self {
            identity,
            deadline: self.deadline,
        }
    }

    /// Derive a context that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self {
            identity: self.identity.clone(),
            deadline: Some(deadline),
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the deadline, if any, has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn identity(&self) -> Option<&RequestIdentity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identity.is_none()
    }

    #[must_use]
    pub fn transaction_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.transaction_id.as_str())
    }

    #[must_use]
    pub fn thread_name(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.thread_name.as_str())
    }

    #[must_use]
    pub fn process_name(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.process_name.as_str())
    }

    /// A span carrying the identity fields, for request-scoped logging.
    ///
    /// ```rust,ignore
    /// let _guard = ctx.span("update_chassis").entered();
    /// tracing::debug!(url = %req.url, "incoming chassis update request");
    /// ```
    pub fn span(&self, operation: &str) -> tracing::Span {
        match &self.identity {
            Some(id) => tracing::info_span!(
                "request",
                operation = %operation,
                transaction_id = %id.transaction_id,
                action_id = %id.action_id,
                action_name = %id.action_name,
                thread_id = %id.thread_id,
                thread_name = %id.thread_name,
                process_name = %id.process_name,
            ),
            None => tracing::info_span!("request", operation = %operation),
        }
    }
}

/// Field-by-field construction of a [`RequestContext`].
#[derive(Debug, Clone, Default)]
pub struct RequestContextBuilder {
    transaction_id: Option<String>,
    action_id: Option<String>,
    action_name: Option<String>,
    thread_id: Option<String>,
    thread_name: Option<String>,
    process_name: Option<String>,
}

impl RequestContextBuilder {
    #[must_use]
    pub fn transaction_id(mut self, value: impl Into<String>) -> Self {
        self.transaction_id = Some(value.into());
        self
    }

    #[must_use]
    pub fn action_id(mut self, value: impl Into<String>) -> Self {
        self.action_id = Some(value.into());
        self
    }

    #[must_use]
    pub fn action_name(mut self, value: impl Into<String>) -> Self {
        self.action_name = Some(value.into());
        self
    }

    #[must_use]
    pub fn thread_id(mut self, value: impl Into<String>) -> Self {
        self.thread_id = Some(value.into());
        self
    }

    #[must_use]
    pub fn thread_name(mut self, value: impl Into<String>) -> Self {
        self.thread_name = Some(value.into());
        self
    }

    #[must_use]
    pub fn process_name(mut self, value: impl Into<String>) -> Self {
        self.process_name = Some(value.into());
        self
    }

    /// Finish the context.
    ///
    /// # Errors
    ///
    /// `ContextError::Incomplete` when some, but not all, fields were set.
    pub fn build(self) -> Result<RequestContext, ContextError> {
        let fields = [
            (keys::TRANSACTION_ID, &self.transaction_id),
            (keys::ACTION_ID, &self.action_id),
            (keys::ACTION_NAME, &self.action_name),
            (keys::THREAD_ID, &self.thread_id),
            (keys::THREAD_NAME, &self.thread_name),
            (keys::PROCESS_NAME, &self.process_name),
        ];
        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| *key)
            .collect();

        if missing.len() == fields.len() {
            return Ok(RequestContext::empty());
        }

        match (
            self.transaction_id,
            self.action_id,
            self.action_name,
            self.thread_id,
            self.thread_name,
            self.process_name,
        ) {
            (
                Some(transaction_id),
                Some(action_id),
                Some(action_name),
                Some(thread_id),
                Some(thread_name),
                Some(process_name),
            ) => Ok(RequestContext {
                identity: Some(RequestIdentity {
                    transaction_id,
                    action_id,
                    action_name,
                    thread_id,
                    thread_name,
                    process_name,
                }),
                deadline: None,
            }),
            _ => Err(ContextError::Incomplete { missing }),
        }
    }
}
