//! # Response Envelope
//!
//! Uniform output shape returned by every RPC-style operation, plus the
//! rewrite step that turns it into the wire response.
//!
//! ## Header precedence
//!
//! The standard headers are applied first, caller headers second, so a caller
//! header always wins on key collision.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Header name → value.
pub type HeaderMap = HashMap<String, String>;

/// Headers present on every response.
pub const STANDARD_HEADERS: [(&str, &str); 7] = [
    ("Connection", "keep-alive"),
    ("OData-Version", "4.0"),
    ("X-Frame-Options", "sameorigin"),
    ("X-Content-Type-Options", "nosniff"),
    ("Content-type", "application/json; charset=utf-8"),
    ("Cache-Control", "no-cache, no-store, must-revalidate"),
    ("Transfer-Encoding", "chunked"),
];

/// Machine-readable status messages (Redfish Base registry ids).
pub mod status_message {
    pub const SUCCESS: &str = "Base.1.13.0.Success";
    pub const NO_VALID_SESSION: &str = "Base.1.13.0.NoValidSession";
    pub const INTERNAL_ERROR: &str = "Base.1.13.0.InternalError";
    pub const MALFORMED_JSON: &str = "Base.1.13.0.MalformedJSON";
    pub const GENERAL_ERROR: &str = "Base.1.13.0.GeneralError";
    pub const INSUFFICIENT_PRIVILEGE: &str = "Base.1.13.0.InsufficientPrivilege";
}

/// HTTP status codes used by the canned responses.
pub mod status_code {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const UNAUTHORIZED: u16 = 401;
    pub const FORBIDDEN: u16 = 403;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
}

const GENERAL_ERROR_MESSAGE: &str =
    "An error has occurred. See ExtendedInfo for more information.";
const MESSAGE_ODATA_TYPE: &str = "#Message.v1_1_2.Message";

/// The standard header set.
#[must_use]
pub fn standard_headers() -> HeaderMap {
    STANDARD_HEADERS
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Apply the standard headers, overwriting any existing values for those keys.
pub fn set_standard_headers(headers: &mut HeaderMap) {
    for (key, value) in STANDARD_HEADERS {
        headers.insert(key.to_string(), value.to_string());
    }
}

/// Apply the standard headers, then the caller's headers on top.
pub fn set_response_headers(headers: &mut HeaderMap, params: &HeaderMap) {
    set_standard_headers(headers);
    for (key, value) in params {
        headers.insert(key.clone(), value.clone());
    }
}

/// Response body before it crosses the external boundary.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    /// Already serialized; passed through untouched.
    Bytes(Vec<u8>),
    /// Pending serialization.
    Value(Value),
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Internal result of an RPC operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub header: HeaderMap,
    pub status_code: u16,
    pub status_message: String,
    pub body: ResponseBody,
}

impl ResponseEnvelope {
    /// Envelope with the standard headers.
    #[must_use]
    pub fn new(
        status_code: u16,
        status_message: impl Into<String>,
        body: impl Into<ResponseBody>,
    ) -> Self {
        Self {
            header: standard_headers(),
            status_code,
            status_message: status_message.into(),
            body: body.into(),
        }
    }

    /// 200 with the given body.
    #[must_use]
    pub fn success(body: impl Into<ResponseBody>) -> Self {
        Self::new(status_code::OK, status_message::SUCCESS, body)
    }

    /// Redfish general error with one extended-info message.
    #[must_use]
    pub fn general_error(status_code: u16, status_message: &str, error_message: &str) -> Self {
        let body = json!({
            "error": {
                "code": status_message::GENERAL_ERROR,
                "message": GENERAL_ERROR_MESSAGE,
                "@Message.ExtendedInfo": [{
                    "@odata.type": MESSAGE_ODATA_TYPE,
                    "MessageId": status_message,
                    "Message": error_message,
                }],
            }
        });
        Self::new(status_code, status_message, body)
    }

    /// 401: no valid session was found.
    #[must_use]
    pub fn invalid_session(error_message: &str) -> Self {
        Self::general_error(
            status_code::UNAUTHORIZED,
            status_message::NO_VALID_SESSION,
            error_message,
        )
    }

    /// 500: a downstream call failed.
    #[must_use]
    pub fn failed_dependency_call(error_message: &str) -> Self {
        Self::general_error(
            status_code::INTERNAL_SERVER_ERROR,
            status_message::INTERNAL_ERROR,
            error_message,
        )
    }

    /// 400: the request body was malformed.
    #[must_use]
    pub fn malformed_request(error_message: &str) -> Self {
        Self::general_error(
            status_code::BAD_REQUEST,
            status_message::MALFORMED_JSON,
            error_message,
        )
    }

    /// Derive an envelope with extra headers applied on top of the current ones.
    #[must_use]
    pub fn with_headers(mut self, params: &HeaderMap) -> Self {
        set_response_headers(&mut self.header, params);
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code == status_code::OK
    }
}

/// Wire response: body is always bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub header: HeaderMap,
    pub status_code: i32,
    pub status_message: String,
    pub body: Vec<u8>,
}

/// Convert an envelope into the wire response using JSON serialization.
#[must_use]
pub fn rewrite(source: ResponseEnvelope) -> RpcResponse {
    rewrite_with(source, |value| serde_json::to_vec(value))
}

/// Convert an envelope into the wire response with a custom encoder.
///
/// Byte bodies are passed through without calling `encode`. An encoder
/// failure is logged and produces an empty body.
pub fn rewrite_with<E>(source: ResponseEnvelope, encode: E) -> RpcResponse
where
    E: FnOnce(&Value) -> Result<Vec<u8>, serde_json::Error>,
{
    let body = match source.body {
        ResponseBody::Empty => Vec::new(),
        ResponseBody::Bytes(bytes) => bytes,
        ResponseBody::Value(value) => encode(&value).unwrap_or_else(|e| {
            tracing::error!(
                status_code = source.status_code,
                error = %e,
                "Failed to serialize response body"
            );
            Vec::new()
        }),
    };

    RpcResponse {
        header: source.header,
        status_code: i32::from(source.status_code),
        status_message: source.status_message,
        body,
    }
}
