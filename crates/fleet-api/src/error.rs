//! Error taxonomy for API calls
//!
//! Every failed call is normalized into an `ApiError` with one of four codes,
//! or the code the backend put in its error body:
//! - `SERVER_ERROR`: a response arrived with a non-2xx status
//! - `NETWORK_ERROR`: the request went out but no response came back
//! - `UNKNOWN_ERROR`: the call failed on the client side before or after dispatch
//! - `AUTH_REFRESH_FAILED`: the session could not be recovered after a 401

use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors constructing an `ApiClient`.
///
/// Per-call failures never use this type; they are `ApiError` values inside
/// a `ResponseEnvelope`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP client setup failed: {0}")]
    Http(String),
}

/// Result alias for client construction.
pub type Result<T> = std::result::Result<T, Error>;

/// Normalized error code, serialized as its wire string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    ServerError,
    NetworkError,
    UnknownError,
    AuthRefreshFailed,
    /// Code supplied by the backend in its error body
    Remote(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::AuthRefreshFailed => "AUTH_REFRESH_FAILED",
            ErrorCode::Remote(code) => code,
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "SERVER_ERROR" => ErrorCode::ServerError,
            "NETWORK_ERROR" => ErrorCode::NetworkError,
            "UNKNOWN_ERROR" => ErrorCode::UnknownError,
            "AUTH_REFRESH_FAILED" => ErrorCode::AuthRefreshFailed,
            _ => ErrorCode::Remote(code),
        }
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Remote(code) => code,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call, in the shape the dashboard renders inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            status: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnknownError, message)
    }

    /// Wrap the failure of a refresh attempt.
    ///
    /// The cause is kept in `details` and its status (if any) is carried over.
    pub fn refresh_failed(cause: ApiError) -> Self {
        let status = cause.status;
        let details = serde_json::to_value(&cause).ok();
        Self {
            code: ErrorCode::AuthRefreshFailed,
            message: format!("session expired and could not be refreshed: {}", cause.message),
            details,
            status,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Whether the backend rejected the access token (HTTP 401).
    pub fn is_auth_denied(&self) -> bool {
        self.status == Some(StatusCode::UNAUTHORIZED.as_u16())
            && self.code != ErrorCode::AuthRefreshFailed
    }

    /// Classify a non-2xx response.
    ///
    /// Understands `{"code","message"}`, `{"error":{"code","message"}}`,
    /// `{"error":"..."}` and `{"detail":"..."}` bodies. Anything unparsable
    /// falls back to `SERVER_ERROR` with the status reason as message. The
    /// parsed body (or raw text) is kept in `details`.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let parsed: Option<Value> = serde_json::from_slice(body).ok();

        let source = parsed
            .as_ref()
            .map(|v| v.get("error").filter(|e| e.is_object()).unwrap_or(v));

        let code = source
            .and_then(|v| str_field(v, "code"))
            .map(|c| ErrorCode::from(c.to_owned()))
            .unwrap_or(ErrorCode::ServerError);

        let message = source
            .and_then(|v| str_field(v, "message").or_else(|| str_field(v, "detail")))
            .or_else(|| parsed.as_ref().and_then(|v| str_field(v, "error")))
            .map(str::to_owned)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("server returned {status}"))
            });

        let details = parsed.or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_owned();
            (!text.is_empty()).then_some(Value::String(text))
        });

        Self {
            code,
            message,
            details,
            status: Some(status.as_u16()),
        }
    }

    /// Classify a failure from `reqwest::RequestBuilder::send`.
    ///
    /// Builder errors never left the process and are `UNKNOWN_ERROR`.
    /// Everything else is a request without a response.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::unknown(format!("building request: {err}"));
        }
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            format!("no response received: {err}")
        };
        Self::network(message)
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}
