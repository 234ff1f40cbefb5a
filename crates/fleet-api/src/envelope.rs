//! Uniform response envelope

use serde::Serialize;

use crate::error::{ApiError, ErrorCode};

/// What every API call resolves to.
///
/// Constructed only through `ok`, `local` and `failure`, so a successful
/// envelope always carries data and a failed one always carries an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

impl<T> ResponseEnvelope<T> {
    /// Successful response from the backend.
    pub fn ok(data: T, status: u16) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: Some(status),
        }
    }

    /// Success produced without calling the backend.
    pub fn local(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            status: error.status,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Metric label: "success" or the error code.
    pub fn outcome(&self) -> &str {
        match &self.error {
            Some(err) => err.code.as_str(),
            None => "success",
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(err)) => Err(err),
            (None, None) => Err(ApiError::new(
                ErrorCode::UnknownError,
                "envelope carried neither data nor error",
            )),
        }
    }

    /// Transform the payload, keeping status and error untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseEnvelope<U> {
        ResponseEnvelope {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            status: self.status,
        }
    }
}

impl<T> From<Result<(u16, T), ApiError>> for ResponseEnvelope<T> {
    fn from(result: Result<(u16, T), ApiError>) -> Self {
        match result {
            Ok((status, data)) => Self::ok(data, status),
            Err(err) => Self::failure(err),
        }
    }
}
