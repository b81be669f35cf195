//! Error types for the conversion client.
//!
//! # Design
//! Every failure surfaces as one `ConvertError`, whether it was caught by
//! local validation before any I/O or reported by the remote service. Callers
//! branch on `ConvertError::kind()` instead of matching transport details.
//!
//! `translate` is the single place where a non-success HTTP response becomes
//! an error value. A body that parses as an `ErrorResponse` becomes a
//! `ServiceError`; anything else keeps the raw status and body in a
//! `TransportError` so no diagnostic information is lost.

use thiserror::Error;

use crate::response::ErrorResponse;

/// Coarse classification of a `ConvertError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    ServiceError,
    TransportError,
    MalformedResponse,
}

/// Errors returned by `ConversionClient` operations.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A required argument was missing or blank. Raised before any network call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The service answered with a non-success status and a structured error body.
    #[error("service error {status}: {message}")]
    ServiceError { status: u16, message: String },

    /// The exchange failed, or the service answered with a body that is not
    /// a structured error. `status` is `None` when no response was received.
    #[error("transport error{}: {body}", status_suffix(.status))]
    TransportError { status: Option<u16>, body: String },

    /// A success response whose body did not match the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ConvertError::ServiceError { .. } => ErrorKind::ServiceError,
            ConvertError::TransportError { .. } => ErrorKind::TransportError,
            ConvertError::MalformedResponse(_) => ErrorKind::MalformedResponse,
        }
    }

    /// HTTP status attached to the error, if the service responded at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ConvertError::ServiceError { status, .. } => Some(*status),
            ConvertError::TransportError { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        ConvertError::InvalidArgument(what.into())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {s}")).unwrap_or_default()
}

/// Turn a non-success response into a structured error.
///
/// The HTTP status is authoritative; a `code` inside the body is ignored.
pub fn translate(status: u16, body: &str) -> ConvertError {
    match serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(ErrorResponse::into_message)
    {
        Some(message) => ConvertError::ServiceError { status, message },
        None => ConvertError::TransportError {
            status: Some(status),
            body: body.to_string(),
        },
    }
}
