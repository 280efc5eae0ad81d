//! Failures raised by backend interfaces.
//!
//! These mirror the exception families a hosted backend SDK throws. They are
//! classified into an `ErrorKind` by the resilience layer, never shown raw.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("response encoding error: {0}")]
    Encoding(String),

    #[error("rest error {status}: {message}")]
    Rest { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("unexpected backend error: {0}")]
    Other(String),
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Encoding(err.to_string())
    }
}
