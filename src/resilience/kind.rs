use crate::remote::RemoteError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable classification of a failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    NotFound,
    EncodingError,
    GenericRestError,
    NetworkError,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::BadRequest,
        ErrorKind::Unauthorized,
        ErrorKind::NotFound,
        ErrorKind::EncodingError,
        ErrorKind::GenericRestError,
        ErrorKind::NetworkError,
        ErrorKind::Timeout,
        ErrorKind::Unknown,
    ];

    /// Transient kinds may succeed on a later attempt; semantic rejections never do.
    pub fn is_retryable(self) -> bool {
        match self {
            ErrorKind::BadRequest
            | ErrorKind::Unauthorized
            | ErrorKind::NotFound
            | ErrorKind::EncodingError => false,
            ErrorKind::GenericRestError
            | ErrorKind::NetworkError
            | ErrorKind::Timeout
            | ErrorKind::Unknown => true,
        }
    }
}

impl From<&RemoteError> for ErrorKind {
    fn from(err: &RemoteError) -> Self {
        match err {
            RemoteError::BadRequest(_) => ErrorKind::BadRequest,
            RemoteError::Unauthorized(_) => ErrorKind::Unauthorized,
            RemoteError::NotFound(_) => ErrorKind::NotFound,
            RemoteError::Encoding(_) => ErrorKind::EncodingError,
            RemoteError::Rest { .. } => ErrorKind::GenericRestError,
            RemoteError::Network(_) => ErrorKind::NetworkError,
            RemoteError::Timeout(_) => ErrorKind::Timeout,
            RemoteError::Other(_) => ErrorKind::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::EncodingError => "encoding_error",
            Self::GenericRestError => "generic_rest_error",
            Self::NetworkError => "network_error",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}
