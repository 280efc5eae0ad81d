//! User-facing message catalog.

use crate::resilience::ErrorKind;

/// Maps failure conditions to messages in the active locale.
pub trait MessageProvider: Send + Sync {
    fn error_message(&self, kind: ErrorKind) -> String;

    fn invalid_user_id(&self) -> String;

    /// The item a mutation targets is no longer in the loaded state.
    fn entity_unavailable(&self) -> String;

    fn empty_cart(&self) -> String;
}

/// Default English catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishMessages;

impl MessageProvider for EnglishMessages {
    fn error_message(&self, kind: ErrorKind) -> String {
        let text = match kind {
            ErrorKind::BadRequest => "The request was rejected. Please check your input and try again.",
            ErrorKind::Unauthorized => "Your session has expired. Please sign in again.",
            ErrorKind::NotFound => "The requested item could not be found.",
            ErrorKind::EncodingError => "We could not read the server response. Please update the app.",
            ErrorKind::GenericRestError => "The server could not complete the request.",
            ErrorKind::NetworkError => "No connection. Please check your network and try again.",
            ErrorKind::Timeout => "The request timed out. Please try again.",
            ErrorKind::Unknown => "Something went wrong. Please try again.",
        };
        text.to_string()
    }

    fn invalid_user_id(&self) -> String {
        "Invalid user id. Please sign in again.".to_string()
    }

    fn entity_unavailable(&self) -> String {
        "This item is no longer available. Pull to refresh.".to_string()
    }

    fn empty_cart(&self) -> String {
        "Your cart is empty.".to_string()
    }
}
