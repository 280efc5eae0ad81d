//! Bounded retry and failure classification for backend calls.

pub mod caller;
pub mod kind;
pub mod policy;

pub use caller::{CallError, OperationResult, ResilientCaller};
pub use kind::ErrorKind;
pub use policy::RetryPolicy;
