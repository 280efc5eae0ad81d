//! Optimistic view-model state: apply locally, confirm remotely, roll back
//! on failure.

pub mod channel;
pub mod controller;
pub mod in_flight;

pub use channel::ErrorChannel;
pub use controller::{MutationRequest, OptimisticController};
pub use in_flight::{InFlightGuard, InFlightIds, InFlightSet};
