// ============================================================================
// Storefront client core
// ============================================================================

pub mod app;
pub mod config;
pub mod core;
pub mod enrich;
pub mod messages;
pub mod optimistic;
pub mod remote;
pub mod resilience;
pub mod session;
pub mod store;

// Re-export main types for convenience
pub use app::Storefront;
pub use config::StoreConfig;
pub use core::{Money, Result, Session, StoreError};
pub use enrich::{EnrichedProduct, ProductEnricher};
pub use messages::{EnglishMessages, MessageProvider};
pub use optimistic::{ErrorChannel, InFlightSet, MutationRequest, OptimisticController};
pub use remote::{Backend, InMemoryBackend, RemoteError, RestBackend};
pub use resilience::{CallError, ErrorKind, OperationResult, ResilientCaller, RetryPolicy};
pub use session::{FilePreferenceStore, ImageNumberPool, MemoryPreferenceStore, PreferenceStore, SessionStore};
