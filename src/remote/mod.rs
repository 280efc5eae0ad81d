//! Backend interfaces and their implementations.

pub mod error;
pub mod memory;
pub mod query;
pub mod rest;
pub mod service;

pub use error::{RemoteError, RemoteResult};
pub use memory::InMemoryBackend;
pub use query::{Predicate, RowFilter, RowQuery, SortDirection};
pub use rest::RestBackend;
pub use service::{AuthService, Backend, FileStorage, RemoteDataService, decode_row, decode_rows, single_row};
