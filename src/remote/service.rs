use super::error::{RemoteError, RemoteResult};
use super::query::{RowFilter, RowQuery};
use crate::core::Session;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Relational row access, addressed by table name.
#[async_trait]
pub trait RemoteDataService: Send + Sync {
    async fn select(&self, table: &str, query: &RowQuery) -> RemoteResult<Vec<Value>>;

    /// Inserts one row and returns it as stored.
    async fn insert(&self, table: &str, row: Value) -> RemoteResult<Value>;

    /// Merges `patch` into every matching row and returns the updated rows.
    async fn update(&self, table: &str, filter: &RowFilter, patch: Value) -> RemoteResult<Vec<Value>>;

    /// Deletes matching rows and returns how many were removed.
    async fn delete(&self, table: &str, filter: &RowFilter) -> RemoteResult<u64>;
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> RemoteResult<Session>;

    async fn sign_up(&self, email: &str, password: &str) -> RemoteResult<Session>;

    async fn sign_out(&self, session: &Session) -> RemoteResult<()>;
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Uploads an object and returns its public URL.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> RemoteResult<String>;
}

/// Full backend surface: data, auth and storage.
pub trait Backend: RemoteDataService + AuthService + FileStorage {}

impl<T> Backend for T where T: RemoteDataService + AuthService + FileStorage {}

pub fn decode_row<T: DeserializeOwned>(row: Value) -> RemoteResult<T> {
    serde_json::from_value(row).map_err(RemoteError::from)
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> RemoteResult<Vec<T>> {
    rows.into_iter().map(decode_row).collect()
}

/// Returns the single row of a select, or `NotFound` when there is none.
pub fn single_row<T: DeserializeOwned>(rows: Vec<Value>, what: &str) -> RemoteResult<T> {
    match rows.into_iter().next() {
        Some(row) => decode_row(row),
        None => Err(RemoteError::NotFound(what.to_string())),
    }
}
