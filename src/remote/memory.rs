//! In-process backend used by tests and the `demo` command.
//!
//! Rows are plain JSON objects kept per table. Faults can be scripted per
//! table so callers can observe retry and rollback behavior deterministically.

use super::error::{RemoteError, RemoteResult};
use super::query::{RowFilter, RowQuery, SortDirection};
use super::service::{AuthService, FileStorage, RemoteDataService};
use crate::core::Session;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Fault key used for authentication calls.
pub const AUTH_FAULT_KEY: &str = "auth";
/// Fault key used for storage uploads.
pub const STORAGE_FAULT_KEY: &str = "storage";

#[derive(Debug, Clone)]
struct Account {
    user_id: String,
    password: String,
}

#[derive(Default)]
pub struct InMemoryBackend {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    accounts: RwLock<HashMap<String, Account>>,
    objects: RwLock<HashMap<String, Vec<u8>>>,
    /// Per-key script; `None` entries let a call through.
    faults: Mutex<HashMap<String, VecDeque<Option<RemoteError>>>>,
    calls: Mutex<HashMap<String, usize>>,
    latency: Mutex<HashMap<String, Duration>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends rows to a table, creating it if needed.
    pub async fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Returns a copy of every row currently stored in `table`.
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes the next `times` calls against `key` fail with `error`.
    ///
    /// `key` is a table name, [`AUTH_FAULT_KEY`] or [`STORAGE_FAULT_KEY`].
    pub fn fail_next(&self, key: &str, error: RemoteError, times: usize) {
        self.fail_after(key, 0, error, times);
    }

    /// Lets `skip` calls against `key` through, then fails the following
    /// `times` calls with `error`.
    pub fn fail_after(&self, key: &str, skip: usize, error: RemoteError, times: usize) {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = faults.entry(key.to_string()).or_default();
        queue.extend(std::iter::repeat_n(None, skip));
        queue.extend(std::iter::repeat_n(Some(error), times));
    }

    pub fn clear_faults(&self) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Delays every call against `key` by `delay`.
    pub fn set_latency(&self, key: &str, delay: Duration) {
        self.latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), delay);
    }

    /// Number of calls issued against `key`, including failed ones.
    pub fn calls(&self, key: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub async fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(&format!("{bucket}/{path}"))
            .cloned()
    }

    /// Records the call, applies latency and pops a scripted fault.
    async fn enter(&self, key: &str) -> RemoteResult<()> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_insert(0) += 1;

        let delay = self
            .latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let fault = self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(key)
            .and_then(VecDeque::pop_front)
            .flatten();
        match fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn new_session(user_id: &str) -> Session {
        Session::new(
            user_id,
            Uuid::new_v4().to_string(),
            Utc::now() + ChronoDuration::hours(1),
        )
    }
}

/// Sort rank of a JSON type; missing and null sort first.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over optional JSON values: by type rank, then by value.
fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.total_cmp(&b)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

#[async_trait]
impl RemoteDataService for InMemoryBackend {
    async fn select(&self, table: &str, query: &RowQuery) -> RemoteResult<Vec<Value>> {
        self.enter(table).await?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filter.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((column, direction)) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(column), b.get(column));
                match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(query.offset).take(limit).collect())
    }

    async fn insert(&self, table: &str, mut row: Value) -> RemoteResult<Value> {
        self.enter(table).await?;
        let Some(object) = row.as_object_mut() else {
            return Err(RemoteError::BadRequest(format!(
                "row for '{table}' must be a JSON object"
            )));
        };
        if !object.contains_key("id") {
            object.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }

        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        if rows.iter().any(|existing| existing.get("id") == row.get("id")) {
            return Err(RemoteError::BadRequest(format!(
                "duplicate key for '{table}'"
            )));
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, filter: &RowFilter, patch: Value) -> RemoteResult<Vec<Value>> {
        self.enter(table).await?;
        let Value::Object(patch) = patch else {
            return Err(RemoteError::BadRequest(format!(
                "patch for '{table}' must be a JSON object"
            )));
        };

        let mut tables = self.tables.write().await;
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| filter.matches(row)) {
                if let Some(object) = row.as_object_mut() {
                    for (key, value) in &patch {
                        object.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filter: &RowFilter) -> RemoteResult<u64> {
        self.enter(table).await?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !filter.matches(row));
        Ok((before - rows.len()) as u64)
    }
}

#[async_trait]
impl AuthService for InMemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> RemoteResult<Session> {
        self.enter(AUTH_FAULT_KEY).await?;
        let accounts = self.accounts.read().await;
        match accounts.get(email) {
            Some(account) if account.password == password => Ok(Self::new_session(&account.user_id)),
            _ => Err(RemoteError::Unauthorized("invalid login credentials".to_string())),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> RemoteResult<Session> {
        self.enter(AUTH_FAULT_KEY).await?;
        if password.len() < 6 {
            return Err(RemoteError::BadRequest(
                "password should be at least 6 characters".to_string(),
            ));
        }
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email) {
            return Err(RemoteError::BadRequest("user already registered".to_string()));
        }
        let user_id = Uuid::new_v4().to_string();
        accounts.insert(
            email.to_string(),
            Account {
                user_id: user_id.clone(),
                password: password.to_string(),
            },
        );
        Ok(Self::new_session(&user_id))
    }

    async fn sign_out(&self, _session: &Session) -> RemoteResult<()> {
        self.enter(AUTH_FAULT_KEY).await
    }
}

#[async_trait]
impl FileStorage for InMemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> RemoteResult<String> {
        self.enter(STORAGE_FAULT_KEY).await?;
        let key = format!("{bucket}/{path}");
        self.objects.write().await.insert(key.clone(), bytes);
        Ok(format!("memory://{key}"))
    }
}
