//! PostgREST-style HTTP backend.
//!
//! Data lives under `/rest/v1/<table>`, authentication under `/auth/v1`, and
//! objects under `/storage/v1/object/<bucket>/<path>`.

use super::error::{RemoteError, RemoteResult};
use super::query::{Predicate, RowFilter, RowQuery};
use super::service::{AuthService, FileStorage, RemoteDataService};
use crate::config::StoreConfig;
use crate::core::{Result, Session, StoreError};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{PoisonError, RwLock};

pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
}

fn default_expires_in() -> i64 {
    3600
}

impl RestBackend {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| StoreError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            access_token: RwLock::new(None),
        })
    }

    fn bearer(&self) -> String {
        let token = self
            .access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        token.unwrap_or_else(|| self.api_key.clone())
    }

    fn set_token(&self, token: Option<String>) {
        *self
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn send_json(&self, builder: RequestBuilder) -> RemoteResult<Value> {
        let response = builder.send().await.map_err(map_transport_error)?;
        read_json(response).await
    }

    async fn exchange_token(&self, url: String, email: &str, password: &str) -> RemoteResult<Session> {
        let builder = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }));
        let body = self.send_json(builder).await?;
        let token: TokenResponse = serde_json::from_value(body)?;
        self.set_token(Some(token.access_token.clone()));
        Ok(Session::new(
            token.user.id,
            token.access_token,
            Utc::now() + ChronoDuration::seconds(token.expires_in),
        ))
    }
}

async fn read_json(response: Response) -> RemoteResult<Value> {
    let status = response.status();
    if status.is_success() {
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        return response.json::<Value>().await.map_err(map_transport_error);
    }

    let body = response.text().await.unwrap_or_default();
    Err(map_status(status.as_u16(), body))
}

/// Maps a non-2xx status to the backend error family it represents.
pub fn map_status(status: u16, body: String) -> RemoteError {
    match status {
        400 | 409 | 422 => RemoteError::BadRequest(body),
        401 | 403 => RemoteError::Unauthorized(body),
        404 => RemoteError::NotFound(body),
        408 | 504 => RemoteError::Timeout(body),
        _ => RemoteError::Rest {
            status,
            message: body,
        },
    }
}

fn map_transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout(err.to_string())
    } else if err.is_connect() {
        RemoteError::Network(err.to_string())
    } else if err.is_decode() {
        RemoteError::Encoding(err.to_string())
    } else if err.is_request() || err.is_body() {
        RemoteError::Network(err.to_string())
    } else {
        RemoteError::Other(err.to_string())
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn filter_params(filter: &RowFilter) -> Vec<(String, String)> {
    filter
        .predicates()
        .iter()
        .map(|predicate| match predicate {
            Predicate::Eq(column, value) => (column.clone(), format!("eq.{}", render_value(value))),
            Predicate::ILike(column, needle) => (column.clone(), format!("ilike.*{needle}*")),
            Predicate::In(column, values) => {
                let joined = values
                    .iter()
                    .map(render_value)
                    .collect::<Vec<_>>()
                    .join(",");
                (column.clone(), format!("in.({joined})"))
            }
        })
        .collect()
}

pub fn query_params(query: &RowQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(filter_params(&query.filter));
    if let Some((column, direction)) = &query.order {
        params.push(("order".to_string(), format!("{column}.{direction}")));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if query.offset > 0 {
        params.push(("offset".to_string(), query.offset.to_string()));
    }
    params
}

fn into_rows(body: Value) -> RemoteResult<Vec<Value>> {
    match body {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        other => Err(RemoteError::Encoding(format!(
            "expected a JSON array of rows, got {other}"
        ))),
    }
}

#[async_trait]
impl RemoteDataService for RestBackend {
    async fn select(&self, table: &str, query: &RowQuery) -> RemoteResult<Vec<Value>> {
        let builder = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&query_params(query));
        into_rows(self.send_json(builder).await?)
    }

    async fn insert(&self, table: &str, row: Value) -> RemoteResult<Value> {
        let builder = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&row);
        into_rows(self.send_json(builder).await?)?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Encoding(format!("insert into '{table}' returned no row")))
    }

    async fn update(&self, table: &str, filter: &RowFilter, patch: Value) -> RemoteResult<Vec<Value>> {
        let builder = self
            .authorized(self.client.patch(self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(&filter_params(filter))
            .json(&patch);
        into_rows(self.send_json(builder).await?)
    }

    async fn delete(&self, table: &str, filter: &RowFilter) -> RemoteResult<u64> {
        let builder = self
            .authorized(self.client.delete(self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(&filter_params(filter));
        let rows = into_rows(self.send_json(builder).await?)?;
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl AuthService for RestBackend {
    async fn sign_in(&self, email: &str, password: &str) -> RemoteResult<Session> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        self.exchange_token(url, email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> RemoteResult<Session> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        self.exchange_token(url, email, password).await
    }

    async fn sign_out(&self, session: &Session) -> RemoteResult<()> {
        let builder = self
            .client
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token);
        self.send_json(builder).await?;
        self.set_token(None);
        Ok(())
    }
}

#[async_trait]
impl FileStorage for RestBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> RemoteResult<String> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        let builder = self
            .authorized(self.client.post(url))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes);
        self.send_json(builder).await?;
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        ))
    }
}
