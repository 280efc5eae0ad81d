use crate::core::{Result, StoreError};
use crate::resilience::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_URL: &str = "STOREFRONT_URL";
pub const ENV_API_KEY: &str = "STOREFRONT_API_KEY";
pub const ENV_TIMEOUT_SECS: &str = "STOREFRONT_TIMEOUT_SECS";
pub const ENV_PAGE_SIZE: &str = "STOREFRONT_PAGE_SIZE";

/// Storefront client configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend project URL
    pub url: String,

    /// Public (anon) API key sent with every request
    pub api_key: String,

    /// Transport timeout for a single request
    pub request_timeout: Duration,

    /// Retry policy for backend calls
    pub retry: RetryPolicy,

    /// Products per catalog page
    pub page_size: usize,

    /// Location of the local preference document
    pub preferences_path: PathBuf,

    /// Size of the unique image number pool
    pub image_pool_capacity: u32,
}

impl StoreConfig {
    /// Create a new configuration with defaults
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            url: url.to_string(),
            api_key: api_key.to_string(),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            page_size: 10,
            preferences_path: PathBuf::from("storefront-preferences.json"),
            image_pool_capacity: 1000,
        }
    }

    /// Read the configuration from `STOREFRONT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(ENV_URL)
            .ok_or_else(|| StoreError::Config(format!("{ENV_URL} is not set")))?;
        let api_key = lookup(ENV_API_KEY)
            .ok_or_else(|| StoreError::Config(format!("{ENV_API_KEY} is not set")))?;
        let mut config = Self::new(&url, &api_key);

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw
                .parse()
                .map_err(|_| StoreError::Config(format!("{ENV_TIMEOUT_SECS} must be an integer")))?;
            config = config.request_timeout(Duration::from_secs(secs));
        }
        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            let size: usize = raw
                .parse()
                .map_err(|_| StoreError::Config(format!("{ENV_PAGE_SIZE} must be an integer")))?;
            config = config.page_size(size);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the catalog page size
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Set the preference document path
    pub fn preferences_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = path.into();
        self
    }

    /// Set the image number pool size
    pub fn image_pool_capacity(mut self, capacity: u32) -> Self {
        self.image_pool_capacity = capacity;
        self
    }

    /// Human-readable summary with the API key redacted
    pub fn describe(&self) -> String {
        format!(
            "url={} api_key=*** timeout={}s retries={} backoff_step={}ms page_size={} preferences={}",
            self.url,
            self.request_timeout.as_secs(),
            self.retry.max_retries,
            self.retry.backoff_step.as_millis(),
            self.page_size,
            self.preferences_path.display()
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(StoreError::Config("url cannot be empty".to_string()));
        }

        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(StoreError::Config(
                "url must start with 'http://' or 'https://'".to_string(),
            ));
        }

        if self.api_key.is_empty() {
            return Err(StoreError::Config("api_key cannot be empty".to_string()));
        }

        if self.page_size == 0 {
            return Err(StoreError::Config("page_size must be > 0".to_string()));
        }

        if self.image_pool_capacity == 0 {
            return Err(StoreError::Config("image_pool_capacity must be > 0".to_string()));
        }

        Ok(())
    }
}
