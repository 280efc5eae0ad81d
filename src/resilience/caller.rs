use super::kind::ErrorKind;
use super::policy::RetryPolicy;
use crate::messages::{EnglishMessages, MessageProvider};
use crate::remote::{RemoteError, RemoteResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{Instrument, debug, error, info_span, warn};

/// Terminal failure of a backend call: a stable kind, a user-facing message
/// and the backend error that caused it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CallError {
    kind: ErrorKind,
    message: String,
    attempts: usize,
    #[source]
    cause: RemoteError,
}

impl CallError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, cause: RemoteError, attempts: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts,
            cause,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> &RemoteError {
        &self.cause
    }

    /// Number of times the operation was invoked before giving up.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

pub type OperationResult<T> = std::result::Result<T, CallError>;

enum Attempt<T> {
    Retry(Duration),
    Finished(OperationResult<T>),
}

/// Runs backend operations with bounded retry and classifies terminal failures.
///
/// Holds no per-call state, so one instance is shared by every repository.
#[derive(Clone)]
pub struct ResilientCaller {
    policy: RetryPolicy,
    messages: Arc<dyn MessageProvider>,
}

impl Default for ResilientCaller {
    fn default() -> Self {
        Self::new(RetryPolicy::default(), Arc::new(EnglishMessages))
    }
}

impl ResilientCaller {
    pub fn new(policy: RetryPolicy, messages: Arc<dyn MessageProvider>) -> Self {
        Self { policy, messages }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn messages(&self) -> &Arc<dyn MessageProvider> {
        &self.messages
    }

    /// Executes `op` until it succeeds, fails with a terminal kind, or the
    /// retry budget is spent.
    ///
    /// ```
    /// use storefront::{RemoteError, ResilientCaller};
    /// # tokio_test::block_on(async {
    /// let caller = ResilientCaller::default();
    /// let err = caller
    ///     .call("profiles.get", || async {
    ///         Err::<(), _>(RemoteError::NotFound("profile".into()))
    ///     })
    ///     .await
    ///     .unwrap_err();
    /// assert_eq!(err.attempts(), 1);
    /// # });
    /// ```
    pub async fn call<T, F, Fut>(&self, operation: &str, mut op: F) -> OperationResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let span = info_span!("backend_call", operation);
        async move {
            let mut attempt = 0usize;
            loop {
                let outcome = op().await;
                match self.next_step(operation, attempt, outcome) {
                    Attempt::Finished(result) => return result,
                    Attempt::Retry(delay) => {
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Like [`call`](Self::call), but treats `NotFound` as an absent value.
    pub async fn call_optional<T, F, Fut>(&self, operation: &str, op: F) -> OperationResult<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        match self.call(operation, op).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Builds the classified failure for a backend error.
    pub fn classify(&self, cause: RemoteError, attempts: usize) -> CallError {
        let kind = ErrorKind::from(&cause);
        CallError::new(kind, self.messages.error_message(kind), cause, attempts)
    }

    fn next_step<T>(&self, operation: &str, attempt: usize, outcome: RemoteResult<T>) -> Attempt<T> {
        let err = match outcome {
            Ok(value) => {
                debug!(operation, attempts = attempt + 1, "backend call succeeded");
                return Attempt::Finished(Ok(value));
            }
            Err(err) => err,
        };

        let kind = ErrorKind::from(&err);
        if kind.is_retryable() && attempt < self.policy.max_retries {
            let delay = self.policy.delay_after(attempt);
            warn!(
                operation,
                attempt,
                kind = %kind,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "backend call failed, retrying"
            );
            return Attempt::Retry(delay);
        }

        error!(operation, attempts = attempt + 1, kind = %kind, error = %err, "backend call failed");
        Attempt::Finished(Err(self.classify(err, attempt + 1)))
    }
}
