use crate::core::Session;
use crate::remote::Backend;
use crate::resilience::{OperationResult, ResilientCaller};
use crate::session::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthRepository {
    backend: Arc<dyn Backend>,
    caller: ResilientCaller,
    sessions: Arc<SessionStore>,
}

impl AuthRepository {
    pub fn new(backend: Arc<dyn Backend>, caller: ResilientCaller, sessions: Arc<SessionStore>) -> Self {
        Self {
            backend,
            caller,
            sessions,
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> OperationResult<Session> {
        let backend = self.backend.as_ref();
        let session = self
            .caller
            .call("auth.sign_in", || backend.sign_in(email, password))
            .await?;
        self.sessions.set(session.clone());
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> OperationResult<Session> {
        let backend = self.backend.as_ref();
        let session = self
            .caller
            .call("auth.sign_up", || backend.sign_up(email, password))
            .await?;
        self.sessions.set(session.clone());
        Ok(session)
    }

    /// Clears the local session even when the backend call fails.
    pub async fn sign_out(&self) -> OperationResult<()> {
        let Some(session) = self.sessions.clear() else {
            return Ok(());
        };
        let backend = self.backend.as_ref();
        self.caller
            .call("auth.sign_out", || backend.sign_out(&session))
            .await
    }
}
