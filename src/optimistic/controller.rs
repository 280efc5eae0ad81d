use super::channel::ErrorChannel;
use super::in_flight::InFlightSet;
use crate::core::{Result, StoreError};
use crate::messages::MessageProvider;
use crate::resilience::{ErrorKind, OperationResult};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Who is mutating what.
#[derive(Debug, Clone, Copy)]
pub struct MutationRequest<'a> {
    pub user_id: Option<&'a str>,
    pub entity_id: &'a str,
}

impl<'a> MutationRequest<'a> {
    pub fn new(user_id: Option<&'a str>, entity_id: &'a str) -> Self {
        Self { user_id, entity_id }
    }
}

/// Observable view-model state with optimistic, reversible mutations.
///
/// `S` is the whole screen state. Each mutation addresses one slice of it
/// through a getter/putter pair keyed by the entity id.
pub struct OptimisticController<S> {
    state: Arc<watch::Sender<S>>,
    in_flight: InFlightSet,
    errors: ErrorChannel,
    messages: Arc<dyn MessageProvider>,
}

impl<S> Clone for OptimisticController<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            in_flight: self.in_flight.clone(),
            errors: self.errors.clone(),
            messages: Arc::clone(&self.messages),
        }
    }
}

impl<S> OptimisticController<S> {
    pub fn new(initial: S, messages: Arc<dyn MessageProvider>) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state: Arc::new(state),
            in_flight: InFlightSet::new(),
            errors: ErrorChannel::new(),
            messages,
        }
    }

    pub fn state(&self) -> watch::Ref<'_, S> {
        self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.state.subscribe()
    }

    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    pub fn messages(&self) -> &Arc<dyn MessageProvider> {
        &self.messages
    }

    pub fn update(&self, modify: impl FnOnce(&mut S)) {
        self.state.send_modify(modify);
    }

    /// Message shown to the user for `err`.
    pub fn message_for(&self, err: &StoreError) -> String {
        match err {
            StoreError::Call(call) => call.message().to_string(),
            StoreError::InvalidUserId => self.messages.invalid_user_id(),
            StoreError::EntityNotLoaded(_) => self.messages.entity_unavailable(),
            StoreError::Validation(message) => message.clone(),
            _ => self.messages.error_message(ErrorKind::Unknown),
        }
    }

    /// Surfaces `err` on the error channel and hands it back.
    pub fn fail(&self, err: StoreError) -> StoreError {
        self.errors.emit(self.message_for(&err));
        err
    }

    /// Requires a non-empty user id, surfacing the failure otherwise.
    pub fn require_user<'a>(&self, user_id: Option<&'a str>) -> Result<&'a str> {
        match user_id {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(self.fail(StoreError::InvalidUserId)),
        }
    }

    /// Awaits a fetch and applies it to the state; failures are surfaced and
    /// leave the state untouched.
    pub async fn load<T, Fut>(&self, fetch: Fut, apply: impl FnOnce(&mut S, T)) -> Result<()>
    where
        Fut: Future<Output = Result<T>>,
    {
        match fetch.await {
            Ok(value) => {
                self.state.send_modify(|state| apply(state, value));
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Optimistically replaces one state slice and reconciles it with the
    /// backend.
    ///
    /// 1. Rejects a missing user id and a slice `get` cannot find, with no
    ///    remote call.
    /// 2. Marks the entity in flight, writes `next(current)` with `put`, then
    ///    runs `remote`.
    /// 3. On failure writes the pre-mutation value back and surfaces the
    ///    message. On success the optimistic value stays.
    ///
    /// The in-flight mark is held by a guard and always cleared.
    pub async fn mutate<V, T, G, P, N, F, Fut>(
        &self,
        request: MutationRequest<'_>,
        get: G,
        put: P,
        next: N,
        remote: F,
    ) -> Result<T>
    where
        V: Clone,
        G: Fn(&S, &str) -> Option<V>,
        P: Fn(&mut S, &str, V),
        N: FnOnce(&V) -> V,
        F: FnOnce(String, V) -> Fut,
        Fut: Future<Output = OperationResult<T>>,
    {
        let user_id = self.require_user(request.user_id)?.to_string();
        let entity_id = request.entity_id;

        let current = {
            let state = self.state.borrow();
            get(&*state, entity_id)
        };
        let Some(previous) = current else {
            return Err(self.fail(StoreError::EntityNotLoaded(entity_id.to_string())));
        };

        let _guard = self.in_flight.begin(entity_id);
        let updated = next(&previous);
        self.state
            .send_modify(|state| put(state, entity_id, updated.clone()));

        match remote(user_id, updated).await {
            Ok(value) => Ok(value),
            Err(err) => {
                log::warn!(
                    "optimistic mutation rolled back: entity='{}' kind='{}' error='{}'",
                    entity_id,
                    err.kind(),
                    err.cause()
                );
                self.state
                    .send_modify(|state| put(state, entity_id, previous));
                Err(self.fail(StoreError::Call(err)))
            }
        }
    }
}

impl<S: Clone> OptimisticController<S> {
    pub fn snapshot(&self) -> S {
        self.state.borrow().clone()
    }
}
