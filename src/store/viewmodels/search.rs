use crate::core::{Result, StoreError};
use crate::messages::MessageProvider;
use crate::optimistic::{ErrorChannel, InFlightSet, MutationRequest, OptimisticController};
use crate::session::SessionStore;
use crate::store::models::{Product, SearchEntry};
use crate::store::repositories::{ProductRepository, SearchHistoryRepository};
use std::sync::Arc;
use tokio::sync::watch;

pub const HISTORY_LIMIT: usize = 20;
pub const RESULT_LIMIT: usize = 20;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<Product>,
    pub history: Vec<SearchEntry>,
    pub is_searching: bool,
}

type HistoryMembership = Option<(usize, SearchEntry)>;

fn history_membership(state: &SearchState, entry_id: &str) -> Option<HistoryMembership> {
    state
        .history
        .iter()
        .position(|entry| entry.id == entry_id)
        .map(|index| Some((index, state.history[index].clone())))
}

fn set_history_membership(state: &mut SearchState, entry_id: &str, value: HistoryMembership) {
    match value {
        None => state.history.retain(|entry| entry.id != entry_id),
        Some((index, entry)) => {
            if !state.history.iter().any(|e| e.id == entry_id) {
                let index = index.min(state.history.len());
                state.history.insert(index, entry);
            }
        }
    }
}

pub struct SearchViewModel {
    products: ProductRepository,
    history: SearchHistoryRepository,
    sessions: Arc<SessionStore>,
    controller: OptimisticController<SearchState>,
}

impl SearchViewModel {
    pub fn new(
        products: ProductRepository,
        history: SearchHistoryRepository,
        sessions: Arc<SessionStore>,
        messages: Arc<dyn MessageProvider>,
    ) -> Self {
        Self {
            products,
            history,
            sessions,
            controller: OptimisticController::new(SearchState::default(), messages),
        }
    }

    pub fn state(&self) -> SearchState {
        self.controller.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.controller.subscribe()
    }

    pub fn in_flight(&self) -> &InFlightSet {
        self.controller.in_flight()
    }

    pub fn errors(&self) -> &ErrorChannel {
        self.controller.errors()
    }

    pub async fn load_history(&self) -> Result<()> {
        let user_id = self.sessions.user_id();
        let user_id = self.controller.require_user(user_id.as_deref())?;
        self.controller
            .load(
                async {
                    self.history
                        .recent(user_id, HISTORY_LIMIT)
                        .await
                        .map_err(StoreError::from)
                },
                |state, history| state.history = history,
            )
            .await
    }

    /// Runs a product search. Signed-in users also get the query recorded;
    /// a failed recording does not fail the search.
    pub async fn search(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            self.controller.update(|state| {
                state.query.clear();
                state.results.clear();
            });
            return Ok(());
        }

        self.controller.update(|state| {
            state.query = text.to_string();
            state.is_searching = true;
        });
        let result = self
            .controller
            .load(
                async {
                    self.products
                        .search(text, RESULT_LIMIT)
                        .await
                        .map_err(StoreError::from)
                },
                |state, results| state.results = results,
            )
            .await;
        self.controller.update(|state| state.is_searching = false);
        result?;

        if let Some(user_id) = self.sessions.user_id() {
            match self.history.record(&user_id, text).await {
                Ok(entry) => self.controller.update(|state| {
                    state.history.retain(|e| e.query != entry.query);
                    state.history.insert(0, entry);
                    state.history.truncate(HISTORY_LIMIT);
                }),
                Err(err) => log::warn!(
                    "search history not recorded: kind='{}' error='{}'",
                    err.kind(),
                    err.cause()
                ),
            }
        }
        Ok(())
    }

    /// Removes a history entry optimistically.
    pub async fn remove_history(&self, entry_id: &str) -> Result<()> {
        let user_id = self.sessions.user_id();
        let history = &self.history;
        self.controller
            .mutate(
                MutationRequest::new(user_id.as_deref(), entry_id),
                history_membership,
                set_history_membership,
                |_| None,
                |user_id, _| async move { history.delete(&user_id, entry_id).await },
            )
            .await
    }
}
