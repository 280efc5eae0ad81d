use crate::core::{Money, Result, StoreError};
use crate::messages::MessageProvider;
use crate::optimistic::{ErrorChannel, InFlightSet, MutationRequest, OptimisticController};
use crate::session::SessionStore;
use crate::store::models::{CartItem, Product};
use crate::store::repositories::CartRepository;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub items: Vec<CartItem>,
    pub is_loading: bool,
}

impl CartState {
    pub fn item(&self, item_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn subtotal(&self) -> Result<Money> {
        crate::store::repositories::order_total(&self.items)
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

fn quantity_of(state: &CartState, item_id: &str) -> Option<i64> {
    state.item(item_id).map(|item| item.quantity)
}

fn set_quantity(state: &mut CartState, item_id: &str, quantity: i64) {
    if let Some(item) = state.items.iter_mut().find(|item| item.id == item_id) {
        item.quantity = quantity;
    }
}

type Membership = Option<(usize, CartItem)>;

fn membership(state: &CartState, item_id: &str) -> Option<Membership> {
    state
        .items
        .iter()
        .position(|item| item.id == item_id)
        .map(|index| Some((index, state.items[index].clone())))
}

fn set_membership(state: &mut CartState, item_id: &str, value: Membership) {
    match value {
        None => state.items.retain(|item| item.id != item_id),
        Some((index, item)) => {
            if state.item(item_id).is_none() {
                let index = index.min(state.items.len());
                state.items.insert(index, item);
            }
        }
    }
}

pub struct CartViewModel {
    repo: CartRepository,
    sessions: Arc<SessionStore>,
    controller: OptimisticController<CartState>,
}

impl CartViewModel {
    pub fn new(repo: CartRepository, sessions: Arc<SessionStore>, messages: Arc<dyn MessageProvider>) -> Self {
        Self {
            repo,
            sessions,
            controller: OptimisticController::new(CartState::default(), messages),
        }
    }

    pub fn state(&self) -> CartState {
        self.controller.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.controller.subscribe()
    }

    pub fn in_flight(&self) -> &InFlightSet {
        self.controller.in_flight()
    }

    pub fn errors(&self) -> &ErrorChannel {
        self.controller.errors()
    }

    pub async fn load(&self) -> Result<()> {
        let user_id = self.sessions.user_id();
        let user_id = self.controller.require_user(user_id.as_deref())?;
        self.controller.update(|state| state.is_loading = true);
        let result = self
            .controller
            .load(
                async { self.repo.list(user_id).await.map_err(StoreError::from) },
                |state, items| state.items = items,
            )
            .await;
        self.controller.update(|state| state.is_loading = false);
        result
    }

    /// Drops the local lines once the server-side cart has been emptied.
    pub fn clear_items(&self) {
        self.controller.update(|state| state.items.clear());
    }

    /// Adds a product and merges the resulting line into the state.
    pub async fn add(&self, product: &Product, quantity: i64) -> Result<()> {
        if quantity < 1 {
            return Err(self.controller.fail(StoreError::Validation(
                "quantity must be at least 1".to_string(),
            )));
        }
        let user_id = self.sessions.user_id();
        let user_id = self.controller.require_user(user_id.as_deref())?;
        self.controller
            .load(
                async {
                    self.repo
                        .add(user_id, product, quantity)
                        .await
                        .map_err(StoreError::from)
                },
                |state, line| match state.items.iter_mut().find(|item| item.id == line.id) {
                    Some(existing) => *existing = line,
                    None => state.items.push(line),
                },
            )
            .await
    }

    /// Sets a line's quantity optimistically; rolls back if the update fails.
    pub async fn change_quantity(&self, item_id: &str, quantity: i64) -> Result<()> {
        if quantity < 1 {
            return Err(self.controller.fail(StoreError::Validation(
                "quantity must be at least 1".to_string(),
            )));
        }
        self.mutate_quantity(item_id, move |_| quantity).await
    }

    pub async fn increment(&self, item_id: &str) -> Result<()> {
        self.mutate_quantity(item_id, |quantity| quantity + 1).await
    }

    /// Decrements a line; a line at quantity 1 is removed instead.
    pub async fn decrement(&self, item_id: &str) -> Result<()> {
        let current = quantity_of(&self.controller.state(), item_id);
        match current {
            Some(quantity) if quantity <= 1 => self.remove(item_id).await,
            _ => self.mutate_quantity(item_id, |quantity| quantity - 1).await,
        }
    }

    async fn mutate_quantity(&self, item_id: &str, next: impl FnOnce(&i64) -> i64) -> Result<()> {
        let user_id = self.sessions.user_id();
        let repo = &self.repo;
        self.controller
            .mutate(
                MutationRequest::new(user_id.as_deref(), item_id),
                quantity_of,
                set_quantity,
                next,
                |user_id, quantity| async move { repo.update_quantity(&user_id, item_id, quantity).await },
            )
            .await
    }

    /// Removes a line optimistically; it is reinserted at its position if the
    /// delete fails.
    pub async fn remove(&self, item_id: &str) -> Result<()> {
        let user_id = self.sessions.user_id();
        let repo = &self.repo;
        self.controller
            .mutate(
                MutationRequest::new(user_id.as_deref(), item_id),
                membership,
                set_membership,
                |_| None,
                |user_id, _| async move { repo.remove(&user_id, item_id).await },
            )
            .await
    }
}
