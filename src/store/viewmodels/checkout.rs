use crate::core::{Result, StoreError};
use crate::messages::MessageProvider;
use crate::optimistic::{ErrorChannel, OptimisticController};
use crate::session::SessionStore;
use crate::store::models::Order;
use crate::store::repositories::{CartRepository, OrderRepository};
use super::CartViewModel;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutState {
    pub placed: Option<Order>,
    pub orders: Vec<Order>,
    pub is_placing: bool,
}

pub struct CheckoutViewModel {
    orders: OrderRepository,
    cart: CartRepository,
    sessions: Arc<SessionStore>,
    controller: OptimisticController<CheckoutState>,
}

impl CheckoutViewModel {
    pub fn new(
        orders: OrderRepository,
        cart: CartRepository,
        sessions: Arc<SessionStore>,
        messages: Arc<dyn MessageProvider>,
    ) -> Self {
        Self {
            orders,
            cart,
            sessions,
            controller: OptimisticController::new(CheckoutState::default(), messages),
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.controller.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.controller.subscribe()
    }

    pub fn errors(&self) -> &ErrorChannel {
        self.controller.errors()
    }

    /// Places an order for the lines loaded in `cart` and empties the cart.
    ///
    /// The order stands even if emptying the server-side cart fails; that
    /// failure is only reported and the local lines are kept.
    pub async fn place_order(&self, address_id: &str, cart: &CartViewModel) -> Result<Order> {
        let user_id = self.sessions.user_id();
        let user_id = self.controller.require_user(user_id.as_deref())?;
        let lines = cart.state().items;
        if lines.is_empty() {
            let message = self.controller.messages().empty_cart();
            return Err(self.controller.fail(StoreError::Validation(message)));
        }

        self.controller.update(|state| state.is_placing = true);
        let placed = self.orders.place(user_id, address_id, &lines).await;
        self.controller.update(|state| state.is_placing = false);
        let order = placed.map_err(|err| self.controller.fail(err))?;

        match self.cart.clear(user_id).await {
            Ok(_) => cart.clear_items(),
            Err(err) => {
                let err = self.controller.fail(err.into());
                log::warn!("cart not cleared after order '{}': {}", order.id, err);
            }
        }

        self.controller.update(|state| {
            state.placed = Some(order.clone());
            state.orders.insert(0, order.clone());
        });
        Ok(order)
    }

    pub async fn load_orders(&self) -> Result<()> {
        let user_id = self.sessions.user_id();
        let user_id = self.controller.require_user(user_id.as_deref())?;
        self.controller
            .load(
                async { self.orders.list(user_id).await.map_err(StoreError::from) },
                |state, orders| state.orders = orders,
            )
            .await
    }
}
