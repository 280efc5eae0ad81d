use crate::core::{Result, StoreError};
use crate::messages::MessageProvider;
use crate::optimistic::{ErrorChannel, InFlightSet, MutationRequest, OptimisticController};
use crate::session::SessionStore;
use crate::store::models::{Address, NewAddress};
use crate::store::repositories::AddressRepository;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressState {
    pub addresses: Vec<Address>,
    pub is_loading: bool,
}

impl AddressState {
    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|a| a.is_default)
    }
}

/// The current default id, provided `address_id` is loaded.
fn default_id(state: &AddressState, address_id: &str) -> Option<Option<String>> {
    state
        .addresses
        .iter()
        .any(|a| a.id == address_id)
        .then(|| state.default_address().map(|a| a.id.clone()))
}

fn assign_default(state: &mut AddressState, _address_id: &str, default: Option<String>) {
    for address in &mut state.addresses {
        address.is_default = default.as_deref() == Some(address.id.as_str());
    }
}

pub struct AddressViewModel {
    repo: AddressRepository,
    sessions: Arc<SessionStore>,
    controller: OptimisticController<AddressState>,
}

impl AddressViewModel {
    pub fn new(repo: AddressRepository, sessions: Arc<SessionStore>, messages: Arc<dyn MessageProvider>) -> Self {
        Self {
            repo,
            sessions,
            controller: OptimisticController::new(AddressState::default(), messages),
        }
    }

    pub fn state(&self) -> AddressState {
        self.controller.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<AddressState> {
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
                |state, addresses| state.addresses = addresses,
            )
            .await;
        self.controller.update(|state| state.is_loading = false);
        result
    }

    pub async fn add(&self, address: NewAddress) -> Result<()> {
        if address.line1.trim().is_empty() || address.city.trim().is_empty() {
            return Err(self.controller.fail(StoreError::Validation(
                "street and city are required".to_string(),
            )));
        }
        let user_id = self.sessions.user_id();
        let user_id = self.controller.require_user(user_id.as_deref())?;
        if let Err(err) = self.repo.add(user_id, &address).await {
            return Err(self.controller.fail(err.into()));
        }
        self.load().await
    }

    /// Moves the default flag optimistically, then reloads so server-side
    /// flags are authoritative. A failed backend call also reloads, since
    /// the server may have applied part of the move.
    pub async fn set_default(&self, address_id: &str) -> Result<()> {
        let user_id = self.sessions.user_id();
        let repo = &self.repo;
        let moved = self
            .controller
            .mutate(
                MutationRequest::new(user_id.as_deref(), address_id),
                default_id,
                assign_default,
                |_| Some(address_id.to_string()),
                |user_id, _| async move { repo.set_default(&user_id, address_id).await },
            )
            .await;
        match moved {
            Ok(()) => self.load().await,
            Err(err @ StoreError::Call(_)) => {
                if let Err(reload) = self.load().await {
                    log::warn!("address reload after failed default move: {}", reload);
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}
