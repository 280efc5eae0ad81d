//! Composition root.
//!
//! Shared components (session, image numbers, retrying caller) are created
//! once here and handed to every repository and view-model that needs them.

use crate::config::StoreConfig;
use crate::core::Result;
use crate::messages::{EnglishMessages, MessageProvider};
use crate::remote::{Backend, RestBackend};
use crate::resilience::ResilientCaller;
use crate::session::{FilePreferenceStore, ImageNumberPool, PreferenceStore, SessionStore};
use crate::store::repositories::{
    AddressRepository, AuthRepository, CartRepository, FavoritesRepository, OrderRepository,
    ProductRepository, ProfileRepository, SearchHistoryRepository,
};
use crate::store::viewmodels::{
    AddressViewModel, CartViewModel, CatalogViewModel, CheckoutViewModel, ProfileViewModel,
    SearchViewModel,
};
use std::sync::Arc;

pub struct Storefront {
    config: StoreConfig,
    backend: Arc<dyn Backend>,
    caller: ResilientCaller,
    messages: Arc<dyn MessageProvider>,
    sessions: Arc<SessionStore>,
    images: Arc<ImageNumberPool>,
    preferences: Arc<dyn PreferenceStore>,
}

impl Storefront {
    pub fn new(
        config: StoreConfig,
        backend: Arc<dyn Backend>,
        messages: Arc<dyn MessageProvider>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        let caller = ResilientCaller::new(config.retry, Arc::clone(&messages));
        let images = Arc::new(ImageNumberPool::new(config.image_pool_capacity));
        Self {
            config,
            backend,
            caller,
            messages,
            sessions: Arc::new(SessionStore::new()),
            images,
            preferences,
        }
    }

    /// Wires the HTTP backend and on-disk preferences described by `config`.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let backend = Arc::new(RestBackend::new(&config)?);
        let preferences = Arc::new(FilePreferenceStore::open(config.preferences_path.clone()).await?);
        Ok(Self::new(config, backend, Arc::new(EnglishMessages), preferences))
    }

    /// Consumes the first-launch flag. Returns `true` on the first launch.
    pub async fn bootstrap(&self) -> Result<bool> {
        let first = self.preferences.is_first_launch().await?;
        if first {
            log::info!("first launch detected");
            self.preferences.mark_launched().await?;
        }
        Ok(first)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn images(&self) -> &Arc<ImageNumberPool> {
        &self.images
    }

    pub fn preferences(&self) -> &Arc<dyn PreferenceStore> {
        &self.preferences
    }

    pub fn caller(&self) -> &ResilientCaller {
        &self.caller
    }

    pub fn auth(&self) -> AuthRepository {
        AuthRepository::new(self.backend(), self.caller.clone(), Arc::clone(&self.sessions))
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.backend(), self.caller.clone())
    }

    pub fn cart(&self) -> CartRepository {
        CartRepository::new(self.backend(), self.caller.clone())
    }

    pub fn favorites(&self) -> FavoritesRepository {
        FavoritesRepository::new(self.backend(), self.caller.clone())
    }

    pub fn search_history(&self) -> SearchHistoryRepository {
        SearchHistoryRepository::new(self.backend(), self.caller.clone())
    }

    pub fn addresses(&self) -> AddressRepository {
        AddressRepository::new(self.backend(), self.caller.clone())
    }

    pub fn profiles(&self) -> ProfileRepository {
        ProfileRepository::new(self.backend(), self.caller.clone(), Arc::clone(&self.images))
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.backend(), self.caller.clone())
    }

    pub fn cart_view_model(&self) -> CartViewModel {
        CartViewModel::new(self.cart(), Arc::clone(&self.sessions), self.messages())
    }

    pub fn catalog_view_model(&self) -> CatalogViewModel {
        CatalogViewModel::new(
            self.products(),
            self.favorites(),
            Arc::clone(&self.sessions),
            self.messages(),
            self.config.page_size,
        )
    }

    pub fn search_view_model(&self) -> SearchViewModel {
        SearchViewModel::new(
            self.products(),
            self.search_history(),
            Arc::clone(&self.sessions),
            self.messages(),
        )
    }

    pub fn address_view_model(&self) -> AddressViewModel {
        AddressViewModel::new(self.addresses(), Arc::clone(&self.sessions), self.messages())
    }

    pub fn profile_view_model(&self) -> ProfileViewModel {
        ProfileViewModel::new(self.profiles(), Arc::clone(&self.sessions), self.messages())
    }

    pub fn checkout_view_model(&self) -> CheckoutViewModel {
        CheckoutViewModel::new(
            self.orders(),
            self.cart(),
            Arc::clone(&self.sessions),
            self.messages(),
        )
    }

    fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    fn messages(&self) -> Arc<dyn MessageProvider> {
        Arc::clone(&self.messages)
    }
}
