use crate::core::{Result, StoreError};
use crate::enrich::{EnrichedProduct, ProductEnricher};
use crate::messages::MessageProvider;
use crate::optimistic::{ErrorChannel, InFlightSet, MutationRequest, OptimisticController};
use crate::session::SessionStore;
use crate::store::repositories::{FavoritesRepository, ProductRepository};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    pub products: Vec<EnrichedProduct>,
    /// Last page loaded, zero-based.
    pub page: usize,
    pub end_reached: bool,
    pub is_loading: bool,
}

impl CatalogState {
    pub fn product(&self, product_id: &str) -> Option<&EnrichedProduct> {
        self.products.iter().find(|p| p.id() == product_id)
    }
}

fn favorite_flag(state: &CatalogState, product_id: &str) -> Option<bool> {
    state.product(product_id).map(|p| p.is_favorite)
}

fn set_favorite_flag(state: &mut CatalogState, product_id: &str, favorite: bool) {
    if let Some(product) = state.products.iter_mut().find(|p| p.id() == product_id) {
        product.is_favorite = favorite;
    }
}

pub struct CatalogViewModel {
    products: ProductRepository,
    favorites: FavoritesRepository,
    enricher: ProductEnricher,
    sessions: Arc<SessionStore>,
    page_size: usize,
    controller: OptimisticController<CatalogState>,
}

impl CatalogViewModel {
    pub fn new(
        products: ProductRepository,
        favorites: FavoritesRepository,
        sessions: Arc<SessionStore>,
        messages: Arc<dyn MessageProvider>,
        page_size: usize,
    ) -> Self {
        let enricher = ProductEnricher::new(products.clone(), favorites.clone());
        Self {
            products,
            favorites,
            enricher,
            sessions,
            page_size: page_size.max(1),
            controller: OptimisticController::new(CatalogState::default(), messages),
        }
    }

    pub fn state(&self) -> CatalogState {
        self.controller.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.controller.subscribe()
    }

    pub fn in_flight(&self) -> &InFlightSet {
        self.controller.in_flight()
    }

    pub fn errors(&self) -> &ErrorChannel {
        self.controller.errors()
    }

    /// Loads and enriches one page. Page 0 replaces the list, later pages append.
    pub async fn load_page(&self, page: usize) -> Result<()> {
        let user_id = self.sessions.user_id();
        let page_size = self.page_size;
        self.controller.update(|state| state.is_loading = true);

        let fetch = async {
            let products = self
                .products
                .page(page, page_size)
                .await
                .map_err(StoreError::from)?;
            let fetched = products.len();
            let enriched = self.enricher.enrich(user_id.as_deref(), products).await;
            Ok::<_, StoreError>((enriched, fetched))
        };
        let result = self
            .controller
            .load(fetch, |state, (enriched, fetched)| {
                if page == 0 {
                    state.products = enriched;
                } else {
                    state.products.extend(enriched);
                }
                state.page = page;
                state.end_reached = fetched < page_size;
            })
            .await;

        self.controller.update(|state| state.is_loading = false);
        result
    }

    pub async fn refresh(&self) -> Result<()> {
        self.load_page(0).await
    }

    /// Loads the page after the last one, unless the end was reached.
    pub async fn load_next_page(&self) -> Result<()> {
        let (next, done) = {
            let state = self.controller.state();
            (state.page + 1, state.end_reached || state.products.is_empty())
        };
        if done {
            return Ok(());
        }
        self.load_page(next).await
    }

    /// Flips a product's favorite flag optimistically.
    pub async fn toggle_favorite(&self, product_id: &str) -> Result<()> {
        let user_id = self.sessions.user_id();
        let favorites = &self.favorites;
        self.controller
            .mutate(
                MutationRequest::new(user_id.as_deref(), product_id),
                favorite_flag,
                set_favorite_flag,
                |favorite| !favorite,
                |user_id, favorite| async move { favorites.set(&user_id, product_id, favorite).await },
            )
            .await
    }
}
