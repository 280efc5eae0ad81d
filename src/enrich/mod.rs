//! Per-product enrichment of catalog pages.
//!
//! Every product on a page is enriched by its own child future, and each
//! child runs its lookups concurrently. A page is published only once all
//! children have resolved, so latency follows the slowest single lookup.
//! Individual lookup failures degrade to defaults instead of failing the page.

use crate::core::Money;
use crate::resilience::OperationResult;
use crate::store::models::{Product, Promotion};
use crate::store::repositories::{FavoritesRepository, ProductRepository};
use futures::future::join_all;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedProduct {
    pub product: Product,
    pub rating: Option<f32>,
    pub promotion: Option<Promotion>,
    pub review_count: usize,
    pub is_favorite: bool,
}

impl EnrichedProduct {
    pub fn id(&self) -> &str {
        &self.product.id
    }

    /// Price after the active promotion, if any.
    pub fn final_price(&self) -> Money {
        match &self.promotion {
            Some(promotion) if promotion.active => self.product.price.discounted(promotion.percent_off),
            _ => self.product.price,
        }
    }
}

#[derive(Clone)]
pub struct ProductEnricher {
    products: ProductRepository,
    favorites: FavoritesRepository,
}

fn absorb<T>(lookup: &str, product_id: &str, result: OperationResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!(
                "enrichment lookup failed: lookup='{}' product='{}' kind='{}' error='{}'",
                lookup,
                product_id,
                err.kind(),
                err.cause()
            );
            None
        }
    }
}

impl ProductEnricher {
    pub fn new(products: ProductRepository, favorites: FavoritesRepository) -> Self {
        Self {
            products,
            favorites,
        }
    }

    /// Enriches all products concurrently, preserving input order.
    pub async fn enrich(&self, user_id: Option<&str>, products: Vec<Product>) -> Vec<EnrichedProduct> {
        let children = products
            .into_iter()
            .map(|product| self.enrich_one(user_id, product));
        join_all(children).await
    }

    async fn enrich_one(&self, user_id: Option<&str>, product: Product) -> EnrichedProduct {
        let id = product.id.as_str();
        let favorite = async {
            match user_id {
                Some(user_id) => self.favorites.is_favorite(user_id, id).await,
                None => Ok(false),
            }
        };

        let (rating, promotion, review_count, is_favorite) = tokio::join!(
            self.products.average_rating(id),
            self.products.promotion(id),
            self.products.review_count(id),
            favorite,
        );

        let rating = absorb("rating", id, rating).flatten();
        let promotion = absorb("promotion", id, promotion).flatten();
        let review_count = absorb("review_count", id, review_count).unwrap_or(0);
        let is_favorite = absorb("favorite", id, is_favorite).unwrap_or(false);

        EnrichedProduct {
            product,
            rating,
            promotion,
            review_count,
            is_favorite,
        }
    }
}
