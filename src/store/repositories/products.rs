use crate::remote::{Backend, RowFilter, RowQuery, SortDirection, decode_rows, single_row};
use crate::resilience::{OperationResult, ResilientCaller};
use crate::store::models::{PRODUCTS, PROMOTIONS, Product, Promotion, RATINGS, REVIEWS, RatingRow};
use std::sync::Arc;

#[derive(Clone)]
pub struct ProductRepository {
    backend: Arc<dyn Backend>,
    caller: ResilientCaller,
}

impl ProductRepository {
    pub fn new(backend: Arc<dyn Backend>, caller: ResilientCaller) -> Self {
        Self { backend, caller }
    }

    /// One page of products ordered by name; `page` is zero-based.
    pub async fn page(&self, page: usize, page_size: usize) -> OperationResult<Vec<Product>> {
        let query = RowQuery::all()
            .order_by("name", SortDirection::Asc)
            .page(page, page_size);
        let backend = self.backend.as_ref();
        self.caller
            .call("products.page", || async {
                decode_rows(backend.select(PRODUCTS, &query).await?)
            })
            .await
    }

    pub async fn by_id(&self, product_id: &str) -> OperationResult<Product> {
        let query = RowQuery::filtered(RowFilter::new().eq("id", product_id)).limit(1);
        let backend = self.backend.as_ref();
        self.caller
            .call("products.by_id", || async {
                single_row(backend.select(PRODUCTS, &query).await?, PRODUCTS)
            })
            .await
    }

    pub async fn search(&self, text: &str, limit: usize) -> OperationResult<Vec<Product>> {
        let query = RowQuery::filtered(RowFilter::new().ilike("name", text))
            .order_by("name", SortDirection::Asc)
            .limit(limit);
        let backend = self.backend.as_ref();
        self.caller
            .call("products.search", || async {
                decode_rows(backend.select(PRODUCTS, &query).await?)
            })
            .await
    }

    /// Mean star rating, `None` when the product has no ratings.
    pub async fn average_rating(&self, product_id: &str) -> OperationResult<Option<f32>> {
        let query = RowQuery::filtered(RowFilter::new().eq("product_id", product_id));
        let backend = self.backend.as_ref();
        let ratings: Vec<RatingRow> = self
            .caller
            .call("ratings.for_product", || async {
                decode_rows(backend.select(RATINGS, &query).await?)
            })
            .await?;

        if ratings.is_empty() {
            return Ok(None);
        }
        let total: u32 = ratings.iter().map(|r| u32::from(r.stars)).sum();
        Ok(Some(total as f32 / ratings.len() as f32))
    }

    /// The active promotion for a product, if any.
    pub async fn promotion(&self, product_id: &str) -> OperationResult<Option<Promotion>> {
        let query = RowQuery::filtered(
            RowFilter::new()
                .eq("product_id", product_id)
                .eq("active", true),
        )
        .limit(1);
        let backend = self.backend.as_ref();
        let rows: Vec<Promotion> = self
            .caller
            .call("promotions.for_product", || async {
                decode_rows(backend.select(PROMOTIONS, &query).await?)
            })
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn review_count(&self, product_id: &str) -> OperationResult<usize> {
        let query = RowQuery::filtered(RowFilter::new().eq("product_id", product_id));
        let backend = self.backend.as_ref();
        self.caller
            .call("reviews.count", || async {
                Ok(backend.select(REVIEWS, &query).await?.len())
            })
            .await
    }
}
