use crate::remote::{Backend, RemoteError, RowFilter, RowQuery, SortDirection, decode_row, decode_rows};
use crate::resilience::{OperationResult, ResilientCaller};
use crate::store::models::{CART_ITEMS, CartItem, Product};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct CartRepository {
    backend: Arc<dyn Backend>,
    caller: ResilientCaller,
}

fn item_filter(user_id: &str, item_id: &str) -> RowFilter {
    RowFilter::new().eq("id", item_id).eq("user_id", user_id)
}

impl CartRepository {
    pub fn new(backend: Arc<dyn Backend>, caller: ResilientCaller) -> Self {
        Self { backend, caller }
    }

    pub async fn list(&self, user_id: &str) -> OperationResult<Vec<CartItem>> {
        let query = RowQuery::filtered(RowFilter::new().eq("user_id", user_id))
            .order_by("name", SortDirection::Asc);
        let backend = self.backend.as_ref();
        self.caller
            .call("cart.list", || async {
                decode_rows(backend.select(CART_ITEMS, &query).await?)
            })
            .await
    }

    /// Adds `quantity` units of a product, merging into an existing line.
    pub async fn add(&self, user_id: &str, product: &Product, quantity: i64) -> OperationResult<CartItem> {
        let existing_query = RowQuery::filtered(
            RowFilter::new()
                .eq("user_id", user_id)
                .eq("product_id", product.id.as_str()),
        )
        .limit(1);
        let backend = self.backend.as_ref();
        let existing: Vec<CartItem> = self
            .caller
            .call("cart.find_line", || async {
                decode_rows(backend.select(CART_ITEMS, &existing_query).await?)
            })
            .await?;

        if let Some(line) = existing.into_iter().next() {
            let quantity = line.quantity + quantity;
            self.update_quantity(user_id, &line.id, quantity).await?;
            return Ok(CartItem { quantity, ..line });
        }

        let row = json!({
            "user_id": user_id,
            "product_id": product.id,
            "name": product.name,
            "unit_price": product.price,
            "quantity": quantity,
        });
        self.caller
            .call("cart.add", || {
                let row = row.clone();
                async move { decode_row(backend.insert(CART_ITEMS, row).await?) }
            })
            .await
    }

    pub async fn update_quantity(&self, user_id: &str, item_id: &str, quantity: i64) -> OperationResult<()> {
        let filter = item_filter(user_id, item_id);
        let patch = json!({ "quantity": quantity });
        let backend = self.backend.as_ref();
        self.caller
            .call("cart.update_quantity", || {
                let patch = patch.clone();
                let filter = &filter;
                async move {
                    let updated = backend.update(CART_ITEMS, filter, patch).await?;
                    if updated.is_empty() {
                        return Err(RemoteError::NotFound(format!("cart item '{item_id}'")));
                    }
                    Ok(())
                }
            })
            .await
    }

    pub async fn remove(&self, user_id: &str, item_id: &str) -> OperationResult<()> {
        let filter = item_filter(user_id, item_id);
        let backend = self.backend.as_ref();
        self.caller
            .call("cart.remove", || async {
                backend.delete(CART_ITEMS, &filter).await.map(|_| ())
            })
            .await
    }

    pub async fn clear(&self, user_id: &str) -> OperationResult<u64> {
        let filter = RowFilter::new().eq("user_id", user_id);
        let backend = self.backend.as_ref();
        self.caller
            .call("cart.clear", || async { backend.delete(CART_ITEMS, &filter).await })
            .await
    }
}
