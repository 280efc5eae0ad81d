use crate::remote::{Backend, RowFilter, RowQuery, decode_rows};
use crate::resilience::{OperationResult, ResilientCaller};
use crate::store::models::{FAVORITES, FavoriteRow};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct FavoritesRepository {
    backend: Arc<dyn Backend>,
    caller: ResilientCaller,
}

fn favorite_filter(user_id: &str, product_id: &str) -> RowFilter {
    RowFilter::new()
        .eq("user_id", user_id)
        .eq("product_id", product_id)
}

impl FavoritesRepository {
    pub fn new(backend: Arc<dyn Backend>, caller: ResilientCaller) -> Self {
        Self { backend, caller }
    }

    pub async fn product_ids(&self, user_id: &str) -> OperationResult<BTreeSet<String>> {
        let query = RowQuery::filtered(RowFilter::new().eq("user_id", user_id));
        let backend = self.backend.as_ref();
        let rows: Vec<FavoriteRow> = self
            .caller
            .call("favorites.list", || async {
                decode_rows(backend.select(FAVORITES, &query).await?)
            })
            .await?;
        Ok(rows.into_iter().map(|row| row.product_id).collect())
    }

    pub async fn is_favorite(&self, user_id: &str, product_id: &str) -> OperationResult<bool> {
        let query = RowQuery::filtered(favorite_filter(user_id, product_id)).limit(1);
        let backend = self.backend.as_ref();
        self.caller
            .call("favorites.contains", || async {
                Ok(!backend.select(FAVORITES, &query).await?.is_empty())
            })
            .await
    }

    pub async fn add(&self, user_id: &str, product_id: &str) -> OperationResult<()> {
        let row = json!({ "user_id": user_id, "product_id": product_id });
        let backend = self.backend.as_ref();
        self.caller
            .call("favorites.add", || {
                let row = row.clone();
                async move { backend.insert(FAVORITES, row).await.map(|_| ()) }
            })
            .await
    }

    pub async fn remove(&self, user_id: &str, product_id: &str) -> OperationResult<()> {
        let filter = favorite_filter(user_id, product_id);
        let backend = self.backend.as_ref();
        self.caller
            .call("favorites.remove", || async {
                backend.delete(FAVORITES, &filter).await.map(|_| ())
            })
            .await
    }

    /// Adds or removes the favorite so that membership equals `favorite`.
    pub async fn set(&self, user_id: &str, product_id: &str, favorite: bool) -> OperationResult<()> {
        if favorite {
            self.add(user_id, product_id).await
        } else {
            self.remove(user_id, product_id).await
        }
    }
}
