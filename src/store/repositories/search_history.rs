use crate::remote::{Backend, RowFilter, RowQuery, SortDirection, decode_row, decode_rows};
use crate::resilience::{OperationResult, ResilientCaller};
use crate::store::models::{SEARCH_HISTORY, SearchEntry};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct SearchHistoryRepository {
    backend: Arc<dyn Backend>,
    caller: ResilientCaller,
}

impl SearchHistoryRepository {
    pub fn new(backend: Arc<dyn Backend>, caller: ResilientCaller) -> Self {
        Self { backend, caller }
    }

    /// Most recent entries first.
    pub async fn recent(&self, user_id: &str, limit: usize) -> OperationResult<Vec<SearchEntry>> {
        let query = RowQuery::filtered(RowFilter::new().eq("user_id", user_id))
            .order_by("created_at", SortDirection::Desc)
            .limit(limit);
        let backend = self.backend.as_ref();
        self.caller
            .call("search_history.recent", || async {
                decode_rows(backend.select(SEARCH_HISTORY, &query).await?)
            })
            .await
    }

    pub async fn record(&self, user_id: &str, text: &str) -> OperationResult<SearchEntry> {
        let row = json!({
            "user_id": user_id,
            "query": text,
            "created_at": Utc::now(),
        });
        let backend = self.backend.as_ref();
        self.caller
            .call("search_history.record", || {
                let row = row.clone();
                async move { decode_row(backend.insert(SEARCH_HISTORY, row).await?) }
            })
            .await
    }

    pub async fn delete(&self, user_id: &str, entry_id: &str) -> OperationResult<()> {
        let filter = RowFilter::new().eq("id", entry_id).eq("user_id", user_id);
        let backend = self.backend.as_ref();
        self.caller
            .call("search_history.delete", || async {
                backend.delete(SEARCH_HISTORY, &filter).await.map(|_| ())
            })
            .await
    }
}
