use crate::core::{Money, StoreError};
use crate::remote::{Backend, RowFilter, RowQuery, SortDirection, decode_row, decode_rows};
use crate::resilience::{OperationResult, ResilientCaller};
use crate::store::models::{CartItem, ORDER_ITEMS, ORDERS, Order, OrderItem, OrderStatus};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct OrderRepository {
    backend: Arc<dyn Backend>,
    caller: ResilientCaller,
}

/// Sum of line totals.
pub fn order_total(lines: &[CartItem]) -> crate::core::Result<Money> {
    let totals = lines
        .iter()
        .map(CartItem::line_total)
        .collect::<crate::core::Result<Vec<_>>>()?;
    Money::sum(totals)
}

impl OrderRepository {
    pub fn new(backend: Arc<dyn Backend>, caller: ResilientCaller) -> Self {
        Self { backend, caller }
    }

    /// Creates an order and its items from cart lines.
    pub async fn place(&self, user_id: &str, address_id: &str, lines: &[CartItem]) -> crate::core::Result<Order> {
        if lines.is_empty() {
            return Err(StoreError::Validation("cannot place an order without items".to_string()));
        }
        let total = order_total(lines)?;
        let order_row = json!({
            "user_id": user_id,
            "address_id": address_id,
            "total": total,
            "status": OrderStatus::Pending,
            "created_at": Utc::now(),
        });
        let backend = self.backend.as_ref();

        let order: Order = self
            .caller
            .call("orders.insert", || {
                let row = order_row.clone();
                async move { decode_row(backend.insert(ORDERS, row).await?) }
            })
            .await?;

        if let Err(err) = self.insert_items(&order.id, lines).await {
            self.discard(&order.id).await;
            return Err(err.into());
        }

        log::info!("order placed: id='{}' lines={} total={}", order.id, lines.len(), total);
        Ok(order)
    }

    async fn insert_items(&self, order_id: &str, lines: &[CartItem]) -> OperationResult<()> {
        let backend = self.backend.as_ref();
        for line in lines {
            let item_row = json!({
                "order_id": order_id,
                "product_id": line.product_id,
                "quantity": line.quantity,
                "unit_price": line.unit_price,
            });
            self.caller
                .call("order_items.insert", || {
                    let row = item_row.clone();
                    async move { backend.insert(ORDER_ITEMS, row).await.map(|_| ()) }
                })
                .await?;
        }
        Ok(())
    }

    /// Removes a partially written order so a retry does not duplicate it.
    async fn discard(&self, order_id: &str) {
        let items = RowFilter::new().eq("order_id", order_id);
        let order = RowFilter::new().eq("id", order_id);
        let backend = self.backend.as_ref();
        let removed = self
            .caller
            .call("orders.discard", || async {
                backend.delete(ORDER_ITEMS, &items).await?;
                backend.delete(ORDERS, &order).await.map(|_| ())
            })
            .await;
        match removed {
            Ok(()) => log::info!("discarded incomplete order: id='{}'", order_id),
            Err(err) => log::warn!(
                "incomplete order left behind: id='{}' kind='{}' error='{}'",
                order_id,
                err.kind(),
                err.cause()
            ),
        }
    }

    /// Newest orders first.
    pub async fn list(&self, user_id: &str) -> OperationResult<Vec<Order>> {
        let query = RowQuery::filtered(RowFilter::new().eq("user_id", user_id))
            .order_by("created_at", SortDirection::Desc);
        let backend = self.backend.as_ref();
        self.caller
            .call("orders.list", || async {
                decode_rows(backend.select(ORDERS, &query).await?)
            })
            .await
    }

    pub async fn items(&self, order_id: &str) -> OperationResult<Vec<OrderItem>> {
        let query = RowQuery::filtered(RowFilter::new().eq("order_id", order_id));
        let backend = self.backend.as_ref();
        self.caller
            .call("order_items.list", || async {
                decode_rows(backend.select(ORDER_ITEMS, &query).await?)
            })
            .await
    }
}
