use crate::remote::{Backend, RemoteError, RowFilter, RowQuery, SortDirection, decode_row, decode_rows};
use crate::resilience::{ErrorKind, OperationResult, ResilientCaller};
use crate::store::models::{ADDRESSES, Address, NewAddress};
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Clone)]
pub struct AddressRepository {
    backend: Arc<dyn Backend>,
    caller: ResilientCaller,
}

impl AddressRepository {
    pub fn new(backend: Arc<dyn Backend>, caller: ResilientCaller) -> Self {
        Self { backend, caller }
    }

    pub async fn list(&self, user_id: &str) -> OperationResult<Vec<Address>> {
        let query = RowQuery::filtered(RowFilter::new().eq("user_id", user_id))
            .order_by("label", SortDirection::Asc);
        let backend = self.backend.as_ref();
        self.caller
            .call("addresses.list", || async {
                decode_rows(backend.select(ADDRESSES, &query).await?)
            })
            .await
    }

    /// Creates an address. The first address of a user becomes the default.
    pub async fn add(&self, user_id: &str, address: &NewAddress) -> OperationResult<Address> {
        let is_first = self.list(user_id).await?.is_empty();
        let row = json!({
            "user_id": user_id,
            "label": address.label,
            "line1": address.line1,
            "city": address.city,
            "postal_code": address.postal_code,
            "is_default": is_first,
        });
        let backend = self.backend.as_ref();
        self.caller
            .call("addresses.add", || {
                let row = row.clone();
                async move { decode_row(backend.insert(ADDRESSES, row).await?) }
            })
            .await
    }

    /// Moves the default flag to `address_id`. When the flag cannot be
    /// placed, the previous default is restored before the error returns.
    pub async fn set_default(&self, user_id: &str, address_id: &str) -> OperationResult<()> {
        let owned = RowFilter::new().eq("user_id", user_id).eq("is_default", true);
        let target = RowFilter::new().eq("user_id", user_id).eq("id", address_id);
        let backend = self.backend.as_ref();

        let cleared: Vec<String> = self
            .caller
            .call("addresses.clear_default", || async {
                let rows = backend
                    .update(ADDRESSES, &owned, json!({ "is_default": false }))
                    .await?;
                Ok(rows
                    .iter()
                    .filter_map(|row| row.get("id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect::<Vec<_>>())
            })
            .await?;

        let result = self
            .caller
            .call("addresses.set_default", || async {
                let updated = backend
                    .update(ADDRESSES, &target, json!({ "is_default": true }))
                    .await?;
                if updated.is_empty() {
                    return Err(RemoteError::NotFound(format!("address '{address_id}'")));
                }
                Ok(())
            })
            .await;

        if let Err(err) = &result {
            self.restore_default(user_id, &cleared, err.kind()).await;
        }
        result
    }

    async fn restore_default(&self, user_id: &str, cleared: &[String], kind: ErrorKind) {
        if cleared.is_empty() {
            return;
        }
        let previous = RowFilter::new()
            .eq("user_id", user_id)
            .is_in("id", cleared.iter().map(String::as_str));
        let backend = self.backend.as_ref();
        let restored = self
            .caller
            .call("addresses.restore_default", || async {
                backend
                    .update(ADDRESSES, &previous, json!({ "is_default": true }))
                    .await
                    .map(|_| ())
            })
            .await;
        match restored {
            Ok(()) => log::info!(
                "restored default address after failed move: user='{}' kind='{}'",
                user_id,
                kind
            ),
            Err(err) => log::warn!(
                "could not restore default address: user='{}' kind='{}' error='{}'",
                user_id,
                err.kind(),
                err.cause()
            ),
        }
    }
}
