#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::Arc;
use storefront::{EnglishMessages, InMemoryBackend, MemoryPreferenceStore, StoreConfig, Storefront};

pub const EMAIL: &str = "shopper@example.com";
pub const PASSWORD: &str = "correct-horse";

pub fn app_with(backend: &Arc<InMemoryBackend>) -> Storefront {
    Storefront::new(
        StoreConfig::new("http://localhost", "test-key"),
        backend.clone(),
        Arc::new(EnglishMessages),
        Arc::new(MemoryPreferenceStore::new()),
    )
}

/// Backend plus a storefront whose session belongs to a freshly registered user.
pub async fn signed_in() -> (Arc<InMemoryBackend>, Storefront, String) {
    let backend = Arc::new(InMemoryBackend::new());
    let app = app_with(&backend);
    let session = app.auth().sign_up(EMAIL, PASSWORD).await.unwrap();
    backend.reset_calls();
    (backend, app, session.user_id)
}

pub fn product(index: usize) -> Value {
    json!({
        "id": format!("p{index}"),
        "name": format!("Product {index:02}"),
        "price": 1000 + index as i64,
    })
}

pub fn cart_line(id: &str, user_id: &str, product_id: &str, unit_price: i64, quantity: i64) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "product_id": product_id,
        "name": format!("Item {product_id}"),
        "unit_price": unit_price,
        "quantity": quantity,
    })
}

pub fn address(id: &str, user_id: &str, label: &str, is_default: bool) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "label": label,
        "line1": "1 Main St",
        "city": "Springfield",
        "postal_code": "12345",
        "is_default": is_default,
    })
}

pub fn history_entry(id: &str, user_id: &str, text: &str, minute: u32) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "query": text,
        "created_at": format!("2026-01-01T10:{minute:02}:00Z"),
    })
}

/// Ten products, each rated 4 and 5 stars, with `i` reviews for product `i`;
/// even products carry an active 10% promotion.
pub async fn seed_catalog(backend: &InMemoryBackend) {
    backend.seed("products", (0..10).map(product)).await;
    for i in 0..10 {
        let id = format!("p{i}");
        backend
            .seed(
                "ratings",
                [
                    json!({"product_id": id, "stars": 4}),
                    json!({"product_id": id, "stars": 5}),
                ],
            )
            .await;
        backend
            .seed(
                "reviews",
                (0..i).map(|r| json!({"id": format!("r{i}-{r}"), "product_id": id})),
            )
            .await;
        if i % 2 == 0 {
            backend
                .seed(
                    "promotions",
                    [json!({"product_id": id, "percent_off": 10, "active": true})],
                )
                .await;
        }
    }
}
