/// End-to-end storefront flows over the in-memory backend
///
/// Run with: cargo test --test storefront_flow_tests

mod common;

use common::{EMAIL, PASSWORD, address, app_with, signed_in};
use std::sync::Arc;
use storefront::store::models::{NewAddress, Product};
use storefront::{
    EnglishMessages, ErrorKind, FilePreferenceStore, InMemoryBackend, MemoryPreferenceStore,
    MessageProvider, PreferenceStore, RemoteError, StoreConfig, StoreError, Storefront,
};
use tempfile::TempDir;

fn product(index: usize) -> Product {
    serde_json::from_value(common::product(index)).unwrap()
}

#[tokio::test]
async fn test_bootstrap_consumes_first_launch_flag() {
    let backend = Arc::new(InMemoryBackend::new());
    let app = app_with(&backend);

    assert!(app.bootstrap().await.unwrap());
    assert!(!app.bootstrap().await.unwrap());
}

#[tokio::test]
async fn test_file_preferences_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("prefs.json");
    let backend = Arc::new(InMemoryBackend::new());

    {
        let prefs = Arc::new(FilePreferenceStore::open(&path).await.unwrap());
        prefs.put_secure("refresh_token", "abc123").await.unwrap();
        let app = Storefront::new(
            StoreConfig::new("http://localhost", "test-key"),
            backend.clone(),
            Arc::new(EnglishMessages),
            prefs,
        );
        assert!(app.bootstrap().await.unwrap());
    }

    let prefs = FilePreferenceStore::open(&path).await.unwrap();
    assert!(!prefs.is_first_launch().await.unwrap());
    assert_eq!(
        prefs.get_secure("refresh_token").await.unwrap().as_deref(),
        Some("abc123")
    );
    prefs.remove_secure("refresh_token").await.unwrap();
    assert_eq!(prefs.get_secure("refresh_token").await.unwrap(), None);
}

#[tokio::test]
async fn test_wrong_password_is_not_retried() {
    let backend = Arc::new(InMemoryBackend::new());
    let app = app_with(&backend);
    app.auth().sign_up(EMAIL, PASSWORD).await.unwrap();
    app.sessions().clear();
    backend.reset_calls();

    let err = app.auth().sign_in(EMAIL, "wrong-password").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.attempts(), 1);
    assert_eq!(backend.calls("auth"), 1);
    assert!(app.sessions().user_id().is_none());

    let session = app.auth().sign_in(EMAIL, PASSWORD).await.unwrap();
    assert_eq!(app.sessions().user_id(), Some(session.user_id));
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_clears_session_even_when_backend_fails() {
    let (backend, app, _user_id) = signed_in().await;
    backend.fail_next("auth", RemoteError::Network("offline".into()), 3);

    let err = app.auth().sign_out().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NetworkError);
    assert!(app.sessions().session().is_none());
    app.auth().sign_out().await.unwrap();
}

#[tokio::test]
async fn test_checkout_places_order_and_empties_cart() {
    let (backend, app, user_id) = signed_in().await;
    backend.seed("addresses", [address("a1", &user_id, "Home", true)]).await;
    let cart = app.cart_view_model();
    cart.add(&product(1), 2).await.unwrap();
    cart.add(&product(2), 1).await.unwrap();
    cart.add(&product(1), 1).await.unwrap();

    let lines = cart.state().items;
    assert_eq!(lines.len(), 2);
    assert_eq!(cart.state().item_count(), 4);

    let checkout = app.checkout_view_model();
    let order = checkout.place_order("a1", &cart).await.unwrap();

    assert_eq!(order.total.0, 3 * 1001 + 1002);
    assert_eq!(order.user_id, user_id);
    assert_eq!(backend.rows("orders").await.len(), 1);
    assert_eq!(backend.rows("order_items").await.len(), 2);
    assert!(backend.rows("cart_items").await.is_empty());
    assert!(cart.state().items.is_empty());
    assert_eq!(checkout.state().placed.as_ref().map(|o| o.id.as_str()), Some(order.id.as_str()));

    checkout.load_orders().await.unwrap();
    assert_eq!(checkout.state().orders.len(), 1);
}

#[tokio::test]
async fn test_empty_cart_checkout_is_rejected_locally() {
    let (backend, app, _user_id) = signed_in().await;
    let cart = app.cart_view_model();
    let checkout = app.checkout_view_model();
    let mut errors = checkout.errors().subscribe();

    let err = checkout.place_order("a1", &cart).await.unwrap_err();

    assert!(matches!(err, StoreError::Validation(ref m) if *m == EnglishMessages.empty_cart()));
    assert_eq!(errors.recv().await.unwrap(), EnglishMessages.empty_cart());
    assert_eq!(backend.calls("orders"), 0);
}

#[tokio::test]
async fn test_failed_item_insert_discards_order() {
    let (backend, app, user_id) = signed_in().await;
    backend.seed("addresses", [address("a1", &user_id, "Home", true)]).await;
    let cart = app.cart_view_model();
    cart.add(&product(1), 1).await.unwrap();
    cart.add(&product(2), 3).await.unwrap();
    let checkout = app.checkout_view_model();

    backend.fail_after("order_items", 1, RemoteError::BadRequest("constraint".into()), 1);
    let err = checkout.place_order("a1", &cart).await.unwrap_err();

    assert!(matches!(&err, StoreError::Call(call) if call.kind() == ErrorKind::BadRequest));
    assert!(backend.rows("orders").await.is_empty());
    assert!(backend.rows("order_items").await.is_empty());
    assert_eq!(backend.rows("cart_items").await.len(), 2);
    assert_eq!(cart.state().items.len(), 2);
    assert!(checkout.state().placed.is_none());

    checkout.place_order("a1", &cart).await.unwrap();
    assert_eq!(backend.rows("orders").await.len(), 1);
    assert_eq!(backend.rows("order_items").await.len(), 2);
}

#[tokio::test]
async fn test_checkout_without_session_is_rejected() {
    let backend = Arc::new(InMemoryBackend::new());
    let app = app_with(&backend);

    let cart = app.cart_view_model();
    let err = app.checkout_view_model().place_order("a1", &cart).await.unwrap_err();

    assert!(matches!(err, StoreError::InvalidUserId));
}

#[tokio::test]
async fn test_missing_profile_is_not_an_error() {
    let (backend, app, user_id) = signed_in().await;
    let profile = app.profile_view_model();
    let mut errors = profile.errors().subscribe();

    profile.load().await.unwrap();
    assert!(profile.state().profile.is_none());
    assert_eq!(backend.calls("profiles"), 1);
    assert!(errors.try_recv().is_err());

    profile.save("Ada Shopper", Some("555-0100")).await.unwrap();
    let saved = profile.state().profile.unwrap();
    assert_eq!(saved.id, user_id);
    assert_eq!(saved.full_name, "Ada Shopper");

    let err = profile.save("   ", None).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[tokio::test]
async fn test_avatar_upload_uses_pool_numbers() {
    let (backend, app, user_id) = signed_in().await;
    let profile = app.profile_view_model();
    profile.save("Ada Shopper", None).await.unwrap();

    profile.upload_avatar(vec![1, 2, 3]).await.unwrap();

    let path = format!("{user_id}/1.jpg");
    assert_eq!(backend.object("avatars", &path).await, Some(vec![1, 2, 3]));
    assert_eq!(
        profile.state().profile.unwrap().avatar_url,
        Some(format!("memory://avatars/{path}"))
    );
    assert_eq!(app.images().in_use(), 1);

    backend.fail_next("storage", RemoteError::BadRequest("too large".into()), 1);
    profile.upload_avatar(vec![0; 16]).await.unwrap_err();
    assert_eq!(app.images().in_use(), 1);

    // The replacement takes the next free number and gives back the old one.
    profile.upload_avatar(vec![4]).await.unwrap();
    let second = format!("{user_id}/2.jpg");
    assert_eq!(backend.object("avatars", &second).await, Some(vec![4]));
    assert_eq!(app.images().in_use(), 1);

    profile.upload_avatar(vec![5]).await.unwrap();
    assert_eq!(backend.object("avatars", &path).await, Some(vec![5]));
    assert_eq!(app.images().in_use(), 1);
}

#[tokio::test]
async fn test_avatar_uploads_beyond_pool_capacity() {
    let backend = Arc::new(InMemoryBackend::new());
    let app = Storefront::new(
        StoreConfig::new("http://localhost", "test-key").image_pool_capacity(2),
        backend.clone(),
        Arc::new(EnglishMessages),
        Arc::new(MemoryPreferenceStore::new()),
    );
    app.auth().sign_up(EMAIL, PASSWORD).await.unwrap();
    let profile = app.profile_view_model();
    profile.save("Ada Shopper", None).await.unwrap();

    for round in 0..5u8 {
        profile.upload_avatar(vec![round]).await.unwrap();
        assert_eq!(app.images().in_use(), 1, "round {round}");
    }
    assert_eq!(backend.calls("storage"), 5);
}

#[tokio::test]
async fn test_failed_avatar_link_releases_number() {
    let (backend, app, _user_id) = signed_in().await;
    let profile = app.profile_view_model();
    profile.save("Ada Shopper", None).await.unwrap();
    profile.upload_avatar(vec![1]).await.unwrap();
    let before = profile.state().profile.unwrap().avatar_url;

    // The owner lookup passes, linking the uploaded object fails.
    backend.fail_after("profiles", 1, RemoteError::BadRequest("rls".into()), 1);
    let err = profile.upload_avatar(vec![2]).await.unwrap_err();

    assert!(matches!(&err, StoreError::Call(call) if call.kind() == ErrorKind::BadRequest));
    assert_eq!(app.images().in_use(), 1);
    assert_eq!(profile.state().profile.unwrap().avatar_url, before);
}

#[tokio::test]
async fn test_avatar_upload_without_profile_is_not_found() {
    let (backend, app, _user_id) = signed_in().await;
    let profile = app.profile_view_model();

    let err = profile.upload_avatar(vec![1]).await.unwrap_err();

    assert!(matches!(&err, StoreError::Call(call) if call.kind() == ErrorKind::NotFound));
    assert_eq!(backend.calls("storage"), 0);
    assert_eq!(app.images().in_use(), 0);
}

#[tokio::test]
async fn test_search_records_history_for_signed_in_users() {
    let (backend, app, _user_id) = signed_in().await;
    backend
        .seed(
            "products",
            [
                serde_json::json!({"id": "p1", "name": "Ceramic Mug", "price": 1200}),
                serde_json::json!({"id": "p2", "name": "Travel mug", "price": 1500}),
                serde_json::json!({"id": "p3", "name": "Canvas Tote", "price": 2500}),
            ],
        )
        .await;
    let search = app.search_view_model();

    search.search("  MUG ").await.unwrap();
    let state = search.state();
    assert_eq!(state.query, "MUG");
    assert_eq!(state.results.len(), 2);
    assert_eq!(state.history[0].query, "MUG");

    search.search("tote").await.unwrap();
    search.search("MUG").await.unwrap();
    let history: Vec<String> = search.state().history.iter().map(|e| e.query.clone()).collect();
    assert_eq!(history, ["MUG", "tote"]);

    search.search("").await.unwrap();
    assert!(search.state().results.is_empty());
    assert_eq!(search.state().history.len(), 2);
}

#[tokio::test]
async fn test_search_survives_history_failure() {
    let (backend, app, _user_id) = signed_in().await;
    backend
        .seed("products", [serde_json::json!({"id": "p1", "name": "Mug", "price": 100})])
        .await;
    let search = app.search_view_model();

    backend.fail_next("search_history", RemoteError::BadRequest("rls".into()), 1);
    search.search("mug").await.unwrap();

    assert_eq!(search.state().results.len(), 1);
    assert!(search.state().history.is_empty());
}

#[tokio::test]
async fn test_first_address_becomes_default() {
    let (_backend, app, _user_id) = signed_in().await;
    let addresses = app.address_view_model();

    addresses
        .add(NewAddress {
            label: "Home".into(),
            line1: "1 Main St".into(),
            city: "Springfield".into(),
            postal_code: "12345".into(),
        })
        .await
        .unwrap();
    addresses
        .add(NewAddress {
            label: "Work".into(),
            line1: "9 Office Rd".into(),
            city: "Springfield".into(),
            postal_code: "12399".into(),
        })
        .await
        .unwrap();

    let state = addresses.state();
    assert_eq!(state.addresses.len(), 2);
    assert_eq!(state.default_address().unwrap().label, "Home");

    let err = addresses
        .add(NewAddress {
            label: "Blank".into(),
            line1: String::new(),
            city: "Springfield".into(),
            postal_code: String::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[tokio::test]
async fn test_memory_preferences_start_fresh() {
    let prefs = MemoryPreferenceStore::new();
    assert!(prefs.is_first_launch().await.unwrap());
    prefs.mark_launched().await.unwrap();
    assert!(!prefs.is_first_launch().await.unwrap());
}
