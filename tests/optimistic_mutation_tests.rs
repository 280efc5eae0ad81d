/// Optimistic mutations against the in-memory backend
///
/// Run with: cargo test --test optimistic_mutation_tests

mod common;

use common::{address, app_with, cart_line, history_entry, signed_in};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use storefront::{
    CallError, EnglishMessages, ErrorKind, InMemoryBackend, MessageProvider, MutationRequest,
    OptimisticController, RemoteError, StoreError,
};
use storefront::remote::{RemoteDataService, RowFilter};

#[tokio::test(start_paused = true)]
async fn test_failed_increment_rolls_back() {
    let (backend, app, user_id) = signed_in().await;
    backend
        .seed("cart_items", [cart_line("c1", &user_id, "p1", 1200, 1)])
        .await;
    let cart = app.cart_view_model();
    cart.load().await.unwrap();
    let mut errors = cart.errors().subscribe();

    backend.fail_next("cart_items", RemoteError::Network("offline".into()), 3);
    let err = cart.increment("c1").await.unwrap_err();

    assert!(matches!(&err, StoreError::Call(call) if call.kind() == ErrorKind::NetworkError));
    assert_eq!(cart.state().item("c1").unwrap().quantity, 1);
    assert!(cart.in_flight().snapshot().is_empty());

    let message = errors.recv().await.unwrap();
    assert!(!message.is_empty());
    assert_eq!(message, EnglishMessages.error_message(ErrorKind::NetworkError));
    assert_eq!(backend.rows("cart_items").await[0]["quantity"], 1);
}

#[tokio::test(start_paused = true)]
async fn test_optimistic_value_is_visible_while_pending() {
    let (backend, app, user_id) = signed_in().await;
    backend
        .seed("cart_items", [cart_line("c1", &user_id, "p1", 1200, 1)])
        .await;
    let cart = app.cart_view_model();
    cart.load().await.unwrap();
    backend.set_latency("cart_items", Duration::from_secs(2));

    let mut in_flight = cart.in_flight().subscribe();
    let observer = async {
        in_flight
            .wait_for(|ids| ids.contains("c1"))
            .await
            .map(|_| ())
            .unwrap();
        cart.state().item("c1").map(|item| item.quantity)
    };
    let (result, pending_quantity) = tokio::join!(cart.change_quantity("c1", 2), observer);

    result.unwrap();
    assert_eq!(pending_quantity, Some(2));
    assert_eq!(cart.state().item("c1").unwrap().quantity, 2);
    assert!(!cart.in_flight().contains("c1"));
    assert_eq!(backend.rows("cart_items").await[0]["quantity"], 2);
}

#[tokio::test]
async fn test_missing_session_makes_no_remote_call() {
    let backend = Arc::new(InMemoryBackend::new());
    let app = app_with(&backend);
    let cart = app.cart_view_model();
    let mut errors = cart.errors().subscribe();

    let err = cart.change_quantity("c1", 2).await.unwrap_err();

    assert!(matches!(err, StoreError::InvalidUserId));
    assert_eq!(backend.calls("cart_items"), 0);
    assert_eq!(errors.recv().await.unwrap(), EnglishMessages.invalid_user_id());
    assert!(cart.in_flight().snapshot().is_empty());
}

#[tokio::test]
async fn test_unloaded_entity_is_rejected() {
    let (backend, app, _user_id) = signed_in().await;
    let cart = app.cart_view_model();

    let err = cart.increment("ghost").await.unwrap_err();

    assert!(matches!(err, StoreError::EntityNotLoaded(ref id) if id == "ghost"));
    assert_eq!(backend.calls("cart_items"), 0);
}

#[tokio::test]
async fn test_decrement_at_one_removes_line() {
    let (backend, app, user_id) = signed_in().await;
    backend
        .seed(
            "cart_items",
            [
                cart_line("c1", &user_id, "p1", 1200, 1),
                cart_line("c2", &user_id, "p2", 500, 3),
            ],
        )
        .await;
    let cart = app.cart_view_model();
    cart.load().await.unwrap();

    cart.decrement("c2").await.unwrap();
    cart.decrement("c1").await.unwrap();

    let state = cart.state();
    assert!(state.item("c1").is_none());
    assert_eq!(state.item("c2").unwrap().quantity, 2);
    assert_eq!(state.subtotal().unwrap().0, 1000);
    assert_eq!(backend.rows("cart_items").await.len(), 1);
}

#[tokio::test]
async fn test_failed_remove_restores_line_position() {
    let (backend, app, user_id) = signed_in().await;
    backend
        .seed(
            "cart_items",
            [
                cart_line("c1", &user_id, "p1", 100, 1),
                cart_line("c2", &user_id, "p2", 100, 1),
                cart_line("c3", &user_id, "p3", 100, 1),
            ],
        )
        .await;
    let cart = app.cart_view_model();
    cart.load().await.unwrap();
    let before: Vec<String> = cart.state().items.iter().map(|i| i.id.clone()).collect();

    backend.fail_next("cart_items", RemoteError::Unauthorized("expired".into()), 1);
    cart.remove("c2").await.unwrap_err();

    let after: Vec<String> = cart.state().items.iter().map(|i| i.id.clone()).collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_favorite_toggle_rolls_back_on_rejection() {
    let (backend, app, _user_id) = signed_in().await;
    backend.seed("products", [common::product(1)]).await;
    let catalog = app.catalog_view_model();
    catalog.load_page(0).await.unwrap();
    assert!(!catalog.state().product("p1").unwrap().is_favorite);

    backend.reset_calls();
    backend.fail_next("favorites", RemoteError::BadRequest("policy".into()), 1);
    catalog.toggle_favorite("p1").await.unwrap_err();

    assert!(!catalog.state().product("p1").unwrap().is_favorite);
    assert_eq!(backend.calls("favorites"), 1);

    catalog.toggle_favorite("p1").await.unwrap();
    assert!(catalog.state().product("p1").unwrap().is_favorite);
    assert_eq!(backend.rows("favorites").await.len(), 1);
}

#[tokio::test]
async fn test_history_removal_rolls_back_on_failure() {
    let (backend, app, user_id) = signed_in().await;
    backend
        .seed(
            "search_history",
            [
                history_entry("h1", &user_id, "mug", 1),
                history_entry("h2", &user_id, "tote", 2),
                history_entry("h3", &user_id, "lamp", 3),
            ],
        )
        .await;
    let search = app.search_view_model();
    search.load_history().await.unwrap();
    let queries: Vec<String> = search.state().history.iter().map(|e| e.query.clone()).collect();
    assert_eq!(queries, ["lamp", "tote", "mug"]);

    backend.reset_calls();
    backend.fail_next("search_history", RemoteError::Unauthorized("expired".into()), 1);
    search.remove_history("h2").await.unwrap_err();

    assert_eq!(backend.calls("search_history"), 1);
    assert_eq!(search.state().history[1].id, "h2");

    search.remove_history("h2").await.unwrap();
    assert!(search.state().history.iter().all(|e| e.id != "h2"));
    assert_eq!(backend.rows("search_history").await.len(), 2);
}

#[tokio::test]
async fn test_set_default_moves_flag_and_reloads() {
    let (backend, app, user_id) = signed_in().await;
    backend
        .seed(
            "addresses",
            [
                address("a1", &user_id, "Home", true),
                address("a2", &user_id, "Work", false),
            ],
        )
        .await;
    let addresses = app.address_view_model();
    addresses.load().await.unwrap();

    addresses.set_default("a2").await.unwrap();

    let state = addresses.state();
    assert_eq!(state.default_address().unwrap().id, "a2");
    assert_eq!(state.addresses.iter().filter(|a| a.is_default).count(), 1);
    let rows = backend.rows("addresses").await;
    let stored_default: Vec<&str> = rows
        .iter()
        .filter(|row| row["is_default"] == true)
        .filter_map(|row| row["id"].as_str())
        .collect();
    assert_eq!(stored_default, ["a2"]);
}

#[tokio::test(start_paused = true)]
async fn test_set_default_failure_restores_previous_default() {
    let (backend, app, user_id) = signed_in().await;
    backend
        .seed(
            "addresses",
            [
                address("a1", &user_id, "Home", true),
                address("a2", &user_id, "Work", false),
            ],
        )
        .await;
    let addresses = app.address_view_model();
    addresses.load().await.unwrap();

    backend.fail_next("addresses", RemoteError::Timeout("slow".into()), 3);
    let err = addresses.set_default("a2").await.unwrap_err();

    assert!(matches!(&err, StoreError::Call(call) if call.attempts() == 3));
    assert_eq!(addresses.state().default_address().unwrap().id, "a1");
}

fn stored_defaults(rows: &[serde_json::Value]) -> Vec<&str> {
    rows.iter()
        .filter(|row| row["is_default"] == true)
        .filter_map(|row| row["id"].as_str())
        .collect()
}

#[tokio::test]
async fn test_set_default_on_deleted_address_keeps_previous_default() {
    let (backend, app, user_id) = signed_in().await;
    backend
        .seed(
            "addresses",
            [
                address("a1", &user_id, "Home", true),
                address("a2", &user_id, "Work", false),
            ],
        )
        .await;
    let addresses = app.address_view_model();
    addresses.load().await.unwrap();
    backend
        .delete("addresses", &RowFilter::new().eq("id", "a2"))
        .await
        .unwrap();

    let err = addresses.set_default("a2").await.unwrap_err();

    assert!(matches!(&err, StoreError::Call(call) if call.kind() == ErrorKind::NotFound));
    assert_eq!(stored_defaults(&backend.rows("addresses").await), ["a1"]);
    let state = addresses.state();
    assert_eq!(state.addresses.len(), 1);
    assert_eq!(state.default_address().unwrap().id, "a1");
}

#[tokio::test(start_paused = true)]
async fn test_set_default_restores_server_flag_when_second_step_fails() {
    let (backend, app, user_id) = signed_in().await;
    backend
        .seed(
            "addresses",
            [
                address("a1", &user_id, "Home", true),
                address("a2", &user_id, "Work", false),
            ],
        )
        .await;
    let addresses = app.address_view_model();
    addresses.load().await.unwrap();

    backend.fail_after("addresses", 1, RemoteError::Timeout("slow".into()), 3);
    let err = addresses.set_default("a2").await.unwrap_err();

    assert!(matches!(&err, StoreError::Call(call) if call.kind() == ErrorKind::Timeout));
    assert_eq!(stored_defaults(&backend.rows("addresses").await), ["a1"]);
    assert_eq!(addresses.state().default_address().unwrap().id, "a1");
}

fn quantity(state: &HashMap<String, i64>, id: &str) -> Option<i64> {
    state.get(id).copied()
}

fn set_quantity(state: &mut HashMap<String, i64>, id: &str, value: i64) {
    state.insert(id.to_string(), value);
}

#[tokio::test]
#[allow(unreachable_code)]
async fn test_in_flight_cleared_when_remote_panics() {
    let controller = OptimisticController::new(
        HashMap::from([("c1".to_string(), 1)]),
        Arc::new(EnglishMessages),
    );
    let task_controller = controller.clone();

    let outcome = tokio::spawn(async move {
        task_controller
            .mutate(
                MutationRequest::new(Some("u1"), "c1"),
                quantity,
                set_quantity,
                |v| v + 1,
                |_, _| async {
                    panic!("backend client panicked");
                    Ok::<(), CallError>(())
                },
            )
            .await
    })
    .await;

    assert!(outcome.unwrap_err().is_panic());
    assert!(!controller.in_flight().contains("c1"));
}

#[tokio::test]
async fn test_concurrent_mutations_on_distinct_entities() {
    let (backend, app, user_id) = signed_in().await;
    backend
        .seed(
            "cart_items",
            [
                cart_line("c1", &user_id, "p1", 100, 1),
                cart_line("c2", &user_id, "p2", 100, 5),
            ],
        )
        .await;
    let cart = app.cart_view_model();
    cart.load().await.unwrap();

    let (first, second) = tokio::join!(cart.increment("c1"), cart.decrement("c2"));
    first.unwrap();
    second.unwrap();

    let state = cart.state();
    assert_eq!(state.item("c1").unwrap().quantity, 2);
    assert_eq!(state.item("c2").unwrap().quantity, 4);
    assert!(cart.in_flight().snapshot().is_empty());
}
