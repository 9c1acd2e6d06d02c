//! Order creation, cart migration, and status transition behavior, driven
//! through the in-memory store, stock, and bus implementations.

mod common;

use common::{create_order, harness, promise_date};
use storefront_orderservice::{
    error::AppError,
    store::{CartStore, MigrationOutcome, OrderStore},
};
use uuid::Uuid;

#[tokio::test]
async fn create_order_persists_an_incomplete_order() {
    let h = harness();
    let order_id = create_order(&h, 1, 50.0).await;

    let order = h.service.order(order_id).await.unwrap();
    assert_eq!(order.user_id, 1);
    assert_eq!(order.address, "1 Main St");
    assert_eq!(order.total_amount, 50.0);
    assert_eq!(order.promise_date, promise_date());
    assert!(!order.is_complete);
}

#[tokio::test]
async fn create_order_rejects_a_blank_address() {
    let h = harness();
    let err = h
        .service
        .create_order(1, "   ".to_string(), 50.0, promise_date())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn create_order_does_not_touch_the_cart() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 2);

    create_order(&h, 1, 50.0).await;

    let cart = h.store.items_for_user(1).await.unwrap();
    assert_eq!(cart.len(), 1);
}

#[tokio::test]
async fn migration_moves_every_cart_item_and_empties_the_cart() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 2);
    h.store.seed_cart_item(1, 11, "10", 1);
    h.stock.set_level(10, "9", 25.0, 5);
    h.stock.set_level(11, "10", 40.0, 1);
    let order_id = create_order(&h, 1, 90.0).await;

    let outcome = h.service.move_cart_to_order(1, order_id).await.unwrap();
    assert_eq!(outcome, MigrationOutcome::Migrated(2));

    let details = h.service.order_details(order_id).await.unwrap();
    assert_eq!(details.len(), 2);
    assert!(h.store.items_for_user(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn migration_only_consumes_the_owning_users_cart() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 1);
    h.store.seed_cart_item(2, 10, "9", 3);
    h.stock.set_level(10, "9", 25.0, 10);
    let order_id = create_order(&h, 1, 25.0).await;

    h.service.move_cart_to_order(1, order_id).await.unwrap();

    assert!(h.store.items_for_user(1).await.unwrap().is_empty());
    assert_eq!(h.store.items_for_user(2).await.unwrap().len(), 1);
}

#[tokio::test]
async fn migration_captures_the_price_at_migration_time() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 2);
    h.stock.set_level(10, "9", 25.0, 5);
    let order_id = create_order(&h, 1, 50.0).await;

    h.service.move_cart_to_order(1, order_id).await.unwrap();

    // A later catalog price change must not rewrite order history.
    h.stock.set_level(10, "9", 99.0, 5);

    let details = h.service.order_details(order_id).await.unwrap();
    assert_eq!(details[0].unit_price, 25.0);
}

#[tokio::test]
async fn migration_reconciles_the_order_total_with_its_line_items() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 2);
    h.stock.set_level(10, "9", 25.0, 5);
    // The client-supplied estimate disagrees with what the cart prices to.
    let order_id = create_order(&h, 1, 999.0).await;

    h.service.move_cart_to_order(1, order_id).await.unwrap();

    let order = h.service.order(order_id).await.unwrap();
    assert_eq!(order.total_amount, 50.0);
}

#[tokio::test]
async fn create_order_accepts_a_zero_total_until_migration_prices_it() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 1);
    h.stock.set_level(10, "9", 25.0, 5);

    let order_id = create_order(&h, 1, 0.0).await;
    assert_eq!(h.service.order(order_id).await.unwrap().total_amount, 0.0);

    h.service.move_cart_to_order(1, order_id).await.unwrap();
    assert_eq!(h.service.order(order_id).await.unwrap().total_amount, 25.0);
}

#[tokio::test]
async fn migration_with_insufficient_stock_changes_nothing() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 2);
    h.store.seed_cart_item(1, 11, "10", 5);
    h.stock.set_level(10, "9", 25.0, 5);
    h.stock.set_level(11, "10", 40.0, 1);
    let order_id = create_order(&h, 1, 250.0).await;

    let err = h.service.move_cart_to_order(1, order_id).await.unwrap_err();
    match err {
        AppError::InsufficientStock(shortages) => {
            assert_eq!(shortages.len(), 1);
            assert_eq!(shortages[0].product_id, 11);
            assert_eq!(shortages[0].size, "10");
            assert_eq!(shortages[0].requested, 5);
            assert_eq!(shortages[0].available, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Atomicity: zero detail rows, cart untouched.
    assert!(h.store.details(order_id).await.unwrap().is_empty());
    assert_eq!(h.store.items_for_user(1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn migration_treats_unknown_catalog_entries_as_unavailable() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 1);
    let order_id = create_order(&h, 1, 25.0).await;

    let err = h.service.move_cart_to_order(1, order_id).await.unwrap_err();
    match err {
        AppError::InsufficientStock(shortages) => {
            assert_eq!(shortages[0].product_id, 10);
            assert_eq!(shortages[0].available, 0);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
}

#[tokio::test]
async fn migration_is_idempotent_across_retries() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 2);
    h.stock.set_level(10, "9", 25.0, 5);
    let order_id = create_order(&h, 1, 50.0).await;

    let first = h.service.move_cart_to_order(1, order_id).await.unwrap();
    assert_eq!(first, MigrationOutcome::Migrated(1));

    let second = h.service.move_cart_to_order(1, order_id).await.unwrap();
    assert_eq!(second, MigrationOutcome::AlreadyMigrated);

    let details = h.service.order_details(order_id).await.unwrap();
    assert_eq!(details.len(), 1);
}

#[tokio::test]
async fn migration_rejects_a_foreign_order() {
    let h = harness();
    h.store.seed_cart_item(2, 10, "9", 1);
    h.stock.set_level(10, "9", 25.0, 5);
    let order_id = create_order(&h, 1, 25.0).await;

    let err = h.service.move_cart_to_order(2, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn migration_rejects_an_empty_cart() {
    let h = harness();
    let order_id = create_order(&h, 1, 0.0).await;

    let err = h.service.move_cart_to_order(1, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn migration_into_an_unknown_order_is_not_found() {
    let h = harness();
    let err = h
        .service
        .move_cart_to_order(1, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn end_to_end_single_item_migration_scenario() {
    let h = harness();
    let order_id = create_order(&h, 1, 50.0).await;
    h.store.seed_cart_item(1, 1, "9", 2);
    h.stock.set_level(1, "9", 25.0, 10);

    h.service.move_cart_to_order(1, order_id).await.unwrap();

    let details = h.service.order_details(order_id).await.unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].product_id, 1);
    assert_eq!(details[0].quantity, 2);
    assert_eq!(details[0].unit_price, 25.0);
    assert!(h.store.items_for_user(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn completion_is_monotonic_under_concurrent_callers() {
    let h = harness();
    let order_id = create_order(&h, 1, 50.0).await;

    let a = h.service.set_order_status(order_id, true);
    let b = h.service.set_order_status(order_id, true);
    let (a, b) = tokio::join!(a, b);

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert!(h.service.order(order_id).await.unwrap().is_complete);
}

#[tokio::test]
async fn reopening_a_completed_order_is_rejected() {
    let h = harness();
    let order_id = create_order(&h, 1, 50.0).await;
    h.service.set_order_status(order_id, true).await.unwrap();

    let err = h
        .service
        .set_order_status(order_id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(h.service.order(order_id).await.unwrap().is_complete);
}

#[tokio::test]
async fn setting_incomplete_on_an_incomplete_order_is_a_noop() {
    let h = harness();
    let order_id = create_order(&h, 1, 50.0).await;

    let order = h.service.set_order_status(order_id, false).await.unwrap();
    assert!(!order.is_complete);
}

#[tokio::test]
async fn address_edits_are_rejected_once_complete() {
    let h = harness();
    let order_id = create_order(&h, 1, 50.0).await;

    let updated = h
        .service
        .set_address(order_id, "2 Side St".to_string())
        .await
        .unwrap();
    assert_eq!(updated.address, "2 Side St");

    h.service.set_order_status(order_id, true).await.unwrap();
    let err = h
        .service
        .set_address(order_id, "3 Other St".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn details_of_a_detailless_order_are_not_found() {
    let h = harness();
    let order_id = create_order(&h, 1, 50.0).await;

    let err = h.service.order_details(order_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn deleting_an_order_removes_its_detail_rows() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 2);
    h.stock.set_level(10, "9", 25.0, 5);
    let order_id = create_order(&h, 1, 50.0).await;
    h.service.move_cart_to_order(1, order_id).await.unwrap();

    h.service.delete_order(order_id).await.unwrap();

    assert!(matches!(
        h.service.order(order_id).await.unwrap_err(),
        AppError::NotFound
    ));
    assert!(h.store.details(order_id).await.unwrap().is_empty());
}
