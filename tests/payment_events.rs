//! Payment-event side of the lifecycle: duplicate delivery, stale events,
//! and the `order.completed` publication contract.

mod common;

use common::{create_order, harness};
use storefront_orderservice::{
    error::AppError,
    events::{ORDERS_TOPIC, OrderCompletedEvent, PaymentCompletedEvent},
    store::OrderStore,
};
use uuid::Uuid;

fn payment_event(order_id: Uuid, user_id: i32) -> PaymentCompletedEvent {
    PaymentCompletedEvent {
        order_id,
        user_id,
        payment_id: "PAY1".to_string(),
    }
}

#[tokio::test]
async fn payment_completed_marks_the_order_complete_and_publishes_its_items() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 2);
    h.store.seed_cart_item(1, 11, "10", 1);
    h.stock.set_level(10, "9", 25.0, 5);
    h.stock.set_level(11, "10", 40.0, 2);
    let order_id = create_order(&h, 1, 90.0).await;
    h.service.move_cart_to_order(1, order_id).await.unwrap();

    h.service
        .complete_from_payment(payment_event(order_id, 1))
        .await
        .unwrap();

    assert!(h.service.order(order_id).await.unwrap().is_complete);

    let envelopes = h.bus.envelopes_on::<OrderCompletedEvent>(ORDERS_TOPIC);
    assert_eq!(envelopes.len(), 1);
    let envelope = &envelopes[0];
    assert_eq!(envelope.event_type, "order.completed");
    assert_eq!(envelope.origin_service, "OrderService");
    assert_eq!(envelope.data.order_id, order_id);
    assert_eq!(envelope.data.user_id, 1);
    assert_eq!(envelope.data.payment_id, "PAY1");

    // The item list mirrors the persisted detail rows.
    let details = h.store.details(order_id).await.unwrap();
    assert_eq!(envelope.data.items.len(), details.len());
    for detail in &details {
        assert!(envelope.data.items.iter().any(|item| {
            item.product_id == detail.product_id
                && item.quantity == detail.quantity
                && item.size == detail.size
        }));
    }
}

#[tokio::test]
async fn duplicate_delivery_publishes_exactly_once() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 2);
    h.stock.set_level(10, "9", 25.0, 5);
    let order_id = create_order(&h, 1, 50.0).await;
    h.service.move_cart_to_order(1, order_id).await.unwrap();

    h.service
        .complete_from_payment(payment_event(order_id, 1))
        .await
        .unwrap();
    h.service
        .complete_from_payment(payment_event(order_id, 1))
        .await
        .unwrap();

    assert!(h.service.order(order_id).await.unwrap().is_complete);
    assert_eq!(
        h.bus.envelopes_on::<OrderCompletedEvent>(ORDERS_TOPIC).len(),
        1
    );
}

#[tokio::test]
async fn payment_racing_an_http_completion_still_publishes_once() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 2);
    h.stock.set_level(10, "9", 25.0, 5);
    let order_id = create_order(&h, 1, 50.0).await;
    h.service.move_cart_to_order(1, order_id).await.unwrap();

    // An admin marks the order complete over HTTP before the event lands.
    h.service.set_order_status(order_id, true).await.unwrap();

    h.service
        .complete_from_payment(payment_event(order_id, 1))
        .await
        .unwrap();

    assert!(h.service.order(order_id).await.unwrap().is_complete);
    assert!(h.bus.envelopes_on::<OrderCompletedEvent>(ORDERS_TOPIC).is_empty());
}

#[tokio::test]
async fn events_for_unknown_orders_are_dropped() {
    let h = harness();

    h.service
        .complete_from_payment(payment_event(Uuid::new_v4(), 1))
        .await
        .unwrap();

    assert!(h.bus.published_on(ORDERS_TOPIC).is_empty());
    assert!(h.service.orders_for_user(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn events_arriving_before_migration_are_dropped() {
    let h = harness();
    let order_id = create_order(&h, 1, 50.0).await;

    // The payment event overtakes the cart migration; an order without
    // detail rows must not be completed by the listener.
    h.service
        .complete_from_payment(payment_event(order_id, 1))
        .await
        .unwrap();

    assert!(!h.service.order(order_id).await.unwrap().is_complete);
    assert!(h.bus.published_on(ORDERS_TOPIC).is_empty());
}

#[tokio::test]
async fn publish_failure_surfaces_without_rolling_back_completion() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 2);
    h.stock.set_level(10, "9", 25.0, 5);
    let order_id = create_order(&h, 1, 50.0).await;
    h.service.move_cart_to_order(1, order_id).await.unwrap();

    h.bus.fail_next_publish();
    let err = h
        .service
        .complete_from_payment(payment_event(order_id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Messaging(_)));

    // The completion was committed before the publish attempt; only the
    // notification was lost, and the error lets the runtime dead-letter
    // the inbound event for replay.
    assert!(h.service.order(order_id).await.unwrap().is_complete);
    assert!(h.bus.published_on(ORDERS_TOPIC).is_empty());
}

#[tokio::test]
async fn events_for_deleted_orders_are_dropped() {
    let h = harness();
    h.store.seed_cart_item(1, 10, "9", 1);
    h.stock.set_level(10, "9", 25.0, 5);
    let order_id = create_order(&h, 1, 25.0).await;
    h.service.move_cart_to_order(1, order_id).await.unwrap();
    h.service.delete_order(order_id).await.unwrap();

    h.service
        .complete_from_payment(payment_event(order_id, 1))
        .await
        .unwrap();

    assert!(h.bus.published_on(ORDERS_TOPIC).is_empty());
}
