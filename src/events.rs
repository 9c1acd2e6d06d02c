//! Wire types exchanged over the event channels.
//!
//! Every outbound message is an [`EventEnvelope`] carrying a typed payload;
//! inbound payment-channel messages are validated against
//! [`PaymentTopicEvent`] so that unknown shapes are detected at the edge
//! instead of failing deep inside a handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Logical topic carrying payment-service notifications.
pub const PAYMENTS_TOPIC: &str = "payments";
/// Logical topic carrying order lifecycle notifications for downstream
/// consumers (fulfillment, notifications).
pub const ORDERS_TOPIC: &str = "orders";

pub const PAYMENT_COMPLETED: &str = "payment.completed";
pub const ORDER_COMPLETED: &str = "order.completed";

/// Common wrapper around every bus message.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EventEnvelope<T> {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: T,
    pub timestamp: DateTime<Utc>,
    pub origin_service: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaymentCompletedEvent {
    pub order_id: Uuid,
    pub user_id: i32,
    pub payment_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrderCompletedEvent {
    pub order_id: Uuid,
    pub user_id: i32,
    pub payment_id: String,
    pub items: Vec<OrderItemSnapshot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrderItemSnapshot {
    pub product_id: i32,
    pub quantity: i32,
    pub size: String,
}

/// Validated view of a payment-topic message. Envelope fields other than
/// `type` and `data` are irrelevant to dispatch and ignored here.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", content = "data")]
pub enum PaymentTopicEvent {
    #[serde(rename = "payment.completed")]
    PaymentCompleted(PaymentCompletedEvent),
    #[serde(other)]
    Unknown,
}
