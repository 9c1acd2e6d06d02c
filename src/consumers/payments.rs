//! Payment event listener: drives order completion from the payments
//! topic.
//!
//! Malformed payloads, unknown event types, and events for orders that no
//! longer exist are logged and dropped (`Ok`, so the runtime acks them) —
//! redelivering them could never succeed. Store or bus failures bubble up
//! as `Err`, which the consumer runtime turns into a nack without requeue
//! so the message lands in the dead-letter queue.

use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use lapin::message::Delivery;
use tracing::{info, warn};

use crate::{events::PaymentTopicEvent, state::AppState};

pub fn payment_completed(
    delivery: Delivery,
    state: Arc<AppState>,
) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let event = match serde_json::from_slice::<PaymentTopicEvent>(&delivery.data) {
            Ok(PaymentTopicEvent::PaymentCompleted(event)) => event,
            Ok(PaymentTopicEvent::Unknown) => {
                warn!("Dropping payment event with unknown type");
                return Ok(());
            }
            Err(err) => {
                warn!("Dropping malformed payment event: {}", err);
                return Ok(());
            }
        };

        info!(
            "Received payment.completed for order {} (payment {})",
            event.order_id, event.payment_id
        );
        state.orders.complete_from_payment(event).await?;

        Ok(())
    })
}
