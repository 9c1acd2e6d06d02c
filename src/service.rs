//! Order lifecycle orchestration.
//!
//! `OrderService` owns the cross-store coordination: cart-to-order
//! migration with stock validation, monotonic completion, and the
//! payment-event side of the lifecycle. All collaborators are injected
//! behind traits so tests can run against the in-memory implementations.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    api::catalog::StockValidator,
    bus::EventPublisher,
    error::{AppError, StockShortage},
    events::{ORDERS_TOPIC, ORDER_COMPLETED, OrderCompletedEvent, OrderItemSnapshot, PaymentCompletedEvent},
    models::{NewOrderDetailEntity, NewOrderEntity, OrderDetailEntity, OrderEntity},
    store::{CartStore, CompletionOutcome, MigrationOutcome, OrderStore},
};

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    carts: Arc<dyn CartStore>,
    stock: Arc<dyn StockValidator>,
    publisher: EventPublisher,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
        stock: Arc<dyn StockValidator>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            orders,
            carts,
            stock,
            publisher,
        }
    }

    pub fn carts(&self) -> &Arc<dyn CartStore> {
        &self.carts
    }

    /// Creates an order in the incomplete state and returns its generated
    /// identifier. Deliberately touches nothing but the orders table; the
    /// cart is only consumed by [`Self::move_cart_to_order`]. A zero total
    /// is accepted here: the client value is an estimate, and migration
    /// reconciles the total with the priced line items.
    pub async fn create_order(
        &self,
        user_id: i32,
        address: String,
        total_amount: f32,
        promise_date: NaiveDate,
    ) -> Result<Uuid, AppError> {
        let address = address.trim().to_string();
        if address.is_empty() {
            return Err(AppError::Validation("address is required".to_string()));
        }
        if !total_amount.is_finite() || total_amount < 0.0 {
            return Err(AppError::Validation(
                "total_amount must be a non-negative number".to_string(),
            ));
        }

        let order_id = Uuid::new_v4();
        self.orders
            .create(NewOrderEntity {
                id: order_id,
                user_id,
                promise_date,
                address,
                total_amount,
                is_complete: false,
            })
            .await?;

        tracing::info!("Created order {} for user {}", order_id, user_id);
        Ok(order_id)
    }

    /// Migrates the user's cart into order detail rows.
    ///
    /// Saga shape: validate stock against fresh catalog levels, then insert
    /// all detail rows and clear the cart inside one store transaction.
    /// Re-entry after a successful run is a no-op, keyed on detail rows
    /// already existing for the order, so client retries are safe.
    pub async fn move_cart_to_order(
        &self,
        user_id: i32,
        order_id: Uuid,
    ) -> Result<MigrationOutcome, AppError> {
        let order = self
            .orders
            .find(order_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if order.user_id != user_id {
            return Err(AppError::Validation(format!(
                "Order {order_id} does not belong to user {user_id}"
            )));
        }
        if order.is_complete {
            return Err(AppError::Validation(
                "Cannot migrate a cart into a completed order".to_string(),
            ));
        }

        // A retry after a successful migration finds an empty cart, so the
        // already-migrated check has to come before the empty-cart check.
        if !self.orders.details(order_id).await?.is_empty() {
            tracing::info!("Order {} already has detail rows, skipping migration", order_id);
            return Ok(MigrationOutcome::AlreadyMigrated);
        }

        let items = self.carts.items_for_user(user_id).await?;
        if items.is_empty() {
            return Err(AppError::Validation(format!(
                "Cart for user {user_id} is empty"
            )));
        }

        let mut product_ids: Vec<i32> = items.iter().map(|item| item.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let levels = self.stock.stock_levels(&product_ids).await?;
        let levels: HashMap<(i32, String), _> = levels
            .into_iter()
            .map(|level| ((level.product_id, level.size.clone()), level))
            .collect();

        let mut shortages = Vec::new();
        let mut details = Vec::with_capacity(items.len());
        for item in &items {
            let key = (item.product_id, item.size.clone());
            match levels.get(&key) {
                Some(level) if level.available >= item.quantity => {
                    details.push(NewOrderDetailEntity {
                        id: Uuid::new_v4(),
                        order_id,
                        product_id: item.product_id,
                        size: item.size.clone(),
                        quantity: item.quantity,
                        // Price is captured here, not referenced live, so
                        // later catalog changes never rewrite order history.
                        unit_price: level.unit_price,
                        user_id,
                    });
                }
                Some(level) => shortages.push(StockShortage {
                    product_id: item.product_id,
                    size: item.size.clone(),
                    requested: item.quantity,
                    available: level.available,
                }),
                None => shortages.push(StockShortage {
                    product_id: item.product_id,
                    size: item.size.clone(),
                    requested: item.quantity,
                    available: 0,
                }),
            }
        }

        if !shortages.is_empty() {
            return Err(AppError::InsufficientStock(shortages));
        }

        let outcome = self.orders.migrate_cart(user_id, order_id, details).await?;
        match &outcome {
            MigrationOutcome::Migrated(count) => {
                tracing::info!("Migrated {} cart items into order {}", count, order_id);
            }
            MigrationOutcome::AlreadyMigrated => {
                tracing::info!("Order {} was migrated concurrently, no-op", order_id);
            }
        }
        Ok(outcome)
    }

    /// Sets the completion flag. Completion is monotonic: `true` is an
    /// idempotent set, `false` against a completed order is rejected
    /// (reopening is not a supported business operation), `false` against
    /// an incomplete order is a no-op.
    pub async fn set_order_status(
        &self,
        order_id: Uuid,
        is_complete: bool,
    ) -> Result<OrderEntity, AppError> {
        if is_complete {
            let order = match self.orders.complete(order_id).await? {
                CompletionOutcome::Completed(order) => {
                    tracing::info!("Order {} marked complete", order_id);
                    order
                }
                CompletionOutcome::AlreadyComplete(order) => order,
            };
            return Ok(order);
        }

        let order = self
            .orders
            .find(order_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if order.is_complete {
            return Err(AppError::Validation(
                "Reopening a completed order is not supported".to_string(),
            ));
        }
        Ok(order)
    }

    pub async fn order(&self, order_id: Uuid) -> Result<OrderEntity, AppError> {
        self.orders
            .find(order_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn orders_for_user(&self, user_id: i32) -> Result<Vec<OrderEntity>, AppError> {
        self.orders.for_user(user_id).await
    }

    pub async fn order_details(&self, order_id: Uuid) -> Result<Vec<OrderDetailEntity>, AppError> {
        let details = self.orders.details(order_id).await?;
        if details.is_empty() {
            return Err(AppError::NotFound);
        }
        Ok(details)
    }

    pub async fn set_address(
        &self,
        order_id: Uuid,
        address: String,
    ) -> Result<OrderEntity, AppError> {
        let address = address.trim().to_string();
        if address.is_empty() {
            return Err(AppError::Validation("address is required".to_string()));
        }
        self.orders.set_address(order_id, address).await
    }

    pub async fn set_promise_date(
        &self,
        order_id: Uuid,
        promise_date: NaiveDate,
    ) -> Result<OrderEntity, AppError> {
        self.orders.set_promise_date(order_id, promise_date).await
    }

    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), AppError> {
        self.orders.delete(order_id).await?;
        tracing::info!("Deleted order {} and its detail rows", order_id);
        Ok(())
    }

    /// Listener side of the lifecycle: drives an order to complete in
    /// response to a `payment.completed` event and announces the result.
    ///
    /// Events referencing unknown orders, or orders whose cart has not
    /// been migrated yet (a payment racing ahead of migration), are stale
    /// or out-of-order bus traffic and are dropped with a warning: only an
    /// order that already has detail rows may be completed from here.
    /// Duplicate deliveries are absorbed by the monotonic completion: only
    /// the delivery that actually performs the transition publishes
    /// `order.completed`, and the published item list always comes from
    /// the persisted detail rows, never from the inbound event.
    pub async fn complete_from_payment(
        &self,
        event: PaymentCompletedEvent,
    ) -> Result<(), AppError> {
        let Some(order) = self.orders.find(event.order_id).await? else {
            tracing::warn!(
                "Dropping payment.completed for unknown order {} (payment {})",
                event.order_id,
                event.payment_id
            );
            return Ok(());
        };

        let details = self.orders.details(order.id).await?;
        if details.is_empty() {
            tracing::warn!(
                "Dropping payment.completed for order {} with no detail rows (payment {})",
                order.id,
                event.payment_id
            );
            return Ok(());
        }

        let outcome = match self.orders.complete(order.id).await {
            Ok(outcome) => outcome,
            // The order can be deleted between the lookup and the update.
            Err(AppError::NotFound) => {
                tracing::warn!(
                    "Order {} disappeared while handling payment {}",
                    order.id,
                    event.payment_id
                );
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        match outcome {
            CompletionOutcome::Completed(order) => {
                let items = details
                    .iter()
                    .map(|detail| OrderItemSnapshot {
                        product_id: detail.product_id,
                        quantity: detail.quantity,
                        size: detail.size.clone(),
                    })
                    .collect();
                self.publisher
                    .publish(
                        ORDERS_TOPIC,
                        ORDER_COMPLETED,
                        OrderCompletedEvent {
                            order_id: order.id,
                            user_id: order.user_id,
                            payment_id: event.payment_id,
                            items,
                        },
                    )
                    .await?;
                tracing::info!("Order {} completed by payment event", order.id);
            }
            CompletionOutcome::AlreadyComplete(order) => {
                tracing::info!(
                    "Order {} already complete, ignoring duplicate payment {}",
                    order.id,
                    event.payment_id
                );
            }
        }

        Ok(())
    }
}
