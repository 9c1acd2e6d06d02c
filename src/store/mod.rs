//! Persistence seams for the cart and the order aggregate.
//!
//! The service layer only sees these traits, so tests can substitute the
//! in-memory implementation in [`memory`] for the Postgres one in
//! [`postgres`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{CartItemEntity, NewCartItemEntity, NewOrderDetailEntity, NewOrderEntity, OrderDetailEntity, OrderEntity},
};

/// Result of the cart-to-order migration transaction.
#[derive(Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Detail rows were inserted and the user's cart was cleared.
    Migrated(usize),
    /// Detail rows already existed for this order; nothing was changed.
    AlreadyMigrated,
}

/// Result of the monotonic completion update.
#[derive(Debug)]
pub enum CompletionOutcome {
    /// The order transitioned from incomplete to complete just now.
    Completed(OrderEntity),
    /// The order was already complete; a successful no-op.
    AlreadyComplete(OrderEntity),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: NewOrderEntity) -> Result<OrderEntity, AppError>;

    async fn find(&self, order_id: Uuid) -> Result<Option<OrderEntity>, AppError>;

    async fn for_user(&self, user_id: i32) -> Result<Vec<OrderEntity>, AppError>;

    async fn details(&self, order_id: Uuid) -> Result<Vec<OrderDetailEntity>, AppError>;

    /// Single logical transaction boundary of the migration: inserts all
    /// detail rows, reconciles the order's total with the sum of the
    /// captured line items, and deletes the user's cart rows, all or
    /// nothing. If detail rows already exist for `order_id`, does nothing
    /// and reports [`MigrationOutcome::AlreadyMigrated`].
    async fn migrate_cart(
        &self,
        user_id: i32,
        order_id: Uuid,
        details: Vec<NewOrderDetailEntity>,
    ) -> Result<MigrationOutcome, AppError>;

    /// Monotonic set-to-true of the completion flag. Never toggles; safe
    /// under concurrent invocation from the HTTP surface and the payment
    /// event listener.
    async fn complete(&self, order_id: Uuid) -> Result<CompletionOutcome, AppError>;

    /// Updates the delivery address of a not-yet-complete order.
    async fn set_address(&self, order_id: Uuid, address: String) -> Result<OrderEntity, AppError>;

    /// Updates the promise date of a not-yet-complete order.
    async fn set_promise_date(
        &self,
        order_id: Uuid,
        promise_date: NaiveDate,
    ) -> Result<OrderEntity, AppError>;

    /// Deletes the order and its detail rows, details first, in one
    /// transaction.
    async fn delete(&self, order_id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn items_for_user(&self, user_id: i32) -> Result<Vec<CartItemEntity>, AppError>;

    /// Inserts or updates one (user, product, size) line. A quantity of
    /// zero or less deletes the line instead; removed items are never
    /// retained as zero.
    async fn upsert_item(
        &self,
        item: NewCartItemEntity,
    ) -> Result<Option<CartItemEntity>, AppError>;

    async fn remove_item(&self, user_id: i32, product_id: i32, size: &str)
    -> Result<(), AppError>;
}
