//! In-memory implementation of the cart and order stores, for tests and
//! local development without a database. One shared state backs both
//! traits so `migrate_cart` can span the cart and order tables the way the
//! Postgres transaction does.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{CartItemEntity, NewCartItemEntity, NewOrderDetailEntity, NewOrderEntity, OrderDetailEntity, OrderEntity},
    store::{CartStore, CompletionOutcome, MigrationOutcome, OrderStore},
};

#[derive(Default)]
struct Inner {
    orders: Vec<OrderEntity>,
    details: Vec<OrderDetailEntity>,
    cart_items: Vec<CartItemEntity>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct cart seeding for tests, bypassing the upsert path.
    pub fn seed_cart_item(&self, user_id: i32, product_id: i32, size: &str, quantity: i32) {
        let now = Utc::now();
        self.inner.lock().unwrap().cart_items.push(CartItemEntity {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            size: size.to_string(),
            quantity,
            added_at: now,
            updated_at: now,
        });
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create(&self, order: NewOrderEntity) -> Result<OrderEntity, AppError> {
        let now = Utc::now();
        let entity = OrderEntity {
            id: order.id,
            user_id: order.user_id,
            order_date: now,
            promise_date: order.promise_date,
            address: order.address,
            total_amount: order.total_amount,
            is_complete: order.is_complete,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.lock().unwrap();
        if inner.orders.iter().any(|o| o.id == entity.id) {
            return Err(AppError::Persistence("duplicate order id".to_string()));
        }
        inner.orders.push(entity.clone());
        Ok(entity)
    }

    async fn find(&self, order_id: Uuid) -> Result<Option<OrderEntity>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn for_user(&self, user_id: i32) -> Result<Vec<OrderEntity>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<OrderEntity> = inner
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }

    async fn details(&self, order_id: Uuid) -> Result<Vec<OrderDetailEntity>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .details
            .iter()
            .filter(|d| d.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn migrate_cart(
        &self,
        user_id: i32,
        order_id: Uuid,
        details: Vec<NewOrderDetailEntity>,
    ) -> Result<MigrationOutcome, AppError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.details.iter().any(|d| d.order_id == order_id) {
            return Ok(MigrationOutcome::AlreadyMigrated);
        }

        let now = Utc::now();
        let inserted = details.len();
        let total_amount: f32 = details
            .iter()
            .map(|detail| detail.quantity as f32 * detail.unit_price)
            .sum();
        for detail in details {
            inner.details.push(OrderDetailEntity {
                id: detail.id,
                order_id: detail.order_id,
                product_id: detail.product_id,
                size: detail.size,
                quantity: detail.quantity,
                unit_price: detail.unit_price,
                user_id: detail.user_id,
                created_at: now,
            });
        }
        if let Some(order) = inner.orders.iter_mut().find(|o| o.id == order_id) {
            order.total_amount = total_amount;
            order.updated_at = now;
        }
        inner.cart_items.retain(|item| item.user_id != user_id);

        Ok(MigrationOutcome::Migrated(inserted))
    }

    async fn complete(&self, order_id: Uuid) -> Result<CompletionOutcome, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(AppError::NotFound)?;

        if order.is_complete {
            return Ok(CompletionOutcome::AlreadyComplete(order.clone()));
        }
        order.is_complete = true;
        order.updated_at = Utc::now();
        Ok(CompletionOutcome::Completed(order.clone()))
    }

    async fn set_address(&self, order_id: Uuid, address: String) -> Result<OrderEntity, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(AppError::NotFound)?;
        if order.is_complete {
            return Err(AppError::Validation(
                "Cannot edit a completed order".to_string(),
            ));
        }
        order.address = address;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn set_promise_date(
        &self,
        order_id: Uuid,
        promise_date: NaiveDate,
    ) -> Result<OrderEntity, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(AppError::NotFound)?;
        if order.is_complete {
            return Err(AppError::Validation(
                "Cannot edit a completed order".to_string(),
            ));
        }
        order.promise_date = promise_date;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn delete(&self, order_id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.orders.iter().any(|o| o.id == order_id) {
            return Err(AppError::NotFound);
        }
        inner.details.retain(|d| d.order_id != order_id);
        inner.orders.retain(|o| o.id != order_id);
        Ok(())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn items_for_user(&self, user_id: i32) -> Result<Vec<CartItemEntity>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<CartItemEntity> = inner
            .cart_items
            .iter()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.added_at.cmp(&b.added_at));
        Ok(rows)
    }

    async fn upsert_item(
        &self,
        item: NewCartItemEntity,
    ) -> Result<Option<CartItemEntity>, AppError> {
        let mut inner = self.inner.lock().unwrap();

        if item.quantity <= 0 {
            inner.cart_items.retain(|existing| {
                !(existing.user_id == item.user_id
                    && existing.product_id == item.product_id
                    && existing.size == item.size)
            });
            return Ok(None);
        }

        let now = Utc::now();
        if let Some(existing) = inner.cart_items.iter_mut().find(|existing| {
            existing.user_id == item.user_id
                && existing.product_id == item.product_id
                && existing.size == item.size
        }) {
            existing.quantity = item.quantity;
            existing.updated_at = now;
            return Ok(Some(existing.clone()));
        }

        let entity = CartItemEntity {
            id: item.id,
            user_id: item.user_id,
            product_id: item.product_id,
            size: item.size,
            quantity: item.quantity,
            added_at: now,
            updated_at: now,
        };
        inner.cart_items.push(entity.clone());
        Ok(Some(entity))
    }

    async fn remove_item(
        &self,
        user_id: i32,
        product_id: i32,
        size: &str,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.cart_items.len();
        inner.cart_items.retain(|item| {
            !(item.user_id == user_id && item.product_id == product_id && item.size == size)
        });
        if inner.cart_items.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
