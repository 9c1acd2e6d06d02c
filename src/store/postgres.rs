//! Diesel-backed implementation of the cart and order stores over a bb8
//! connection pool.

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl, pooled_connection::bb8::Pool};
use uuid::Uuid;

use crate::{
    error::{AppError, DieselError},
    models::{CartItemEntity, NewCartItemEntity, NewOrderDetailEntity, NewOrderEntity, OrderDetailEntity, OrderEntity},
    schema::{cart_items, order_details, orders},
    store::{CartStore, CompletionOutcome, MigrationOutcome, OrderStore},
};

pub type DbPool = Pool<AsyncPgConnection>;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create(&self, order: NewOrderEntity) -> Result<OrderEntity, AppError> {
        let conn = &mut self.pool.get().await?;
        let order = diesel::insert_into(orders::table)
            .values(order)
            .returning(OrderEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(order)
    }

    async fn find(&self, order_id: Uuid) -> Result<Option<OrderEntity>, AppError> {
        let conn = &mut self.pool.get().await?;
        let order = orders::table
            .find(order_id)
            .get_result(conn)
            .await
            .map(Some)
            .or_else(|err| match err {
                DieselError::NotFound => Ok(None),
                _ => Err(err),
            })?;
        Ok(order)
    }

    async fn for_user(&self, user_id: i32) -> Result<Vec<OrderEntity>, AppError> {
        let conn = &mut self.pool.get().await?;
        let rows = orders::table
            .filter(orders::user_id.eq(user_id))
            .order_by(orders::updated_at.desc())
            .get_results(conn)
            .await?;
        Ok(rows)
    }

    async fn details(&self, order_id: Uuid) -> Result<Vec<OrderDetailEntity>, AppError> {
        let conn = &mut self.pool.get().await?;
        let rows = order_details::table
            .filter(order_details::order_id.eq(order_id))
            .get_results(conn)
            .await?;
        Ok(rows)
    }

    async fn migrate_cart(
        &self,
        user_id: i32,
        order_id: Uuid,
        details: Vec<NewOrderDetailEntity>,
    ) -> Result<MigrationOutcome, AppError> {
        let conn = &mut self.pool.get().await?;
        let outcome = conn
            .transaction(move |conn| {
                Box::pin(async move {
                    let existing: i64 = order_details::table
                        .filter(order_details::order_id.eq(order_id))
                        .count()
                        .get_result(conn)
                        .await?;

                    if existing > 0 {
                        return Ok(MigrationOutcome::AlreadyMigrated);
                    }

                    let total_amount: f32 = details
                        .iter()
                        .map(|detail| detail.quantity as f32 * detail.unit_price)
                        .sum();

                    let inserted = diesel::insert_into(order_details::table)
                        .values(details)
                        .execute(conn)
                        .await?;

                    // The order total must agree with the line items just
                    // captured, not with the client-supplied estimate.
                    diesel::update(orders::table.find(order_id))
                        .set((
                            orders::total_amount.eq(total_amount),
                            orders::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)
                        .await?;

                    diesel::delete(cart_items::table.filter(cart_items::user_id.eq(user_id)))
                        .execute(conn)
                        .await?;

                    Ok::<MigrationOutcome, AppError>(MigrationOutcome::Migrated(inserted))
                })
            })
            .await?;
        Ok(outcome)
    }

    async fn complete(&self, order_id: Uuid) -> Result<CompletionOutcome, AppError> {
        let conn = &mut self.pool.get().await?;

        let updated = diesel::update(
            orders::table
                .find(order_id)
                .filter(orders::is_complete.eq(false)),
        )
        .set((
            orders::is_complete.eq(true),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await;

        match updated {
            Ok(order) => Ok(CompletionOutcome::Completed(order)),
            // No incomplete row matched: either already complete or gone.
            Err(DieselError::NotFound) => match self.find(order_id).await? {
                Some(order) => Ok(CompletionOutcome::AlreadyComplete(order)),
                None => Err(AppError::NotFound),
            },
            Err(err) => Err(err.into()),
        }
    }

    async fn set_address(&self, order_id: Uuid, address: String) -> Result<OrderEntity, AppError> {
        let conn = &mut self.pool.get().await?;
        let updated = diesel::update(
            orders::table
                .find(order_id)
                .filter(orders::is_complete.eq(false)),
        )
        .set((
            orders::address.eq(address),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await;

        match updated {
            Ok(order) => Ok(order),
            Err(DieselError::NotFound) => match self.find(order_id).await? {
                Some(_) => Err(AppError::Validation(
                    "Cannot edit a completed order".to_string(),
                )),
                None => Err(AppError::NotFound),
            },
            Err(err) => Err(err.into()),
        }
    }

    async fn set_promise_date(
        &self,
        order_id: Uuid,
        promise_date: NaiveDate,
    ) -> Result<OrderEntity, AppError> {
        let conn = &mut self.pool.get().await?;
        let updated = diesel::update(
            orders::table
                .find(order_id)
                .filter(orders::is_complete.eq(false)),
        )
        .set((
            orders::promise_date.eq(promise_date),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await;

        match updated {
            Ok(order) => Ok(order),
            Err(DieselError::NotFound) => match self.find(order_id).await? {
                Some(_) => Err(AppError::Validation(
                    "Cannot edit a completed order".to_string(),
                )),
                None => Err(AppError::NotFound),
            },
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, order_id: Uuid) -> Result<(), AppError> {
        let conn = &mut self.pool.get().await?;
        conn.transaction(move |conn| {
            Box::pin(async move {
                diesel::delete(
                    order_details::table.filter(order_details::order_id.eq(order_id)),
                )
                .execute(conn)
                .await?;

                let deleted = diesel::delete(orders::table.find(order_id))
                    .execute(conn)
                    .await?;
                if deleted == 0 {
                    return Err(AppError::NotFound);
                }

                Ok::<(), AppError>(())
            })
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn items_for_user(&self, user_id: i32) -> Result<Vec<CartItemEntity>, AppError> {
        let conn = &mut self.pool.get().await?;
        let rows = cart_items::table
            .filter(cart_items::user_id.eq(user_id))
            .order_by(cart_items::added_at.asc())
            .get_results(conn)
            .await?;
        Ok(rows)
    }

    async fn upsert_item(
        &self,
        item: NewCartItemEntity,
    ) -> Result<Option<CartItemEntity>, AppError> {
        let conn = &mut self.pool.get().await?;

        if item.quantity <= 0 {
            diesel::delete(
                cart_items::table
                    .filter(cart_items::user_id.eq(item.user_id))
                    .filter(cart_items::product_id.eq(item.product_id))
                    .filter(cart_items::size.eq(&item.size)),
            )
            .execute(conn)
            .await?;
            return Ok(None);
        }

        let row = diesel::insert_into(cart_items::table)
            .values(&item)
            .on_conflict((
                cart_items::user_id,
                cart_items::product_id,
                cart_items::size,
            ))
            .do_update()
            .set((
                cart_items::quantity.eq(item.quantity),
                cart_items::updated_at.eq(diesel::dsl::now),
            ))
            .returning(CartItemEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(Some(row))
    }

    async fn remove_item(
        &self,
        user_id: i32,
        product_id: i32,
        size: &str,
    ) -> Result<(), AppError> {
        let conn = &mut self.pool.get().await?;
        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::user_id.eq(user_id))
                .filter(cart_items::product_id.eq(product_id))
                .filter(cart_items::size.eq(size)),
        )
        .execute(conn)
        .await?;
        if deleted == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
