use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    Selectable,
    prelude::{Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Carts

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemEntity {
    pub id: Uuid,
    pub user_id: i32,
    pub product_id: i32,
    pub size: String,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::cart_items)]
pub struct NewCartItemEntity {
    pub id: Uuid,
    pub user_id: i32,
    pub product_id: i32,
    pub size: String,
    pub quantity: i32,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: Uuid,
    pub user_id: i32,
    pub order_date: DateTime<Utc>,
    pub promise_date: NaiveDate,
    pub address: String,
    pub total_amount: f32,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewOrderEntity {
    pub id: Uuid,
    pub user_id: i32,
    pub promise_date: NaiveDate,
    pub address: String,
    pub total_amount: f32,
    pub is_complete: bool,
}

// Order details (immutable line items, priced at migration time)

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::order_details)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderDetailEntity {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: i32,
    pub size: String,
    pub quantity: i32,
    pub unit_price: f32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::order_details)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewOrderDetailEntity {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: i32,
    pub size: String,
    pub quantity: i32,
    pub unit_price: f32,
    pub user_id: i32,
}
