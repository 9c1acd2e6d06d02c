use anyhow::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    error::{AppError, StdResponse},
    models::{OrderDetailEntity, OrderEntity},
    state::AppState,
    store::MigrationOutcome,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_order))
            .routes(utoipa_axum::routes!(move_cart))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(get_user_orders))
            .routes(utoipa_axum::routes!(get_order_details))
            .routes(utoipa_axum::routes!(update_status))
            .routes(utoipa_axum::routes!(update_address))
            .routes(utoipa_axum::routes!(update_promise_date))
            .routes(utoipa_axum::routes!(delete_order)),
    )
}

#[derive(Deserialize, ToSchema)]
struct CreateOrderReq {
    user_id: i32,
    address: String,
    total_amount: f32,
    promise_date: NaiveDate,
}

#[derive(Serialize, ToSchema)]
struct CreateOrderRes {
    order_id: Uuid,
}

/// Create a new order in the incomplete state.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    request_body = CreateOrderReq,
    responses(
        (status = 201, description = "Created order successfully", body = StdResponse<CreateOrderRes, String>)
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let order_id = state
        .orders
        .create_order(body.user_id, body.address, body.total_amount, body.promise_date)
        .await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(CreateOrderRes { order_id }),
            message: Some("Created order successfully"),
        },
    ))
}

#[derive(Deserialize, ToSchema)]
struct MoveCartReq {
    user_id: i32,
    order_id: Uuid,
}

#[derive(Serialize, ToSchema)]
struct MoveCartRes {
    migrated_items: usize,
    already_migrated: bool,
}

/// Migrate the user's cart into order detail rows. Idempotent: repeating
/// the call after a successful migration is a no-op.
#[utoipa::path(
    post,
    path = "/move-cart",
    tags = ["Orders"],
    request_body = MoveCartReq,
    responses(
        (status = 200, description = "Cart migrated successfully", body = StdResponse<MoveCartRes, String>),
        (status = 409, description = "Requested quantity exceeds available stock", body = StdResponse<String, String>)
    )
)]
async fn move_cart(
    State(state): State<AppState>,
    Json(body): Json<MoveCartReq>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .orders
        .move_cart_to_order(body.user_id, body.order_id)
        .await?;

    let (res, message) = match outcome {
        MigrationOutcome::Migrated(count) => (
            MoveCartRes {
                migrated_items: count,
                already_migrated: false,
            },
            "Cart migrated successfully",
        ),
        MigrationOutcome::AlreadyMigrated => (
            MoveCartRes {
                migrated_items: 0,
                already_migrated: true,
            },
            "Cart was already migrated",
        ),
    };

    Ok(StdResponse {
        data: Some(res),
        message: Some(message),
    })
}

/// Fetch a specific order.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn get_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.order(id).await?;
    Ok(StdResponse {
        data: Some(order),
        message: Some("Get order successfully"),
    })
}

/// Fetch all orders belonging to a user, most recently updated first.
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tags = ["Orders"],
    params(
        ("user_id" = i32, Path, description = "User whose orders to list")
    ),
    responses(
        (status = 200, description = "List user orders", body = StdResponse<Vec<OrderEntity>, String>)
    )
)]
async fn get_user_orders(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.orders.orders_for_user(user_id).await?;
    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get user orders successfully"),
    })
}

/// Fetch the detail rows of an order. 404 when the order has no details.
#[utoipa::path(
    get,
    path = "/{id}/details",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID whose details to fetch")
    ),
    responses(
        (status = 200, description = "Get order details successfully", body = StdResponse<Vec<OrderDetailEntity>, String>)
    )
)]
async fn get_order_details(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let details = state.orders.order_details(id).await?;
    Ok(StdResponse {
        data: Some(details),
        message: Some("Get order details successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateStatusReq {
    is_complete: bool,
}

/// Set the completion flag. Completion is forward-only; reopening a
/// completed order is rejected.
#[utoipa::path(
    put,
    path = "/{id}/status",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to update")
    ),
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Updated order status successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn update_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<UpdateStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.set_order_status(id, body.is_complete).await?;
    Ok(StdResponse {
        data: Some(order),
        message: Some("Updated order status successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateAddressReq {
    address: String,
}

/// Update the delivery address of a not-yet-complete order.
#[utoipa::path(
    put,
    path = "/{id}/address",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to update")
    ),
    request_body = UpdateAddressReq,
    responses(
        (status = 200, description = "Updated order address successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn update_address(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<UpdateAddressReq>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.set_address(id, body.address).await?;
    Ok(StdResponse {
        data: Some(order),
        message: Some("Updated order address successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdatePromiseDateReq {
    promise_date: NaiveDate,
}

/// Update the promise date of a not-yet-complete order.
#[utoipa::path(
    put,
    path = "/{id}/promise-date",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to update")
    ),
    request_body = UpdatePromiseDateReq,
    responses(
        (status = 200, description = "Updated promise date successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn update_promise_date(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<UpdatePromiseDateReq>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.set_promise_date(id, body.promise_date).await?;
    Ok(StdResponse {
        data: Some(order),
        message: Some("Updated promise date successfully"),
    })
}

/// Delete an order and its detail rows.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted order successfully", body = StdResponse<String, String>)
    )
)]
async fn delete_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.orders.delete_order(id).await?;
    Ok(StdResponse::<(), _> {
        data: None,
        message: Some("Deleted order successfully"),
    })
}
