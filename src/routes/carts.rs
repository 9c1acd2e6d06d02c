use anyhow::Result;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    error::{AppError, StdResponse},
    models::{CartItemEntity, NewCartItemEntity},
    state::AppState,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/carts",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_user_cart))
            .routes(utoipa_axum::routes!(upsert_item))
            .routes(utoipa_axum::routes!(remove_item)),
    )
}

/// Fetch a user's cart contents.
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tags = ["Carts"],
    params(
        ("user_id" = i32, Path, description = "User whose cart to fetch")
    ),
    responses(
        (status = 200, description = "Get cart successfully", body = StdResponse<Vec<CartItemEntity>, String>)
    )
)]
async fn get_user_cart(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let items = state.orders.carts().items_for_user(user_id).await?;
    Ok(StdResponse {
        data: Some(items),
        message: Some("Get cart successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpsertCartItemReq {
    user_id: i32,
    product_id: i32,
    size: String,
    quantity: i32,
}

#[derive(Serialize, ToSchema)]
struct UpsertCartItemRes {
    item: Option<CartItemEntity>,
}

/// Add or update one cart line. A quantity of zero or less removes the
/// line; cart items are never stored with a zero quantity.
#[utoipa::path(
    put,
    path = "/items",
    tags = ["Carts"],
    request_body = UpsertCartItemReq,
    responses(
        (status = 200, description = "Upserted cart item successfully", body = StdResponse<UpsertCartItemRes, String>)
    )
)]
async fn upsert_item(
    State(state): State<AppState>,
    Json(body): Json<UpsertCartItemReq>,
) -> Result<impl IntoResponse, AppError> {
    let item = state
        .orders
        .carts()
        .upsert_item(NewCartItemEntity {
            id: Uuid::new_v4(),
            user_id: body.user_id,
            product_id: body.product_id,
            size: body.size,
            quantity: body.quantity,
        })
        .await?;

    let message = if item.is_some() {
        "Upserted cart item successfully"
    } else {
        "Removed cart item"
    };
    Ok(StdResponse {
        data: Some(UpsertCartItemRes { item }),
        message: Some(message),
    })
}

/// Remove one cart line.
#[utoipa::path(
    delete,
    path = "/users/{user_id}/items/{product_id}/{size}",
    tags = ["Carts"],
    params(
        ("user_id" = i32, Path, description = "Cart owner"),
        ("product_id" = i32, Path, description = "Product to remove"),
        ("size" = String, Path, description = "Size to remove")
    ),
    responses(
        (status = 200, description = "Removed cart item successfully", body = StdResponse<String, String>)
    )
)]
async fn remove_item(
    Path((user_id, product_id, size)): Path<(i32, i32, String)>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state
        .orders
        .carts()
        .remove_item(user_id, product_id, &size)
        .await?;
    Ok(StdResponse::<(), _> {
        data: None,
        message: Some("Removed cart item successfully"),
    })
}
