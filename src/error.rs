use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub type DieselError = diesel::result::Error;

/// One cart line whose requested quantity could not be covered by current
/// stock. `available` is what the catalog reported at validation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct StockShortage {
    pub product_id: i32,
    pub size: String,
    pub requested: i32,
    pub available: i32,
}

impl std::fmt::Display for StockShortage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "product {} size {}: requested {}, available {}",
            self.product_id, self.size, self.requested, self.available
        )
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Resource not found")]
    NotFound,
    #[error("Insufficient stock: {}", format_shortages(.0))]
    InsufficientStock(Vec<StockShortage>),
    #[error("Persistence failure: {0}")]
    Persistence(String),
    #[error("Messaging failure: {0}")]
    Messaging(String),
    #[error("{0} is unreachable")]
    ServiceUnreachable(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_shortages(shortages: &[StockShortage]) -> String {
    shortages
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InsufficientStock(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) | AppError::Messaging(_) | AppError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ServiceUnreachable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {self:#}");
        }
        let body: StdResponse<(), String> = StdResponse {
            data: None,
            message: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Persistence(err.to_string()),
        }
    }
}

impl From<diesel_async::pooled_connection::bb8::RunError> for AppError {
    fn from(err: diesel_async::pooled_connection::bb8::RunError) -> Self {
        AppError::Persistence(format!("Failed to obtain a DB connection: {err}"))
    }
}

impl From<lapin::Error> for AppError {
    fn from(err: lapin::Error) -> Self {
        AppError::Messaging(err.to_string())
    }
}

/// Standard response wrapper used by every JSON endpoint.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T: Serialize, M: Serialize> IntoResponse for StdResponse<T, M> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_expected_statuses() {
        assert_eq!(
            AppError::Validation("address is required".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::InsufficientStock(vec![]).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Persistence("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::ServiceUnreachable("CatalogService".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn insufficient_stock_message_names_the_offending_items() {
        let err = AppError::InsufficientStock(vec![StockShortage {
            product_id: 7,
            size: "9".into(),
            requested: 3,
            available: 1,
        }]);
        let message = err.to_string();
        assert!(message.contains("product 7"));
        assert!(message.contains("size 9"));
        assert!(message.contains("requested 3"));
        assert!(message.contains("available 1"));
    }
}
