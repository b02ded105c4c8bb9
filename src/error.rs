//! Handler error type.
//!
//! Every handler returns `Result<T, AppError>`. Store failures are logged
//! with their detail and answered with a generic message.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::aggregates::ProductError;
use crate::domain::query::QueryError;
use crate::domain::value_objects::Quantity;
use crate::store::{CartStoreError, StoreError};

#[derive(Debug, Error)]
pub enum AppError {
    /// Request data failed validation.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self { Self::Validation(message.into()) }

    pub fn not_found(message: impl Into<String>) -> Self { Self::NotFound(message.into()) }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "Request error");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self { Self::Validation(err.to_string()) }
}

impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self { Self::Validation(err.to_string()) }
}

impl From<CartStoreError> for AppError {
    fn from(err: CartStoreError) -> Self {
        match err {
            CartStoreError::ProductNotFound => Self::not_found("Product not found"),
            CartStoreError::ItemNotFound => Self::not_found("Cart item not found"),
            CartStoreError::InsufficientStock { available } => {
                Self::Validation(format!("Insufficient stock: only {available} available"))
            }
            CartStoreError::QuantityTooLarge => {
                Self::Validation(format!("Cart quantity must not exceed {}", Quantity::MAX))
            }
            CartStoreError::Store(err) => Self::Store(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_values()
            .flatten()
            .find_map(|e| e.message.as_ref().map(ToString::to_string))
            .unwrap_or_else(|| "Invalid request".to_string());
        Self::Validation(message)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self { Self::Validation(rejection.body_text()) }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self { Self::Validation(rejection.body_text()) }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    async fn body(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_internal_detail_hidden() {
        let (status, json) = body(StoreError::DataCorruption("negative stock on product x".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_validation_message_returned() {
        let (status, json) = body(ProductError::MissingMainImage.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Main image URL is required");
    }

    #[test]
    fn test_cart_outcomes_mapped() {
        assert_eq!(AppError::from(CartStoreError::ProductNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::from(CartStoreError::ItemNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::from(CartStoreError::InsufficientStock { available: 2 }).status(), StatusCode::BAD_REQUEST);
        let too_large = AppError::from(CartStoreError::QuantityTooLarge);
        assert_eq!(too_large.status(), StatusCode::BAD_REQUEST);
        assert!(!too_large.to_string().contains("available"));
        let store = CartStoreError::Store(StoreError::DataCorruption("bad".into()));
        assert_eq!(AppError::from(store).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validator_message_used() {
        let err = crate::domain::aggregates::UpdateItemRequest { quantity: 0 }.validate().unwrap_err();
        assert_eq!(AppError::from(err).to_string(), "Quantity must be between 1 and 2147483647");
    }
}
