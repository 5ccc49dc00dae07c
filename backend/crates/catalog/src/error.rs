//! Catalog Error Types
//!
//! Catalog-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Catalog-specific result type alias
pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found")]
    ProductNotFound,

    /// Another product already carries this SKU
    #[error("SKU is already in use")]
    DuplicateSku,

    /// A stock adjustment would take the count below zero
    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i32, requested: i32 },

    /// Field-level validation failure
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        CatalogError::Invalid {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::ProductNotFound => ErrorKind::NotFound,
            CatalogError::DuplicateSku | CatalogError::InsufficientStock { .. } => {
                ErrorKind::Conflict
            }
            CatalogError::Invalid { .. } => ErrorKind::UnprocessableEntity,
            CatalogError::Database(_) | CatalogError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    pub fn to_app_error(&self) -> AppError {
        match self {
            CatalogError::ProductNotFound => {
                AppError::not_found(self.to_string()).with_code("PRODUCT_NOT_FOUND")
            }
            CatalogError::DuplicateSku => {
                AppError::conflict(self.to_string()).with_code("DUPLICATE_SKU")
            }
            CatalogError::InsufficientStock {
                available,
                requested,
            } => AppError::conflict(self.to_string())
                .with_code("INSUFFICIENT_STOCK")
                .with_details(serde_json::json!({
                    "available": available,
                    "requested": requested,
                })),
            CatalogError::Invalid { field, message } => AppError::unprocessable(message.clone())
                .with_code("VALIDATION_ERROR")
                .with_details(serde_json::json!({ "field": field })),
            // Never leak database or internal details
            CatalogError::Database(_) | CatalogError::Internal(_) => {
                AppError::internal("An internal error occurred")
            }
        }
    }

    fn log(&self) {
        match self {
            CatalogError::Database(e) => {
                tracing::error!(error = %e, "Catalog database error");
            }
            CatalogError::Internal(msg) => {
                tracing::error!(message = %msg, "Catalog internal error");
            }
            CatalogError::InsufficientStock {
                available,
                requested,
            } => {
                tracing::warn!(available, requested, "Stock adjustment rejected");
            }
            _ => {
                tracing::debug!(error = %self, "Catalog error");
            }
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        err.to_app_error()
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts() {
        assert_eq!(CatalogError::DuplicateSku.to_app_error().status_code(), 409);

        let err = CatalogError::InsufficientStock {
            available: 2,
            requested: 5,
        }
        .to_app_error();
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");
        assert_eq!(err.details().unwrap()["available"], 2);
    }

    #[test]
    fn test_invalid_names_field() {
        let err = CatalogError::invalid("price", "must be greater than 0").to_app_error();
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.details().unwrap()["field"], "price");
    }

    #[test]
    fn test_database_error_is_hidden() {
        let err = CatalogError::Database(sqlx::Error::PoolClosed).to_app_error();
        assert_eq!(err.status_code(), 500);
        assert!(!err.message().contains("pool"));
    }
}
