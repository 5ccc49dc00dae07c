//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use kernel::id::ProductId;
use serde::{Deserialize, Serialize};

use crate::domain::entities::Product;

// ============================================================================
// Listing
// ============================================================================

/// `GET /products` query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub available_only: Option<bool>,
}

// ============================================================================
// Writes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub stock: i32,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub weight: Option<f64>,
}

/// Partial update; send `""` to clear `description`, `category` or `sku`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub is_available: Option<bool>,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub weight: Option<f64>,
}

/// Signed change to the stock count
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustmentRequest {
    pub quantity: i32,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub is_available: bool,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub weight: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.as_str().to_string(),
            description: product.description.clone(),
            price: product.price.value(),
            stock: product.stock,
            is_available: product.is_available,
            category: product.category.as_ref().map(|c| c.as_str().to_string()),
            sku: product.sku.as_ref().map(|s| s.as_str().to_string()),
            weight: product.weight.map(|w| w.value()),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}
