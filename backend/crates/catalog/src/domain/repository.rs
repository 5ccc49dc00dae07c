//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use kernel::id::ProductId;

use crate::domain::entities::Product;
use crate::domain::value_objects::ProductFilter;
use crate::error::CatalogResult;

/// Product repository trait
#[trait_variant::make(ProductRepository: Send)]
pub trait LocalProductRepository {
    /// Insert a new product; a taken SKU is `DuplicateSku`
    async fn create(&self, product: &Product) -> CatalogResult<()>;

    async fn find_by_id(&self, id: &ProductId) -> CatalogResult<Option<Product>>;

    /// Filtered page, newest first
    async fn list(&self, filter: &ProductFilter) -> CatalogResult<Vec<Product>>;

    /// Persist every mutable field; a taken SKU is `DuplicateSku`
    async fn update(&self, product: &Product) -> CatalogResult<()>;

    /// Mark unavailable. Returns false when no such product exists.
    async fn soft_delete(&self, id: &ProductId) -> CatalogResult<bool>;

    /// Add `delta` to the stock in one atomic step.
    ///
    /// Returns `None` for an unknown product and `InsufficientStock` when the
    /// result would be negative; the stored count is unchanged in both cases.
    async fn adjust_stock(&self, id: &ProductId, delta: i32) -> CatalogResult<Option<Product>>;
}
