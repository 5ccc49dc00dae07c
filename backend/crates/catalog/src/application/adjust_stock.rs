//! Adjust Stock Use Case

use std::sync::Arc;

use kernel::id::ProductId;

use crate::domain::entities::Product;
use crate::domain::repository::ProductRepository;
use crate::error::{CatalogError, CatalogResult};

pub struct AdjustStockUseCase<R>
where
    R: ProductRepository,
{
    repo: Arc<R>,
}

impl<R> AdjustStockUseCase<R>
where
    R: ProductRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Add `delta` (negative to remove) units
    pub async fn execute(&self, id: &ProductId, delta: i32) -> CatalogResult<Product> {
        if delta == 0 {
            return Err(CatalogError::invalid("quantity", "quantity must not be zero"));
        }

        let product = self
            .repo
            .adjust_stock(id, delta)
            .await?
            .ok_or(CatalogError::ProductNotFound)?;

        tracing::info!(product_id = %id, delta, stock = product.stock, "Stock adjusted");
        Ok(product)
    }
}
