//! Delete Product Use Case
//!
//! Deletion is soft: the row stays and `is_available` turns false.

use std::sync::Arc;

use kernel::id::ProductId;

use crate::domain::repository::ProductRepository;
use crate::error::{CatalogError, CatalogResult};

pub struct DeleteProductUseCase<R>
where
    R: ProductRepository,
{
    repo: Arc<R>,
}

impl<R> DeleteProductUseCase<R>
where
    R: ProductRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, id: &ProductId) -> CatalogResult<()> {
        if !self.repo.soft_delete(id).await? {
            return Err(CatalogError::ProductNotFound);
        }
        tracing::info!(product_id = %id, "Product withdrawn");
        Ok(())
    }
}
