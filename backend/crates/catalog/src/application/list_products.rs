//! List Products Use Case

use std::sync::Arc;

use crate::application::config::CatalogConfig;
use crate::domain::entities::Product;
use crate::domain::repository::ProductRepository;
use crate::domain::value_objects::ProductFilter;
use crate::error::CatalogResult;

pub struct ListProductsUseCase<R>
where
    R: ProductRepository,
{
    repo: Arc<R>,
    config: Arc<CatalogConfig>,
}

impl<R> ListProductsUseCase<R>
where
    R: ProductRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<CatalogConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, filter: ProductFilter) -> CatalogResult<Vec<Product>> {
        let filter = filter.validate(self.config.max_page_size)?;
        let products = self.repo.list(&filter).await?;

        tracing::debug!(
            count = products.len(),
            skip = filter.skip,
            limit = filter.limit,
            "Listed products"
        );
        Ok(products)
    }
}
