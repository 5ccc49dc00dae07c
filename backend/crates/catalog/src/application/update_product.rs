//! Update Product Use Case

use std::sync::Arc;

use kernel::id::ProductId;

use crate::domain::entities::{Product, ProductChanges};
use crate::domain::repository::ProductRepository;
use crate::domain::value_objects::{self, Category, Price, ProductName, Sku, Weight};
use crate::error::{CatalogError, CatalogResult};

/// Raw partial update. A blank string clears an optional text field.
#[derive(Debug, Clone, Default)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub is_available: Option<bool>,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub weight: Option<f64>,
}

impl UpdateProductInput {
    fn validate(self) -> CatalogResult<ProductChanges> {
        Ok(ProductChanges {
            name: self.name.as_deref().map(ProductName::new).transpose()?,
            description: self
                .description
                .as_deref()
                .map(value_objects::description)
                .transpose()?,
            price: self.price.map(Price::new).transpose()?,
            stock: self.stock.map(value_objects::stock).transpose()?,
            is_available: self.is_available,
            category: self
                .category
                .as_deref()
                .map(|raw| clearable(raw, Category::new))
                .transpose()?,
            sku: self
                .sku
                .as_deref()
                .map(|raw| clearable(raw, Sku::new))
                .transpose()?,
            weight: self.weight.map(|w| Weight::new(w).map(Some)).transpose()?,
        })
    }
}

fn clearable<T>(raw: &str, parse: fn(&str) -> CatalogResult<T>) -> CatalogResult<Option<T>> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse(raw).map(Some)
    }
}

pub struct UpdateProductUseCase<R>
where
    R: ProductRepository,
{
    repo: Arc<R>,
}

impl<R> UpdateProductUseCase<R>
where
    R: ProductRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, id: &ProductId, input: UpdateProductInput) -> CatalogResult<Product> {
        let changes = input.validate()?;

        let mut product = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)?;

        if changes.is_empty() {
            return Ok(product);
        }

        product.apply(changes);
        self.repo.update(&product).await?;

        tracing::info!(product_id = %id, "Product updated");
        Ok(product)
    }
}
