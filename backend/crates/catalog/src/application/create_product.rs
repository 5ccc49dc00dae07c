//! Create Product Use Case

use std::sync::Arc;

use crate::domain::entities::{NewProduct, Product};
use crate::domain::repository::ProductRepository;
use crate::domain::value_objects::{self, Category, Price, ProductName, Sku, Weight};
use crate::error::CatalogResult;

/// Raw creation fields
#[derive(Debug, Clone, Default)]
pub struct CreateProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub weight: Option<f64>,
}

impl CreateProductInput {
    fn validate(self) -> CatalogResult<NewProduct> {
        Ok(NewProduct {
            name: ProductName::new(&self.name)?,
            description: match self.description {
                Some(text) => value_objects::description(&text)?,
                None => None,
            },
            price: Price::new(self.price)?,
            stock: value_objects::stock(self.stock)?,
            category: self.category.as_deref().map(Category::new).transpose()?,
            sku: self.sku.as_deref().map(Sku::new).transpose()?,
            weight: self.weight.map(Weight::new).transpose()?,
        })
    }
}

pub struct CreateProductUseCase<R>
where
    R: ProductRepository,
{
    repo: Arc<R>,
}

impl<R> CreateProductUseCase<R>
where
    R: ProductRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, input: CreateProductInput) -> CatalogResult<Product> {
        let product = Product::new(input.validate()?);
        self.repo.create(&product).await?;

        tracing::info!(
            product_id = %product.id,
            sku = product.sku.as_ref().map(Sku::as_str),
            "Product created"
        );
        Ok(product)
    }
}
