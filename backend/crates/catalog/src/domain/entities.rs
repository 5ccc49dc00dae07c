//! Domain Entities

use chrono::{DateTime, Utc};
use kernel::id::ProductId;

use crate::domain::value_objects::{Category, Price, ProductName, Sku, Weight};

/// Product entity
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: ProductName,
    pub description: Option<String>,
    pub price: Price,
    /// Units on hand, never negative
    pub stock: i32,
    /// Soft-delete flag; unavailable products drop out of the default listing
    pub is_available: bool,
    pub category: Option<Category>,
    pub sku: Option<Sku>,
    pub weight: Option<Weight>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields of a product about to be created
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: ProductName,
    pub description: Option<String>,
    pub price: Price,
    pub stock: i32,
    pub category: Option<Category>,
    pub sku: Option<Sku>,
    pub weight: Option<Weight>,
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<ProductName>,
    pub description: Option<Option<String>>,
    pub price: Option<Price>,
    pub stock: Option<i32>,
    pub is_available: Option<bool>,
    pub category: Option<Option<Category>>,
    pub sku: Option<Option<Sku>>,
    pub weight: Option<Option<Weight>>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.is_available.is_none()
            && self.category.is_none()
            && self.sku.is_none()
            && self.weight.is_none()
    }
}

impl Product {
    pub fn new(fields: NewProduct) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::new(),
            name: fields.name,
            description: fields.description,
            price: fields.price,
            stock: fields.stock,
            is_available: true,
            category: fields.category,
            sku: fields.sku,
            weight: fields.weight,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, changes: ProductChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(stock) = changes.stock {
            self.stock = stock;
        }
        if let Some(is_available) = changes.is_available {
            self.is_available = is_available;
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(sku) = changes.sku {
            self.sku = sku;
        }
        if let Some(weight) = changes.weight {
            self.weight = weight;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laptop() -> Product {
        Product::new(NewProduct {
            name: ProductName::new("Laptop").unwrap(),
            description: None,
            price: Price::new(999.99).unwrap(),
            stock: 3,
            category: Some(Category::new("electronics").unwrap()),
            sku: Some(Sku::new("LAP-001").unwrap()),
            weight: None,
        })
    }

    #[test]
    fn test_new_product_is_available() {
        let product = laptop();
        assert!(product.is_available);
        assert_eq!(product.created_at, product.updated_at);
    }

    #[test]
    fn test_apply_touches_only_given_fields() {
        let mut product = laptop();
        product.apply(ProductChanges {
            price: Some(Price::new(899.0).unwrap()),
            sku: Some(None),
            ..Default::default()
        });

        assert_eq!(product.price.value(), 899.0);
        assert_eq!(product.sku, None);
        assert_eq!(product.name.as_str(), "Laptop");
        assert_eq!(product.stock, 3);
        assert!(product.updated_at >= product.created_at);
    }

    #[test]
    fn test_empty_changes() {
        assert!(ProductChanges::default().is_empty());
        assert!(
            !ProductChanges {
                is_available: Some(false),
                ..Default::default()
            }
            .is_empty()
        );
    }
}
