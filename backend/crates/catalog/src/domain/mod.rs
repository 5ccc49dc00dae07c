//! Domain Layer
//!
//! Product entity, validated value objects and the repository contract.

pub mod entities;
pub mod repository;
pub mod value_objects;

pub use entities::{NewProduct, Product, ProductChanges};
pub use repository::ProductRepository;
pub use value_objects::{Category, Price, ProductFilter, ProductName, Sku, Weight};
