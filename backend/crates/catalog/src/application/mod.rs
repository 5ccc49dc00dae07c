//! Application Layer
//!
//! One use case per catalog operation.

pub mod adjust_stock;
pub mod config;
pub mod create_product;
pub mod delete_product;
pub mod get_product;
pub mod list_products;
pub mod update_product;

pub use adjust_stock::AdjustStockUseCase;
pub use config::CatalogConfig;
pub use create_product::{CreateProductInput, CreateProductUseCase};
pub use delete_product::DeleteProductUseCase;
pub use get_product::GetProductUseCase;
pub use list_products::ListProductsUseCase;
pub use update_product::{UpdateProductInput, UpdateProductUseCase};
