//! Presentation Layer
//!
//! HTTP handlers, DTOs, and routing.

pub mod dto;
pub mod handlers;
pub mod router;

pub use handlers::CatalogState;
pub use router::{PRODUCTS_RESOURCE, catalog_router, catalog_router_generic};
