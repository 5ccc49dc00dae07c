//! Shared Kernel - vocabulary every storefront crate agrees on
//!
//! This crate contains:
//! - The outward error envelope ([`error::app_error::AppError`]) and its kinds
//! - Typed identifiers for users and products
//!
//! Anything placed here must mean the same thing to the admission core,
//! the account endpoints and the catalog.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
