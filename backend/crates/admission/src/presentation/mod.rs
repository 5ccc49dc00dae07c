//! Presentation Layer
//!
//! The axum middleware that puts routes behind the admission pipeline.

pub mod middleware;

pub use middleware::{RouteGuard, admit, guarded};
