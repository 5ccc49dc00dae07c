//! Application Configuration
//!
//! Configuration for the catalog application layer.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Page size when the caller gives none
    pub default_page_size: i64,
    pub max_page_size: i64,
    /// Listing cache TTL; `None` uses the admission default
    pub listing_ttl: Option<Duration>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 100,
            listing_ttl: None,
        }
    }
}
