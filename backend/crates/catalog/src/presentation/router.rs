//! Catalog Router

use std::sync::Arc;

use admission::{AccessLevel, AdmissionPipeline, RouteClass, RouteSpec, guarded};
use axum::{
    Router,
    routing::{get, patch, post},
};
use platform::kv::KeyValueStore;

use crate::application::CatalogConfig;
use crate::domain::repository::ProductRepository;
use crate::infra::postgres::PgProductRepository;
use crate::presentation::handlers::{self, CatalogState};

/// Cache prefix of product reads
pub const PRODUCTS_RESOURCE: &str = "products";

/// Create the catalog router with PostgreSQL repository
pub fn catalog_router<S>(
    repo: PgProductRepository,
    pipeline: Arc<AdmissionPipeline<S>>,
    config: CatalogConfig,
) -> Router
where
    S: KeyValueStore + Send + Sync + 'static,
{
    catalog_router_generic(repo, pipeline, config)
}

/// Create a generic catalog router for any repository implementation
pub fn catalog_router_generic<R, S>(
    repo: R,
    pipeline: Arc<AdmissionPipeline<S>>,
    config: CatalogConfig,
) -> Router
where
    R: ProductRepository + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
{
    let public_read = match config.listing_ttl {
        Some(ttl) => RouteSpec::new(RouteClass::General).cached_for(PRODUCTS_RESOURCE, ttl),
        None => RouteSpec::new(RouteClass::General).cached(PRODUCTS_RESOURCE),
    };
    let admin_write = RouteSpec::new(RouteClass::General)
        .access(AccessLevel::Admin)
        .invalidates(PRODUCTS_RESOURCE);

    let state = CatalogState {
        repo: Arc::new(repo),
        config: Arc::new(config),
    };
    let p = &pipeline;

    Router::new()
        .route(
            "/products",
            guarded(get(handlers::list_products::<R>), p, public_read.clone()).merge(guarded(
                post(handlers::create_product::<R>),
                p,
                admin_write.clone(),
            )),
        )
        .route(
            "/products/{id}",
            guarded(get(handlers::get_product::<R>), p, public_read).merge(guarded(
                patch(handlers::update_product::<R>).delete(handlers::delete_product::<R>),
                p,
                admin_write.clone(),
            )),
        )
        .route(
            "/products/{id}/stock",
            guarded(post(handlers::adjust_stock::<R>), p, admin_write),
        )
        .with_state(state)
}
