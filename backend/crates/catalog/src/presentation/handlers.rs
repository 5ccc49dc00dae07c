//! HTTP Handlers
//!
//! Access control, caching and invalidation happen in the admission layer
//! in front of these; handlers only run the use case.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use kernel::id::ProductId;

use crate::application::{
    AdjustStockUseCase, CatalogConfig, CreateProductInput, CreateProductUseCase,
    DeleteProductUseCase, GetProductUseCase, ListProductsUseCase, UpdateProductInput,
    UpdateProductUseCase,
};
use crate::domain::repository::ProductRepository;
use crate::domain::value_objects::ProductFilter;
use crate::error::CatalogResult;
use crate::presentation::dto::{
    CreateProductRequest, ProductQuery, ProductResponse, StockAdjustmentRequest,
    UpdateProductRequest,
};

/// Shared state for catalog handlers
pub struct CatalogState<R> {
    pub repo: Arc<R>,
    pub config: Arc<CatalogConfig>,
}

impl<R> Clone for CatalogState<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
        }
    }
}

// ============================================================================
// Public reads
// ============================================================================

/// GET /products
pub async fn list_products<R>(
    State(state): State<CatalogState<R>>,
    Query(query): Query<ProductQuery>,
) -> CatalogResult<Json<Vec<ProductResponse>>>
where
    R: ProductRepository + Send + Sync + 'static,
{
    let filter = ProductFilter {
        skip: query.skip.unwrap_or(0),
        limit: query.limit.unwrap_or(state.config.default_page_size),
        search: query.search,
        category: query.category,
        min_price: query.min_price,
        max_price: query.max_price,
        available_only: query.available_only.unwrap_or(true),
    };

    let use_case = ListProductsUseCase::new(state.repo.clone(), state.config.clone());
    let products = use_case.execute(filter).await?;

    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

/// GET /products/{id}
pub async fn get_product<R>(
    State(state): State<CatalogState<R>>,
    Path(id): Path<ProductId>,
) -> CatalogResult<Json<ProductResponse>>
where
    R: ProductRepository + Send + Sync + 'static,
{
    let product = GetProductUseCase::new(state.repo.clone()).execute(&id).await?;
    Ok(Json(ProductResponse::from(&product)))
}

// ============================================================================
// Administration (admin only)
// ============================================================================

/// POST /products
pub async fn create_product<R>(
    State(state): State<CatalogState<R>>,
    Json(req): Json<CreateProductRequest>,
) -> CatalogResult<(StatusCode, Json<ProductResponse>)>
where
    R: ProductRepository + Send + Sync + 'static,
{
    let use_case = CreateProductUseCase::new(state.repo.clone());

    let product = use_case
        .execute(CreateProductInput {
            name: req.name,
            description: req.description,
            price: req.price,
            stock: req.stock,
            category: req.category,
            sku: req.sku,
            weight: req.weight,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ProductResponse::from(&product))))
}

/// PATCH /products/{id}
pub async fn update_product<R>(
    State(state): State<CatalogState<R>>,
    Path(id): Path<ProductId>,
    Json(req): Json<UpdateProductRequest>,
) -> CatalogResult<Json<ProductResponse>>
where
    R: ProductRepository + Send + Sync + 'static,
{
    let use_case = UpdateProductUseCase::new(state.repo.clone());

    let product = use_case
        .execute(
            &id,
            UpdateProductInput {
                name: req.name,
                description: req.description,
                price: req.price,
                stock: req.stock,
                is_available: req.is_available,
                category: req.category,
                sku: req.sku,
                weight: req.weight,
            },
        )
        .await?;

    Ok(Json(ProductResponse::from(&product)))
}

/// DELETE /products/{id}
pub async fn delete_product<R>(
    State(state): State<CatalogState<R>>,
    Path(id): Path<ProductId>,
) -> CatalogResult<StatusCode>
where
    R: ProductRepository + Send + Sync + 'static,
{
    DeleteProductUseCase::new(state.repo.clone())
        .execute(&id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /products/{id}/stock
pub async fn adjust_stock<R>(
    State(state): State<CatalogState<R>>,
    Path(id): Path<ProductId>,
    Json(req): Json<StockAdjustmentRequest>,
) -> CatalogResult<Json<ProductResponse>>
where
    R: ProductRepository + Send + Sync + 'static,
{
    let product = AdjustStockUseCase::new(state.repo.clone())
        .execute(&id, req.quantity)
        .await?;
    Ok(Json(ProductResponse::from(&product)))
}
