//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::ProductId;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::entities::Product;
use crate::domain::repository::ProductRepository;
use crate::domain::value_objects::{Category, Price, ProductFilter, ProductName, Sku, Weight};
use crate::error::{CatalogError, CatalogResult};

const PRODUCT_COLUMNS: &str = r#"
    id,
    name,
    description,
    price,
    stock,
    is_available,
    category,
    sku,
    weight,
    created_at,
    updated_at
"#;

/// PostgreSQL-backed product repository
#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Product Repository Implementation
// ============================================================================

impl ProductRepository for PgProductRepository {
    async fn create(&self, product: &Product) -> CatalogResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id,
                name,
                description,
                price,
                stock,
                is_available,
                category,
                sku,
                weight,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.name.as_str())
        .bind(product.description.as_deref())
        .bind(product.price.value())
        .bind(product.stock)
        .bind(product.is_available)
        .bind(product.category.as_ref().map(Category::as_str))
        .bind(product.sku.as_ref().map(Sku::as_str))
        .bind(product.weight.map(|w| w.value()))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_sku)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ProductId) -> CatalogResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProductRow::into_product))
    }

    async fn list(&self, filter: &ProductFilter) -> CatalogResult<Vec<Product>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));

        if filter.available_only {
            query.push(" AND is_available");
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", escape_like(search));
            query
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category) = &filter.category {
            query.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(min) = filter.min_price {
            query.push(" AND price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            query.push(" AND price <= ").push_bind(max);
        }

        query
            .push(" ORDER BY created_at DESC, id DESC OFFSET ")
            .push_bind(filter.skip)
            .push(" LIMIT ")
            .push_bind(filter.limit);

        let rows = query
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ProductRow::into_product).collect())
    }

    async fn update(&self, product: &Product) -> CatalogResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = $2,
                description = $3,
                price = $4,
                stock = $5,
                is_available = $6,
                category = $7,
                sku = $8,
                weight = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.name.as_str())
        .bind(product.description.as_deref())
        .bind(product.price.value())
        .bind(product.stock)
        .bind(product.is_available)
        .bind(product.category.as_ref().map(Category::as_str))
        .bind(product.sku.as_ref().map(Sku::as_str))
        .bind(product.weight.map(|w| w.value()))
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_sku)?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::ProductNotFound);
        }
        Ok(())
    }

    async fn soft_delete(&self, id: &ProductId) -> CatalogResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET is_available = FALSE, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn adjust_stock(&self, id: &ProductId, delta: i32) -> CatalogResult<Option<Product>> {
        // Guarded in the WHERE clause so concurrent adjustments cannot overdraw
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET stock = stock + $2, updated_at = now()
            WHERE id = $1 AND stock + $2 >= 0
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(Some(row.into_product()));
        }

        let available =
            sqlx::query_scalar::<_, i32>("SELECT stock FROM products WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match available {
            Some(available) => Err(CatalogError::InsufficientStock {
                available,
                requested: -delta,
            }),
            None => Ok(None),
        }
    }
}

fn map_unique_sku(err: sqlx::Error) -> CatalogError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => CatalogError::DuplicateSku,
        _ => CatalogError::Database(err),
    }
}

/// Treat `%`, `_` and `\` in user search text literally
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: f64,
    stock: i32,
    is_available: bool,
    category: Option<String>,
    sku: Option<String>,
    weight: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> Product {
        Product {
            id: ProductId::from(self.id),
            name: ProductName::from_db(self.name),
            description: self.description,
            price: Price::from_db(self.price),
            stock: self.stock,
            is_available: self.is_available,
            category: self.category.map(Category::from_db),
            sku: self.sku.map(Sku::from_db),
            weight: self.weight.map(Weight::from_db),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("laptop"), "laptop");
    }
}
