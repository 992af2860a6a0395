//! Database operations for the `catalogue.t_product` table.

use async_trait::async_trait;
use catalogue_core::{Product, ProductId, ValidProduct};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from `catalogue.t_product`, with columns aliased to field names.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i32,
    pub title: String,
    pub details: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            details: row.details,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Escape `LIKE` metacharacters so the filter matches literally.
fn like_pattern(filter: &str) -> String {
    let mut escaped = String::with_capacity(filter.len() + 2);
    escaped.push('%');
    for c in filter.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Returns all products, or those whose title contains `filter`
/// case-insensitively, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(pool: &PgPool, filter: Option<&str>) -> Result<Vec<ProductRow>, DbError> {
    let rows = match filter {
        Some(filter) => {
            sqlx::query_as::<_, ProductRow>(
                "SELECT id, c_title AS title, c_details AS details \
                 FROM catalogue.t_product \
                 WHERE c_title ILIKE $1 ESCAPE '\\' \
                 ORDER BY id",
            )
            .bind(like_pattern(filter))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, ProductRow>(
                "SELECT id, c_title AS title, c_details AS details \
                 FROM catalogue.t_product \
                 ORDER BY id",
            )
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}

/// Returns a single product by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: ProductId) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, c_title AS title, c_details AS details \
         FROM catalogue.t_product \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a product and returns the stored row with its generated id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_product(pool: &PgPool, product: &ValidProduct) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO catalogue.t_product (c_title, c_details) \
         VALUES ($1, $2) \
         RETURNING id, c_title AS title, c_details AS details",
    )
    .bind(&product.title)
    .bind(product.details.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Replaces title and details of an existing product.
///
/// Returns `false` when no row has the given id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_product(
    pool: &PgPool,
    id: ProductId,
    product: &ValidProduct,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE catalogue.t_product \
         SET c_title = $1, c_details = $2 \
         WHERE id = $3",
    )
    .bind(&product.title)
    .bind(product.details.as_deref())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes a product by id. Returns `false` when no row has the given id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_product(pool: &PgPool, id: ProductId) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM catalogue.t_product WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Repository seam
// ---------------------------------------------------------------------------

/// Storage operations the product service depends on.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_all(&self, filter: Option<&str>) -> Result<Vec<Product>, DbError>;
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, DbError>;
    async fn insert(&self, product: &ValidProduct) -> Result<Product, DbError>;
    /// Returns `false` when `id` does not exist.
    async fn update(&self, id: ProductId, product: &ValidProduct) -> Result<bool, DbError>;
    /// Returns `false` when `id` does not exist.
    async fn delete(&self, id: ProductId) -> Result<bool, DbError>;
    async fn ping(&self) -> Result<(), DbError>;
}

/// [`ProductRepository`] backed by a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn find_all(&self, filter: Option<&str>) -> Result<Vec<Product>, DbError> {
        let rows = list_products(&self.pool, filter).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, DbError> {
        Ok(get_product(&self.pool, id).await?.map(Product::from))
    }

    async fn insert(&self, product: &ValidProduct) -> Result<Product, DbError> {
        Ok(create_product(&self.pool, product).await?.into())
    }

    async fn update(&self, id: ProductId, product: &ValidProduct) -> Result<bool, DbError> {
        update_product(&self.pool, id, product).await
    }

    async fn delete(&self, id: ProductId) -> Result<bool, DbError> {
        delete_product(&self.pool, id).await
    }

    async fn ping(&self) -> Result<(), DbError> {
        crate::health_check(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_filter() {
        assert_eq!(like_pattern("товар"), "%товар%");
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
