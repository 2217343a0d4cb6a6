//! # Product Repository (Catalog Store)
//!
//! Single-row reads and writes on the catalog.
//!
//! ## Key Operations
//! - Listing active products
//! - Create / replace / soft delete
//!
//! ## Visibility
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Active vs Deleted Products                           │
//! │                                                                         │
//! │  DELETE /api/products/7                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE products SET is_active = 0 WHERE id = 7                        │
//! │       │                                                                 │
//! │       ├── list_active()      → product 7 no longer listed              │
//! │       ├── get_by_id(7)       → None                                    │
//! │       ├── update(7, ..)      → NotFound                                │
//! │       ├── place_order(7, ..) → NotFound                                │
//! │       └── order_lines.product_id = 7 stays valid (row still exists)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is never decremented here; that belongs to the order engine. A
//! catalog update may only set a new absolute, non-negative stock level.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use pharmatrade_core::{Product, ProductInput};

const PRODUCT_COLUMNS: &str =
    "id, name, price_cents, stock_quantity, is_active, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let catalog = repo.list_active().await?;
/// let product = repo.get_by_id(42).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every active product ordered by id.
    ///
    /// Two calls without an intervening mutation return identical results.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed active products");
        Ok(products)
    }

    /// Gets an active product by ID.
    ///
    /// ## Returns
    /// * `Ok(Some(product))` - Product found
    /// * `Ok(None)` - Product not found or deleted
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        debug!(id, "Getting product by ID");

        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND is_active = 1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// `input` is validated here as well as at the HTTP edge; the schema's
    /// CHECK constraints are the last line.
    pub async fn insert(&self, input: ProductInput) -> DbResult<Product> {
        let input = input.validated().map_err(pharmatrade_core::CoreError::from)?;

        debug!(name = %input.name, "Inserting product");

        let now = Utc::now();

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (name, price_cents, stock_quantity, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?4)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(input.price.cents())
        .bind(input.stock_quantity)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        debug!(id = product.id, "Product inserted");
        Ok(product)
    }

    /// Replaces name, price and stock of an active product.
    ///
    /// ## Returns
    /// * `Ok(product)` - The updated row
    /// * `Err(DbError::NotFound)` - Product doesn't exist or was deleted
    pub async fn update(&self, id: i64, input: ProductInput) -> DbResult<Product> {
        let input = input.validated().map_err(pharmatrade_core::CoreError::from)?;

        debug!(id, name = %input.name, "Updating product");

        let now = Utc::now();

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET
                name = ?2,
                price_cents = ?3,
                stock_quantity = ?4,
                updated_at = ?5
            WHERE id = ?1 AND is_active = 1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.price.cents())
        .bind(input.stock_quantity)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        product.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical order lines keep referencing the row. Deleting an already
    /// deleted product is `NotFound`.
    pub async fn soft_delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET
                is_active = 0,
                updated_at = ?2
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics and the seed binary).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use pharmatrade_core::{CoreError, Money};

    fn input(name: &str, cents: i64, stock: i64) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            price: Money::from_cents(cents),
            stock_quantity: stock,
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;

        let created = db
            .products()
            .insert(input(" Amoxicillin 500mg ", 1250, 40))
            .await
            .unwrap();

        assert_eq!(created.name, "Amoxicillin 500mg");
        assert_eq!(created.price_cents, 1250);
        assert!(created.is_active);

        let fetched = db.products().get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_list_is_ordered_and_stable() {
        let db = test_db().await;
        let repo = db.products();

        let b = repo.insert(input("Bandages", 300, 10)).await.unwrap();
        let a = repo.insert(input("Aspirin", 150, 5)).await.unwrap();

        let first = repo.list_active().await.unwrap();
        let second = repo.list_active().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![b.id, a.id]
        );
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo.insert(input("Saline", 200, 3)).await.unwrap();
        let updated = repo
            .update(created.id, input("Saline 1L", 275, 30))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Saline 1L");
        assert_eq!(updated.price_cents, 275);
        assert_eq!(updated.stock_quantity, 30);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = test_db().await;

        let err = db
            .products()
            .update(999, input("Ghost", 100, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let db = test_db().await;

        let err = db.products().insert(input("", 100, 1)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let err = db
            .products()
            .insert(input("Gauze", 100, -1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_product() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo.insert(input("Insulin pen", 4500, 8)).await.unwrap();
        repo.soft_delete(created.id).await.unwrap();

        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(repo.list_active().await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);

        let again = repo.soft_delete(created.id).await.unwrap_err();
        assert!(matches!(again, DbError::NotFound { .. }));

        let update = repo
            .update(created.id, input("Insulin pen", 4500, 8))
            .await
            .unwrap_err();
        assert!(matches!(update, DbError::NotFound { .. }));
    }
}
