//! # Product Repository
//!
//! Catalog rows and the stock arithmetic orders depend on.
//!
//! ## Stock Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Conditional Decrement (no read-then-write)              │
//! │                                                                         │
//! │  UPDATE products                                                       │
//! │     SET available_quantity = available_quantity - :qty,                │
//! │         total_shipped      = total_shipped + :qty                      │
//! │   WHERE id = :id AND available_quantity >= :qty                        │
//! │                                                                         │
//! │  rows_affected = 1  → reserved                                         │
//! │  rows_affected = 0  → not enough stock; caller reads the current       │
//! │                       quantity for the error and drops the tx          │
//! │                                                                         │
//! │  Two orders racing for the last units: SQLite serialises the writers,  │
//! │  the second sees the decremented value and gets 0 rows.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tradelink_core::{EntityId, Product};

const PRODUCT_COLUMNS: &str = r#"
    id, company_id, category_id, name, description, sku, hsn_code, unit,
    price_paise, available_quantity, total_shipped, reorder_level,
    cgst_rate_bps, sgst_rate_bps, igst_rate_bps, cess_rate_bps,
    is_active, created_at, updated_at
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().get_by_id(&id).await?;
///
/// let mut tx = db.begin().await?;
/// if !ProductRepository::reserve_stock(&mut tx, &id, 3).await? {
///     let available = ProductRepository::available_quantity(&mut tx, &id).await?;
///     // report InsufficientStock, tx drops and rolls back
/// }
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

    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(name = %product.name, company = %product.company_id, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, company_id, category_id, name, description, sku, hsn_code, unit,
                price_paise, available_quantity, total_shipped, reorder_level,
                cgst_rate_bps, sgst_rate_bps, igst_rate_bps, cess_rate_bps,
                is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.company_id)
        .bind(&product.category_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.sku)
        .bind(&product.hsn_code)
        .bind(&product.unit)
        .bind(product.price_paise)
        .bind(product.available_quantity)
        .bind(product.total_shipped)
        .bind(product.reorder_level)
        .bind(product.cgst_rate_bps)
        .bind(product.sgst_rate_bps)
        .bind(product.igst_rate_bps)
        .bind(product.cess_rate_bps)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &EntityId) -> DbResult<Product> {
        let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Products missing from the table are absent from the result.
    pub async fn get_many(&self, ids: &[EntityId]) -> DbResult<Vec<Product>> {
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_by_id(id).await {
                Ok(p) => products.push(p),
                Err(DbError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(products)
    }

    pub async fn list_by_company(&self, company_id: &EntityId) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE company_id = ? ORDER BY name",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Sets the on-hand quantity (and optionally the reorder level).
    pub async fn set_stock(
        &self,
        id: &EntityId,
        available_quantity: i64,
        reorder_level: Option<i64>,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                available_quantity = ?,
                reorder_level = COALESCE(?, reorder_level),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(available_quantity)
        .bind(reorder_level)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    // =========================================================================
    // Transactional stock movements
    // =========================================================================

    /// Decrements stock by `quantity` if at least that much is available.
    ///
    /// Returns false (and changes nothing) when stock is short.
    pub async fn reserve_stock(
        conn: &mut SqliteConnection,
        id: &EntityId,
        quantity: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                available_quantity = available_quantity - ?1,
                total_shipped = total_shipped + ?1
            WHERE id = ?2 AND available_quantity >= ?1
            "#,
        )
        .bind(quantity)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn available_quantity(conn: &mut SqliteConnection, id: &EntityId) -> DbResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT available_quantity FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Returns `quantity` units to stock after a cancellation.
    pub async fn restore_stock(
        conn: &mut SqliteConnection,
        id: &EntityId,
        quantity: i64,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE products SET
                available_quantity = available_quantity + ?1,
                total_shipped = MAX(total_shipped - ?1, 0)
            WHERE id = ?2
            "#,
        )
        .bind(quantity)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::Fixture;
    use tradelink_core::ProductStatus;

    #[tokio::test]
    async fn test_product_roundtrip_keeps_rates() {
        let fx = Fixture::new().await;
        let p = fx.db.products().get_by_id(&fx.product.id).await.unwrap();

        assert_eq!(p.price_paise, 50_000);
        assert_eq!(p.cgst_rate_bps, 250);
        assert_eq!(p.sgst_rate_bps, 250);
        assert_eq!(p.status(), ProductStatus::Sufficient);
        assert_eq!(p.unit, "PACK");
    }

    #[tokio::test]
    async fn test_reserve_stock_is_conditional() {
        let fx = Fixture::new().await;
        let id = &fx.product.id;

        let mut tx = fx.db.begin().await.unwrap();
        assert!(ProductRepository::reserve_stock(&mut tx, id, 15).await.unwrap());
        assert!(!ProductRepository::reserve_stock(&mut tx, id, 6).await.unwrap());
        assert_eq!(ProductRepository::available_quantity(&mut tx, id).await.unwrap(), 5);
        tx.commit().await.unwrap();

        let p = fx.db.products().get_by_id(id).await.unwrap();
        assert_eq!(p.available_quantity, 5);
        assert_eq!(p.total_shipped, 15);
        assert_eq!(p.status(), ProductStatus::LowStock);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back_reservation() {
        let fx = Fixture::new().await;
        let id = &fx.product.id;

        {
            let mut tx = fx.db.begin().await.unwrap();
            assert!(ProductRepository::reserve_stock(&mut tx, id, 20).await.unwrap());
            // dropped without commit
        }

        let p = fx.db.products().get_by_id(id).await.unwrap();
        assert_eq!(p.available_quantity, 20);
        assert_eq!(p.total_shipped, 0);
    }

    #[tokio::test]
    async fn test_restore_stock() {
        let fx = Fixture::new().await;
        let id = &fx.product.id;

        let mut tx = fx.db.begin().await.unwrap();
        ProductRepository::reserve_stock(&mut tx, id, 8).await.unwrap();
        ProductRepository::restore_stock(&mut tx, id, 8).await.unwrap();
        tx.commit().await.unwrap();

        let p = fx.db.products().get_by_id(id).await.unwrap();
        assert_eq!(p.available_quantity, 20);
        assert_eq!(p.total_shipped, 0);
    }

    #[tokio::test]
    async fn test_set_stock() {
        let fx = Fixture::new().await;
        let repo = fx.db.products();

        repo.set_stock(&fx.product.id, 0, Some(5), Utc::now()).await.unwrap();
        let p = repo.get_by_id(&fx.product.id).await.unwrap();
        assert_eq!(p.available_quantity, 0);
        assert_eq!(p.reorder_level, 5);
        assert_eq!(p.status(), ProductStatus::OutOfStock);

        // negative stock is refused by the schema
        let err = repo
            .set_stock(&fx.product.id, -1, None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
