//! # Order Repository
//!
//! Orders and their line items.
//!
//! ## Status Updates Are Conditional
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cancel():        WHERE status IN ('pending','confirmed','processing') │
//! │  update_status(): WHERE status NOT IN ('delivered','cancelled',        │
//! │                                        'returned')                     │
//! │                                                                         │
//! │  A cancel racing a ship: whichever UPDATE lands first wins, the other  │
//! │  matches 0 rows and the service reports InvalidState. Stock is only    │
//! │  restored after the cancel UPDATE matched, so it is restored once.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::line_items::{self, ItemTable};
use tradelink_core::{EntityId, Order, OrderStatus};

const ORDER_COLUMNS: &str = r#"
    id, order_number, company_id, retailer_id, created_by, status, payment_method,
    subtotal_paise, tax_amount_paise, total_amount_paise,
    address_line1, address_line2, city, state, pincode, country,
    delivery_notes, notes, status_notes, tracking_number,
    expected_delivery_date, delivery_date,
    cancellation_reason, cancelled_by, cancelled_at,
    invoice_generated, created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Fetches an order with its items.
    pub async fn get_by_id(&self, id: &EntityId) -> DbResult<Order> {
        let sql = format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS);
        let mut order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        order.items = line_items::fetch(&self.pool, ItemTable::Order, id).await?;
        Ok(order)
    }

    /// Orders received by a company, newest first.
    pub async fn list_by_company(
        &self,
        company_id: &EntityId,
        status: Option<OrderStatus>,
    ) -> DbResult<Vec<Order>> {
        let sql = format!(
            r#"
            SELECT {} FROM orders
            WHERE company_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC
            "#,
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(company_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        self.with_items(orders).await
    }

    /// Orders placed for a retailer, newest first.
    pub async fn list_by_retailer(
        &self,
        retailer_id: &EntityId,
        status: Option<OrderStatus>,
    ) -> DbResult<Vec<Order>> {
        let sql = format!(
            r#"
            SELECT {} FROM orders
            WHERE retailer_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC
            "#,
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(retailer_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        self.with_items(orders).await
    }

    async fn with_items(&self, mut orders: Vec<Order>) -> DbResult<Vec<Order>> {
        for order in &mut orders {
            order.items = line_items::fetch(&self.pool, ItemTable::Order, &order.id).await?;
        }
        Ok(orders)
    }

    /// Moves a non-terminal order to `status`.
    ///
    /// Notes and tracking number are only overwritten when given. Moving to
    /// `delivered` stamps the delivery date once.
    pub async fn update_status(
        &self,
        id: &EntityId,
        status: OrderStatus,
        status_notes: Option<&str>,
        tracking_number: Option<&str>,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, status = %status, "Updating order status");

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = ?1,
                status_notes = COALESCE(?2, status_notes),
                tracking_number = COALESCE(?3, tracking_number),
                delivery_date = CASE WHEN ?1 = 'delivered'
                                     THEN COALESCE(delivery_date, ?4)
                                     ELSE delivery_date END,
                updated_at = ?4
            WHERE id = ?5 AND status NOT IN ('delivered', 'cancelled', 'returned')
            "#,
        )
        .bind(status)
        .bind(status_notes)
        .bind(tracking_number)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Transactional
    // =========================================================================

    /// Number of orders a company has received; seeds the order number.
    pub async fn count_by_company(conn: &mut SqliteConnection, company_id: &EntityId) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE company_id = ?")
            .bind(company_id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }

    /// Inserts the order row and its items.
    ///
    /// ## Errors
    /// `UniqueViolation` on `orders.order_number` when the number is taken.
    pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(number = %order.order_number, items = order.items.len(), "Inserting order");

        let addr = &order.delivery_address;
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, company_id, retailer_id, created_by, status, payment_method,
                subtotal_paise, tax_amount_paise, total_amount_paise,
                address_line1, address_line2, city, state, pincode, country,
                delivery_notes, notes, status_notes, tracking_number,
                expected_delivery_date, delivery_date,
                cancellation_reason, cancelled_by, cancelled_at,
                invoice_generated, created_at, updated_at
            ) VALUES (
                ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?,
                ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?,
                ?, ?,
                ?, ?, ?,
                ?, ?, ?
            )
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.company_id)
        .bind(&order.retailer_id)
        .bind(&order.created_by)
        .bind(order.status)
        .bind(order.payment_method)
        .bind(order.subtotal_paise)
        .bind(order.tax_amount_paise)
        .bind(order.total_amount_paise)
        .bind(&addr.address_line1)
        .bind(&addr.address_line2)
        .bind(&addr.city)
        .bind(&addr.state)
        .bind(&addr.pincode)
        .bind(&addr.country)
        .bind(&order.delivery_notes)
        .bind(&order.notes)
        .bind(&order.status_notes)
        .bind(&order.tracking_number)
        .bind(order.expected_delivery_date)
        .bind(order.delivery_date)
        .bind(&order.cancellation_reason)
        .bind(&order.cancelled_by)
        .bind(order.cancelled_at)
        .bind(order.invoice_generated)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;

        line_items::insert(conn, ItemTable::Order, &order.id, &order.items).await
    }

    /// Cancels a cancellable order. False when it had already moved on.
    pub async fn cancel(
        conn: &mut SqliteConnection,
        id: &EntityId,
        cancelled_by: &EntityId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = 'cancelled',
                cancellation_reason = ?,
                cancelled_by = ?,
                cancelled_at = ?,
                updated_at = ?
            WHERE id = ? AND status IN ('pending', 'confirmed', 'processing')
            "#,
        )
        .bind(reason)
        .bind(cancelled_by)
        .bind(at)
        .bind(at)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn set_invoice_generated(
        conn: &mut SqliteConnection,
        id: &EntityId,
        generated: bool,
    ) -> DbResult<()> {
        sqlx::query("UPDATE orders SET invoice_generated = ? WHERE id = ?")
            .bind(generated)
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

    #[tokio::test]
    async fn test_insert_and_fetch_with_items() {
        let fx = Fixture::new().await;
        let placed = fx.place(4).await;

        let order = fx.db.orders().get_by_id(&placed.id).await.unwrap();
        assert_eq!(order.order_number, placed.order_number);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 4);
        assert_eq!(order.items, placed.items);
        assert_eq!(order.delivery_address.pincode, "411001");
        assert_eq!(order.total_amount_paise, placed.total_amount_paise);

        let mut tx = fx.db.begin().await.unwrap();
        assert_eq!(OrderRepository::count_by_company(&mut tx, &fx.company.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_order_number_unique() {
        let fx = Fixture::new().await;
        let placed = fx.place(1).await;

        let mut dup = placed.clone();
        dup.id = EntityId::generate();
        let mut tx = fx.db.begin().await.unwrap();
        let err = OrderRepository::insert(&mut tx, &dup).await.unwrap_err();
        assert!(err.is_unique_violation_on("orders.order_number"));
    }

    #[tokio::test]
    async fn test_cancel_only_before_shipping() {
        let fx = Fixture::new().await;
        let shipped = fx.place(1).await;
        let open = fx.place(1).await;
        let orders = fx.db.orders();

        assert!(orders
            .update_status(&shipped.id, OrderStatus::Shipped, None, Some("AWB123"), Utc::now())
            .await
            .unwrap());

        let mut tx = fx.db.begin().await.unwrap();
        assert!(!OrderRepository::cancel(&mut tx, &shipped.id, &fx.owner.id, "late", Utc::now())
            .await
            .unwrap());
        assert!(OrderRepository::cancel(&mut tx, &open.id, &fx.owner.id, "late", Utc::now())
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let cancelled = orders.get_by_id(&open.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("late"));
        assert_eq!(cancelled.cancelled_by, Some(fx.owner.id.clone()));

        let shipped = orders.get_by_id(&shipped.id).await.unwrap();
        assert_eq!(shipped.tracking_number.as_deref(), Some("AWB123"));
    }

    #[tokio::test]
    async fn test_terminal_orders_do_not_move() {
        let fx = Fixture::new().await;
        let placed = fx.place(1).await;
        let orders = fx.db.orders();

        assert!(orders
            .update_status(&placed.id, OrderStatus::Delivered, None, None, Utc::now())
            .await
            .unwrap());
        let delivered = orders.get_by_id(&placed.id).await.unwrap();
        assert!(delivered.delivery_date.is_some());

        assert!(!orders
            .update_status(&placed.id, OrderStatus::Pending, None, None, Utc::now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let fx = Fixture::new().await;
        let a = fx.place(1).await;
        fx.place(2).await;
        fx.db
            .orders()
            .update_status(&a.id, OrderStatus::Confirmed, Some("packed"), None, Utc::now())
            .await
            .unwrap();

        let orders = fx.db.orders();
        assert_eq!(orders.list_by_company(&fx.company.id, None).await.unwrap().len(), 2);
        let confirmed = orders
            .list_by_retailer(&fx.retailer.id, Some(OrderStatus::Confirmed))
            .await
            .unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].status_notes.as_deref(), Some("packed"));
        assert_eq!(confirmed[0].items.len(), 1);
    }
}
