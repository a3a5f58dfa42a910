//! # Connection Repository
//!
//! One row per (company, retailer) pair, enforced by a unique key, so two
//! concurrent approvals or redemptions cannot both create a connection.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tradelink_core::{Connection, ConnectionStatus, EntityId};

const CONNECTION_COLUMNS: &str = r#"
    id, company_id, retailer_id, status, credit_limit_paise, payment_terms,
    approved_by, approved_at, suspended_by, suspended_at, suspension_reason,
    total_orders, total_order_value_paise, last_order_date,
    created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct ConnectionRepository {
    pool: SqlitePool,
}

impl ConnectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ConnectionRepository { pool }
    }

    pub async fn get_by_id(&self, id: &EntityId) -> DbResult<Connection> {
        let sql = format!("SELECT {} FROM connections WHERE id = ?", CONNECTION_COLUMNS);
        sqlx::query_as::<_, Connection>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Connection", id))
    }

    pub async fn find_by_pair(
        &self,
        company_id: &EntityId,
        retailer_id: &EntityId,
    ) -> DbResult<Option<Connection>> {
        let sql = format!(
            "SELECT {} FROM connections WHERE company_id = ? AND retailer_id = ?",
            CONNECTION_COLUMNS
        );
        let connection = sqlx::query_as::<_, Connection>(&sql)
            .bind(company_id)
            .bind(retailer_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(connection)
    }

    /// A company's retailers, newest first.
    pub async fn list_by_company(
        &self,
        company_id: &EntityId,
        status: Option<ConnectionStatus>,
    ) -> DbResult<Vec<Connection>> {
        let sql = format!(
            r#"
            SELECT {} FROM connections
            WHERE company_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC
            "#,
            CONNECTION_COLUMNS
        );
        let connections = sqlx::query_as::<_, Connection>(&sql)
            .bind(company_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(connections)
    }

    /// Companies a retailer is connected to, newest first.
    pub async fn list_by_retailer(&self, retailer_id: &EntityId) -> DbResult<Vec<Connection>> {
        let sql = format!(
            "SELECT {} FROM connections WHERE retailer_id = ? ORDER BY created_at DESC",
            CONNECTION_COLUMNS
        );
        let connections = sqlx::query_as::<_, Connection>(&sql)
            .bind(retailer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(connections)
    }

    /// Writes status, suspension fields and terms as set on `connection`.
    ///
    /// Terminated rows are never changed; returns false for them.
    pub async fn update_status(&self, connection: &Connection) -> DbResult<bool> {
        debug!(id = %connection.id, status = %connection.status, "Updating connection status");

        let result = sqlx::query(
            r#"
            UPDATE connections SET
                status = ?,
                suspended_by = ?,
                suspended_at = ?,
                suspension_reason = ?,
                credit_limit_paise = ?,
                payment_terms = ?,
                updated_at = ?
            WHERE id = ? AND status != 'terminated'
            "#,
        )
        .bind(connection.status)
        .bind(&connection.suspended_by)
        .bind(connection.suspended_at)
        .bind(&connection.suspension_reason)
        .bind(connection.credit_limit_paise)
        .bind(&connection.payment_terms)
        .bind(connection.updated_at)
        .bind(&connection.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Transactional
    // =========================================================================

    /// ## Errors
    /// `UniqueViolation` on `connections.company_id, connections.retailer_id`
    /// when the pair is already connected.
    pub async fn insert(conn: &mut SqliteConnection, connection: &Connection) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO connections (
                id, company_id, retailer_id, status, credit_limit_paise, payment_terms,
                approved_by, approved_at, suspended_by, suspended_at, suspension_reason,
                total_orders, total_order_value_paise, last_order_date,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&connection.id)
        .bind(&connection.company_id)
        .bind(&connection.retailer_id)
        .bind(connection.status)
        .bind(connection.credit_limit_paise)
        .bind(&connection.payment_terms)
        .bind(&connection.approved_by)
        .bind(connection.approved_at)
        .bind(&connection.suspended_by)
        .bind(connection.suspended_at)
        .bind(&connection.suspension_reason)
        .bind(connection.total_orders)
        .bind(connection.total_order_value_paise)
        .bind(connection.last_order_date)
        .bind(connection.created_at)
        .bind(connection.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Bumps the order counters on the pair's connection.
    pub async fn record_order(
        conn: &mut SqliteConnection,
        id: &EntityId,
        order_value_paise: i64,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE connections SET
                total_orders = total_orders + 1,
                total_order_value_paise = total_order_value_paise + ?,
                last_order_date = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(order_value_paise)
        .bind(at)
        .bind(at)
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
    use crate::repository::fixtures::{self, Fixture};

    #[tokio::test]
    async fn test_pair_is_unique() {
        let fx = Fixture::new().await;
        fx.connect(&fx.retailer.id).await;

        let mut tx = fx.db.begin().await.unwrap();
        let err = ConnectionRepository::insert(
            &mut tx,
            &fixtures::connection(&fx.company, &fx.retailer.id),
        )
        .await
        .unwrap_err();
        assert!(err.is_unique_violation_on("connections.company_id"));
    }

    #[tokio::test]
    async fn test_record_order_accumulates() {
        let fx = Fixture::new().await;
        let c = fx.connect(&fx.retailer.id).await;

        let mut tx = fx.db.begin().await.unwrap();
        ConnectionRepository::record_order(&mut tx, &c.id, 10_000, Utc::now()).await.unwrap();
        ConnectionRepository::record_order(&mut tx, &c.id, 2_500, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        let stored = fx
            .db
            .connections()
            .find_by_pair(&fx.company.id, &fx.retailer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.total_orders, 2);
        assert_eq!(stored.total_order_value_paise, 12_500);
        assert!(stored.last_order_date.is_some());
    }

    #[tokio::test]
    async fn test_update_status_skips_terminated() {
        let fx = Fixture::new().await;
        let mut c = fixtures::connection(&fx.company, &fx.retailer.id);
        c.status = ConnectionStatus::Terminated;
        let mut tx = fx.db.begin().await.unwrap();
        ConnectionRepository::insert(&mut tx, &c).await.unwrap();
        tx.commit().await.unwrap();

        c.status = ConnectionStatus::Approved;
        assert!(!fx.db.connections().update_status(&c).await.unwrap());

        let other = fx.user("second_shop", tradelink_core::Role::Retailer).await;
        let mut live = fx.connect(&other.id).await;
        live.status = ConnectionStatus::Suspended;
        live.suspended_by = Some(fx.owner.id.clone());
        live.suspended_at = Some(Utc::now());
        live.suspension_reason = Some("Overdue invoices".to_string());
        assert!(fx.db.connections().update_status(&live).await.unwrap());

        let suspended = fx
            .db
            .connections()
            .list_by_company(&fx.company.id, Some(ConnectionStatus::Suspended))
            .await
            .unwrap();
        assert_eq!(suspended.len(), 1);
        assert_eq!(suspended[0].suspension_reason.as_deref(), Some("Overdue invoices"));
        assert_eq!(fx.db.connections().list_by_retailer(&other.id).await.unwrap().len(), 1);
    }
}
