//! # Retailer Request Repository
//!
//! Join requests from retailers to public companies. A partial unique
//! index allows one pending request per (retailer, company) pair while
//! keeping resolved ones as history.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DbError, DbResult};
use tradelink_core::{EntityId, RequestStatus, RetailerRequest};

const REQUEST_COLUMNS: &str =
    "id, retailer_id, company_id, status, message, reviewed_by, reviewed_at, created_at";

#[derive(Debug, Clone)]
pub struct RequestRepository {
    pool: SqlitePool,
}

impl RequestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RequestRepository { pool }
    }

    pub async fn get_by_id(&self, id: &EntityId) -> DbResult<RetailerRequest> {
        let sql = format!("SELECT {} FROM retailer_requests WHERE id = ?", REQUEST_COLUMNS);
        sqlx::query_as::<_, RetailerRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Request", id))
    }

    /// Requests addressed to a company, newest first.
    pub async fn list_by_company(
        &self,
        company_id: &EntityId,
        status: Option<RequestStatus>,
    ) -> DbResult<Vec<RetailerRequest>> {
        let sql = format!(
            r#"
            SELECT {} FROM retailer_requests
            WHERE company_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC
            "#,
            REQUEST_COLUMNS
        );
        let requests = sqlx::query_as::<_, RetailerRequest>(&sql)
            .bind(company_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(requests)
    }

    /// Requests a retailer has sent, newest first.
    pub async fn list_by_retailer(&self, retailer_id: &EntityId) -> DbResult<Vec<RetailerRequest>> {
        let sql = format!(
            "SELECT {} FROM retailer_requests WHERE retailer_id = ? ORDER BY created_at DESC",
            REQUEST_COLUMNS
        );
        let requests = sqlx::query_as::<_, RetailerRequest>(&sql)
            .bind(retailer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(requests)
    }

    pub async fn find_pending(
        &self,
        retailer_id: &EntityId,
        company_id: &EntityId,
    ) -> DbResult<Option<RetailerRequest>> {
        let sql = format!(
            "SELECT {} FROM retailer_requests WHERE retailer_id = ? AND company_id = ? AND status = 'pending'",
            REQUEST_COLUMNS
        );
        let request = sqlx::query_as::<_, RetailerRequest>(&sql)
            .bind(retailer_id)
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(request)
    }

    // =========================================================================
    // Transactional
    // =========================================================================

    /// ## Errors
    /// `UniqueViolation` on the pending index when the pair already has an
    /// open request.
    pub async fn insert(conn: &mut SqliteConnection, request: &RetailerRequest) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO retailer_requests (
                id, retailer_id, company_id, status, message,
                reviewed_by, reviewed_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.retailer_id)
        .bind(&request.company_id)
        .bind(request.status)
        .bind(&request.message)
        .bind(&request.reviewed_by)
        .bind(request.reviewed_at)
        .bind(request.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Moves a pending request to `status`. False when it was not pending.
    pub async fn resolve(
        conn: &mut SqliteConnection,
        id: &EntityId,
        status: RequestStatus,
        reviewed_by: &EntityId,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE retailer_requests
            SET status = ?, reviewed_by = ?, reviewed_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status)
        .bind(reviewed_by)
        .bind(at)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
