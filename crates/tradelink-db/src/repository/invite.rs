//! # Invite Repository
//!
//! Invite codes and their redemption log.
//!
//! ## Redemption Counting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE invite_codes SET current_uses = current_uses + 1               │
//! │   WHERE id = :id AND current_uses < max_uses                           │
//! │                                                                         │
//! │  0 rows → the last use was taken by a concurrent redemption.           │
//! │  The CHECK (current_uses <= max_uses) backs this up in the schema.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tradelink_core::{EntityId, InviteCode, InviteRedemption};

const INVITE_COLUMNS: &str = r#"
    id, code, company_id, issued_by, email, message,
    expires_at, max_uses, current_uses, created_at
"#;

#[derive(Debug, Clone)]
pub struct InviteRepository {
    pool: SqlitePool,
}

impl InviteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InviteRepository { pool }
    }

    /// ## Errors
    /// `UniqueViolation` on `invite_codes.code` when the drawn code is taken.
    pub async fn insert(&self, invite: &InviteCode) -> DbResult<()> {
        debug!(company = %invite.company_id, max_uses = invite.max_uses, "Inserting invite code");

        sqlx::query(
            r#"
            INSERT INTO invite_codes (
                id, code, company_id, issued_by, email, message,
                expires_at, max_uses, current_uses, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invite.id)
        .bind(&invite.code)
        .bind(&invite.company_id)
        .bind(&invite.issued_by)
        .bind(&invite.email)
        .bind(&invite.message)
        .bind(invite.expires_at)
        .bind(invite.max_uses)
        .bind(invite.current_uses)
        .bind(invite.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Looks up a code (already normalised by the caller).
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<InviteCode>> {
        let sql = format!("SELECT {} FROM invite_codes WHERE code = ?", INVITE_COLUMNS);
        let invite = sqlx::query_as::<_, InviteCode>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        match invite {
            Some(mut invite) => {
                invite.used_by = self.redemptions(&invite.id).await?;
                Ok(Some(invite))
            }
            None => Ok(None),
        }
    }

    /// Invites issued by a company, newest first.
    pub async fn list_by_company(&self, company_id: &EntityId) -> DbResult<Vec<InviteCode>> {
        let sql = format!(
            "SELECT {} FROM invite_codes WHERE company_id = ? ORDER BY created_at DESC",
            INVITE_COLUMNS
        );
        let mut invites = sqlx::query_as::<_, InviteCode>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;

        for invite in &mut invites {
            invite.used_by = self.redemptions(&invite.id).await?;
        }
        Ok(invites)
    }

    async fn redemptions(&self, invite_id: &EntityId) -> DbResult<Vec<InviteRedemption>> {
        let used_by = sqlx::query_as::<_, InviteRedemption>(
            "SELECT retailer_id, used_at FROM invite_redemptions WHERE invite_id = ? ORDER BY used_at",
        )
        .bind(invite_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(used_by)
    }

    // =========================================================================
    // Transactional
    // =========================================================================

    /// Takes one use of the invite. False when none are left.
    pub async fn consume_use(conn: &mut SqliteConnection, id: &EntityId) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE invite_codes SET current_uses = current_uses + 1 WHERE id = ? AND current_uses < max_uses",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn record_redemption(
        conn: &mut SqliteConnection,
        invite_id: &EntityId,
        retailer_id: &EntityId,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query("INSERT INTO invite_redemptions (invite_id, retailer_id, used_at) VALUES (?, ?, ?)")
            .bind(invite_id)
            .bind(retailer_id)
            .bind(at)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
