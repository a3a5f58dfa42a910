//! # User Repository
//!
//! Accounts and the company memberships an [`Actor`](tradelink_core::Actor)
//! is built from.
//!
//! ## Membership Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  companies.owner_id = user        → Membership { kind: owner }         │
//! │  company_employees.user_id = user → Membership { kind: employee }      │
//! │                                                                         │
//! │  Resolved on every authenticated request, so adding an employee takes  │
//! │  effect on their next call without re-issuing a token.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tradelink_core::{EntityId, Membership, User};

/// A user row together with its password hash. Never serialized.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a new account.
    ///
    /// ## Errors
    /// `UniqueViolation` on `users.username` or `users.email`.
    pub async fn insert(&self, user: &User, password_hash: &str) -> DbResult<()> {
        debug!(username = %user.username, role = %user.role, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, password_hash, role,
                first_name, last_name, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(password_hash)
        .bind(user.role)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &EntityId) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, role, first_name, last_name,
                   is_active, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Looks an account up by username or email for login.
    pub async fn find_credentials(&self, username_or_email: &str) -> DbResult<Option<UserCredentials>> {
        let creds = sqlx::query_as::<_, UserCredentials>(
            r#"
            SELECT id, username, email, role, first_name, last_name,
                   is_active, created_at, updated_at, password_hash
            FROM users
            WHERE username = ?1 OR email = lower(?1)
            "#,
        )
        .bind(username_or_email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(creds)
    }

    /// Companies the user owns or works for.
    pub async fn memberships(&self, user_id: &EntityId) -> DbResult<Vec<Membership>> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id AS company_id, 'owner' AS kind
            FROM companies
            WHERE owner_id = ?1
            UNION ALL
            SELECT company_id, 'employee' AS kind
            FROM company_employees
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
