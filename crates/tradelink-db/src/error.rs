//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├── UniqueViolation on a known key? Service maps it to a         │
//! │       │   domain outcome (AlreadyConnected, AlreadyInvoiced, retry)    │
//! │       ▼                                                                 │
//! │  ApiError (apps/api) ← { code, message } + HTTP status                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Second connection for the same company/retailer pair
    /// - Second pending request for the same pair
    /// - Second invoice for the same order
    /// - Invite code, order number or invoice number collision
    /// - Duplicate username, email or category name
    ///
    /// `field` holds the constraint target as SQLite reports it, e.g.
    /// `connections.company_id, connections.retailer_id`.
    #[error("Duplicate {field}")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a non-existent user, company or product
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock, over-redemption).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// True when this is a unique violation whose target mentions `column`.
    ///
    /// ```rust
    /// use tradelink_db::DbError;
    ///
    /// let err = DbError::UniqueViolation {
    ///     field: "connections.company_id, connections.retailer_id".to_string(),
    /// };
    /// assert!(err.is_unique_violation_on("connections.company_id"));
    /// assert!(!err.is_unique_violation_on("invoices.order_id"));
    /// ```
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        match self {
            DbError::UniqueViolation { field } => field.split(", ").any(|f| f == column),
            _ => false,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                //   "UNIQUE constraint failed: <table>.<column>[, <table>.<column>]"
                //   "FOREIGN KEY constraint failed"
                //   "CHECK constraint failed: <expr>"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_matches_exact_column() {
        let err = DbError::UniqueViolation {
            field: "orders.order_number".to_string(),
        };
        assert!(err.is_unique_violation_on("orders.order_number"));
        assert!(!err.is_unique_violation_on("orders.order"));
        assert!(!DbError::PoolExhausted.is_unique_violation_on("orders.order_number"));
    }
}
