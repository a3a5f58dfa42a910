//! # Error Types
//!
//! Domain-specific error types for tradelink-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tradelink-core errors (this file)                                     │
//! │  ├── CoreError        - Domain outcomes callers can act on             │
//! │  │     └── kind() → ErrorKind (NotFound, Forbidden, InvalidState,      │
//! │  │                  Conflict, Validation, InsufficientStock)           │
//! │  └── ValidationError  - Malformed input, caught before any store read  │
//! │                                                                         │
//! │  tradelink-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  apps/api errors                                                       │
//! │  └── ApiError         - { code, message } JSON body + HTTP status      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┬─► ApiError → Client              │
//! │                          DbError ───┘                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is expected and recoverable. None of them is retried
//! automatically: retrying a write such as order placement could
//! double-decrement stock.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business outcomes of the connection engine and the commerce ledger.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity absent (or, for requests, no longer pending).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Caller has no relationship to the entity's company.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Operation is illegal for the entity's current lifecycle stage.
    #[error("{entity} {id} is {status}, cannot perform operation")]
    InvalidState {
        entity: String,
        id: String,
        status: String,
    },

    /// A connection already exists for this company/retailer pair.
    #[error("Retailer is already connected to this company")]
    AlreadyConnected,

    /// The retailer already has a pending request to this company.
    #[error("A pending request to this company already exists")]
    AlreadyPending,

    /// An invoice already references this order.
    #[error("Invoice already exists for order {order_id}")]
    AlreadyInvoiced { order_id: String },

    /// Invite code is past its expiry.
    #[error("Invite code {code} has expired")]
    InviteExpired { code: String },

    /// Invite code has been used `max_uses` times.
    #[error("Invite code {code} has no uses left")]
    InviteExhausted { code: String },

    /// Target company does not accept public requests.
    #[error("This company is not accepting public requests")]
    CompanyNotPublic,

    /// No approved connection exists between the retailer and the company.
    #[error("Retailer is not connected to this company")]
    NotConnected,

    /// Product is missing, belongs to another company, or is inactive.
    #[error("Product {product_id} is not available from this company")]
    ProductUnavailable { product_id: String },

    /// Stock would go negative.
    ///
    /// ## User Workflow
    /// ```text
    /// Place order (qty: 5)
    ///      │
    ///      ▼
    /// Conditional decrement: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Basmati 5kg", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole order rolled back, client shows "Only 3 Basmati 5kg in stock"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Machine-readable category of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidState,
    Conflict,
    Validation,
    /// Specialisation of Conflict carrying available/requested quantities.
    InsufficientStock,
}

impl CoreError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden(reason.into())
    }

    pub fn invalid_state(entity: impl Into<String>, id: impl ToString, status: impl ToString) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.to_string(),
            status: status.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Forbidden(_) => ErrorKind::Forbidden,
            CoreError::InvalidState { .. } => ErrorKind::InvalidState,
            CoreError::AlreadyConnected
            | CoreError::AlreadyPending
            | CoreError::AlreadyInvoiced { .. }
            | CoreError::InviteExpired { .. }
            | CoreError::InviteExhausted { .. } => ErrorKind::Conflict,
            // relationship or catalog state does not permit the operation
            CoreError::CompanyNotPublic
            | CoreError::NotConnected
            | CoreError::ProductUnavailable { .. } => ErrorKind::InvalidState,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Raised before any store access.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Basmati 5kg".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Basmati 5kg: available 3, requested 5"
        );

        let err = CoreError::invalid_state("Order", "o-1", "shipped");
        assert_eq!(err.to_string(), "Order o-1 is shipped, cannot perform operation");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(CoreError::AlreadyConnected.kind(), ErrorKind::Conflict);
        assert_eq!(CoreError::AlreadyPending.kind(), ErrorKind::Conflict);
        assert_eq!(
            CoreError::InviteExhausted { code: "X".into() }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(CoreError::not_found("Invite", "X").kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::forbidden("no").kind(), ErrorKind::Forbidden);
        assert_eq!(
            CoreError::InsufficientStock {
                product: "p".into(),
                available: 0,
                requested: 1
            }
            .kind(),
            ErrorKind::InsufficientStock
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "message".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }
}
