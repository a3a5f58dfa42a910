//! Error types for the API.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Services ──► ServiceError                                              │
//! │                 ├── Core(CoreError)    business outcome, passed through │
//! │                 ├── Db(DbError)        storage failure, logged          │
//! │                 └── Unauthorized / InvalidCredentials / Duplicate       │
//! │                        │                                                │
//! │  Handlers ──► ApiError { code, message, details? } + HTTP status        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use tradelink_core::{CoreError, ValidationError};
use tradelink_db::DbError;

// =============================================================================
// Service Error
// =============================================================================

/// Errors returned by the service layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Business outcome of an engine operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure not mapped to a business outcome.
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Username, email or category name already taken.
    #[error("{0} is already taken")]
    Duplicate(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// API Error
// =============================================================================

/// Machine-readable error code, serialized as SCREAMING_SNAKE_CASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    ValidationFailed,
    Unauthorized,
    InvalidCredentials,
    Forbidden,
    NotFound,
    AlreadyConnected,
    AlreadyPending,
    AlreadyInvoiced,
    InviteExpired,
    InviteExhausted,
    InsufficientStock,
    Duplicate,
    InvalidState,
    CompanyNotPublic,
    NotConnected,
    ProductUnavailable,
    InvalidReference,
    InternalError,
}

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized | ErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::AlreadyConnected
            | ErrorCode::AlreadyPending
            | ErrorCode::AlreadyInvoiced
            | ErrorCode::InviteExpired
            | ErrorCode::InviteExhausted
            | ErrorCode::InsufficientStock
            | ErrorCode::Duplicate => StatusCode::CONFLICT,
            ErrorCode::InvalidState
            | ErrorCode::CompanyNotPublic
            | ErrorCode::NotConnected
            | ErrorCode::ProductUnavailable
            | ErrorCode::InvalidReference => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body: `{"code": "...", "message": "...", "details": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn internal() -> Self {
        ApiError::new(ErrorCode::InternalError, "Internal server error")
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.http_status(), Json(self)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, message),
            CoreError::Forbidden(_) => ApiError::new(ErrorCode::Forbidden, message),
            CoreError::InvalidState { .. } => ApiError::new(ErrorCode::InvalidState, message),
            CoreError::AlreadyConnected => ApiError::new(ErrorCode::AlreadyConnected, message),
            CoreError::AlreadyPending => ApiError::new(ErrorCode::AlreadyPending, message),
            CoreError::AlreadyInvoiced { .. } => ApiError::new(ErrorCode::AlreadyInvoiced, message),
            CoreError::InviteExpired { .. } => ApiError::new(ErrorCode::InviteExpired, message),
            CoreError::InviteExhausted { .. } => ApiError::new(ErrorCode::InviteExhausted, message),
            CoreError::CompanyNotPublic => ApiError::new(ErrorCode::CompanyNotPublic, message),
            CoreError::NotConnected => ApiError::new(ErrorCode::NotConnected, message),
            CoreError::ProductUnavailable { .. } => {
                ApiError::new(ErrorCode::ProductUnavailable, message)
            }
            CoreError::InsufficientStock {
                product,
                available,
                requested,
            } => ApiError::new(ErrorCode::InsufficientStock, message).with_details(json!({
                "product": product,
                "available": available,
                "requested": requested,
            })),
            CoreError::Validation(_) => ApiError::new(ErrorCode::ValidationFailed, message),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            DbError::UniqueViolation { ref field } => {
                ApiError::new(ErrorCode::Duplicate, format!("Duplicate value for {}", field))
            }
            DbError::ForeignKeyViolation { .. } => ApiError::new(
                ErrorCode::InvalidReference,
                "A referenced record does not exist",
            ),
            other => {
                error!(error = %other, "Storage failure");
                ApiError::internal()
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::from(CoreError::Validation(err))
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Core(e) => e.into(),
            ServiceError::Db(e) => e.into(),
            ServiceError::Unauthorized(msg) => ApiError::unauthorized(msg),
            ServiceError::InvalidCredentials => {
                ApiError::new(ErrorCode::InvalidCredentials, err.to_string())
            }
            ServiceError::Duplicate(_) => ApiError::new(ErrorCode::Duplicate, err.to_string()),
            ServiceError::Internal(msg) => {
                error!(error = %msg, "Internal service error");
                ApiError::internal()
            }
        }
    }
}

// Extractor rejections (malformed JSON, bad path ids, bad query strings).

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(ErrorCode::BadRequest, rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::new(ErrorCode::BadRequest, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new(ErrorCode::BadRequest, rejection.body_text())
    }
}
