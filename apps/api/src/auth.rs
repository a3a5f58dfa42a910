//! JWT authentication module.
//!
//! Handles token issuance and validation, password hashing, and the
//! [`AuthActor`] extractor that turns a bearer token into an explicit
//! [`Actor`] for every protected handler.
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! JwtManager::validate_access_token ──► Claims { sub, role, ... }
//!        │
//!        ▼
//! IdentityService::authenticate ──► user active? + memberships
//!        │
//!        ▼
//! AuthActor(Actor) handed to the handler
//! ```

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ServiceError, ServiceResult};
use crate::AppState;
use tradelink_core::{Actor, Role, User};

const ACCESS_TOKEN: &str = "access";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Role at issue time. The extractor re-reads the live role.
    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type (always "access")
    pub token_type: String,
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    access_lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, access_lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            access_lifetime_secs,
        }
    }

    pub fn access_lifetime_secs(&self) -> i64 {
        self.access_lifetime_secs
    }

    /// Generate an access token for `user`.
    pub fn generate_access_token(&self, user: &User) -> ServiceResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_lifetime_secs);

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> ServiceResult<Claims> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ServiceError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> ServiceResult<Claims> {
        let claims = self.validate_token(token)?;

        if claims.token_type != ACCESS_TOKEN {
            return Err(ServiceError::Unauthorized("Expected access token".to_string()));
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("access_lifetime_secs", &self.access_lifetime_secs)
            .finish_non_exhaustive()
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Passwords
// =============================================================================

/// Hash a password for storage.
pub fn hash_password(password: &str) -> ServiceResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against its stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Actor Extractor
// =============================================================================

/// The authenticated caller of a protected handler.
#[derive(Debug, Clone)]
pub struct AuthActor(pub Actor);

impl FromRequestParts<Arc<AppState>> for AuthActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<AuthActor>() {
            return Ok(actor.clone());
        }

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(extract_bearer_token);

        let token = match token {
            Some(token) => token.to_string(),
            None => {
                warn!(uri = %parts.uri, "Missing bearer token");
                return Err(ApiError::unauthorized("Missing bearer token"));
            }
        };

        match state.identity.authenticate(&token).await {
            Ok(actor) => {
                let actor = AuthActor(actor);
                parts.extensions.insert(actor.clone());
                Ok(actor)
            }
            Err(e) => {
                warn!(uri = %parts.uri, error = %e, "Rejected bearer token");
                Err(e.into())
            }
        }
    }
}
