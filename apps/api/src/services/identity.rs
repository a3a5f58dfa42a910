//! Identity service.
//!
//! Registers accounts, exchanges credentials for access tokens and resolves
//! a bearer token into the [`Actor`] every engine operation takes.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, JwtManager};
use crate::error::{ServiceError, ServiceResult};
use tradelink_core::input::{LoginInput, RegisterInput};
use tradelink_core::{Actor, EntityId, Membership, User};
use tradelink_db::{Database, DbError};

/// Token issued on register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

/// The caller's own profile.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: User,
    pub memberships: Vec<Membership>,
}

#[derive(Debug, Clone)]
pub struct IdentityService {
    db: Database,
    jwt: JwtManager,
}

impl IdentityService {
    pub fn new(db: Database, jwt: JwtManager) -> Self {
        IdentityService { db, jwt }
    }

    pub async fn register(&self, input: RegisterInput) -> ServiceResult<AuthResponse> {
        let input = input.validate()?;
        let password_hash = hash_password(&input.password)?;

        let now = Utc::now();
        let user = User {
            id: EntityId::generate(),
            username: input.username,
            email: input.email,
            role: input.role,
            first_name: input.first_name,
            last_name: input.last_name,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        match self.db.users().insert(&user, &password_hash).await {
            Ok(()) => {}
            Err(e) if e.is_unique_violation_on("users.username") => {
                return Err(ServiceError::Duplicate("Username".to_string()))
            }
            Err(e) if e.is_unique_violation_on("users.email") => {
                return Err(ServiceError::Duplicate("Email".to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, role = %user.role, "User registered");
        self.issue(user)
    }

    pub async fn login(&self, input: LoginInput) -> ServiceResult<AuthResponse> {
        let input = input.validate()?;

        let credentials = match self.db.users().find_credentials(&input.username).await? {
            Some(c) => c,
            None => {
                warn!(username = %input.username, "Login for unknown user");
                return Err(ServiceError::InvalidCredentials);
            }
        };

        if !verify_password(&input.password, &credentials.password_hash) {
            warn!(user_id = %credentials.user.id, "Login with wrong password");
            return Err(ServiceError::InvalidCredentials);
        }
        if !credentials.user.is_active {
            return Err(ServiceError::Unauthorized("Account is disabled".to_string()));
        }

        info!(user_id = %credentials.user.id, "User logged in");
        self.issue(credentials.user)
    }

    /// Resolves a bearer token into the live actor.
    ///
    /// Role and memberships are read from storage, not from the token, so a
    /// deactivated user or a removed employee loses access immediately.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<Actor> {
        let claims = self.jwt.validate_access_token(token)?;
        let user_id = EntityId::parse(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Malformed token subject".to_string()))?;

        let user = match self.db.users().get_by_id(&user_id).await {
            Ok(user) => user,
            Err(DbError::NotFound { .. }) => {
                return Err(ServiceError::Unauthorized("Account no longer exists".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        if !user.is_active {
            return Err(ServiceError::Unauthorized("Account is disabled".to_string()));
        }

        let memberships = self.db.users().memberships(&user.id).await?;
        Ok(Actor::new(user.id, user.role, memberships))
    }

    pub async fn profile(&self, actor: &Actor) -> ServiceResult<Profile> {
        let user = self.db.users().get_by_id(&actor.user_id).await?;
        Ok(Profile {
            user,
            memberships: actor.memberships.clone(),
        })
    }

    fn issue(&self, user: User) -> ServiceResult<AuthResponse> {
        let access_token = self.jwt.generate_access_token(&user)?;
        Ok(AuthResponse {
            access_token,
            token_type: "Bearer",
            expires_in: self.jwt.access_lifetime_secs(),
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Harness;
    use tradelink_core::Role;

    fn registration(username: &str, email: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            email: email.to_string(),
            password: "kirana-pass-1".to_string(),
            role: Role::Retailer,
            first_name: Some("Asha".to_string()),
            last_name: None,
        }
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let h = Harness::new().await;
        let identity = &h.state.identity;

        let registered = identity
            .register(registration("ashastores", "Asha@Example.com"))
            .await
            .unwrap();
        assert_eq!(registered.user.email, "asha@example.com");

        let login = identity
            .login(LoginInput {
                username: "asha@example.com".to_string(),
                password: "kirana-pass-1".to_string(),
            })
            .await
            .unwrap();

        let actor = identity.authenticate(&login.access_token).await.unwrap();
        assert_eq!(actor.user_id, registered.user.id);
        assert_eq!(actor.role, Role::Retailer);
        assert!(actor.memberships.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_username_and_bad_password() {
        let h = Harness::new().await;
        let identity = &h.state.identity;

        identity
            .register(registration("ashastores", "asha@example.com"))
            .await
            .unwrap();
        let err = identity
            .register(registration("ashastores", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(field) if field == "Username"));

        let err = identity
            .login(LoginInput {
                username: "ashastores".to_string(),
                password: "not-the-password".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_owner_token_carries_membership() {
        let h = Harness::new().await;
        let token = h.token_for(&h.owner.user_id).await;

        let actor = h.state.identity.authenticate(&token).await.unwrap();
        assert!(actor.administers(&h.company.id));

        assert!(matches!(
            h.state.identity.authenticate("garbage").await,
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
