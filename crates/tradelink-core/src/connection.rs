//! # Connection Rules
//!
//! Invite codes, retailer requests and the company-retailer connection.
//!
//! ## Lifecycles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  InviteCode                                                             │
//! │    redeemable ⇔ now < expires_at  AND  current_uses < max_uses         │
//! │    never deleted, expires logically                                     │
//! │                                                                         │
//! │  RetailerRequest                                                        │
//! │    pending ──approve──► approved   (terminal)                           │
//! │       └─────reject────► rejected   (terminal, retailer may ask again)   │
//! │                                                                         │
//! │  Connection            one row per (company, retailer), ever            │
//! │    approved ◄──────────► suspended                                      │
//! │    terminated          reserved, no transition produces it              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rules here are pure. Uniqueness of the connection pair and the
//! conditional invite-use increment are enforced by the storage layer.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::EntityId;
use crate::INVITE_CODE_LEN;

// =============================================================================
// Invite Code
// =============================================================================

const INVITE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draws an invite code from `[A-Z0-9]`.
///
/// Collisions are possible (36^8 space) and are retried by the caller when
/// the unique index rejects the insert.
pub fn generate_invite_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_ALPHABET[rng.gen_range(0..INVITE_ALPHABET.len())] as char)
        .collect()
}

/// Codes are matched case-insensitively; stored codes are uppercase.
pub fn normalize_invite_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// One redemption of an invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InviteRedemption {
    pub retailer_id: EntityId,
    #[ts(as = "String")]
    pub used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InviteCode {
    pub id: EntityId,
    pub code: String,
    pub company_id: EntityId,
    pub issued_by: EntityId,
    /// Restricts nothing; shown to the issuer as the intended recipient.
    pub email: Option<String>,
    pub message: String,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
    pub max_uses: i64,
    pub current_uses: i64,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub used_by: Vec<InviteRedemption>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InviteCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_uses >= self.max_uses
    }

    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && !self.is_exhausted()
    }

    /// Expiry is reported before exhaustion.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.is_expired(now) {
            return Err(CoreError::InviteExpired {
                code: self.code.clone(),
            });
        }
        if self.is_exhausted() {
            return Err(CoreError::InviteExhausted {
                code: self.code.clone(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Retailer Request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approver's decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RequestAction {
    Approve,
    Reject,
}

impl RequestAction {
    pub fn resulting_status(&self) -> RequestStatus {
        match self {
            RequestAction::Approve => RequestStatus::Approved,
            RequestAction::Reject => RequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RetailerRequest {
    pub id: EntityId,
    pub retailer_id: EntityId,
    pub company_id: EntityId,
    pub status: RequestStatus,
    pub message: String,
    pub reviewed_by: Option<EntityId>,
    #[ts(as = "Option<String>")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl RetailerRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

// =============================================================================
// Connection
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Approved,
    Suspended,
    /// Reserved for a future hard disconnect.
    Terminated,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Approved => "approved",
            ConnectionStatus::Suspended => "suspended",
            ConnectionStatus::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The trading relationship between one company and one retailer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Connection {
    pub id: EntityId,
    pub company_id: EntityId,
    pub retailer_id: EntityId,
    pub status: ConnectionStatus,
    pub credit_limit_paise: i64,
    pub payment_terms: String,
    /// Approver of the originating request, or the invite issuer.
    pub approved_by: EntityId,
    #[ts(as = "String")]
    pub approved_at: DateTime<Utc>,
    pub suspended_by: Option<EntityId>,
    #[ts(as = "Option<String>")]
    pub suspended_at: Option<DateTime<Utc>>,
    pub suspension_reason: Option<String>,
    pub total_orders: i64,
    pub total_order_value_paise: i64,
    #[ts(as = "Option<String>")]
    pub last_order_date: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// Orders are only accepted on an approved connection.
    pub fn permits_orders(&self) -> bool {
        self.status == ConnectionStatus::Approved
    }

    /// Validates a company-side status change.
    ///
    /// Only `approved` and `suspended` can be requested. A terminated
    /// connection cannot be revived.
    pub fn check_status_change(&self, target: ConnectionStatus) -> CoreResult<()> {
        if target == ConnectionStatus::Terminated {
            return Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["approved".to_string(), "suspended".to_string()],
            }
            .into());
        }
        if self.status == ConnectionStatus::Terminated {
            return Err(CoreError::invalid_state("Connection", &self.id, self.status));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn invite(max_uses: i64, current_uses: i64, expires_in: Duration) -> InviteCode {
        let now = Utc::now();
        InviteCode {
            id: EntityId::generate(),
            code: "AB12CD34".to_string(),
            company_id: EntityId::generate(),
            issued_by: EntityId::generate(),
            email: None,
            message: "Join us".to_string(),
            expires_at: now + expires_in,
            max_uses,
            current_uses,
            used_by: vec![],
            created_at: now,
        }
    }

    fn connection(status: ConnectionStatus) -> Connection {
        let now = Utc::now();
        Connection {
            id: EntityId::generate(),
            company_id: EntityId::generate(),
            retailer_id: EntityId::generate(),
            status,
            credit_limit_paise: 0,
            payment_terms: "Net 30 days".to_string(),
            approved_by: EntityId::generate(),
            approved_at: now,
            suspended_by: None,
            suspended_at: None,
            suspension_reason: None,
            total_orders: 0,
            total_order_value_paise: 0,
            last_order_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_generated_code_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = generate_invite_code(&mut rng);
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_normalize_invite_code() {
        assert_eq!(normalize_invite_code("  ab12cd34 "), "AB12CD34");
    }

    #[test]
    fn test_invite_redeemable_window() {
        let now = Utc::now();
        let fresh = invite(1, 0, Duration::days(7));
        assert!(fresh.is_redeemable(now));
        assert!(fresh.check_redeemable(now).is_ok());

        let used = invite(1, 1, Duration::days(7));
        assert!(matches!(
            used.check_redeemable(now),
            Err(CoreError::InviteExhausted { .. })
        ));
    }

    #[test]
    fn test_invite_expires_at_boundary() {
        let inv = invite(5, 0, Duration::days(1));
        assert!(inv.is_expired(inv.expires_at));
        assert!(!inv.is_expired(inv.expires_at - Duration::seconds(1)));
    }

    #[test]
    fn test_expired_reported_before_exhausted() {
        let inv = invite(1, 1, Duration::days(-1));
        assert!(matches!(
            inv.check_redeemable(Utc::now()),
            Err(CoreError::InviteExpired { .. })
        ));
    }

    #[test]
    fn test_request_action_outcome() {
        assert_eq!(RequestAction::Approve.resulting_status(), RequestStatus::Approved);
        assert_eq!(RequestAction::Reject.resulting_status(), RequestStatus::Rejected);
    }

    #[test]
    fn test_connection_status_changes() {
        let approved = connection(ConnectionStatus::Approved);
        assert!(approved.permits_orders());
        assert!(approved.check_status_change(ConnectionStatus::Suspended).is_ok());
        assert!(matches!(
            approved.check_status_change(ConnectionStatus::Terminated),
            Err(CoreError::Validation(_))
        ));

        let suspended = connection(ConnectionStatus::Suspended);
        assert!(!suspended.permits_orders());
        assert!(suspended.check_status_change(ConnectionStatus::Approved).is_ok());

        let terminated = connection(ConnectionStatus::Terminated);
        assert!(matches!(
            terminated.check_status_change(ConnectionStatus::Approved),
            Err(CoreError::InvalidState { .. })
        ));
    }
}
