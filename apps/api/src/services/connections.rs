//! # Connection Engine
//!
//! Owns how a retailer comes to trade with a company.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  owner ── GenerateInvite ──► InviteCode ──► retailer RedeemInvite ─┐   │
//! │                                                                     │   │
//! │  retailer ── RequestApproval ──► RetailerRequest(pending)           │   │
//! │                                       │                             │   │
//! │                    owner ResolveRequest(approve | reject)           │   │
//! │                                       │                             ▼   │
//! │                                       └──────────────────► Connection   │
//! │                                                        approved ⇄ suspended
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Races
//! A connection row is unique per (company, retailer). Every path that
//! creates one inserts it inside a transaction and treats the unique
//! violation as `AlreadyConnected`, so a redemption racing an approval
//! leaves exactly one row. Invite uses are consumed with a conditional
//! increment after the connection insert succeeds.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};
use tradelink_core::connection::generate_invite_code;
use tradelink_core::input::{
    GenerateInviteInput, RedeemInviteInput, RequestApprovalInput, ResolveRequestInput,
    UpdateConnectionStatusInput,
};
use tradelink_core::{
    Actor, Company, Connection, ConnectionStatus, CoreError, EntityId, InviteCode,
    RequestAction, RequestStatus, RetailerRequest, Role, DEFAULT_INVITE_MESSAGE,
};
use tradelink_db::{
    ConnectionRepository, Database, DbError, InviteRepository, RequestRepository,
};

/// Attempts at drawing an unused invite code.
const INVITE_CODE_ATTEMPTS: usize = 5;

/// An invite with its redeemability derived at read time.
#[derive(Debug, Clone, Serialize)]
pub struct InviteView {
    #[serde(flatten)]
    pub invite: InviteCode,
    pub is_redeemable: bool,
}

impl InviteView {
    fn at(invite: InviteCode, now: DateTime<Utc>) -> Self {
        let is_redeemable = invite.is_redeemable(now);
        InviteView {
            invite,
            is_redeemable,
        }
    }
}

/// Result of requesting or resolving: the request, plus the connection when
/// one was created.
#[derive(Debug, Clone, Serialize)]
pub struct RequestOutcome {
    pub request: RetailerRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestFilter {
    #[serde(default)]
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionFilter {
    #[serde(default)]
    pub status: Option<ConnectionStatus>,
}

#[derive(Debug, Clone)]
pub struct ConnectionService {
    db: Database,
    default_invite_ttl_days: i64,
}

impl ConnectionService {
    pub fn new(db: Database, default_invite_ttl_days: i64) -> Self {
        ConnectionService {
            db,
            default_invite_ttl_days,
        }
    }

    // =========================================================================
    // Invites
    // =========================================================================

    pub async fn generate_invite(
        &self,
        actor: &Actor,
        company_id: &EntityId,
        input: GenerateInviteInput,
    ) -> ServiceResult<InviteView> {
        actor.require_admin(company_id)?;
        let input = input.validate()?;

        let now = Utc::now();
        let ttl_days = input.expires_in_days.unwrap_or(self.default_invite_ttl_days);
        let message = input
            .message
            .unwrap_or_else(|| DEFAULT_INVITE_MESSAGE.to_string());

        for attempt in 1..=INVITE_CODE_ATTEMPTS {
            let invite = InviteCode {
                id: EntityId::generate(),
                code: generate_invite_code(&mut rand::thread_rng()),
                company_id: company_id.clone(),
                issued_by: actor.user_id.clone(),
                email: input.email.clone(),
                message: message.clone(),
                expires_at: now + Duration::days(ttl_days),
                max_uses: input.max_uses.unwrap_or(1),
                current_uses: 0,
                used_by: vec![],
                created_at: now,
            };

            match self.db.invites().insert(&invite).await {
                Ok(()) => {
                    info!(
                        company_id = %company_id,
                        code = %invite.code,
                        max_uses = invite.max_uses,
                        "Invite generated"
                    );
                    return Ok(InviteView::at(invite, now));
                }
                Err(e) if e.is_unique_violation_on("invite_codes.code") => {
                    warn!(attempt, "Invite code collision, drawing again");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Internal(
            "could not allocate a unique invite code".to_string(),
        ))
    }

    pub async fn list_invites(
        &self,
        actor: &Actor,
        company_id: &EntityId,
    ) -> ServiceResult<Vec<InviteView>> {
        actor.require_admin(company_id)?;

        let now = Utc::now();
        let invites = self.db.invites().list_by_company(company_id).await?;
        Ok(invites.into_iter().map(|i| InviteView::at(i, now)).collect())
    }

    /// Redeems an invite code, connecting the calling retailer.
    ///
    /// ## Errors
    /// `NotFound`, `InviteExpired`, `InviteExhausted`, `AlreadyConnected`.
    /// On `AlreadyConnected` the invite is left untouched.
    pub async fn redeem_invite(
        &self,
        actor: &Actor,
        input: RedeemInviteInput,
    ) -> ServiceResult<Connection> {
        actor.require_role(Role::Retailer)?;
        let input = input.validate()?;
        let now = Utc::now();

        let invite = self
            .db
            .invites()
            .find_by_code(&input.invite_code)
            .await?
            .ok_or_else(|| CoreError::not_found("Invite code", &input.invite_code))?;
        invite.check_redeemable(now)?;

        if self
            .db
            .connections()
            .find_by_pair(&invite.company_id, &actor.user_id)
            .await?
            .is_some()
        {
            return Err(CoreError::AlreadyConnected.into());
        }

        let company = self.db.companies().get_by_id(&invite.company_id).await?;
        let connection = new_connection(
            &company,
            &actor.user_id,
            &invite.issued_by,
            None,
            None,
            now,
        );

        let mut tx = self.db.begin().await?;
        insert_connection(&mut tx, &connection).await?;
        if !InviteRepository::consume_use(&mut tx, &invite.id).await? {
            return Err(CoreError::InviteExhausted { code: invite.code }.into());
        }
        InviteRepository::record_redemption(&mut tx, &invite.id, &actor.user_id, now).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            code = %invite.code,
            company_id = %connection.company_id,
            retailer_id = %connection.retailer_id,
            "Invite redeemed"
        );
        Ok(connection)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// A retailer asks to trade with a public company.
    ///
    /// Companies with `auto_approve_requests` answer immediately: the request
    /// is stored approved and the connection is created in the same
    /// transaction.
    pub async fn request_approval(
        &self,
        actor: &Actor,
        input: RequestApprovalInput,
    ) -> ServiceResult<RequestOutcome> {
        actor.require_role(Role::Retailer)?;
        let input = input.validate()?;

        let company = self.db.companies().get_by_id(&input.company_id).await?;
        if !company.is_public {
            return Err(CoreError::CompanyNotPublic.into());
        }
        if self
            .db
            .connections()
            .find_by_pair(&company.id, &actor.user_id)
            .await?
            .is_some()
        {
            return Err(CoreError::AlreadyConnected.into());
        }
        if self
            .db
            .requests()
            .find_pending(&actor.user_id, &company.id)
            .await?
            .is_some()
        {
            return Err(CoreError::AlreadyPending.into());
        }

        let now = Utc::now();
        let auto_approve = company.settings.auto_approve_requests;
        let request = RetailerRequest {
            id: EntityId::generate(),
            retailer_id: actor.user_id.clone(),
            company_id: company.id.clone(),
            status: if auto_approve {
                RequestStatus::Approved
            } else {
                RequestStatus::Pending
            },
            message: input.message,
            reviewed_by: auto_approve.then(|| company.owner_id.clone()),
            reviewed_at: auto_approve.then_some(now),
            created_at: now,
        };

        let mut tx = self.db.begin().await?;
        let connection = if auto_approve {
            let connection =
                new_connection(&company, &actor.user_id, &company.owner_id, None, None, now);
            insert_connection(&mut tx, &connection).await?;
            Some(connection)
        } else {
            None
        };
        match RequestRepository::insert(&mut tx, &request).await {
            Ok(()) => {}
            Err(e) if e.is_unique_violation_on("retailer_requests.retailer_id") => {
                return Err(CoreError::AlreadyPending.into())
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            request_id = %request.id,
            company_id = %request.company_id,
            retailer_id = %request.retailer_id,
            status = %request.status,
            "Retailer request created"
        );
        Ok(RequestOutcome {
            request,
            connection,
        })
    }

    pub async fn list_requests(
        &self,
        actor: &Actor,
        company_id: &EntityId,
        filter: RequestFilter,
    ) -> ServiceResult<Vec<RetailerRequest>> {
        actor.require_admin(company_id)?;
        Ok(self
            .db
            .requests()
            .list_by_company(company_id, filter.status)
            .await?)
    }

    pub async fn list_my_requests(&self, actor: &Actor) -> ServiceResult<Vec<RetailerRequest>> {
        actor.require_role(Role::Retailer)?;
        Ok(self.db.requests().list_by_retailer(&actor.user_id).await?)
    }

    /// Approves or rejects a pending request.
    ///
    /// ## Errors
    /// `NotFound` unless the request is pending, `Forbidden` unless the
    /// caller owns the company, `AlreadyConnected` when approving a pair that
    /// connected in the meantime.
    pub async fn resolve_request(
        &self,
        actor: &Actor,
        request_id: &EntityId,
        input: ResolveRequestInput,
    ) -> ServiceResult<RequestOutcome> {
        let input = input.validate()?;

        let mut request = self.db.requests().get_by_id(request_id).await?;
        if !request.is_pending() {
            return Err(CoreError::not_found("Pending request", request_id).into());
        }
        actor.require_admin(&request.company_id)?;

        let now = Utc::now();
        let status = input.action.resulting_status();

        let connection = match input.action {
            RequestAction::Approve => {
                let company = self.db.companies().get_by_id(&request.company_id).await?;
                if self
                    .db
                    .connections()
                    .find_by_pair(&company.id, &request.retailer_id)
                    .await?
                    .is_some()
                {
                    return Err(CoreError::AlreadyConnected.into());
                }
                Some(new_connection(
                    &company,
                    &request.retailer_id,
                    &actor.user_id,
                    input.credit_limit_paise,
                    input.payment_terms,
                    now,
                ))
            }
            RequestAction::Reject => None,
        };

        let mut tx = self.db.begin().await?;
        if !RequestRepository::resolve(&mut tx, request_id, status, &actor.user_id, now).await? {
            return Err(CoreError::not_found("Pending request", request_id).into());
        }
        if let Some(connection) = &connection {
            insert_connection(&mut tx, connection).await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        request.status = status;
        request.reviewed_by = Some(actor.user_id.clone());
        request.reviewed_at = Some(now);

        info!(
            request_id = %request.id,
            status = %request.status,
            reviewer = %actor.user_id,
            "Retailer request resolved"
        );
        Ok(RequestOutcome {
            request,
            connection,
        })
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Suspends or reactivates a connection, optionally changing its terms.
    pub async fn set_connection_status(
        &self,
        actor: &Actor,
        connection_id: &EntityId,
        input: UpdateConnectionStatusInput,
    ) -> ServiceResult<Connection> {
        let input = input.validate()?;

        let mut connection = self.db.connections().get_by_id(connection_id).await?;
        actor.require_admin(&connection.company_id)?;
        connection.check_status_change(input.status)?;

        let now = Utc::now();
        connection.status = input.status;
        match input.status {
            ConnectionStatus::Suspended => {
                connection.suspended_by = Some(actor.user_id.clone());
                connection.suspended_at = Some(now);
                connection.suspension_reason = input.reason;
            }
            _ => {
                connection.suspended_by = None;
                connection.suspended_at = None;
                connection.suspension_reason = None;
            }
        }
        if let Some(limit) = input.credit_limit_paise {
            connection.credit_limit_paise = limit;
        }
        if let Some(terms) = input.payment_terms {
            connection.payment_terms = terms;
        }
        connection.updated_at = now;

        if !self.db.connections().update_status(&connection).await? {
            return Err(CoreError::invalid_state(
                "Connection",
                connection_id,
                ConnectionStatus::Terminated,
            )
            .into());
        }

        info!(
            connection_id = %connection.id,
            status = %connection.status,
            "Connection status changed"
        );
        Ok(connection)
    }

    /// A company's retailers, for its owner and employees.
    pub async fn list_connections(
        &self,
        actor: &Actor,
        company_id: &EntityId,
        filter: ConnectionFilter,
    ) -> ServiceResult<Vec<Connection>> {
        actor.require_operator(company_id)?;
        Ok(self
            .db
            .connections()
            .list_by_company(company_id, filter.status)
            .await?)
    }

    /// Companies the calling retailer trades with.
    pub async fn list_my_connections(&self, actor: &Actor) -> ServiceResult<Vec<Connection>> {
        actor.require_role(Role::Retailer)?;
        Ok(self.db.connections().list_by_retailer(&actor.user_id).await?)
    }
}

fn new_connection(
    company: &Company,
    retailer_id: &EntityId,
    approved_by: &EntityId,
    credit_limit_paise: Option<i64>,
    payment_terms: Option<String>,
    now: DateTime<Utc>,
) -> Connection {
    Connection {
        id: EntityId::generate(),
        company_id: company.id.clone(),
        retailer_id: retailer_id.clone(),
        status: ConnectionStatus::Approved,
        credit_limit_paise: credit_limit_paise
            .unwrap_or(company.settings.default_credit_limit_paise),
        payment_terms: payment_terms
            .unwrap_or_else(|| company.settings.default_payment_terms.clone()),
        approved_by: approved_by.clone(),
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

/// Inserts a connection, reporting the pair's unique key as `AlreadyConnected`.
async fn insert_connection(
    conn: &mut sqlx::SqliteConnection,
    connection: &Connection,
) -> ServiceResult<()> {
    match ConnectionRepository::insert(conn, connection).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_unique_violation_on("connections.company_id") => {
            Err(CoreError::AlreadyConnected.into())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
