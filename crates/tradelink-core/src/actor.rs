//! # Actor
//!
//! The caller of every engine operation, passed explicitly.
//!
//! The HTTP layer resolves a bearer token into an `Actor` once per request
//! (user id + role from the token, memberships from the company directory).
//! Engines never look at ambient request state.
//!
//! ## Permission Levels
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  administers(c)   owner of c                                            │
//! │       │           invites, resolve requests, suspend connections        │
//! │       ▼                                                                 │
//! │  works_for(c)     owner or employee of c                                │
//! │       │           cancel orders                                         │
//! │       ▼                                                                 │
//! │  can_operate(c)   works_for(c) or role=staff                            │
//! │                   advance orders, raise invoices, record payments       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{EntityId, Role};

/// How a user belongs to a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MembershipKind {
    Owner,
    Employee,
}

/// One company the actor belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Membership {
    pub company_id: EntityId,
    pub kind: MembershipKind,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub user_id: EntityId,
    pub role: Role,
    pub memberships: Vec<Membership>,
}

impl Actor {
    pub fn new(user_id: EntityId, role: Role, memberships: Vec<Membership>) -> Self {
        Actor {
            user_id,
            role,
            memberships,
        }
    }

    /// Owner of the company.
    pub fn administers(&self, company_id: &EntityId) -> bool {
        self.memberships
            .iter()
            .any(|m| &m.company_id == company_id && m.kind == MembershipKind::Owner)
    }

    /// Owner or employee of the company.
    pub fn works_for(&self, company_id: &EntityId) -> bool {
        self.memberships.iter().any(|m| &m.company_id == company_id)
    }

    /// Company-side operator: member of the company, or platform staff.
    pub fn can_operate(&self, company_id: &EntityId) -> bool {
        self.role == Role::Staff || self.works_for(company_id)
    }

    pub fn is(&self, user_id: &EntityId) -> bool {
        &self.user_id == user_id
    }

    /// First company this actor owns, used when a request omits the company.
    pub fn owned_company(&self) -> Option<&EntityId> {
        self.memberships
            .iter()
            .find(|m| m.kind == MembershipKind::Owner)
            .map(|m| &m.company_id)
    }

    pub fn require_admin(&self, company_id: &EntityId) -> CoreResult<()> {
        if self.administers(company_id) {
            Ok(())
        } else {
            Err(CoreError::forbidden("only the company owner can do this"))
        }
    }

    pub fn require_operator(&self, company_id: &EntityId) -> CoreResult<()> {
        if self.can_operate(company_id) {
            Ok(())
        } else {
            Err(CoreError::forbidden("you do not work for this company"))
        }
    }

    pub fn require_role(&self, role: Role) -> CoreResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(CoreError::forbidden(format!("{} role required", role)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(company: &EntityId, kind: MembershipKind) -> Membership {
        Membership {
            company_id: company.clone(),
            kind,
        }
    }

    #[test]
    fn test_owner_has_every_level() {
        let company = EntityId::generate();
        let actor = Actor::new(
            EntityId::generate(),
            Role::Manufacturer,
            vec![membership(&company, MembershipKind::Owner)],
        );

        assert!(actor.administers(&company));
        assert!(actor.works_for(&company));
        assert!(actor.can_operate(&company));
        assert_eq!(actor.owned_company(), Some(&company));
    }

    #[test]
    fn test_employee_cannot_administer() {
        let company = EntityId::generate();
        let actor = Actor::new(
            EntityId::generate(),
            Role::Employee,
            vec![membership(&company, MembershipKind::Employee)],
        );

        assert!(!actor.administers(&company));
        assert!(actor.works_for(&company));
        assert!(matches!(
            actor.require_admin(&company),
            Err(CoreError::Forbidden(_))
        ));
        assert!(actor.owned_company().is_none());
    }

    #[test]
    fn test_staff_operates_everywhere_but_administers_nothing() {
        let company = EntityId::generate();
        let actor = Actor::new(EntityId::generate(), Role::Staff, vec![]);

        assert!(actor.can_operate(&company));
        assert!(!actor.works_for(&company));
        assert!(!actor.administers(&company));
    }

    #[test]
    fn test_require_role() {
        let actor = Actor::new(EntityId::generate(), Role::Retailer, vec![]);
        assert!(actor.require_role(Role::Retailer).is_ok());
        assert!(actor.require_role(Role::Manufacturer).is_err());
    }
}
