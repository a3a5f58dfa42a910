//! # Orders
//!
//! Order record, status rules and order numbering.
//!
//! ## Status Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  pending ─► confirmed ─► processing ─► shipped ─► delivered ■           │
//! │     │           │             │           │                             │
//! │     └───────────┴──── cancel ─┘           └──────► returned ■           │
//! │                         │                                               │
//! │                         ▼                                               │
//! │                     cancelled ■          (stock restored)               │
//! │                                                                         │
//! │  ■ terminal. Any non-terminal status may move to any other listed      │
//! │    status; only leaving a terminal status is refused. Cancelling is     │
//! │    refused once shipped.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::actor::Actor;
use crate::error::{CoreError, CoreResult};
use crate::ledger::LineItem;
use crate::money::Money;
use crate::types::{DeliveryAddress, EntityId};

// =============================================================================
// Order Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Returned
        )
    }

    /// Cancellation is legal only before the goods leave.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
        )
    }

    /// Statuses an order may be in when an invoice is raised from it.
    pub fn can_invoice(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    BankTransfer,
    #[default]
    Credit,
}

// =============================================================================
// Order
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: EntityId,
    pub order_number: String,
    pub company_id: EntityId,
    pub retailer_id: EntityId,
    pub created_by: EntityId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<LineItem>,
    pub subtotal_paise: i64,
    /// cgst + sgst + igst over all lines.
    pub tax_amount_paise: i64,
    /// subtotal + tax.
    pub total_amount_paise: i64,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub delivery_address: DeliveryAddress,
    pub delivery_notes: Option<String>,
    pub notes: Option<String>,
    pub status_notes: Option<String>,
    pub tracking_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub expected_delivery_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub delivery_date: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<EntityId>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub invoice_generated: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_paise(self.total_amount_paise)
    }

    /// Company operators and the ordering retailer may see the order.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        actor.can_operate(&self.company_id) || actor.is(&self.retailer_id)
    }

    /// Company operators and the ordering retailer may cancel, before shipping.
    pub fn check_cancel(&self, actor: &Actor) -> CoreResult<()> {
        if !self.is_visible_to(actor) {
            return Err(CoreError::forbidden("you cannot cancel this order"));
        }
        if !self.status.can_cancel() {
            return Err(CoreError::invalid_state("Order", &self.order_number, self.status));
        }
        Ok(())
    }

    /// Any non-terminal status may move to any listed status, itself included.
    pub fn check_advance(&self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::invalid_state("Order", &self.order_number, self.status));
        }
        Ok(())
    }
}

/// `ORD-{unix_millis}-{seq:04}`.
///
/// The sequence is the company's order count + 1. It is not unique by
/// itself under concurrency, so the insert is retried on collision.
pub fn order_number(at: DateTime<Utc>, seq: i64) -> String {
    format!("ORD-{}-{:04}", at.timestamp_millis(), seq)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::actor::{Membership, MembershipKind};
    use crate::types::Role;
    use chrono::TimeZone;

    pub(crate) fn order(status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: EntityId::generate(),
            order_number: "ORD-1700000000000-0001".to_string(),
            company_id: EntityId::generate(),
            retailer_id: EntityId::generate(),
            created_by: EntityId::generate(),
            status,
            payment_method: PaymentMethod::Credit,
            items: vec![],
            subtotal_paise: 20_000,
            tax_amount_paise: 3_600,
            total_amount_paise: 23_600,
            delivery_address: DeliveryAddress {
                address_line1: "12 MG Road".to_string(),
                address_line2: None,
                city: "Pune".to_string(),
                state: "MH".to_string(),
                pincode: "411001".to_string(),
                country: "India".to_string(),
            },
            delivery_notes: None,
            notes: None,
            status_notes: None,
            tracking_number: None,
            expected_delivery_date: None,
            delivery_date: None,
            cancellation_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            invoice_generated: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_order_number_format() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(order_number(at, 7), "ORD-1700000000123-0007");
        assert_eq!(order_number(at, 12345), "ORD-1700000000123-12345");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Returned.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn test_cancel_rules() {
        let o = order(OrderStatus::Processing);
        let retailer = Actor::new(o.retailer_id.clone(), Role::Retailer, vec![]);
        assert!(o.check_cancel(&retailer).is_ok());

        let stranger = Actor::new(EntityId::generate(), Role::Retailer, vec![]);
        assert!(matches!(o.check_cancel(&stranger), Err(CoreError::Forbidden(_))));

        let employee = Actor::new(
            EntityId::generate(),
            Role::Employee,
            vec![Membership {
                company_id: o.company_id.clone(),
                kind: MembershipKind::Employee,
            }],
        );
        let shipped = Order {
            status: OrderStatus::Shipped,
            ..o.clone()
        };
        assert!(matches!(
            shipped.check_cancel(&employee),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_advance_is_lax_between_non_terminal_statuses() {
        assert!(order(OrderStatus::Pending).check_advance().is_ok());
        assert!(order(OrderStatus::Shipped).check_advance().is_ok());

        let delivered = order(OrderStatus::Delivered);
        assert!(matches!(
            delivered.check_advance(),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_payment_method_defaults_to_credit() {
        assert_eq!(PaymentMethod::default(), PaymentMethod::Credit);
    }
}
