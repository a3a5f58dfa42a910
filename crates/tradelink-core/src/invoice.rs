//! # Invoices
//!
//! Invoice record, lifecycle rules and payment-status derivation.
//!
//! ## Two Independent Axes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Lifecycle (stored, set by explicit actions)                            │
//! │    draft ──► pending ──► sent          cancelled                        │
//! │    └── payments and edits accepted ─┘                                   │
//! │                                                                         │
//! │  Payment status (derived, never stored as truth)                        │
//! │    paid == 0                         → unpaid                           │
//! │    paid >= grand_total               → paid                             │
//! │    otherwise                         → partially_paid                   │
//! │    not paid AND now > due_date       → overdue    (overrides above)     │
//! │                                                                         │
//! │  Re-derived on every save and every read, so `overdue` shows up the     │
//! │  moment the due date passes without any write.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::actor::Actor;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::{LedgerTotals, LineItem};
use crate::money::Money;
use crate::types::EntityId;

// =============================================================================
// Statuses
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Sent,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Stages that accept payments, edits and sending.
    pub fn accepts_updates(&self) -> bool {
        matches!(self, InvoiceStatus::Draft | InvoiceStatus::Pending)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Overdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    Card,
    Upi,
    BankTransfer,
    Credit,
    Cheque,
}

/// Derives the payment status of an invoice.
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use tradelink_core::invoice::{derive_payment_status, PaymentStatus};
/// use tradelink_core::Money;
///
/// let now = Utc::now();
/// let yesterday = now - Duration::days(1);
/// let grand = Money::from_rupees(1000);
///
/// assert_eq!(derive_payment_status(Money::zero(), grand, yesterday, now), PaymentStatus::Overdue);
/// assert_eq!(derive_payment_status(grand, grand, yesterday, now), PaymentStatus::Paid);
/// ```
pub fn derive_payment_status(
    paid: Money,
    grand_total: Money,
    due_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> PaymentStatus {
    let status = if paid.is_zero() {
        PaymentStatus::Unpaid
    } else if paid >= grand_total {
        PaymentStatus::Paid
    } else {
        PaymentStatus::PartiallyPaid
    };

    if status != PaymentStatus::Paid && now > due_date {
        PaymentStatus::Overdue
    } else {
        status
    }
}

// =============================================================================
// Invoice
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: EntityId,
    pub invoice_number: String,
    pub company_id: EntityId,
    pub retailer_id: EntityId,
    /// Set when raised from an order; at most one invoice per order.
    pub order_id: Option<EntityId>,
    pub created_by: EntityId,
    pub status: InvoiceStatus,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<LineItem>,
    pub total_taxable_value_paise: i64,
    pub total_cgst_paise: i64,
    pub total_sgst_paise: i64,
    pub total_igst_paise: i64,
    /// Reported for returns, not part of the grand total.
    pub total_cess_paise: i64,
    pub total_tax_paise: i64,
    pub discount_paise: i64,
    pub shipping_charges_paise: i64,
    /// Always zero: every amount is already whole paise.
    pub round_off_paise: i64,
    pub grand_total_paise: i64,
    pub paid_amount_paise: i64,
    pub balance_amount_paise: i64,
    pub payment_status: PaymentStatus,
    pub payment_mode: Option<PaymentMode>,
    #[ts(as = "Option<String>")]
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub invoice_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub due_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub sent_date: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to draft an invoice except its number.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub company_id: EntityId,
    pub retailer_id: EntityId,
    pub order_id: Option<EntityId>,
    pub created_by: EntityId,
    pub items: Vec<LineItem>,
    pub discount: Money,
    pub shipping_charges: Money,
    pub due_date: DateTime<Utc>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
}

impl Invoice {
    /// Builds a draft invoice from priced lines.
    ///
    /// Totals are column sums of the lines, so an invoice raised from an
    /// order reconciles with it exactly.
    pub fn draft(number: String, draft: InvoiceDraft, now: DateTime<Utc>) -> CoreResult<Self> {
        if draft.discount.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }
        if draft.shipping_charges.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "shipping_charges".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let totals = LedgerTotals::from_items(&draft.items);
        let grand_total = totals.grand_total(draft.discount, draft.shipping_charges);
        if grand_total.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: (totals.total() + draft.shipping_charges).paise(),
            }
            .into());
        }

        let mut invoice = Invoice {
            id: EntityId::generate(),
            invoice_number: number,
            company_id: draft.company_id,
            retailer_id: draft.retailer_id,
            order_id: draft.order_id,
            created_by: draft.created_by,
            status: InvoiceStatus::Draft,
            items: draft.items,
            total_taxable_value_paise: totals.subtotal.paise(),
            total_cgst_paise: totals.cgst.paise(),
            total_sgst_paise: totals.sgst.paise(),
            total_igst_paise: totals.igst.paise(),
            total_cess_paise: totals.cess.paise(),
            total_tax_paise: totals.tax.paise(),
            discount_paise: draft.discount.paise(),
            shipping_charges_paise: draft.shipping_charges.paise(),
            round_off_paise: 0,
            grand_total_paise: grand_total.paise(),
            paid_amount_paise: 0,
            balance_amount_paise: grand_total.paise(),
            payment_status: PaymentStatus::Unpaid,
            payment_mode: None,
            payment_date: None,
            payment_terms: draft.payment_terms,
            notes: draft.notes,
            invoice_date: now,
            due_date: draft.due_date,
            sent_date: None,
            created_at: now,
            updated_at: now,
        };
        invoice.rederive(now);
        Ok(invoice)
    }

    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_paise(self.grand_total_paise)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_paise(self.paid_amount_paise)
    }

    /// Recomputes balance and payment status from paid, grand total and `now`.
    pub fn rederive(&mut self, now: DateTime<Utc>) {
        self.balance_amount_paise = (self.grand_total() - self.paid()).paise();
        self.payment_status =
            derive_payment_status(self.paid(), self.grand_total(), self.due_date, now);
    }

    /// Company operators and the billed retailer may see the invoice.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        actor.can_operate(&self.company_id) || actor.is(&self.retailer_id)
    }

    fn check_updatable(&self) -> CoreResult<()> {
        if self.status.accepts_updates() {
            Ok(())
        } else {
            Err(CoreError::invalid_state("Invoice", &self.invoice_number, self.status))
        }
    }

    /// Sets the cumulative paid amount and re-derives status.
    pub fn apply_payment(&mut self, payment: PaymentUpdate, now: DateTime<Utc>) -> CoreResult<()> {
        self.check_updatable()?;

        if payment.paid_amount.is_negative() || payment.paid_amount > self.grand_total() {
            return Err(ValidationError::OutOfRange {
                field: "paid_amount".to_string(),
                min: 0,
                max: self.grand_total_paise,
            }
            .into());
        }

        self.paid_amount_paise = payment.paid_amount.paise();
        if payment.payment_mode.is_some() {
            self.payment_mode = payment.payment_mode;
        }
        self.payment_date = payment.payment_date.or(self.payment_date);
        if payment.notes.is_some() {
            self.notes = payment.notes;
        }
        self.updated_at = now;
        self.rederive(now);
        Ok(())
    }

    /// draft | pending → sent.
    pub fn mark_sent(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.check_updatable()?;
        self.status = InvoiceStatus::Sent;
        self.sent_date = Some(now);
        self.updated_at = now;
        self.rederive(now);
        Ok(())
    }

    /// Only drafts may be deleted.
    pub fn check_delete(&self) -> CoreResult<()> {
        if self.status == InvoiceStatus::Draft {
            Ok(())
        } else {
            Err(CoreError::invalid_state("Invoice", &self.invoice_number, self.status))
        }
    }
}

/// A payment recorded against an invoice. `paid_amount` is cumulative.
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdate {
    pub paid_amount: Money,
    pub payment_mode: Option<PaymentMode>,
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// `INV-{last 6 hex of company id}-{seq:06}`.
pub fn invoice_number(company_id: &EntityId, seq: i64) -> String {
    format!("INV-{}-{:06}", company_id.short_suffix(6), seq)
}

// =============================================================================
// Unit Tests
// =============================================================================
