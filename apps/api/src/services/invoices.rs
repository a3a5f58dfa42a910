//! # Commerce Ledger: Invoices
//!
//! ```text
//!            ┌── from order ── copy the order's lines, flag the order
//!  draft ◄───┤
//!            └── direct ────── price lines, reserve stock
//!    │
//!    ├── RecordPayment  (cumulative paid amount, status re-derived)
//!    ├── Send ─────────► sent
//!    └── Delete         (drafts only; frees the order for re-invoicing)
//! ```
//!
//! `balance_amount` and `payment_status` are recomputed from the paid
//! amount, grand total and current time on every read, so an invoice turns
//! `overdue` without anything being written.
//!
//! At most one invoice references an order: the `invoices.order_id` unique
//! index settles concurrent attempts, and the loser reports
//! `AlreadyInvoiced`.

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::lines::{price_lines, reserve_lines};
use crate::error::{ServiceError, ServiceResult};
use tradelink_core::input::{DirectInvoiceInput, InvoiceFromOrderInput, RecordPaymentInput};
use tradelink_core::invoice::{invoice_number, InvoiceDraft, PaymentUpdate};
use tradelink_core::{
    Actor, CoreError, EntityId, Invoice, InvoiceStatus, Money, PaymentStatus, Role,
    ValidationError,
};
use tradelink_db::{Database, DbError, InvoiceRepository, OrderRepository};

/// Attempts at allocating an unused invoice number.
const INVOICE_NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceFilter {
    /// Company to list for; defaults to the caller's own company.
    #[serde(default)]
    pub company_id: Option<EntityId>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    /// Matched after re-derivation, so `overdue` reflects the current time.
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Clone)]
pub struct InvoiceService {
    db: Database,
    due_days: i64,
}

impl InvoiceService {
    pub fn new(db: Database, due_days: i64) -> Self {
        InvoiceService { db, due_days }
    }

    /// Raises the invoice for an order.
    ///
    /// ## Errors
    /// `AlreadyInvoiced` when an invoice already references the order,
    /// `InvalidState` when the order is cancelled or returned.
    pub async fn create_from_order(
        &self,
        actor: &Actor,
        input: InvoiceFromOrderInput,
    ) -> ServiceResult<Invoice> {
        let input = input.validate()?;
        let order = self.db.orders().get_by_id(&input.order_id).await?;
        actor.require_operator(&order.company_id)?;

        if !order.status.can_invoice() {
            return Err(CoreError::invalid_state("Order", &order.order_number, order.status).into());
        }
        let already_invoiced = || CoreError::AlreadyInvoiced {
            order_id: order.id.to_string(),
        };
        if order.invoice_generated || self.db.invoices().find_by_order(&order.id).await?.is_some() {
            return Err(already_invoiced().into());
        }

        let now = Utc::now();
        let draft = InvoiceDraft {
            company_id: order.company_id.clone(),
            retailer_id: order.retailer_id.clone(),
            order_id: Some(order.id.clone()),
            created_by: actor.user_id.clone(),
            items: order.items.clone(),
            discount: Money::zero(),
            shipping_charges: Money::zero(),
            due_date: input
                .due_date
                .unwrap_or_else(|| now + Duration::days(self.due_days)),
            payment_terms: input.payment_terms,
            notes: input.notes,
        };
        let mut invoice = Invoice::draft(String::new(), draft, now)?;

        for attempt in 1..=INVOICE_NUMBER_ATTEMPTS {
            let mut tx = self.db.begin().await?;
            OrderRepository::set_invoice_generated(&mut tx, &order.id, true).await?;

            let seq = InvoiceRepository::count_by_company(&mut tx, &order.company_id).await? + 1;
            invoice.invoice_number = invoice_number(&order.company_id, seq);

            match InvoiceRepository::insert(&mut tx, &invoice).await {
                Ok(()) => {}
                Err(e) if e.is_unique_violation_on("invoices.order_id") => {
                    return Err(already_invoiced().into())
                }
                Err(e) if e.is_unique_violation_on("invoices.invoice_number") => {
                    warn!(attempt, number = %invoice.invoice_number, "Invoice number taken, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            tx.commit().await.map_err(DbError::from)?;

            info!(
                invoice_id = %invoice.id,
                number = %invoice.invoice_number,
                order = %order.order_number,
                grand_total = %invoice.grand_total(),
                "Invoice raised from order"
            );
            return Ok(invoice);
        }

        Err(ServiceError::Internal(
            "could not allocate a unique invoice number".to_string(),
        ))
    }

    /// Bills a retailer directly, reserving stock like an order does.
    pub async fn create_direct(
        &self,
        actor: &Actor,
        input: DirectInvoiceInput,
    ) -> ServiceResult<Invoice> {
        let input = input.validate()?;
        actor.require_operator(&input.company_id)?;

        let retailer = self.db.users().get_by_id(&input.retailer_id).await?;
        if retailer.role != Role::Retailer {
            return Err(ValidationError::NotAllowed {
                field: "retailer_id".to_string(),
                allowed: vec![Role::Retailer.to_string()],
            }
            .into());
        }

        let items = price_lines(&self.db, &input.company_id, &input.items).await?;
        let now = Utc::now();
        let draft = InvoiceDraft {
            company_id: input.company_id.clone(),
            retailer_id: retailer.id,
            order_id: None,
            created_by: actor.user_id.clone(),
            items,
            discount: Money::from_paise(input.discount_paise),
            shipping_charges: Money::from_paise(input.shipping_charges_paise),
            due_date: input
                .due_date
                .unwrap_or_else(|| now + Duration::days(self.due_days)),
            payment_terms: input.payment_terms,
            notes: input.notes,
        };
        let mut invoice = Invoice::draft(String::new(), draft, now)?;

        for attempt in 1..=INVOICE_NUMBER_ATTEMPTS {
            let mut tx = self.db.begin().await?;
            reserve_lines(&mut tx, &invoice.items).await?;

            let seq = InvoiceRepository::count_by_company(&mut tx, &input.company_id).await? + 1;
            invoice.invoice_number = invoice_number(&input.company_id, seq);

            match InvoiceRepository::insert(&mut tx, &invoice).await {
                Ok(()) => {}
                Err(e) if e.is_unique_violation_on("invoices.invoice_number") => {
                    warn!(attempt, number = %invoice.invoice_number, "Invoice number taken, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            tx.commit().await.map_err(DbError::from)?;

            info!(
                invoice_id = %invoice.id,
                number = %invoice.invoice_number,
                retailer_id = %invoice.retailer_id,
                grand_total = %invoice.grand_total(),
                "Direct invoice raised"
            );
            return Ok(invoice);
        }

        Err(ServiceError::Internal(
            "could not allocate a unique invoice number".to_string(),
        ))
    }

    /// Sets the cumulative paid amount. Company operators only.
    pub async fn record_payment(
        &self,
        actor: &Actor,
        invoice_id: &EntityId,
        input: RecordPaymentInput,
    ) -> ServiceResult<Invoice> {
        let input = input.validate()?;
        let mut invoice = self.db.invoices().get_by_id(invoice_id).await?;
        actor.require_operator(&invoice.company_id)?;

        invoice.apply_payment(
            PaymentUpdate {
                paid_amount: Money::from_paise(input.paid_amount_paise),
                payment_mode: input.payment_mode,
                payment_date: input.payment_date,
                notes: input.notes,
            },
            Utc::now(),
        )?;
        if !self.db.invoices().update_payment(&invoice).await? {
            return Err(self.stale(invoice_id).await);
        }

        info!(
            invoice_id = %invoice.id,
            paid = invoice.paid_amount_paise,
            balance = invoice.balance_amount_paise,
            "Payment recorded"
        );
        Ok(invoice)
    }

    pub async fn send(&self, actor: &Actor, invoice_id: &EntityId) -> ServiceResult<Invoice> {
        let mut invoice = self.db.invoices().get_by_id(invoice_id).await?;
        actor.require_operator(&invoice.company_id)?;

        invoice.mark_sent(Utc::now())?;
        if !self.db.invoices().mark_sent(&invoice).await? {
            return Err(self.stale(invoice_id).await);
        }

        info!(invoice_id = %invoice.id, number = %invoice.invoice_number, "Invoice sent");
        Ok(invoice)
    }

    /// Deletes a draft. An order-backed draft releases its order.
    pub async fn delete(&self, actor: &Actor, invoice_id: &EntityId) -> ServiceResult<()> {
        let invoice = self.db.invoices().get_by_id(invoice_id).await?;
        actor.require_operator(&invoice.company_id)?;
        invoice.check_delete()?;

        let mut tx = self.db.begin().await?;
        if !InvoiceRepository::delete(&mut tx, invoice_id).await? {
            drop(tx);
            return Err(self.stale(invoice_id).await);
        }
        if let Some(order_id) = &invoice.order_id {
            OrderRepository::set_invoice_generated(&mut tx, order_id, false).await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(invoice_id = %invoice_id, number = %invoice.invoice_number, "Invoice deleted");
        Ok(())
    }

    pub async fn get_invoice(&self, actor: &Actor, invoice_id: &EntityId) -> ServiceResult<Invoice> {
        let mut invoice = self.db.invoices().get_by_id(invoice_id).await?;
        if !invoice.is_visible_to(actor) {
            return Err(CoreError::forbidden("you cannot view this invoice").into());
        }
        invoice.rederive(Utc::now());
        Ok(invoice)
    }

    /// Company-side listing for operators, otherwise the caller's own invoices.
    pub async fn list_invoices(
        &self,
        actor: &Actor,
        filter: InvoiceFilter,
    ) -> ServiceResult<Vec<Invoice>> {
        let company_id = filter
            .company_id
            .or_else(|| actor.memberships.first().map(|m| m.company_id.clone()));

        let invoices = match company_id {
            Some(company_id) if actor.role != Role::Retailer => {
                actor.require_operator(&company_id)?;
                self.db
                    .invoices()
                    .list_by_company(&company_id, filter.status)
                    .await?
            }
            _ => {
                self.db
                    .invoices()
                    .list_by_retailer(&actor.user_id, filter.status)
                    .await?
            }
        };

        let now = Utc::now();
        Ok(invoices
            .into_iter()
            .map(|mut invoice| {
                invoice.rederive(now);
                invoice
            })
            .filter(|invoice| {
                filter
                    .payment_status
                    .map_or(true, |status| invoice.payment_status == status)
            })
            .collect())
    }

    /// The state error for a conditional write that matched no row.
    async fn stale(&self, invoice_id: &EntityId) -> ServiceError {
        match self.db.invoices().get_by_id(invoice_id).await {
            Ok(current) => {
                CoreError::invalid_state("Invoice", &current.invoice_number, current.status).into()
            }
            Err(e) => e.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
