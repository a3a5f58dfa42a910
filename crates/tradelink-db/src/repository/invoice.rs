//! # Invoice Repository
//!
//! Invoices and their line items. `invoices.order_id` is unique, so an
//! order can be invoiced at most once even under concurrent requests.
//!
//! Stored `payment_status` reflects the last write only. Readers call
//! [`Invoice::rederive`] so overdue invoices show as overdue without a
//! background job.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::line_items::{self, ItemTable};
use tradelink_core::{EntityId, Invoice, InvoiceStatus};

const INVOICE_COLUMNS: &str = r#"
    id, invoice_number, company_id, retailer_id, order_id, created_by, status,
    total_taxable_value_paise, total_cgst_paise, total_sgst_paise,
    total_igst_paise, total_cess_paise, total_tax_paise,
    discount_paise, shipping_charges_paise, round_off_paise, grand_total_paise,
    paid_amount_paise, balance_amount_paise, payment_status, payment_mode,
    payment_date, payment_terms, notes,
    invoice_date, due_date, sent_date, created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Fetches an invoice with its items.
    pub async fn get_by_id(&self, id: &EntityId) -> DbResult<Invoice> {
        let sql = format!("SELECT {} FROM invoices WHERE id = ?", INVOICE_COLUMNS);
        let mut invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))?;

        invoice.items = line_items::fetch(&self.pool, ItemTable::Invoice, id).await?;
        Ok(invoice)
    }

    /// The invoice raised from an order, if any.
    pub async fn find_by_order(&self, order_id: &EntityId) -> DbResult<Option<Invoice>> {
        let id = sqlx::query_scalar::<_, EntityId>("SELECT id FROM invoices WHERE order_id = ?")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        match id {
            Some(id) => Ok(Some(self.get_by_id(&id).await?)),
            None => Ok(None),
        }
    }

    /// Invoices issued by a company, newest first.
    pub async fn list_by_company(
        &self,
        company_id: &EntityId,
        status: Option<InvoiceStatus>,
    ) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            r#"
            SELECT {} FROM invoices
            WHERE company_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC
            "#,
            INVOICE_COLUMNS
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(company_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        self.with_items(invoices).await
    }

    /// Invoices billed to a retailer, newest first.
    pub async fn list_by_retailer(
        &self,
        retailer_id: &EntityId,
        status: Option<InvoiceStatus>,
    ) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            r#"
            SELECT {} FROM invoices
            WHERE retailer_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC
            "#,
            INVOICE_COLUMNS
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(retailer_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        self.with_items(invoices).await
    }

    async fn with_items(&self, mut invoices: Vec<Invoice>) -> DbResult<Vec<Invoice>> {
        for invoice in &mut invoices {
            invoice.items = line_items::fetch(&self.pool, ItemTable::Invoice, &invoice.id).await?;
        }
        Ok(invoices)
    }

    /// Writes the payment fields of `invoice` while it still accepts updates.
    ///
    /// Returns false when the stored invoice is sent or cancelled.
    pub async fn update_payment(&self, invoice: &Invoice) -> DbResult<bool> {
        debug!(
            number = %invoice.invoice_number,
            paid = invoice.paid_amount_paise,
            status = ?invoice.payment_status,
            "Recording payment"
        );

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                paid_amount_paise = ?,
                balance_amount_paise = ?,
                payment_status = ?,
                payment_mode = ?,
                payment_date = ?,
                notes = ?,
                updated_at = ?
            WHERE id = ? AND status IN ('draft', 'pending')
            "#,
        )
        .bind(invoice.paid_amount_paise)
        .bind(invoice.balance_amount_paise)
        .bind(invoice.payment_status)
        .bind(invoice.payment_mode)
        .bind(invoice.payment_date)
        .bind(&invoice.notes)
        .bind(invoice.updated_at)
        .bind(&invoice.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Persists a draft or pending invoice as sent. False otherwise.
    pub async fn mark_sent(&self, invoice: &Invoice) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                status = 'sent',
                sent_date = ?,
                payment_status = ?,
                updated_at = ?
            WHERE id = ? AND status IN ('draft', 'pending')
            "#,
        )
        .bind(invoice.sent_date)
        .bind(invoice.payment_status)
        .bind(invoice.updated_at)
        .bind(&invoice.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Transactional
    // =========================================================================

    /// Number of invoices a company has issued; seeds the invoice number.
    pub async fn count_by_company(conn: &mut SqliteConnection, company_id: &EntityId) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices WHERE company_id = ?")
            .bind(company_id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }

    /// Inserts the invoice row and its items.
    ///
    /// ## Errors
    /// - `UniqueViolation` on `invoices.order_id`: the order is already invoiced
    /// - `UniqueViolation` on `invoices.invoice_number`: number taken, retry
    pub async fn insert(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
        debug!(number = %invoice.invoice_number, items = invoice.items.len(), "Inserting invoice");

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, company_id, retailer_id, order_id, created_by, status,
                total_taxable_value_paise, total_cgst_paise, total_sgst_paise,
                total_igst_paise, total_cess_paise, total_tax_paise,
                discount_paise, shipping_charges_paise, round_off_paise, grand_total_paise,
                paid_amount_paise, balance_amount_paise, payment_status, payment_mode,
                payment_date, payment_terms, notes,
                invoice_date, due_date, sent_date, created_at, updated_at
            ) VALUES (
                ?, ?, ?, ?, ?, ?, ?,
                ?, ?, ?,
                ?, ?, ?,
                ?, ?, ?, ?,
                ?, ?, ?, ?,
                ?, ?, ?,
                ?, ?, ?, ?, ?
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.company_id)
        .bind(&invoice.retailer_id)
        .bind(&invoice.order_id)
        .bind(&invoice.created_by)
        .bind(invoice.status)
        .bind(invoice.total_taxable_value_paise)
        .bind(invoice.total_cgst_paise)
        .bind(invoice.total_sgst_paise)
        .bind(invoice.total_igst_paise)
        .bind(invoice.total_cess_paise)
        .bind(invoice.total_tax_paise)
        .bind(invoice.discount_paise)
        .bind(invoice.shipping_charges_paise)
        .bind(invoice.round_off_paise)
        .bind(invoice.grand_total_paise)
        .bind(invoice.paid_amount_paise)
        .bind(invoice.balance_amount_paise)
        .bind(invoice.payment_status)
        .bind(invoice.payment_mode)
        .bind(invoice.payment_date)
        .bind(&invoice.payment_terms)
        .bind(&invoice.notes)
        .bind(invoice.invoice_date)
        .bind(invoice.due_date)
        .bind(invoice.sent_date)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await?;

        line_items::insert(conn, ItemTable::Invoice, &invoice.id, &invoice.items).await
    }

    /// Deletes a draft invoice and its items. False when it is not a draft.
    pub async fn delete(conn: &mut SqliteConnection, id: &EntityId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ? AND status = 'draft'")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::Fixture;
    use chrono::{Duration, Utc};
    use tradelink_core::invoice::{invoice_number, InvoiceDraft, PaymentUpdate};
    use tradelink_core::{Money, Order, PaymentMode, PaymentStatus};

    fn draft_for(fx: &Fixture, order: &Order, seq: i64) -> Invoice {
        let now = Utc::now();
        Invoice::draft(
            invoice_number(&fx.company.id, seq),
            InvoiceDraft {
                company_id: fx.company.id.clone(),
                retailer_id: fx.retailer.id.clone(),
                order_id: Some(order.id.clone()),
                created_by: fx.owner.id.clone(),
                items: order.items.clone(),
                discount: Money::zero(),
                shipping_charges: Money::zero(),
                due_date: now + Duration::days(30),
                payment_terms: None,
                notes: None,
            },
            now,
        )
        .unwrap()
    }

    async fn store(fx: &Fixture, invoice: &Invoice) -> DbResult<()> {
        let mut tx = fx.db.begin().await?;
        InvoiceRepository::insert(&mut tx, invoice).await?;
        tx.commit().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_invoice_reconciles_with_order() {
        let fx = Fixture::new().await;
        let order = fx.place(3).await;
        let invoice = draft_for(&fx, &order, 1);
        store(&fx, &invoice).await.unwrap();

        let stored = fx.db.invoices().find_by_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.id, invoice.id);
        assert_eq!(stored.items, order.items);
        assert_eq!(stored.total_taxable_value_paise, order.subtotal_paise);
        assert_eq!(stored.total_tax_paise, order.tax_amount_paise);
        assert_eq!(stored.grand_total_paise, order.total_amount_paise);
        assert_eq!(stored.status, InvoiceStatus::Draft);
    }

    #[tokio::test]
    async fn test_second_invoice_for_order_rejected() {
        let fx = Fixture::new().await;
        let order = fx.place(1).await;
        store(&fx, &draft_for(&fx, &order, 1)).await.unwrap();

        let err = store(&fx, &draft_for(&fx, &order, 2)).await.unwrap_err();
        assert!(err.is_unique_violation_on("invoices.order_id"));
    }

    #[tokio::test]
    async fn test_payment_and_send_are_conditional() {
        let fx = Fixture::new().await;
        let order = fx.place(2).await;
        let mut invoice = draft_for(&fx, &order, 1);
        store(&fx, &invoice).await.unwrap();
        let repo = fx.db.invoices();

        let half = Money::from_paise(invoice.grand_total_paise / 2);
        invoice
            .apply_payment(
                PaymentUpdate {
                    paid_amount: half,
                    payment_mode: Some(PaymentMode::Upi),
                    ..PaymentUpdate::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert!(repo.update_payment(&invoice).await.unwrap());

        invoice.mark_sent(Utc::now()).unwrap();
        assert!(repo.mark_sent(&invoice).await.unwrap());
        assert!(!repo.mark_sent(&invoice).await.unwrap());
        assert!(!repo.update_payment(&invoice).await.unwrap());

        let stored = repo.get_by_id(&invoice.id).await.unwrap();
        assert_eq!(stored.status, InvoiceStatus::Sent);
        assert_eq!(stored.paid_amount_paise, half.paise());
        assert_eq!(stored.payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(stored.payment_mode, Some(PaymentMode::Upi));
    }

    #[tokio::test]
    async fn test_delete_draft_only() {
        let fx = Fixture::new().await;
        let order = fx.place(1).await;
        let mut invoice = draft_for(&fx, &order, 1);
        store(&fx, &invoice).await.unwrap();

        invoice.mark_sent(Utc::now()).unwrap();
        fx.db.invoices().mark_sent(&invoice).await.unwrap();

        let mut tx = fx.db.begin().await.unwrap();
        assert!(!InvoiceRepository::delete(&mut tx, &invoice.id).await.unwrap());
        drop(tx);

        let other = fx.place(1).await;
        let draft = draft_for(&fx, &other, 2);
        store(&fx, &draft).await.unwrap();

        let mut tx = fx.db.begin().await.unwrap();
        assert!(InvoiceRepository::delete(&mut tx, &draft.id).await.unwrap());
        assert_eq!(InvoiceRepository::count_by_company(&mut tx, &fx.company.id).await.unwrap(), 1);
        tx.commit().await.unwrap();

        assert!(fx.db.invoices().find_by_order(&other.id).await.unwrap().is_none());
        assert_eq!(
            fx.db
                .invoices()
                .list_by_retailer(&fx.retailer.id, None)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
