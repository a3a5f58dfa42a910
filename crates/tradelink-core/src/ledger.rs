//! # Ledger Math
//!
//! GST line computation shared by order placement and direct invoicing.
//!
//! ## One Code Path For Both Documents
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  PlaceOrder ────────┐                                                   │
//! │                     ├──► LineItem::price(product, qty, unit_price?)     │
//! │  InvoiceDirect ─────┘         │                                         │
//! │                               ▼                                         │
//! │            unit_price = override ?? product.price                       │
//! │            line_total = unit_price × qty                                │
//! │            cgst/sgst/igst/cess = round_half_up(line_total × bps)        │
//! │            tax        = cgst + sgst + igst      (cess reported only)    │
//! │            total      = line_total + tax                                │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                  LedgerTotals::from_items(&lines)                       │
//! │                  sums of already-rounded paise                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cess
//! Cess is computed per line and summed into `total_cess` for GST returns,
//! but it is not part of `tax_amount`, order totals or invoice grand totals.
//! Both document paths apply the same exclusion.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::directory::Product;
use crate::money::Money;
use crate::types::{EntityId, TaxRate};

// =============================================================================
// GST Rates & Breakdown
// =============================================================================

/// The four GST components configured on a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GstRates {
    pub cgst: TaxRate,
    pub sgst: TaxRate,
    pub igst: TaxRate,
    pub cess: TaxRate,
}

/// Per-component tax on one taxable amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GstBreakdown {
    pub taxable: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub cess: Money,
}

impl GstBreakdown {
    /// Each component is rounded independently, then summed.
    pub fn compute(taxable: Money, rates: &GstRates) -> Self {
        GstBreakdown {
            taxable,
            cgst: taxable.calculate_tax(rates.cgst),
            sgst: taxable.calculate_tax(rates.sgst),
            igst: taxable.calculate_tax(rates.igst),
            cess: taxable.calculate_tax(rates.cess),
        }
    }

    /// Tax counted towards document totals (cess excluded).
    pub fn tax(&self) -> Money {
        self.cgst + self.sgst + self.igst
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One product/quantity/price entry on an order or invoice.
///
/// Product name and HSN code are snapshotted so historical documents stay
/// stable when the catalog entry is renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LineItem {
    pub product_id: EntityId,
    pub product_name: String,
    pub hsn_code: Option<String>,
    pub unit: String,
    pub quantity: i64,
    pub unit_price_paise: i64,
    /// unit price × quantity, before tax.
    pub line_total_paise: i64,
    pub cgst_rate_bps: u32,
    pub sgst_rate_bps: u32,
    pub igst_rate_bps: u32,
    pub cess_rate_bps: u32,
    pub cgst_amount_paise: i64,
    pub sgst_amount_paise: i64,
    pub igst_amount_paise: i64,
    pub cess_amount_paise: i64,
    /// cgst + sgst + igst.
    pub tax_amount_paise: i64,
    /// line total + tax.
    pub total_price_paise: i64,
}

impl LineItem {
    /// Prices `quantity` units of `product`, optionally at a negotiated unit price.
    pub fn price(product: &Product, quantity: i64, unit_price_override: Option<i64>) -> Self {
        let unit_price = unit_price_override
            .map(Money::from_paise)
            .unwrap_or_else(|| product.price());
        let line_total = unit_price.multiply_quantity(quantity);
        let rates = product.gst_rates();
        let gst = GstBreakdown::compute(line_total, &rates);
        let tax = gst.tax();

        LineItem {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            hsn_code: product.hsn_code.clone(),
            unit: product.unit.clone(),
            quantity,
            unit_price_paise: unit_price.paise(),
            line_total_paise: line_total.paise(),
            cgst_rate_bps: rates.cgst.bps(),
            sgst_rate_bps: rates.sgst.bps(),
            igst_rate_bps: rates.igst.bps(),
            cess_rate_bps: rates.cess.bps(),
            cgst_amount_paise: gst.cgst.paise(),
            sgst_amount_paise: gst.sgst.paise(),
            igst_amount_paise: gst.igst.paise(),
            cess_amount_paise: gst.cess.paise(),
            tax_amount_paise: tax.paise(),
            total_price_paise: (line_total + tax).paise(),
        }
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_paise(self.line_total_paise)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_paise(self.tax_amount_paise)
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Column sums over a set of line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerTotals {
    pub subtotal: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub cess: Money,
    pub tax: Money,
}

impl LedgerTotals {
    pub fn from_items(items: &[LineItem]) -> Self {
        items.iter().fold(LedgerTotals::default(), |mut acc, item| {
            acc.subtotal += item.line_total();
            acc.cgst += Money::from_paise(item.cgst_amount_paise);
            acc.sgst += Money::from_paise(item.sgst_amount_paise);
            acc.igst += Money::from_paise(item.igst_amount_paise);
            acc.cess += Money::from_paise(item.cess_amount_paise);
            acc.tax += item.tax();
            acc
        })
    }

    /// Order total: subtotal + tax.
    pub fn total(&self) -> Money {
        self.subtotal + self.tax
    }

    /// Invoice grand total: subtotal + tax - discount + shipping.
    pub fn grand_total(&self, discount: Money, shipping: Money) -> Money {
        self.subtotal + self.tax - discount + shipping
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn product(price_paise: i64, cgst: u32, sgst: u32, igst: u32, cess: u32) -> Product {
        let now = Utc::now();
        Product {
            id: EntityId::generate(),
            company_id: EntityId::generate(),
            category_id: None,
            name: "Basmati Rice 5kg".to_string(),
            description: None,
            sku: Some("RICE-5".to_string()),
            hsn_code: Some("1006".to_string()),
            unit: "PACK".to_string(),
            price_paise,
            available_quantity: 50,
            total_shipped: 0,
            reorder_level: 10,
            cgst_rate_bps: cgst,
            sgst_rate_bps: sgst,
            igst_rate_bps: igst,
            cess_rate_bps: cess,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_order_line_with_split_gst() {
        // ₹100 × 2 at 9% CGST + 9% SGST
        let line = LineItem::price(&product(10_000, 900, 900, 0, 0), 2, None);

        assert_eq!(line.line_total_paise, 20_000);
        assert_eq!(line.cgst_amount_paise, 1_800);
        assert_eq!(line.sgst_amount_paise, 1_800);
        assert_eq!(line.tax_amount_paise, 3_600);
        assert_eq!(line.total_price_paise, 23_600);

        let totals = LedgerTotals::from_items(&[line]);
        assert_eq!(totals.subtotal.paise(), 20_000);
        assert_eq!(totals.tax.paise(), 3_600);
        assert_eq!(totals.total().paise(), 23_600);
    }

    #[test]
    fn test_unit_price_override_wins() {
        let line = LineItem::price(&product(10_000, 0, 0, 1800, 0), 3, Some(9_000));
        assert_eq!(line.unit_price_paise, 9_000);
        assert_eq!(line.line_total_paise, 27_000);
        assert_eq!(line.igst_amount_paise, 4_860);
    }

    #[test]
    fn test_cess_is_reported_but_not_totalled() {
        let line = LineItem::price(&product(10_000, 1400, 1400, 0, 1200), 1, None);
        assert_eq!(line.cess_amount_paise, 1_200);
        assert_eq!(line.tax_amount_paise, 2_800);

        let totals = LedgerTotals::from_items(&[line]);
        assert_eq!(totals.cess.paise(), 1_200);
        assert_eq!(totals.total().paise(), 12_800);
    }

    #[test]
    fn test_components_round_independently() {
        // ₹3.33 at 2.5% + 2.5%: each 8.325p → 8p, tax 16p
        let line = LineItem::price(&product(333, 250, 250, 0, 0), 1, None);
        assert_eq!(line.cgst_amount_paise, 8);
        assert_eq!(line.sgst_amount_paise, 8);
        assert_eq!(line.tax_amount_paise, 16);
    }

    #[test]
    fn test_grand_total_applies_discount_and_shipping() {
        let lines = vec![
            LineItem::price(&product(10_000, 900, 900, 0, 0), 2, None),
            LineItem::price(&product(5_000, 0, 0, 500, 0), 1, None),
        ];
        let totals = LedgerTotals::from_items(&lines);

        assert_eq!(totals.subtotal.paise(), 25_000);
        assert_eq!(totals.tax.paise(), 3_850);
        assert_eq!(
            totals
                .grand_total(Money::from_paise(1_000), Money::from_paise(500))
                .paise(),
            28_350
        );
    }
}
