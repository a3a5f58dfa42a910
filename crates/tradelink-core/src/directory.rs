//! # Directory Types
//!
//! Companies, users, categories and products: the keyed records both
//! engines look up. Plain CRUD, so this module is mostly data.
//!
//! ## Product Stock Status
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  available_quantity == 0              → out_of_stock                    │
//! │  available_quantity <= reorder_level  → low_stock                       │
//! │  otherwise                            → sufficient                      │
//! │                                                                         │
//! │  Never stored. Derived from the current row every time it is read,     │
//! │  so it cannot drift from the quantity it describes.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::GstRates;
use crate::money::Money;
use crate::types::{EntityId, Role, TaxRate};
use crate::DEFAULT_PAYMENT_TERMS;

// =============================================================================
// Company
// =============================================================================

/// Defaults a company applies to new connections and incoming requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CompanySettings {
    pub allow_retailer_discovery: bool,
    /// Requests from retailers become connections without review.
    pub auto_approve_requests: bool,
    pub default_credit_limit_paise: i64,
    pub default_payment_terms: String,
}

impl Default for CompanySettings {
    fn default() -> Self {
        CompanySettings {
            allow_retailer_discovery: true,
            auto_approve_requests: false,
            default_credit_limit_paise: 0,
            default_payment_terms: DEFAULT_PAYMENT_TERMS.to_string(),
        }
    }
}

/// A manufacturer's trading entity.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Company {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: EntityId,
    /// Accepts join requests from retailers it has not invited.
    pub is_public: bool,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub settings: CompanySettings,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub employees: Vec<EntityId>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// User
// =============================================================================

/// Public view of a user. Credentials live only in the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: EntityId,
    pub company_id: EntityId,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// Stock level relative to the reorder threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    OutOfStock,
    LowStock,
    Sufficient,
}

impl ProductStatus {
    pub fn derive(available_quantity: i64, reorder_level: i64) -> Self {
        if available_quantity <= 0 {
            ProductStatus::OutOfStock
        } else if available_quantity <= reorder_level {
            ProductStatus::LowStock
        } else {
            ProductStatus::Sufficient
        }
    }
}

/// A catalog entry. Prices in paise, GST rates in basis points.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: EntityId,
    pub company_id: EntityId,
    pub category_id: Option<EntityId>,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub hsn_code: Option<String>,
    /// Selling unit shown on documents ("box", "kg", ...).
    pub unit: String,
    pub price_paise: i64,
    /// Never negative; enforced by a conditional decrement and a CHECK.
    pub available_quantity: i64,
    pub total_shipped: i64,
    pub reorder_level: i64,
    pub cgst_rate_bps: u32,
    pub sgst_rate_bps: u32,
    pub igst_rate_bps: u32,
    pub cess_rate_bps: u32,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }

    pub fn gst_rates(&self) -> GstRates {
        GstRates {
            cgst: TaxRate::from_bps(self.cgst_rate_bps),
            sgst: TaxRate::from_bps(self.sgst_rate_bps),
            igst: TaxRate::from_bps(self.igst_rate_bps),
            cess: TaxRate::from_bps(self.cess_rate_bps),
        }
    }

    pub fn status(&self) -> ProductStatus {
        ProductStatus::derive(self.available_quantity, self.reorder_level)
    }

    /// Active and listed by `company_id`.
    pub fn is_sellable_by(&self, company_id: &EntityId) -> bool {
        self.is_active && &self.company_id == company_id
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
