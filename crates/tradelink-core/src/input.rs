//! # Input Schemas
//!
//! One request schema per operation, owned here and consumed by the HTTP
//! layer. Each `validate()` checks field rules and returns the normalised
//! value (trimmed strings, uppercase units and codes, blank optionals
//! dropped), so services only ever see clean input.
//!
//! ```text
//! JSON body ──serde──► XxxInput ──validate()──► XxxInput (normalised) ──► service
//!                         │                          │
//!                  EntityId parsed here       ValidationError → 400
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use ts_rs::TS;

use crate::connection::{normalize_invite_code, ConnectionStatus, RequestAction};
use crate::error::ValidationError;
use crate::invoice::PaymentMode;
use crate::order::{OrderStatus, PaymentMethod};
use crate::types::{DeliveryAddress, EntityId, Role};
use crate::validation::*;
use crate::{REQUEST_MESSAGE_MAX, REQUEST_MESSAGE_MIN};

// =============================================================================
// Identity
// =============================================================================

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl RegisterInput {
    /// Staff accounts are provisioned, never self-registered.
    pub fn validate(self) -> ValidationResult<Self> {
        if self.role == Role::Staff {
            return Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: [Role::Manufacturer, Role::Retailer, Role::Employee]
                    .iter()
                    .map(|r| r.to_string())
                    .collect(),
            });
        }
        validate_password(&self.password)?;

        Ok(RegisterInput {
            username: validate_username(&self.username)?,
            email: validate_email(&self.email)?,
            password: self.password,
            role: self.role,
            first_name: validate_optional_text("first_name", self.first_name.as_deref(), 50)?,
            last_name: validate_optional_text("last_name", self.last_name.as_deref(), 50)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn validate(self) -> ValidationResult<Self> {
        if self.password.is_empty() {
            return Err(ValidationError::Required {
                field: "password".to_string(),
            });
        }
        Ok(LoginInput {
            username: validate_text("username", &self.username, 1, 254)?,
            password: self.password,
        })
    }
}

// =============================================================================
// Directory
// =============================================================================

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateCompanyInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

impl CreateCompanyInput {
    pub fn validate(self) -> ValidationResult<Self> {
        Ok(CreateCompanyInput {
            name: validate_text("name", &self.name, 1, 100)?,
            description: validate_optional_text("description", self.description.as_deref(), 500)?,
            is_public: self.is_public,
        })
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct UpdateCompanySettingsInput {
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub allow_retailer_discovery: Option<bool>,
    #[serde(default)]
    pub auto_approve_requests: Option<bool>,
    #[serde(default)]
    pub default_credit_limit_paise: Option<i64>,
    #[serde(default)]
    pub default_payment_terms: Option<String>,
}

impl UpdateCompanySettingsInput {
    pub fn validate(self) -> ValidationResult<Self> {
        if let Some(limit) = self.default_credit_limit_paise {
            validate_amount_paise("default_credit_limit", limit)?;
        }
        let default_payment_terms = match self.default_payment_terms.as_deref() {
            Some(terms) => Some(validate_text("default_payment_terms", terms, 1, 100)?),
            None => None,
        };
        Ok(UpdateCompanySettingsInput {
            default_payment_terms,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct AddEmployeeInput {
    pub user_id: EntityId,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateCategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateCategoryInput {
    pub fn validate(self) -> ValidationResult<Self> {
        Ok(CreateCategoryInput {
            name: validate_text("name", &self.name, 1, 50)?,
            description: validate_optional_text("description", self.description.as_deref(), 200)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<EntityId>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub hsn_code: Option<String>,
    pub unit: String,
    pub price_paise: i64,
    pub available_quantity: i64,
    #[serde(default)]
    pub reorder_level: Option<i64>,
    #[serde(default)]
    pub cgst_rate_bps: u32,
    #[serde(default)]
    pub sgst_rate_bps: u32,
    #[serde(default)]
    pub igst_rate_bps: u32,
    #[serde(default)]
    pub cess_rate_bps: u32,
}

impl CreateProductInput {
    pub fn validate(self) -> ValidationResult<Self> {
        validate_amount_paise("price", self.price_paise)?;
        validate_stock_quantity("available_quantity", self.available_quantity)?;
        if let Some(level) = self.reorder_level {
            validate_stock_quantity("reorder_level", level)?;
        }
        validate_tax_rate_bps("cgst_rate", self.cgst_rate_bps)?;
        validate_tax_rate_bps("sgst_rate", self.sgst_rate_bps)?;
        validate_tax_rate_bps("igst_rate", self.igst_rate_bps)?;
        validate_tax_rate_bps("cess_rate", self.cess_rate_bps)?;

        let sku = match self.sku.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(sku) => Some(validate_sku(sku)?),
        };
        let hsn_code = match self.hsn_code.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(code) => Some(validate_hsn_code(code)?),
        };

        Ok(CreateProductInput {
            name: validate_text("name", &self.name, 1, 100)?,
            description: validate_optional_text("description", self.description.as_deref(), 1000)?,
            sku,
            hsn_code,
            unit: validate_unit(&self.unit)?,
            ..self
        })
    }
}

/// Absolute restock. The quantity replaces the current level.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct UpdateStockInput {
    pub available_quantity: i64,
    #[serde(default)]
    pub reorder_level: Option<i64>,
}

impl UpdateStockInput {
    pub fn validate(self) -> ValidationResult<Self> {
        validate_stock_quantity("available_quantity", self.available_quantity)?;
        if let Some(level) = self.reorder_level {
            validate_stock_quantity("reorder_level", level)?;
        }
        Ok(self)
    }
}

// =============================================================================
// Connection Engine
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct GenerateInviteInput {
    #[serde(default)]
    pub expires_in_days: Option<i64>,
    #[serde(default)]
    pub max_uses: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl GenerateInviteInput {
    pub fn validate(self) -> ValidationResult<Self> {
        if let Some(days) = self.expires_in_days {
            validate_invite_ttl_days(days)?;
        }
        if let Some(max_uses) = self.max_uses {
            validate_invite_max_uses(max_uses)?;
        }
        let email = match self.email.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(email) => Some(validate_email(email)?),
        };
        Ok(GenerateInviteInput {
            message: validate_optional_text("message", self.message.as_deref(), 500)?,
            email,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct RedeemInviteInput {
    pub invite_code: String,
}

impl RedeemInviteInput {
    pub fn validate(self) -> ValidationResult<Self> {
        let code = normalize_invite_code(&self.invite_code);
        if code.is_empty() {
            return Err(ValidationError::Required {
                field: "invite_code".to_string(),
            });
        }
        Ok(RedeemInviteInput { invite_code: code })
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct RequestApprovalInput {
    pub company_id: EntityId,
    pub message: String,
}

impl RequestApprovalInput {
    pub fn validate(self) -> ValidationResult<Self> {
        Ok(RequestApprovalInput {
            message: validate_text(
                "message",
                &self.message,
                REQUEST_MESSAGE_MIN,
                REQUEST_MESSAGE_MAX,
            )?,
            company_id: self.company_id,
        })
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct ResolveRequestInput {
    pub action: RequestAction,
    #[serde(default)]
    pub credit_limit_paise: Option<i64>,
    #[serde(default)]
    pub payment_terms: Option<String>,
}

impl ResolveRequestInput {
    pub fn validate(self) -> ValidationResult<Self> {
        if let Some(limit) = self.credit_limit_paise {
            validate_amount_paise("credit_limit", limit)?;
        }
        Ok(ResolveRequestInput {
            payment_terms: validate_optional_text(
                "payment_terms",
                self.payment_terms.as_deref(),
                100,
            )?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct UpdateConnectionStatusInput {
    pub status: ConnectionStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub credit_limit_paise: Option<i64>,
    #[serde(default)]
    pub payment_terms: Option<String>,
}

impl UpdateConnectionStatusInput {
    pub fn validate(self) -> ValidationResult<Self> {
        if let Some(limit) = self.credit_limit_paise {
            validate_amount_paise("credit_limit", limit)?;
        }
        Ok(UpdateConnectionStatusInput {
            reason: validate_optional_text("reason", self.reason.as_deref(), 500)?,
            payment_terms: validate_optional_text(
                "payment_terms",
                self.payment_terms.as_deref(),
                100,
            )?,
            ..self
        })
    }
}

// =============================================================================
// Commerce Ledger
// =============================================================================

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct LineItemInput {
    pub product_id: EntityId,
    pub quantity: i64,
    /// Negotiated price; the catalog price applies when absent.
    #[serde(default)]
    pub unit_price_paise: Option<i64>,
}

fn validate_items(items: &[LineItemInput]) -> ValidationResult<()> {
    validate_item_count(items.len())?;
    for item in items {
        validate_quantity(item.quantity)?;
        if let Some(price) = item.unit_price_paise {
            validate_amount_paise("unit_price", price)?;
        }
    }
    Ok(())
}

fn validate_address(address: DeliveryAddress) -> ValidationResult<DeliveryAddress> {
    Ok(DeliveryAddress {
        address_line1: validate_text("address_line1", &address.address_line1, 1, 100)?,
        address_line2: validate_optional_text(
            "address_line2",
            address.address_line2.as_deref(),
            100,
        )?,
        city: validate_text("city", &address.city, 1, 50)?,
        state: validate_text("state", &address.state, 1, 50)?,
        pincode: validate_pincode(&address.pincode)?,
        country: validate_text("country", &address.country, 1, 50)?,
    })
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct PlaceOrderInput {
    pub company_id: EntityId,
    /// Required when a company operator places the order for a retailer.
    #[serde(default)]
    pub retailer_id: Option<EntityId>,
    pub items: Vec<LineItemInput>,
    pub delivery_address: DeliveryAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub delivery_notes: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expected_delivery_date: Option<DateTime<Utc>>,
}

impl PlaceOrderInput {
    pub fn validate(self) -> ValidationResult<Self> {
        validate_items(&self.items)?;
        Ok(PlaceOrderInput {
            delivery_address: validate_address(self.delivery_address)?,
            delivery_notes: validate_optional_text(
                "delivery_notes",
                self.delivery_notes.as_deref(),
                500,
            )?,
            notes: validate_optional_text("notes", self.notes.as_deref(), 500)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct CancelOrderInput {
    #[serde(default)]
    pub reason: Option<String>,
}

impl CancelOrderInput {
    pub fn validate(self) -> ValidationResult<Self> {
        Ok(CancelOrderInput {
            reason: validate_optional_text("reason", self.reason.as_deref(), 500)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct UpdateOrderStatusInput {
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

impl UpdateOrderStatusInput {
    pub fn validate(self) -> ValidationResult<Self> {
        Ok(UpdateOrderStatusInput {
            notes: validate_optional_text("notes", self.notes.as_deref(), 500)?,
            tracking_number: validate_optional_text(
                "tracking_number",
                self.tracking_number.as_deref(),
                100,
            )?,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceFromOrderInput {
    pub order_id: EntityId,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl InvoiceFromOrderInput {
    pub fn validate(self) -> ValidationResult<Self> {
        Ok(InvoiceFromOrderInput {
            payment_terms: validate_optional_text(
                "payment_terms",
                self.payment_terms.as_deref(),
                100,
            )?,
            notes: validate_optional_text("notes", self.notes.as_deref(), 500)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct DirectInvoiceInput {
    pub company_id: EntityId,
    pub retailer_id: EntityId,
    pub items: Vec<LineItemInput>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub discount_paise: i64,
    #[serde(default)]
    pub shipping_charges_paise: i64,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DirectInvoiceInput {
    pub fn validate(self) -> ValidationResult<Self> {
        validate_items(&self.items)?;
        validate_amount_paise("discount", self.discount_paise)?;
        validate_amount_paise("shipping_charges", self.shipping_charges_paise)?;
        Ok(DirectInvoiceInput {
            payment_terms: validate_optional_text(
                "payment_terms",
                self.payment_terms.as_deref(),
                100,
            )?,
            notes: validate_optional_text("notes", self.notes.as_deref(), 500)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct RecordPaymentInput {
    /// Cumulative amount paid so far, not an increment.
    pub paid_amount_paise: i64,
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RecordPaymentInput {
    pub fn validate(self) -> ValidationResult<Self> {
        // Bounded by the invoice's grand total when applied.
        if self.paid_amount_paise < 0 {
            return Err(ValidationError::OutOfRange {
                field: "paid_amount".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        Ok(RecordPaymentInput {
            notes: validate_optional_text("notes", self.notes.as_deref(), 500)?,
            ..self
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
