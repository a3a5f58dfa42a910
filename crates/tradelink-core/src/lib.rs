//! # tradelink-core: Pure Business Logic for Tradelink
//!
//! This crate is the **heart** of Tradelink. It holds every rule of the
//! connection engine and the commerce ledger as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tradelink Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    bearer token ──► Actor ──► Connection Engine / Ledger       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ tradelink-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │  ledger   │  │connection │  │   input   │  │   │
//! │  │   │   Money   │  │ LineItem  │  │  Invite   │  │ schemas + │  │   │
//! │  │   │  TaxRate  │  │ GST split │  │  Request  │  │validation │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   order   │  │  invoice  │  │ directory │  │   actor   │  │   │
//! │  │   │  status   │  │ payment   │  │ Company   │  │permission │  │   │
//! │  │   │  rules    │  │ derivation│  │ Product   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • CLOCK PASSED IN          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  tradelink-db (Database Layer)                  │   │
//! │  │       SQLite queries, migrations, conditional updates           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Shared value types (EntityId, TaxRate, Role, DeliveryAddress)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`ledger`] - GST line pricing and totals, shared by orders and invoices
//! - [`connection`] - Invite codes, retailer requests, connections
//! - [`order`] / [`invoice`] - Document records and lifecycle rules
//! - [`directory`] - Companies, users, categories, products
//! - [`actor`] - The explicit caller and its permission checks
//! - [`input`] - One request schema per operation
//! - [`error`] / [`validation`] - Error taxonomy and field validators
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: `now` and RNGs are parameters, never ambient
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in paise (i64)
//! 4. **Derived, Not Stored**: stock status and payment status are recomputed
//!
//! ## Example Usage
//!
//! ```rust
//! use tradelink_core::money::Money;
//! use tradelink_core::types::TaxRate;
//!
//! // ₹100 × 2 at 9% CGST + 9% SGST
//! let line = Money::from_rupees(100).multiply_quantity(2);
//! let cgst = line.calculate_tax(TaxRate::from_bps(900));
//! let sgst = line.calculate_tax(TaxRate::from_bps(900));
//!
//! assert_eq!((line + cgst + sgst).paise(), 23_600);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod actor;
pub mod connection;
pub mod directory;
pub mod error;
pub mod input;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tradelink_core::Money` instead of
// `use tradelink_core::money::Money`

pub use actor::{Actor, Membership, MembershipKind};
pub use connection::{
    Connection, ConnectionStatus, InviteCode, InviteRedemption, RequestAction, RequestStatus,
    RetailerRequest,
};
pub use directory::{Category, Company, CompanySettings, Product, ProductStatus, User};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use invoice::{Invoice, InvoiceStatus, PaymentMode, PaymentStatus};
pub use ledger::{GstRates, LedgerTotals, LineItem};
pub use money::Money;
pub use order::{Order, OrderStatus, PaymentMethod};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single order or invoice.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Catches typos such as 10000 instead of 100 before stock is reserved.
pub const MAX_ITEM_QUANTITY: i64 = 9999;

/// Largest accepted price, discount, shipping charge or credit limit
/// (₹1,000 crore).
///
/// A full order at this price (100 lines × 9999 units, taxed at three
/// 100% components) stays inside `i64` paise.
pub const MAX_AMOUNT_PAISE: i64 = 1_000_000_000_000;

/// Length of an invite code.
pub const INVITE_CODE_LEN: usize = 8;

/// Invite lifetime bounds, in days.
pub const INVITE_MIN_TTL_DAYS: i64 = 1;
pub const INVITE_MAX_TTL_DAYS: i64 = 30;
pub const DEFAULT_INVITE_TTL_DAYS: i64 = 7;

/// Upper bound on `max_uses` for a single invite.
pub const MAX_INVITE_USES: i64 = 1000;

/// Message attached to an invite when the issuer gives none.
pub const DEFAULT_INVITE_MESSAGE: &str = "Join our network to access our products.";

/// Retailer request message bounds, in characters.
pub const REQUEST_MESSAGE_MIN: usize = 10;
pub const REQUEST_MESSAGE_MAX: usize = 500;

/// Payment terms a company starts with.
pub const DEFAULT_PAYMENT_TERMS: &str = "Net 30 days";

/// Days until an invoice falls due when none is given.
pub const DEFAULT_INVOICE_DUE_DAYS: i64 = 30;

/// Stock level at or below which a product reports `low_stock`.
pub const DEFAULT_REORDER_LEVEL: i64 = 10;

/// Reason stored when an order is cancelled without one.
pub const DEFAULT_CANCELLATION_REASON: &str = "Cancelled by user";
