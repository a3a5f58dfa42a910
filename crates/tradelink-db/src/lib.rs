//! # tradelink-db: Database Layer for Tradelink
//!
//! This crate provides database access for the Tradelink API.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tradelink Data Flow                              │
//! │                                                                         │
//! │  HTTP handler ──► service (engine / ledger operation)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tradelink-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Users         │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ Companies     │    │  _schema.sql │  │   │
//! │  │   │ begin() → tx  │    │ Products      │    │              │  │   │
//! │  │   │               │    │ Invites ...   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │       ./data/tradelink.db  (or :memory: in tests)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per collection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tradelink_db::{Database, DbConfig, ProductRepository};
//!
//! let db = Database::new(DbConfig::new("./data/tradelink.db")).await?;
//!
//! // Single-statement reads and updates go through the pool
//! let products = db.products().list_by_company(&company_id).await?;
//!
//! // Multi-row writes share one transaction
//! let mut tx = db.begin().await?;
//! ProductRepository::reserve_stock(&mut tx, &product_id, 3).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::company::CompanyRepository;
pub use repository::connection::ConnectionRepository;
pub use repository::invite::InviteRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::request::RequestRepository;
pub use repository::user::{UserCredentials, UserRepository};
