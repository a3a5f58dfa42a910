//! # Repository Module
//!
//! Database repository implementations for Tradelink.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Service (apps/api)                                                    │
//! │       │                                                                 │
//! │       │  db.orders().get_by_id(&id)          pool, one statement       │
//! │       │  OrderRepository::insert(&mut tx, ..) caller's transaction     │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── list_by_company(&self, company, status)                           │
//! │  ├── update_status(&self, ..) -> bool      conditional on status       │
//! │  └── insert(conn, order)                   associated fn, no &self     │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Conditional updates return `bool`: false means the row was not in     │
//! │  the state the caller expected, and the caller decides what that       │
//! │  means (NotFound, InvalidState, Exhausted, InsufficientStock).          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`] - Accounts, credentials, company memberships
//! - [`CompanyRepository`] - Companies, settings, employees
//! - [`CategoryRepository`] - Product categories
//! - [`ProductRepository`] - Catalog and stock reservation
//! - [`InviteRepository`] - Invite codes and redemptions
//! - [`RequestRepository`] - Retailer join requests
//! - [`ConnectionRepository`] - Company/retailer connections
//! - [`OrderRepository`] - Orders and their line items
//! - [`InvoiceRepository`] - Invoices and their line items

pub mod category;
pub mod company;
pub mod connection;
pub mod invite;
pub mod invoice;
pub mod order;
pub mod product;
pub mod request;
pub mod user;

mod line_items;

#[cfg(test)]
pub(crate) mod fixtures;

pub use category::CategoryRepository;
pub use company::CompanyRepository;
pub use connection::ConnectionRepository;
pub use invite::InviteRepository;
pub use invoice::InvoiceRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
pub use request::RequestRepository;
pub use user::{UserCredentials, UserRepository};
