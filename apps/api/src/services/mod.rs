//! Service layer: one service per area, each holding a `Database` handle.
//!
//! Services take the calling [`Actor`](tradelink_core::Actor) explicitly and
//! return [`ServiceResult`](crate::error::ServiceResult). HTTP handlers stay
//! thin wrappers around them.

pub mod connections;
pub mod directory;
pub mod identity;
pub mod invoices;
pub mod orders;

mod lines;

#[cfg(test)]
pub(crate) mod testing;

pub use connections::{ConnectionFilter, ConnectionService, InviteView, RequestFilter, RequestOutcome};
pub use directory::{DirectoryService, ProductView};
pub use identity::{AuthResponse, IdentityService, Profile};
pub use invoices::{InvoiceFilter, InvoiceService};
pub use orders::{OrderFilter, OrderService};
