//! # Tradelink API
//!
//! JSON/HTTP server for the connection engine and the commerce ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tradelink API Services                          │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │IdentityService │  │DirectoryService│  │  ConnectionService         ││
//! │  │                │  │                │  │                            ││
//! │  │ • Register     │  │ • Companies    │  │ • Invites (issue, redeem)  ││
//! │  │ • Login        │  │ • Categories   │  │ • Requests (ask, resolve)  ││
//! │  │ • Authenticate │  │ • Products     │  │ • Suspend / reactivate     ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐                                │
//! │  │  OrderService  │  │ InvoiceService │                                │
//! │  │                │  │                │                                │
//! │  │ • Place        │  │ • From order   │                                │
//! │  │ • Cancel       │  │ • Direct       │                                │
//! │  │ • Status       │  │ • Pay / Send   │                                │
//! │  └────────────────┘  └────────────────┘                                │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │   SQLite (tradelink-db)  •  JWT bearer auth  •  argon2 hashes    │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - HTTP server port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./data/tradelink.db)
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `JWT_ACCESS_LIFETIME_SECS` - Access token lifetime (default: 86400)
//! - `INVOICE_DUE_DAYS` - Default invoice due period (default: 30)
//! - `INVITE_DEFAULT_TTL_DAYS` - Default invite lifetime (default: 7)

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod services;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ServiceError};
pub use routes::app;

use auth::JwtManager;
use services::{ConnectionService, DirectoryService, IdentityService, InvoiceService, OrderService};
use tradelink_db::Database;

/// Shared application state.
pub struct AppState {
    pub config: ApiConfig,
    pub db: Database,
    pub jwt: JwtManager,
    pub identity: IdentityService,
    pub directory: DirectoryService,
    pub connections: ConnectionService,
    pub orders: OrderService,
    pub invoices: InvoiceService,
}

impl AppState {
    pub fn new(config: ApiConfig, db: Database) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs);

        AppState {
            identity: IdentityService::new(db.clone(), jwt.clone()),
            directory: DirectoryService::new(db.clone()),
            connections: ConnectionService::new(db.clone(), config.invite_default_ttl_days),
            orders: OrderService::new(db.clone()),
            invoices: InvoiceService::new(db.clone(), config.invoice_due_days),
            jwt,
            db,
            config,
        }
    }
}
