//! HTTP routes.
//!
//! ```text
//! /health                         health
//! /api/auth/*                     auth
//! /api/companies, /api/products   companies
//! /api/invites, /api/requests,
//! /api/connections                connections
//! /api/orders                     orders
//! /api/invoices                   invoices
//! ```
//!
//! Every route except `/health`, register and login takes a bearer token,
//! resolved into an `Actor` by the [`AuthActor`](crate::auth::AuthActor)
//! extractor.

pub mod auth;
pub mod companies;
pub mod connections;
pub mod health;
pub mod invoices;
pub mod orders;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Builds the full application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(companies::router())
        .merge(connections::router())
        .merge(orders::router())
        .merge(invoices::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Router Tests
// =============================================================================
