//! Liveness and database health.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

/// GET /health - 200 when the database answers, 503 otherwise.
async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if database { "healthy" } else { "degraded" },
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
