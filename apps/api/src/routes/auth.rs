//! Registration, login and the caller's profile.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::AuthActor;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::services::{AuthResponse, Profile};
use crate::AppState;
use tradelink_core::input::{LoginInput, RegisterInput};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api/auth",
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/me", get(me)),
    )
}

/// POST /api/auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let response = state.identity.register(input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<LoginInput>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.identity.login(input).await?))
}

/// GET /api/auth/me
async fn me(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
) -> ApiResult<Json<Profile>> {
    Ok(Json(state.identity.profile(&actor).await?))
}
