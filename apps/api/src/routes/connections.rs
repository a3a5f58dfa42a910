//! Invites, retailer requests and connections.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::auth::AuthActor;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::services::{ConnectionFilter, InviteView, RequestFilter, RequestOutcome};
use crate::AppState;
use tradelink_core::input::{
    GenerateInviteInput, RedeemInviteInput, RequestApprovalInput, ResolveRequestInput,
    UpdateConnectionStatusInput,
};
use tradelink_core::{Connection, EntityId, RetailerRequest};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/companies/{id}/invites",
            get(list_invites).post(generate_invite),
        )
        .route("/api/invites/redeem", post(redeem_invite))
        .route("/api/requests", post(request_approval))
        .route("/api/requests/mine", get(list_my_requests))
        .route("/api/requests/{id}/resolve", post(resolve_request))
        .route("/api/companies/{id}/requests", get(list_requests))
        .route("/api/companies/{id}/connections", get(list_connections))
        .route("/api/connections/mine", get(list_my_connections))
        .route("/api/connections/{id}/status", put(set_status))
}

// =============================================================================
// Invites
// =============================================================================

async fn generate_invite(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(company_id): ApiPath<EntityId>,
    ApiJson(input): ApiJson<GenerateInviteInput>,
) -> ApiResult<(StatusCode, Json<InviteView>)> {
    let invite = state
        .connections
        .generate_invite(&actor, &company_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

async fn list_invites(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(company_id): ApiPath<EntityId>,
) -> ApiResult<Json<Vec<InviteView>>> {
    Ok(Json(state.connections.list_invites(&actor, &company_id).await?))
}

async fn redeem_invite(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiJson(input): ApiJson<RedeemInviteInput>,
) -> ApiResult<(StatusCode, Json<Connection>)> {
    let connection = state.connections.redeem_invite(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(connection)))
}

// =============================================================================
// Requests
// =============================================================================

async fn request_approval(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiJson(input): ApiJson<RequestApprovalInput>,
) -> ApiResult<(StatusCode, Json<RequestOutcome>)> {
    let outcome = state.connections.request_approval(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn list_my_requests(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
) -> ApiResult<Json<Vec<RetailerRequest>>> {
    Ok(Json(state.connections.list_my_requests(&actor).await?))
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(company_id): ApiPath<EntityId>,
    ApiQuery(filter): ApiQuery<RequestFilter>,
) -> ApiResult<Json<Vec<RetailerRequest>>> {
    Ok(Json(
        state
            .connections
            .list_requests(&actor, &company_id, filter)
            .await?,
    ))
}

async fn resolve_request(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(request_id): ApiPath<EntityId>,
    ApiJson(input): ApiJson<ResolveRequestInput>,
) -> ApiResult<Json<RequestOutcome>> {
    Ok(Json(
        state
            .connections
            .resolve_request(&actor, &request_id, input)
            .await?,
    ))
}

// =============================================================================
// Connections
// =============================================================================

async fn list_connections(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(company_id): ApiPath<EntityId>,
    ApiQuery(filter): ApiQuery<ConnectionFilter>,
) -> ApiResult<Json<Vec<Connection>>> {
    Ok(Json(
        state
            .connections
            .list_connections(&actor, &company_id, filter)
            .await?,
    ))
}

async fn list_my_connections(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
) -> ApiResult<Json<Vec<Connection>>> {
    Ok(Json(state.connections.list_my_connections(&actor).await?))
}

async fn set_status(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(connection_id): ApiPath<EntityId>,
    ApiJson(input): ApiJson<UpdateConnectionStatusInput>,
) -> ApiResult<Json<Connection>> {
    Ok(Json(
        state
            .connections
            .set_connection_status(&actor, &connection_id, input)
            .await?,
    ))
}
