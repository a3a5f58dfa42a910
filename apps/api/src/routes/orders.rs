//! Order placement and lifecycle.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::auth::AuthActor;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::services::OrderFilter;
use crate::AppState;
use tradelink_core::input::{CancelOrderInput, PlaceOrderInput, UpdateOrderStatusInput};
use tradelink_core::{EntityId, Order};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/orders", get(list_orders).post(place_order))
        .route("/api/orders/{id}", get(get_order))
        .route("/api/orders/{id}/cancel", post(cancel_order))
        .route("/api/orders/{id}/status", put(update_status))
}

async fn place_order(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiJson(input): ApiJson<PlaceOrderInput>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = state.orders.place_order(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.orders.list_orders(&actor, filter).await?))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.get_order(&actor, &id).await?))
}

/// POST /api/orders/{id}/cancel - body `{}` or `{"reason": "..."}`.
async fn cancel_order(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(input): ApiJson<CancelOrderInput>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.cancel_order(&actor, &id, input).await?))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(input): ApiJson<UpdateOrderStatusInput>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.update_status(&actor, &id, input).await?))
}
