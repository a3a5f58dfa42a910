//! Invoicing and payments.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::auth::AuthActor;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::services::InvoiceFilter;
use crate::AppState;
use tradelink_core::input::{DirectInvoiceInput, InvoiceFromOrderInput, RecordPaymentInput};
use tradelink_core::{EntityId, Invoice};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/invoices", get(list_invoices))
        .route("/api/invoices/from-order", post(create_from_order))
        .route("/api/invoices/direct", post(create_direct))
        .route("/api/invoices/{id}", get(get_invoice).delete(delete_invoice))
        .route("/api/invoices/{id}/payment", put(record_payment))
        .route("/api/invoices/{id}/send", post(send_invoice))
}

async fn create_from_order(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiJson(input): ApiJson<InvoiceFromOrderInput>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let invoice = state.invoices.create_from_order(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn create_direct(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiJson(input): ApiJson<DirectInvoiceInput>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let invoice = state.invoices.create_direct(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn list_invoices(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiQuery(filter): ApiQuery<InvoiceFilter>,
) -> ApiResult<Json<Vec<Invoice>>> {
    Ok(Json(state.invoices.list_invoices(&actor, filter).await?))
}

async fn get_invoice(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.invoices.get_invoice(&actor, &id).await?))
}

async fn record_payment(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(input): ApiJson<RecordPaymentInput>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.invoices.record_payment(&actor, &id, input).await?))
}

async fn send_invoice(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.invoices.send(&actor, &id).await?))
}

async fn delete_invoice(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<StatusCode> {
    state.invoices.delete(&actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
