//! Companies, categories and products.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::auth::AuthActor;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::services::ProductView;
use crate::AppState;
use tradelink_core::input::{
    AddEmployeeInput, CreateCategoryInput, CreateCompanyInput, CreateProductInput,
    UpdateCompanySettingsInput, UpdateStockInput,
};
use tradelink_core::{Category, Company, EntityId};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/companies", post(create_company))
        .route("/api/companies/public", get(list_public))
        .route("/api/companies/{id}", get(get_company))
        .route("/api/companies/{id}/settings", put(update_settings))
        .route("/api/companies/{id}/employees", post(add_employee))
        .route(
            "/api/companies/{id}/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/api/companies/{id}/products",
            get(list_products).post(create_product),
        )
        .route("/api/products/{id}", get(get_product))
        .route("/api/products/{id}/stock", put(update_stock))
}

// =============================================================================
// Companies
// =============================================================================

async fn create_company(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiJson(input): ApiJson<CreateCompanyInput>,
) -> ApiResult<(StatusCode, Json<Company>)> {
    let company = state.directory.create_company(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

async fn list_public(
    State(state): State<Arc<AppState>>,
    AuthActor(_): AuthActor,
) -> ApiResult<Json<Vec<Company>>> {
    Ok(Json(state.directory.list_public_companies().await?))
}

async fn get_company(
    State(state): State<Arc<AppState>>,
    AuthActor(_): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Json<Company>> {
    Ok(Json(state.directory.get_company(&id).await?))
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(input): ApiJson<UpdateCompanySettingsInput>,
) -> ApiResult<Json<Company>> {
    Ok(Json(state.directory.update_settings(&actor, &id, input).await?))
}

async fn add_employee(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(input): ApiJson<AddEmployeeInput>,
) -> ApiResult<Json<Company>> {
    Ok(Json(state.directory.add_employee(&actor, &id, input).await?))
}

// =============================================================================
// Catalog
// =============================================================================

async fn create_category(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(input): ApiJson<CreateCategoryInput>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state.directory.create_category(&actor, &id, input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    AuthActor(_): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.directory.list_categories(&id).await?))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(input): ApiJson<CreateProductInput>,
) -> ApiResult<(StatusCode, Json<ProductView>)> {
    let product = state.directory.create_product(&actor, &id, input).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    AuthActor(_): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Json<Vec<ProductView>>> {
    let products = state.directory.list_products(&id).await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    AuthActor(_): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Json<ProductView>> {
    Ok(Json(state.directory.get_product(&id).await?.into()))
}

async fn update_stock(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(input): ApiJson<UpdateStockInput>,
) -> ApiResult<Json<ProductView>> {
    Ok(Json(state.directory.update_stock(&actor, &id, input).await?.into()))
}
