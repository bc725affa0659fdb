use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::services::catalog::{CreateProductInput, UpdateProductInput, VariantInput};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_product))
        .route("/:id", put(update_product))
        .route("/:id", delete(deactivate_product))
        .route("/:id/variants", post(add_variant))
        .route("/variants/:variant_id/stock", put(set_stock))
        .route("/categories", post(create_category))
        .route("/brands", post(create_brand))
}

#[derive(Debug, Deserialize)]
struct SetStockRequest {
    stock: i32,
}

#[derive(Debug, Deserialize)]
struct CreateCategoryRequest {
    name: String,
    slug: String,
    parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct CreateBrandRequest {
    name: String,
    slug: String,
}

/// Create a product with variants and images in one call
async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .create_product(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

/// Soft delete; order snapshots keep their history
async fn deactivate_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .deactivate_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

async fn add_variant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VariantInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let variant = state
        .services
        .catalog
        .add_variant(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(variant))
}

async fn set_stock(
    State(state): State<Arc<AppState>>,
    Path(variant_id): Path<Uuid>,
    Json(payload): Json<SetStockRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let variant = state
        .services
        .catalog
        .set_variant_stock(variant_id, payload.stock)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(variant))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = state
        .services
        .catalog
        .create_category(payload.name, payload.slug, payload.parent_id)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(category))
}

async fn create_brand(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBrandRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let brand = state
        .services
        .catalog
        .create_brand(payload.name, payload.slug)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(brand))
}
