use crate::handlers::common::{map_service_error, success_response, Paginated};
use crate::services::catalog::ProductFilters;
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use std::sync::Arc;

/// Public catalog endpoints
pub fn products_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products))
        .route("/:product", get(get_product))
}

pub fn categories_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_categories))
}

pub fn brands_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_brands))
}

/// Browse products with filters and pagination
async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<ProductFilters>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = filters.page.unwrap_or(1).max(1);
    let per_page = filters.per_page.unwrap_or(24).clamp(1, 100);

    let (cards, total) = state
        .services
        .catalog
        .list_products(filters)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(Paginated::new(cards, page, per_page, total)))
}

/// Product page by slug (bumps the view counter)
async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let detail = state
        .services
        .catalog
        .get_product_by_slug(&slug)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let categories = state
        .services
        .catalog
        .list_categories()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

async fn list_brands(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let brands = state
        .services
        .catalog
        .list_brands()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(brands))
}
