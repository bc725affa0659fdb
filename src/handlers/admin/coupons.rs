use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, Paginated,
    PaginationParams,
};
use crate::services::coupons::{CreateCouponInput, UpdateCouponInput};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_coupon))
        .route("/", get(list_coupons))
        .route("/:id", put(update_coupon))
        .route("/:id", delete(delete_coupon))
}

async fn create_coupon(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCouponInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupons
        .create(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(coupon))
}

async fn list_coupons(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (coupons, total) = state
        .services
        .coupons
        .list(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(
        coupons,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

async fn update_coupon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupons
        .update(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(coupon))
}

async fn delete_coupon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .coupons
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
