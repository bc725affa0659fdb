use crate::auth::SessionUser;
use crate::handlers::common::{
    created_response, map_service_error, success_response, Paginated, PaginationParams,
};
use crate::services::orders::PlaceOrderInput;
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated order endpoints
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(place_order))
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/cancel", post(cancel_order))
}

/// Place a cash-on-delivery order from the caller's cart
async fn place_order(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Json(payload): Json<PlaceOrderInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .place_cod_order(user.user_id, user.email.clone(), payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(order))
}

/// The caller's order history
async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (orders, total) = state
        .services
        .orders
        .list_for_user(user.user_id, pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(
        orders,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// One order with items and timeline; owners only
async fn get_order(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(id, user.user_id, user.is_admin())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// Cancel an order that has not shipped yet
async fn cancel_order(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .cancel_order(id, user.user_id, user.is_admin())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}
