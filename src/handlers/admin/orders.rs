use crate::handlers::common::{map_service_error, success_response, Paginated};
use crate::services::order_status::UpdateStatusInput;
use crate::{entities::PaymentStatus, errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::services::orders::OrderListFilters;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_status))
        .route("/:id/payment-status", put(update_payment_status))
}

#[derive(Debug, Deserialize)]
struct UpdatePaymentStatusRequest {
    status: PaymentStatus,
}

/// All orders, filterable by fulfillment and payment status
async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<OrderListFilters>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = filters.page.unwrap_or(1).max(1);
    let per_page = filters.per_page.unwrap_or(25).clamp(1, 100);
    let (orders, total) = state
        .services
        .orders
        .list_all(filters)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(orders, page, per_page, total)))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(id, Uuid::nil(), true)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// Move an order through its lifecycle; the timeline records every change
async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .order_status
        .update_status(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// Out-of-band payment corrections (refunds etc.)
async fn update_payment_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .order_status
        .update_payment_status(id, payload.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}
