use crate::auth::SessionUser;
use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::services::orders::PlaceOrderInput;
use crate::services::payments::VerifyPaymentInput;
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use std::sync::Arc;

/// Authenticated online payment endpoints
pub fn payments_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_payment_order))
        .route("/verify", post(verify_payment))
}

/// Create a pending order and register it with the payment gateway. Stock
/// is not taken until the payment verifies.
async fn create_payment_order(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Json(payload): Json<PlaceOrderInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let initiation = state
        .services
        .payments
        .create_payment_order(user.user_id, user.email.clone(), payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(initiation))
}

/// Verify the gateway signature and settle the order
async fn verify_payment(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Json(payload): Json<VerifyPaymentInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .payments
        .verify_payment(user.user_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}
