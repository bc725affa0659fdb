use crate::auth::SessionUser;
use crate::handlers::common::{map_service_error, success_response};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Authenticated coupon check-before-checkout endpoint
pub fn coupons_routes() -> Router<Arc<AppState>> {
    Router::new().route("/validate", post(validate_coupon))
}

#[derive(Debug, Deserialize)]
struct ValidateCouponRequest {
    code: String,
    /// Subtotal to validate against; defaults to the caller's live cart.
    subtotal: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ValidateCouponResponse {
    valid: bool,
    code: String,
    discount: i64,
    subtotal: i64,
}

/// Validate a coupon against a subtotal. Read-only: usage is only consumed
/// when an order is placed.
async fn validate_coupon(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Json(payload): Json<ValidateCouponRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let subtotal = match payload.subtotal {
        Some(s) if s >= 0 => s,
        Some(_) => {
            return Err(map_service_error(crate::errors::ServiceError::ValidationError(
                "subtotal cannot be negative".into(),
            )))
        }
        None => {
            state
                .services
                .cart
                .get_cart(user.user_id)
                .await
                .map_err(map_service_error)?
                .subtotal
        }
    };

    let (coupon, discount) = state
        .services
        .coupons
        .validate_for_subtotal(&payload.code, subtotal)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ValidateCouponResponse {
        valid: true,
        code: coupon.code,
        discount,
        subtotal,
    }))
}
