use crate::auth::SessionUser;
use crate::handlers::common::{
    created_response, map_service_error, success_response, Paginated, PaginationParams,
};
use crate::services::reviews::SubmitReviewInput;
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Public review listing. Merged (not nested) so the POST on the same path
/// can carry the auth middleware without the GET paying for it.
pub fn reviews_public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/products/:product/reviews", get(list_reviews))
}

/// Authenticated review submission
pub fn reviews_authed_routes() -> Router<Arc<AppState>> {
    Router::new().route("/products/:product/reviews", post(submit_review))
}

/// Approved reviews for a product
async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (reviews, total) = state
        .services
        .reviews
        .list_for_product(product_id, pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(
        reviews,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Submit a review (one per product per user)
async fn submit_review(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<SubmitReviewInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let review = state
        .services
        .reviews
        .submit(product_id, user.user_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(review))
}
