use crate::handlers::common::{map_service_error, no_content_response, success_response, Paginated};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_reviews))
        .route("/:id/approval", put(set_approval))
        .route("/:id", delete(delete_review))
}

#[derive(Debug, Deserialize)]
struct ReviewListQuery {
    product_id: Option<Uuid>,
    page: Option<u64>,
    per_page: Option<u64>,
}

/// Moderation queue: all reviews including hidden ones
async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReviewListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(25).clamp(1, 100);
    let (reviews, total) = state
        .services
        .reviews
        .list_all(query.product_id, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(reviews, page, per_page, total)))
}

#[derive(Debug, Deserialize)]
struct ApprovalRequest {
    approved: bool,
}

/// Show or hide a review; product aggregates follow
async fn set_approval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApprovalRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let review = state
        .services
        .reviews
        .set_approved(id, payload.approved)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(review))
}

async fn delete_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .reviews
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
