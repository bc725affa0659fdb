use crate::handlers::common::{map_service_error, success_response, Paginated, PaginationParams};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use std::sync::Arc;

/// Public merchandising content
pub fn content_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/banners", get(list_banners))
        .route("/blog", get(list_posts))
        .route("/blog/:slug", get(get_post))
}

async fn list_banners(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let banners = state
        .services
        .content
        .active_banners()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(banners))
}

async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (posts, total) = state
        .services
        .content
        .list_posts(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(
        posts,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let post = state
        .services
        .content
        .get_post_by_slug(&slug)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(post))
}
