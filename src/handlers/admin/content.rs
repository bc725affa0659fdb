use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::services::content::{BannerInput, CreatePostInput, UpdatePostInput};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/banners", post(create_banner))
        .route("/banners/:id", put(update_banner))
        .route("/banners/:id", delete(delete_banner))
        .route("/blog", post(create_post))
        .route("/blog/:id", put(update_post))
        .route("/blog/:id", delete(delete_post))
}

async fn create_banner(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BannerInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let banner = state
        .services
        .content
        .create_banner(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(banner))
}

async fn update_banner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BannerInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let banner = state
        .services
        .content
        .update_banner(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(banner))
}

async fn delete_banner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .content
        .delete_banner(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePostInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let post = state
        .services
        .content
        .create_post(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(post))
}

async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let post = state
        .services
        .content
        .update_post(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(post))
}

async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .content
        .delete_post(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
