use crate::auth::SessionUser;
use crate::handlers::common::{map_service_error, no_content_response, success_response};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated cart endpoints
pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/", delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:item_id", put(update_item))
        .route("/items/:item_id", delete(remove_item))
}

#[derive(Debug, Deserialize)]
struct AddItemRequest {
    variant_id: Uuid,
    quantity: i32,
}

#[derive(Debug, Deserialize)]
struct UpdateQuantityRequest {
    quantity: i32,
}

/// Get the caller's cart with live prices
async fn get_cart(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Add a variant to the cart (merges with an existing line)
async fn add_item(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .add_item(user.user_id, payload.variant_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Set a line's quantity; zero removes it
async fn update_item(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .update_quantity(user.user_id, item_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .remove_item(user.user_id, item_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn clear_cart(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .cart
        .clear(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
