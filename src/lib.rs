/*!
 * Threadline storefront API.
 *
 * Backend for a direct-to-consumer fashion storefront: catalog browsing,
 * carts, coupons, COD and online-payment checkout, order lifecycle,
 * reviews and merchandising content, plus the admin surface for all of it.
 */

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod notifications;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::TokenVerifier;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    database: &'static str,
    version: &'static str,
}

async fn health() -> &'static str {
    "ok"
}

/// Liveness plus a database ping.
async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let database = match state.db.ping().await {
        Ok(()) => "up",
        Err(_) => "down",
    };
    Json(StatusResponse {
        status: "ok",
        database,
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
}

/// The versioned API surface.
///
/// Three rings: public catalog/content, session-authenticated shopping, and
/// the admin subtree behind the admin-role middleware.
pub fn api_v1_routes(verifier: TokenVerifier) -> Router<Arc<AppState>> {
    let public = Router::new()
        .nest("/products", handlers::products::products_routes())
        .nest("/categories", handlers::products::categories_routes())
        .nest("/brands", handlers::products::brands_routes())
        .merge(handlers::reviews::reviews_public_routes())
        .merge(handlers::content::content_routes());

    let authed = Router::new()
        .nest("/cart", handlers::carts::carts_routes())
        .nest("/coupons", handlers::coupons::coupons_routes())
        .nest("/orders", handlers::orders::orders_routes())
        .nest("/payments", handlers::payments::payments_routes())
        .merge(handlers::reviews::reviews_authed_routes())
        .layer(axum::middleware::from_fn_with_state(
            verifier.clone(),
            auth::require_auth,
        ));

    let admin = handlers::admin::admin_routes().layer(axum::middleware::from_fn_with_state(
        verifier,
        auth::require_admin,
    ));

    public.merge(authed).nest("/admin", admin)
}
