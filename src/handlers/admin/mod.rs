//! Admin-only endpoints. The whole subtree sits behind the admin-role
//! middleware; handlers here never re-check the role.

pub mod content;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod reviews;

use crate::AppState;
use axum::Router;
use std::sync::Arc;

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/products", products::routes())
        .nest("/orders", orders::routes())
        .nest("/coupons", coupons::routes())
        .nest("/reviews", reviews::routes())
        .merge(content::routes())
}
