pub mod admin;
pub mod carts;
pub mod common;
pub mod content;
pub mod coupons;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::gateway::PaymentGateway;
use crate::services::{
    pricing::PricingConfig, CartService, CatalogService, ContentService, CouponService,
    OrderService, OrderStatusService, PaymentService, PricingService, ReviewService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: CatalogService,
    pub cart: CartService,
    pub coupons: CouponService,
    pub pricing: PricingService,
    pub orders: OrderService,
    pub payments: PaymentService,
    pub order_status: OrderStatusService,
    pub reviews: ReviewService,
    pub content: ContentService,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        config: &AppConfig,
        gateway: Arc<dyn PaymentGateway>,
        events: EventSender,
    ) -> Self {
        let catalog = CatalogService::new(db.clone());
        let cart = CartService::new(db.clone());
        let coupons = CouponService::new(db.clone());
        let pricing = PricingService::new(PricingConfig::from(config));
        let orders = OrderService::new(
            db.clone(),
            cart.clone(),
            coupons.clone(),
            pricing.clone(),
            events.clone(),
        );
        let payments = PaymentService::new(
            db.clone(),
            orders.clone(),
            cart.clone(),
            coupons.clone(),
            gateway,
            events.clone(),
        );
        let order_status = OrderStatusService::new(db.clone(), orders.clone(), events.clone());
        let reviews = ReviewService::new(db.clone(), events);
        let content = ContentService::new(db);

        Self {
            catalog,
            cart,
            coupons,
            pricing,
            orders,
            payments,
            order_status,
            reviews,
            content,
        }
    }
}
