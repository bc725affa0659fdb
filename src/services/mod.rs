pub mod cart;
pub mod catalog;
pub mod content;
pub mod coupons;
pub mod order_status;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod reviews;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use content::ContentService;
pub use coupons::CouponService;
pub use order_status::OrderStatusService;
pub use orders::OrderService;
pub use payments::PaymentService;
pub use pricing::{PriceBreakdown, PricingService, ShippingTier};
pub use reviews::ReviewService;
