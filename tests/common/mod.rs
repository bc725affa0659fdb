#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    Schema, Set,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use threadline_api::entities::{
    banner, blog_post, brand, cart_item, category, coupon, order, order_item, order_timeline,
    product, product_image, product_variant, review, DiscountType,
};
use threadline_api::events::{process_events, EventSender};
use threadline_api::gateway::{compute_signature, GatewayError, GatewayOrder, PaymentGateway};
use threadline_api::notifications::NoopMailer;
use threadline_api::services::pricing::PricingConfig;
use threadline_api::services::{
    CartService, CatalogService, ContentService, CouponService, OrderService, OrderStatusService,
    PaymentService, PricingService, ReviewService,
};

pub const GATEWAY_SECRET: &str = "test-gateway-secret";

/// Gateway double: orders always register, signatures use the test secret.
pub struct StubGateway;

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder, GatewayError> {
        Ok(GatewayOrder {
            id: format!("gw_{}", receipt),
            amount: amount * 100,
            currency: "INR".to_string(),
        })
    }

    fn verify_signature(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
        threadline_api::gateway::verify_signature(
            GATEWAY_SECRET,
            gateway_order_id,
            payment_id,
            signature,
        )
    }
}

/// Sign like the gateway would after a successful checkout.
pub fn sign(gateway_order_id: &str, payment_id: &str) -> String {
    compute_signature(GATEWAY_SECRET, gateway_order_id, payment_id)
}

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
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

/// Fresh in-memory database with the full schema, plus the service stack
/// wired the way the binary wires it.
pub async fn setup() -> TestApp {
    // A single pooled connection keeps the in-memory database alive and
    // shared for the whole test
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.unwrap();
    create_schema(&db).await;
    let db = Arc::new(db);

    let (tx, rx) = mpsc::channel(64);
    let events = EventSender::new(tx);
    tokio::spawn(process_events(rx, Arc::new(NoopMailer)));

    let pricing = PricingService::new(PricingConfig::new(dec!(0.18), 1999, 99, 199, 299));
    let catalog = CatalogService::new(db.clone());
    let cart = CartService::new(db.clone());
    let coupons = CouponService::new(db.clone());
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
        Arc::new(StubGateway),
        events.clone(),
    );
    let order_status = OrderStatusService::new(db.clone(), orders.clone(), events.clone());
    let reviews = ReviewService::new(db.clone(), events);
    let content = ContentService::new(db.clone());

    TestApp {
        db,
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

async fn create_schema(db: &DatabaseConnection) {
    let schema = Schema::new(DbBackend::Sqlite);
    let backend = db.get_database_backend();
    let statements = [
        schema.create_table_from_entity(category::Entity),
        schema.create_table_from_entity(brand::Entity),
        schema.create_table_from_entity(product::Entity),
        schema.create_table_from_entity(product_variant::Entity),
        schema.create_table_from_entity(product_image::Entity),
        schema.create_table_from_entity(cart_item::Entity),
        schema.create_table_from_entity(coupon::Entity),
        schema.create_table_from_entity(order::Entity),
        schema.create_table_from_entity(order_item::Entity),
        schema.create_table_from_entity(order_timeline::Entity),
        schema.create_table_from_entity(review::Entity),
        schema.create_table_from_entity(banner::Entity),
        schema.create_table_from_entity(blog_post::Entity),
    ];
    for stmt in statements {
        db.execute(backend.build(&stmt)).await.unwrap();
    }
}

pub struct SeededProduct {
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub category_id: Uuid,
}

/// One active product with a single variant at the given price and stock.
pub async fn seed_product(
    db: &DatabaseConnection,
    slug: &str,
    base_price: i64,
    stock: i32,
) -> SeededProduct {
    let now = Utc::now();
    let category_id = Uuid::new_v4();
    category::ActiveModel {
        id: Set(category_id),
        name: Set(format!("Category for {}", slug)),
        slug: Set(format!("cat-{}", slug)),
        parent_id: Set(None),
        is_active: Set(true),
        created_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();

    let product_id = Uuid::new_v4();
    product::ActiveModel {
        id: Set(product_id),
        name: Set(format!("Product {}", slug)),
        slug: Set(slug.to_string()),
        description: Set("A test garment".to_string()),
        gender: Set("unisex".to_string()),
        base_price: Set(base_price),
        compare_at_price: Set(None),
        category_id: Set(category_id),
        brand_id: Set(None),
        is_active: Set(true),
        is_featured: Set(false),
        is_new_arrival: Set(false),
        is_bestseller: Set(false),
        view_count: Set(0),
        sold_count: Set(0),
        rating_avg_hundredths: Set(0),
        review_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();

    let variant_id = Uuid::new_v4();
    product_variant::ActiveModel {
        id: Set(variant_id),
        product_id: Set(product_id),
        size: Set("M".to_string()),
        color: Set("indigo".to_string()),
        sku: Set(format!("SKU-{}", slug.to_uppercase())),
        stock: Set(stock),
        price_delta: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();

    SeededProduct {
        product_id,
        variant_id,
        category_id,
    }
}

/// A 10%-off coupon capped at 500 with a 999 minimum, valid now.
pub async fn seed_welcome_coupon(db: &DatabaseConnection, usage_limit: Option<i32>) -> Uuid {
    let now = Utc::now();
    let id = Uuid::new_v4();
    coupon::ActiveModel {
        id: Set(id),
        code: Set("WELCOME10".to_string()),
        discount_type: Set(DiscountType::Percentage),
        value: Set(10),
        min_order_value: Set(999),
        max_discount: Set(Some(500)),
        usage_limit: Set(usage_limit),
        used_count: Set(0),
        is_active: Set(true),
        valid_from: Set(now - chrono::Duration::days(1)),
        valid_until: Set(now + chrono::Duration::days(30)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub fn test_address() -> threadline_api::services::orders::ShippingAddress {
    threadline_api::services::orders::ShippingAddress {
        name: "Asha Mehta".to_string(),
        phone: "9876543210".to_string(),
        line1: "14 Linen Lane".to_string(),
        line2: None,
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        pincode: "560001".to_string(),
    }
}

pub fn place_order_input(
    coupon_code: Option<&str>,
) -> threadline_api::services::orders::PlaceOrderInput {
    threadline_api::services::orders::PlaceOrderInput {
        address: test_address(),
        coupon_code: coupon_code.map(|c| c.to_string()),
        shipping_tier: threadline_api::services::pricing::ShippingTier::Standard,
    }
}
