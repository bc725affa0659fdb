mod common;

use common::*;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use threadline_api::entities::{
    Coupon, FulfillmentStatus, Order, PaymentMethod, PaymentStatus, Product, ProductVariant,
};
use threadline_api::errors::ServiceError;
use uuid::Uuid;

#[tokio::test]
async fn cod_checkout_with_coupon_settles_everything() {
    let app = setup().await;
    let seeded = seed_product(&app.db, "linen-shirt", 2500, 5).await;
    let coupon_id = seed_welcome_coupon(&app.db, Some(100)).await;
    let user_id = Uuid::new_v4();

    app.cart
        .add_item(user_id, seeded.variant_id, 1)
        .await
        .unwrap();

    let detail = app
        .orders
        .place_cod_order(
            user_id,
            Some("asha@example.com".into()),
            place_order_input(Some("WELCOME10")),
        )
        .await
        .unwrap();

    // 2500 - 10% = 2250, free shipping over 1999, 18% tax = 405
    assert_eq!(detail.order.subtotal, 2500);
    assert_eq!(detail.order.discount, 250);
    assert_eq!(detail.order.shipping, 0);
    assert_eq!(detail.order.tax, 405);
    assert_eq!(detail.order.total, 2655);
    assert_eq!(detail.order.payment_method, PaymentMethod::Cod);
    assert_eq!(detail.order.payment_status, PaymentStatus::Pending);
    assert_eq!(detail.order.fulfillment_status, FulfillmentStatus::Pending);
    assert_eq!(detail.order.coupon_code.as_deref(), Some("WELCOME10"));
    assert!(detail.order.order_number.starts_with("TL-"));

    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].unit_price, 2500);
    assert_eq!(detail.items[0].quantity, 1);
    assert_eq!(detail.timeline.len(), 1);
    assert_eq!(detail.timeline[0].message, "Order placed");

    // Stock taken and sold count bumped
    let variant = ProductVariant::find_by_id(seeded.variant_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(variant.stock, 4);
    let product = Product::find_by_id(seeded.product_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.sold_count, 1);

    // Cart cleared, coupon consumed
    let cart = app.cart.get_cart(user_id).await.unwrap();
    assert!(cart.items.is_empty());
    let coupon = Coupon::find_by_id(coupon_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(coupon.used_count, 1);
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let app = setup().await;
    let user_id = Uuid::new_v4();

    let err = app
        .orders
        .place_cod_order(user_id, None, place_order_input(None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::CartEmpty));
}

#[tokio::test]
async fn oversell_rolls_back_the_whole_order() {
    let app = setup().await;
    let seeded = seed_product(&app.db, "silk-scarf", 1200, 2).await;
    let user_id = Uuid::new_v4();
    app.cart
        .add_item(user_id, seeded.variant_id, 2)
        .await
        .unwrap();

    // Someone else takes the stock between add-to-cart and checkout
    let variant = ProductVariant::find_by_id(seeded.variant_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let mut model: threadline_api::entities::product_variant::ActiveModel = variant.into();
    model.stock = Set(1);
    model.update(app.db.as_ref()).await.unwrap();

    let err = app
        .orders
        .place_cod_order(user_id, None, place_order_input(None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // Nothing committed: no order rows, stock untouched, cart intact
    let orders = Order::find().all(app.db.as_ref()).await.unwrap();
    assert!(orders.is_empty());
    let variant = ProductVariant::find_by_id(seeded.variant_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(variant.stock, 1);
    let cart = app.cart.get_cart(user_id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
}

#[tokio::test]
async fn order_snapshot_survives_catalog_edits() {
    let app = setup().await;
    let seeded = seed_product(&app.db, "denim-jacket", 3999, 3).await;
    let user_id = Uuid::new_v4();
    app.cart
        .add_item(user_id, seeded.variant_id, 1)
        .await
        .unwrap();

    let detail = app
        .orders
        .place_cod_order(user_id, None, place_order_input(None))
        .await
        .unwrap();
    assert_eq!(detail.items[0].unit_price, 3999);

    // Reprice the product after the sale
    let product = Product::find_by_id(seeded.product_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let mut model: threadline_api::entities::product::ActiveModel = product.into();
    model.base_price = Set(2999);
    model.update(app.db.as_ref()).await.unwrap();

    let reloaded = app
        .orders
        .get_order(detail.order.id, user_id, false)
        .await
        .unwrap();
    assert_eq!(reloaded.items[0].unit_price, 3999);
    assert_eq!(reloaded.order.total, detail.order.total);
}

#[tokio::test]
async fn small_order_pays_shipping_and_orders_are_private() {
    let app = setup().await;
    let seeded = seed_product(&app.db, "cotton-socks", 299, 10).await;
    let user_id = Uuid::new_v4();
    app.cart
        .add_item(user_id, seeded.variant_id, 2)
        .await
        .unwrap();

    let detail = app
        .orders
        .place_cod_order(user_id, None, place_order_input(None))
        .await
        .unwrap();
    // 598 subtotal, under the 1999 threshold
    assert_eq!(detail.order.shipping, 99);

    // Another customer cannot see the order
    let err = app
        .orders
        .get_order(detail.order.id, Uuid::new_v4(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
