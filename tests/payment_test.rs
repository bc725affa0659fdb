mod common;

use common::*;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use threadline_api::entities::{
    FulfillmentStatus, Order, PaymentStatus, ProductVariant,
};
use threadline_api::errors::ServiceError;
use threadline_api::services::payments::VerifyPaymentInput;
use uuid::Uuid;

#[tokio::test]
async fn online_order_defers_stock_until_verification() {
    let app = setup().await;
    let seeded = seed_product(&app.db, "wool-coat", 5000, 3).await;
    let user_id = Uuid::new_v4();
    app.cart
        .add_item(user_id, seeded.variant_id, 1)
        .await
        .unwrap();

    let initiation = app
        .payments
        .create_payment_order(user_id, Some("asha@example.com".into()), place_order_input(None))
        .await
        .unwrap();
    assert_eq!(initiation.amount, 5900); // 5000 + 18% tax, free shipping
    assert!(initiation.gateway_order_id.starts_with("gw_"));

    // Stock untouched, cart still full, order pending
    let variant = ProductVariant::find_by_id(seeded.variant_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(variant.stock, 3);
    assert_eq!(app.cart.get_cart(user_id).await.unwrap().items.len(), 1);
    let order = Order::find_by_id(initiation.order_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);

    // Verify with a good signature: settlement mirrors the COD path
    let detail = app
        .payments
        .verify_payment(
            user_id,
            VerifyPaymentInput {
                order_id: initiation.order_id,
                gateway_order_id: initiation.gateway_order_id.clone(),
                gateway_payment_id: "pay_123".into(),
                signature: sign(&initiation.gateway_order_id, "pay_123"),
            },
        )
        .await
        .unwrap();
    assert_eq!(detail.order.payment_status, PaymentStatus::Paid);
    assert_eq!(detail.order.fulfillment_status, FulfillmentStatus::Confirmed);
    assert_eq!(detail.order.gateway_payment_id.as_deref(), Some("pay_123"));

    let variant = ProductVariant::find_by_id(seeded.variant_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(variant.stock, 2);
    assert!(app.cart.get_cart(user_id).await.unwrap().items.is_empty());
}

#[tokio::test]
async fn verification_is_idempotent() {
    let app = setup().await;
    let seeded = seed_product(&app.db, "linen-trousers", 2200, 4).await;
    let user_id = Uuid::new_v4();
    app.cart
        .add_item(user_id, seeded.variant_id, 1)
        .await
        .unwrap();

    let initiation = app
        .payments
        .create_payment_order(user_id, None, place_order_input(None))
        .await
        .unwrap();
    let input = VerifyPaymentInput {
        order_id: initiation.order_id,
        gateway_order_id: initiation.gateway_order_id.clone(),
        gateway_payment_id: "pay_777".into(),
        signature: sign(&initiation.gateway_order_id, "pay_777"),
    };

    app.payments
        .verify_payment(user_id, input.clone())
        .await
        .unwrap();
    // The retry must not take stock twice
    app.payments.verify_payment(user_id, input).await.unwrap();

    let variant = ProductVariant::find_by_id(seeded.variant_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(variant.stock, 3);
}

#[tokio::test]
async fn bad_signature_marks_payment_failed() {
    let app = setup().await;
    let seeded = seed_product(&app.db, "canvas-tote", 1500, 5).await;
    let user_id = Uuid::new_v4();
    app.cart
        .add_item(user_id, seeded.variant_id, 1)
        .await
        .unwrap();

    let initiation = app
        .payments
        .create_payment_order(user_id, None, place_order_input(None))
        .await
        .unwrap();

    let err = app
        .payments
        .verify_payment(
            user_id,
            VerifyPaymentInput {
                order_id: initiation.order_id,
                gateway_order_id: initiation.gateway_order_id.clone(),
                gateway_payment_id: "pay_evil".into(),
                signature: "deadbeef".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PaymentFailed(_)));

    let order = Order::find_by_id(initiation.order_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Failed);

    // No stock was taken
    let variant = ProductVariant::find_by_id(seeded.variant_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(variant.stock, 5);

    // The audit trail records the failure under its own label
    let detail = app
        .orders
        .get_order(initiation.order_id, user_id, false)
        .await
        .unwrap();
    assert!(detail
        .timeline
        .iter()
        .any(|entry| entry.status == "payment_failed"));
}

#[tokio::test]
async fn failed_verification_can_be_retried_with_valid_signature() {
    let app = setup().await;
    let seeded = seed_product(&app.db, "cord-shirt", 2100, 3).await;
    let user_id = Uuid::new_v4();
    app.cart
        .add_item(user_id, seeded.variant_id, 1)
        .await
        .unwrap();

    let initiation = app
        .payments
        .create_payment_order(user_id, None, place_order_input(None))
        .await
        .unwrap();

    // First attempt arrives with a mangled signature
    let err = app
        .payments
        .verify_payment(
            user_id,
            VerifyPaymentInput {
                order_id: initiation.order_id,
                gateway_order_id: initiation.gateway_order_id.clone(),
                gateway_payment_id: "pay_retry".into(),
                signature: "deadbeef".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PaymentFailed(_)));

    // The retry with the real signature settles normally
    let detail = app
        .payments
        .verify_payment(
            user_id,
            VerifyPaymentInput {
                order_id: initiation.order_id,
                gateway_order_id: initiation.gateway_order_id.clone(),
                gateway_payment_id: "pay_retry".into(),
                signature: sign(&initiation.gateway_order_id, "pay_retry"),
            },
        )
        .await
        .unwrap();
    assert_eq!(detail.order.payment_status, PaymentStatus::Paid);

    let variant = ProductVariant::find_by_id(seeded.variant_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(variant.stock, 2);
}

#[tokio::test]
async fn oversold_verified_payment_cancels_and_refunds() {
    let app = setup().await;
    let seeded = seed_product(&app.db, "limited-sneaker", 8000, 1).await;
    let user_id = Uuid::new_v4();
    app.cart
        .add_item(user_id, seeded.variant_id, 1)
        .await
        .unwrap();

    let initiation = app
        .payments
        .create_payment_order(user_id, None, place_order_input(None))
        .await
        .unwrap();

    // The last unit sells elsewhere while the shopper is in the widget
    let variant = ProductVariant::find_by_id(seeded.variant_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let mut model: threadline_api::entities::product_variant::ActiveModel = variant.into();
    model.stock = Set(0);
    model.update(app.db.as_ref()).await.unwrap();

    let err = app
        .payments
        .verify_payment(
            user_id,
            VerifyPaymentInput {
                order_id: initiation.order_id,
                gateway_order_id: initiation.gateway_order_id.clone(),
                gateway_payment_id: "pay_late".into(),
                signature: sign(&initiation.gateway_order_id, "pay_late"),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    let order = Order::find_by_id(initiation.order_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Refunded);
    assert_eq!(order.fulfillment_status, FulfillmentStatus::Cancelled);
}

#[tokio::test]
async fn coupon_exhausted_before_verification_cancels_and_refunds() {
    let app = setup().await;
    seed_welcome_coupon(&app.db, Some(1)).await;
    let seeded = seed_product(&app.db, "quilted-jacket", 2500, 5).await;
    let shopper = Uuid::new_v4();
    app.cart
        .add_item(shopper, seeded.variant_id, 1)
        .await
        .unwrap();

    let initiation = app
        .payments
        .create_payment_order(shopper, None, place_order_input(Some("WELCOME10")))
        .await
        .unwrap();

    // Another shopper consumes the coupon's last use while the widget is open
    let rival = Uuid::new_v4();
    app.cart
        .add_item(rival, seeded.variant_id, 1)
        .await
        .unwrap();
    app.orders
        .place_cod_order(rival, None, place_order_input(Some("WELCOME10")))
        .await
        .unwrap();

    let err = app
        .payments
        .verify_payment(
            shopper,
            VerifyPaymentInput {
                order_id: initiation.order_id,
                gateway_order_id: initiation.gateway_order_id.clone(),
                gateway_payment_id: "pay_coupon".into(),
                signature: sign(&initiation.gateway_order_id, "pay_coupon"),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::CouponUsageExceeded(_)));

    // Not stranded pending: refunded, cancelled, payment id kept for
    // reconciliation, and the timeline says why
    let detail = app
        .orders
        .get_order(initiation.order_id, shopper, false)
        .await
        .unwrap();
    assert_eq!(detail.order.payment_status, PaymentStatus::Refunded);
    assert_eq!(detail.order.fulfillment_status, FulfillmentStatus::Cancelled);
    assert_eq!(detail.order.gateway_payment_id.as_deref(), Some("pay_coupon"));
    assert!(detail
        .timeline
        .iter()
        .any(|entry| entry.status == "cancelled"
            && entry.message.contains("Coupon was exhausted")));

    // The failed settlement rolled back its stock decrement; only the
    // rival's order took a unit
    let variant = ProductVariant::find_by_id(seeded.variant_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(variant.stock, 4);
}
