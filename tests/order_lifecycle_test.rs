mod common;

use common::*;
use sea_orm::EntityTrait;
use threadline_api::entities::{FulfillmentStatus, PaymentStatus, ProductVariant};
use threadline_api::errors::ServiceError;
use threadline_api::services::order_status::UpdateStatusInput;
use uuid::Uuid;

async fn place_test_order(app: &TestApp, slug: &str, stock: i32) -> (Uuid, Uuid, Uuid) {
    let seeded = seed_product(&app.db, slug, 2500, stock).await;
    let user_id = Uuid::new_v4();
    app.cart
        .add_item(user_id, seeded.variant_id, 1)
        .await
        .unwrap();
    let detail = app
        .orders
        .place_cod_order(user_id, Some("asha@example.com".into()), place_order_input(None))
        .await
        .unwrap();
    (detail.order.id, user_id, seeded.variant_id)
}

#[tokio::test]
async fn status_updates_append_to_the_timeline() {
    let app = setup().await;
    let (order_id, _, _) = place_test_order(&app, "status-shirt", 5).await;

    let detail = app
        .order_status
        .update_status(
            order_id,
            UpdateStatusInput {
                status: FulfillmentStatus::Confirmed,
                message: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(detail.order.fulfillment_status, FulfillmentStatus::Confirmed);

    let detail = app
        .order_status
        .update_status(
            order_id,
            UpdateStatusInput {
                status: FulfillmentStatus::Shipped,
                message: Some("Handed to BlueDart, AWB 12345".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(detail.order.fulfillment_status, FulfillmentStatus::Shipped);

    // placed + confirmed + shipped
    assert_eq!(detail.timeline.len(), 3);
    assert_eq!(detail.timeline[2].message, "Handed to BlueDart, AWB 12345");
    assert_eq!(detail.timeline[2].status, "shipped");
}

#[tokio::test]
async fn cod_delivery_collects_payment() {
    let app = setup().await;
    let (order_id, _, _) = place_test_order(&app, "delivery-kurta", 5).await;

    let detail = app
        .order_status
        .update_status(
            order_id,
            UpdateStatusInput {
                status: FulfillmentStatus::Delivered,
                message: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(detail.order.fulfillment_status, FulfillmentStatus::Delivered);
    assert_eq!(detail.order.payment_status, PaymentStatus::Paid);
    assert!(detail
        .timeline
        .iter()
        .any(|t| t.message == "Cash collected on delivery"));
}

#[tokio::test]
async fn cancellation_restocks_before_shipping_only() {
    let app = setup().await;
    let (order_id, user_id, variant_id) = place_test_order(&app, "cancel-dress", 5).await;

    let variant = ProductVariant::find_by_id(variant_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(variant.stock, 4);

    let detail = app
        .orders
        .cancel_order(order_id, user_id, false)
        .await
        .unwrap();
    assert_eq!(detail.order.fulfillment_status, FulfillmentStatus::Cancelled);

    let variant = ProductVariant::find_by_id(variant_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(variant.stock, 5);

    // A delivered order cannot be cancelled
    let (order_id, user_id, _) = place_test_order(&app, "delivered-saree", 5).await;
    app.order_status
        .update_status(
            order_id,
            UpdateStatusInput {
                status: FulfillmentStatus::Delivered,
                message: None,
            },
        )
        .await
        .unwrap();
    let err = app
        .orders
        .cancel_order(order_id, user_id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn user_order_history_is_paged_and_scoped() {
    let app = setup().await;
    let seeded = seed_product(&app.db, "history-tee", 1000, 20).await;
    let user_id = Uuid::new_v4();

    for _ in 0..3 {
        app.cart
            .add_item(user_id, seeded.variant_id, 1)
            .await
            .unwrap();
        app.orders
            .place_cod_order(user_id, None, place_order_input(None))
            .await
            .unwrap();
    }
    // Another user's order should not appear
    let other = Uuid::new_v4();
    app.cart.add_item(other, seeded.variant_id, 1).await.unwrap();
    app.orders
        .place_cod_order(other, None, place_order_input(None))
        .await
        .unwrap();

    let (orders, total) = app.orders.list_for_user(user_id, 1, 2).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(orders.len(), 2);

    let (all, total_all) = app
        .orders
        .list_all(Default::default())
        .await
        .unwrap();
    assert_eq!(total_all, 4);
    assert_eq!(all.len(), 4);
}
