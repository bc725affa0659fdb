mod common;

use chrono::{Duration, Utc};
use common::*;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use threadline_api::entities::{coupon, Coupon, DiscountType};
use threadline_api::errors::ServiceError;
use uuid::Uuid;

#[tokio::test]
async fn valid_coupon_returns_discount() {
    let app = setup().await;
    seed_welcome_coupon(&app.db, None).await;

    let (coupon, discount) = app
        .coupons
        .validate_for_subtotal("WELCOME10", 2500)
        .await
        .unwrap();
    assert_eq!(coupon.code, "WELCOME10");
    assert_eq!(discount, 250);
}

#[tokio::test]
async fn coupon_code_is_case_insensitive() {
    let app = setup().await;
    seed_welcome_coupon(&app.db, None).await;

    let (_, discount) = app
        .coupons
        .validate_for_subtotal("welcome10", 2500)
        .await
        .unwrap();
    assert_eq!(discount, 250);
}

#[tokio::test]
async fn discount_respects_the_cap() {
    let app = setup().await;
    seed_welcome_coupon(&app.db, None).await;

    // 10% of 20000 would be 2000; cap is 500
    let (_, discount) = app
        .coupons
        .validate_for_subtotal("WELCOME10", 20000)
        .await
        .unwrap();
    assert_eq!(discount, 500);
}

#[tokio::test]
async fn below_minimum_is_rejected() {
    let app = setup().await;
    seed_welcome_coupon(&app.db, None).await;

    let err = app
        .coupons
        .validate_for_subtotal("WELCOME10", 500)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::CouponBelowMinimum(_)));
}

#[tokio::test]
async fn unknown_and_expired_coupons_are_rejected() {
    let app = setup().await;

    let err = app
        .coupons
        .validate_for_subtotal("NOPE", 2500)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let now = Utc::now();
    coupon::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set("EXPIRED".into()),
        discount_type: Set(DiscountType::Fixed),
        value: Set(100),
        min_order_value: Set(0),
        max_discount: Set(None),
        usage_limit: Set(None),
        used_count: Set(0),
        is_active: Set(true),
        valid_from: Set(now - Duration::days(30)),
        valid_until: Set(now - Duration::days(1)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(app.db.as_ref())
    .await
    .unwrap();

    let err = app
        .coupons
        .validate_for_subtotal("EXPIRED", 2500)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn exhausted_coupon_is_rejected() {
    let app = setup().await;
    let id = seed_welcome_coupon(&app.db, Some(1)).await;

    // Burn the single use
    let existing = Coupon::find_by_id(id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    app.coupons.redeem(app.db.as_ref(), &existing).await.unwrap();

    let err = app
        .coupons
        .validate_for_subtotal("WELCOME10", 2500)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::CouponUsageExceeded(_)));

    // A second redeem cannot slip past the limit either
    let err = app
        .coupons
        .redeem(app.db.as_ref(), &existing)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::CouponUsageExceeded(_)));
}

#[tokio::test]
async fn admin_create_validates_and_uppercases() {
    let app = setup().await;
    let now = Utc::now();

    let created = app
        .coupons
        .create(threadline_api::services::coupons::CreateCouponInput {
            code: "festive20".into(),
            discount_type: DiscountType::Percentage,
            value: 20,
            min_order_value: 1500,
            max_discount: Some(1000),
            usage_limit: Some(200),
            valid_from: now,
            valid_until: now + Duration::days(14),
        })
        .await
        .unwrap();
    assert_eq!(created.code, "FESTIVE20");

    // Duplicate code is a conflict
    let err = app
        .coupons
        .create(threadline_api::services::coupons::CreateCouponInput {
            code: "FESTIVE20".into(),
            discount_type: DiscountType::Fixed,
            value: 100,
            min_order_value: 0,
            max_discount: None,
            usage_limit: None,
            valid_from: now,
            valid_until: now + Duration::days(1),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Percentage over 100 is rejected
    let err = app
        .coupons
        .create(threadline_api::services::coupons::CreateCouponInput {
            code: "TOOMUCH".into(),
            discount_type: DiscountType::Percentage,
            value: 150,
            min_order_value: 0,
            max_discount: None,
            usage_limit: None,
            valid_from: now,
            valid_until: now + Duration::days(1),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}
