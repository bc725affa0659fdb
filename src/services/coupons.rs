use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::coupon::{self, DiscountType};
use crate::entities::{Coupon, CouponModel};
use crate::errors::ServiceError;

/// Coupon validation and redemption.
///
/// Validation is read-only and safe to call from quote endpoints; redemption
/// happens inside the order transaction and enforces the usage limit with a
/// conditional update.
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCouponInput {
    #[validate(length(min = 3, max = 32))]
    pub code: String,
    pub discount_type: DiscountType,
    #[validate(range(min = 1))]
    pub value: i64,
    #[validate(range(min = 0))]
    pub min_order_value: i64,
    pub max_discount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCouponInput {
    pub value: Option<i64>,
    pub min_order_value: Option<i64>,
    pub max_discount: Option<Option<i64>>,
    pub usage_limit: Option<Option<i32>>,
    pub is_active: Option<bool>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Discount for `coupon` against `subtotal`, in whole rupees.
///
/// Percentage discounts round half-away-from-zero and respect
/// `max_discount`; either kind is clamped to the subtotal.
pub fn discount_for(coupon: &CouponModel, subtotal: i64) -> i64 {
    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            let pct = Decimal::from(subtotal) * Decimal::from(coupon.value) / Decimal::from(100);
            pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
                .unwrap_or(0)
        }
        DiscountType::Fixed => coupon.value,
    };
    let capped = match coupon.max_discount {
        Some(cap) => raw.min(cap),
        None => raw,
    };
    capped.clamp(0, subtotal)
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Look up a coupon by code (case-insensitive via uppercase storage).
    async fn find_by_code<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
    ) -> Result<Option<CouponModel>, ServiceError> {
        Ok(Coupon::find()
            .filter(coupon::Column::Code.eq(code.trim().to_uppercase()))
            .one(conn)
            .await?)
    }

    /// Validate a coupon against the current cart subtotal and return the
    /// coupon with the discount it would grant. Does not consume usage.
    #[instrument(skip(self, conn))]
    pub async fn validate<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
        subtotal: i64,
    ) -> Result<(CouponModel, i64), ServiceError> {
        let coupon = self
            .find_by_code(conn, code)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {}", code)))?;

        let now = Utc::now();
        if !coupon.is_active || now < coupon.valid_from || now > coupon.valid_until {
            return Err(ServiceError::ValidationError(format!(
                "Coupon {} is not currently valid",
                coupon.code
            )));
        }
        if let Some(limit) = coupon.usage_limit {
            if coupon.used_count >= limit {
                return Err(ServiceError::CouponUsageExceeded(coupon.code.clone()));
            }
        }
        if subtotal < coupon.min_order_value {
            return Err(ServiceError::CouponBelowMinimum(format!(
                "{} requires a minimum order of {}",
                coupon.code, coupon.min_order_value
            )));
        }

        let discount = discount_for(&coupon, subtotal);
        Ok((coupon, discount))
    }

    /// Convenience wrapper over the service's own connection.
    pub async fn validate_for_subtotal(
        &self,
        code: &str,
        subtotal: i64,
    ) -> Result<(CouponModel, i64), ServiceError> {
        self.validate(self.db.as_ref(), code, subtotal).await
    }

    /// Consume one use of the coupon inside the caller's transaction. The
    /// usage-limit check is part of the UPDATE so two concurrent orders
    /// cannot both take the last slot.
    pub async fn redeem<C: ConnectionTrait>(
        &self,
        conn: &C,
        coupon: &CouponModel,
    ) -> Result<(), ServiceError> {
        let mut update = Coupon::update_many()
            .col_expr(
                coupon::Column::UsedCount,
                Expr::col(coupon::Column::UsedCount).add(1),
            )
            .col_expr(coupon::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(coupon::Column::Id.eq(coupon.id));
        if let Some(limit) = coupon.usage_limit {
            update = update.filter(coupon::Column::UsedCount.lt(limit));
        }

        let result = update.exec(conn).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::CouponUsageExceeded(coupon.code.clone()));
        }
        Ok(())
    }

    /// Fetch by code and consume one use, inside the caller's transaction.
    pub async fn redeem_by_code<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
    ) -> Result<(), ServiceError> {
        let coupon = self
            .find_by_code(conn, code)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {}", code)))?;
        self.redeem(conn, &coupon).await
    }

    // Admin operations

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: CreateCouponInput) -> Result<CouponModel, ServiceError> {
        input.validate()?;
        if input.valid_until <= input.valid_from {
            return Err(ServiceError::ValidationError(
                "valid_until must be after valid_from".to_string(),
            ));
        }
        if input.discount_type == DiscountType::Percentage && input.value > 100 {
            return Err(ServiceError::ValidationError(
                "percentage value cannot exceed 100".to_string(),
            ));
        }

        let code = input.code.trim().to_uppercase();
        if self.find_by_code(self.db.as_ref(), &code).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon {} already exists",
                code
            )));
        }

        let now = Utc::now();
        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.clone()),
            discount_type: Set(input.discount_type),
            value: Set(input.value),
            min_order_value: Set(input.min_order_value),
            max_discount: Set(input.max_discount),
            usage_limit: Set(input.usage_limit),
            used_count: Set(0),
            is_active: Set(true),
            valid_from: Set(input.valid_from),
            valid_until: Set(input.valid_until),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(self.db.as_ref()).await?;
        info!(code = %created.code, "coupon created");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateCouponInput,
    ) -> Result<CouponModel, ServiceError> {
        let existing = Coupon::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {}", id)))?;

        let mut model: coupon::ActiveModel = existing.into();
        if let Some(value) = input.value {
            model.value = Set(value);
        }
        if let Some(min) = input.min_order_value {
            model.min_order_value = Set(min);
        }
        if let Some(max) = input.max_discount {
            model.max_discount = Set(max);
        }
        if let Some(limit) = input.usage_limit {
            model.usage_limit = Set(limit);
        }
        if let Some(active) = input.is_active {
            model.is_active = Set(active);
        }
        if let Some(from) = input.valid_from {
            model.valid_from = Set(from);
        }
        if let Some(until) = input.valid_until {
            model.valid_until = Set(until);
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(self.db.as_ref()).await?)
    }

    pub async fn list(&self, page: u64, per_page: u64) -> Result<(Vec<CouponModel>, u64), ServiceError> {
        let paginator = Coupon::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .paginate(self.db.as_ref(), per_page.clamp(1, 100));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Coupon::delete_by_id(id).exec(self.db.as_ref()).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Coupon {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn percentage_coupon(value: i64, max_discount: Option<i64>) -> CouponModel {
        let now = Utc::now();
        CouponModel {
            id: Uuid::new_v4(),
            code: "WELCOME10".into(),
            discount_type: DiscountType::Percentage,
            value,
            min_order_value: 999,
            max_discount,
            usage_limit: None,
            used_count: 0,
            is_active: true,
            valid_from: now - chrono::Duration::days(1),
            valid_until: now + chrono::Duration::days(1),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn percentage_discount_basic() {
        let coupon = percentage_coupon(10, Some(500));
        assert_eq!(discount_for(&coupon, 2500), 250);
    }

    #[test]
    fn percentage_discount_capped() {
        let coupon = percentage_coupon(10, Some(500));
        assert_eq!(discount_for(&coupon, 10000), 500);
    }

    #[test]
    fn percentage_discount_rounds() {
        // 10% of 2505 = 250.5 -> 251
        let coupon = percentage_coupon(10, None);
        assert_eq!(discount_for(&coupon, 2505), 251);
    }

    #[test]
    fn fixed_discount_clamped_to_subtotal() {
        let mut coupon = percentage_coupon(0, None);
        coupon.discount_type = DiscountType::Fixed;
        coupon.value = 1000;
        assert_eq!(discount_for(&coupon, 600), 600);
        assert_eq!(discount_for(&coupon, 1500), 1000);
    }
}
