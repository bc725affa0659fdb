use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    order, order_item, product, review, FulfillmentStatus, Order, OrderItem, Product, Review,
    ReviewModel,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Product reviews with aggregate maintenance.
///
/// One review per (product, user). Aggregates on the product row count
/// approved reviews only and are recomputed in the same transaction as any
/// change that affects them.
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitReviewInput {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        Self { db, events }
    }

    #[instrument(skip(self, input), fields(product_id = %product_id, user_id = %user_id))]
    pub async fn submit(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        input: SubmitReviewInput,
    ) -> Result<ReviewModel, ServiceError> {
        input.validate()?;

        let product = Product::find_by_id(product_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {}", product_id)))?;
        if !product.is_active {
            return Err(ServiceError::InvalidOperation(
                "product is no longer available".into(),
            ));
        }

        let existing = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .filter(review::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?;
        if existing.is_some() {
            return Err(ServiceError::AlreadyReviewed(product.name));
        }

        let verified = self.has_delivered_purchase(user_id, product_id).await?;

        let txn = self.db.begin().await?;
        let created = review::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            user_id: Set(user_id),
            rating: Set(input.rating),
            title: Set(input.title),
            body: Set(input.body),
            is_verified_purchase: Set(verified),
            is_approved: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
        recompute_aggregates(&txn, product_id).await?;
        txn.commit().await?;

        info!(review_id = %created.id, verified, "review submitted");
        self.events
            .send_or_log(Event::ReviewSubmitted {
                review_id: created.id,
                product_id,
            })
            .await;
        Ok(created)
    }

    /// Approved reviews for a product page, newest first.
    pub async fn list_for_product(
        &self,
        product_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ReviewModel>, u64), ServiceError> {
        let paginator = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .filter(review::Column::IsApproved.eq(true))
            .order_by_desc(review::Column::CreatedAt)
            .paginate(self.db.as_ref(), per_page.clamp(1, 100));
        let total = paginator.num_items().await?;
        let reviews = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((reviews, total))
    }

    /// Moderation queue: every review regardless of approval state,
    /// optionally narrowed to one product, newest first.
    pub async fn list_all(
        &self,
        product_id: Option<Uuid>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ReviewModel>, u64), ServiceError> {
        let mut query = Review::find();
        if let Some(product_id) = product_id {
            query = query.filter(review::Column::ProductId.eq(product_id));
        }
        let paginator = query
            .order_by_desc(review::Column::CreatedAt)
            .paginate(self.db.as_ref(), per_page.clamp(1, 100));
        let total = paginator.num_items().await?;
        let reviews = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((reviews, total))
    }

    /// Moderation toggle; aggregates follow in the same transaction.
    #[instrument(skip(self))]
    pub async fn set_approved(
        &self,
        review_id: Uuid,
        approved: bool,
    ) -> Result<ReviewModel, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = Review::find_by_id(review_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {}", review_id)))?;
        let product_id = existing.product_id;

        let mut model: review::ActiveModel = existing.into();
        model.is_approved = Set(approved);
        let updated = model.update(&txn).await?;
        recompute_aggregates(&txn, product_id).await?;
        txn.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, review_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let existing = Review::find_by_id(review_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {}", review_id)))?;
        let product_id = existing.product_id;

        Review::delete_by_id(review_id).exec(&txn).await?;
        recompute_aggregates(&txn, product_id).await?;
        txn.commit().await?;
        Ok(())
    }

    /// True when the user has a delivered order containing this product.
    async fn has_delivered_purchase(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let delivered_ids: Vec<Uuid> = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::FulfillmentStatus.eq(FulfillmentStatus::Delivered))
            .select_only()
            .column(order::Column::Id)
            .into_tuple()
            .all(self.db.as_ref())
            .await?;
        if delivered_ids.is_empty() {
            return Ok(false);
        }
        let count = OrderItem::find()
            .filter(order_item::Column::OrderId.is_in(delivered_ids))
            .filter(order_item::Column::ProductId.eq(product_id))
            .count(self.db.as_ref())
            .await?;
        Ok(count > 0)
    }
}

/// Recompute the product's rating average (stored as hundredths) and
/// approved-review count.
async fn recompute_aggregates<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<(), ServiceError> {
    let ratings: Vec<i32> = Review::find()
        .filter(review::Column::ProductId.eq(product_id))
        .filter(review::Column::IsApproved.eq(true))
        .select_only()
        .column(review::Column::Rating)
        .into_tuple()
        .all(conn)
        .await?;

    let count = ratings.len() as i64;
    let avg_hundredths = if count == 0 {
        0
    } else {
        let sum: i64 = ratings.iter().map(|r| *r as i64).sum();
        // round half up on the final digit
        (sum * 100 + count / 2) / count
    };

    let product = Product::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {}", product_id)))?;
    let mut model: product::ActiveModel = product.into();
    model.rating_avg_hundredths = Set(avg_hundredths);
    model.review_count = Set(count as i32);
    model.updated_at = Set(Utc::now());
    model.update(conn).await?;
    Ok(())
}
