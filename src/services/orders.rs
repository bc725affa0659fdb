use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    order, order_item, order_timeline, product, product_variant, FulfillmentStatus, Order,
    OrderItem, OrderItemModel, OrderModel, OrderTimeline, OrderTimelineModel, PaymentMethod,
    PaymentStatus, Product, ProductVariant,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::cart::{CartLine, CartService};
use crate::services::coupons::CouponService;
use crate::services::pricing::{PricingService, ShippingTier};

/// Order creation and retrieval.
///
/// Cash-on-delivery orders settle (stock, coupon, cart) in one transaction
/// at placement. Online orders are created pending and settle when the
/// payment service verifies the gateway signature.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    cart: CartService,
    coupons: CouponService,
    pricing: PricingService,
    events: EventSender,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 10, max = 15))]
    pub phone: String,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 6, max = 6))]
    pub pincode: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlaceOrderInput {
    #[validate]
    pub address: ShippingAddress,
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub shipping_tier: ShippingTier,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
    pub timeline: Vec<OrderTimelineModel>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OrderListFilters {
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Generate a human-facing order reference, e.g. `TL-20250301-A1B2C3`.
pub fn generate_order_number() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("TL-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

/// Append an entry to the order's audit trail.
pub(crate) async fn append_timeline<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    status: &str,
    message: &str,
) -> Result<(), ServiceError> {
    order_timeline::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        status: Set(status.to_string()),
        message: Set(message.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Take stock for every line of the order. The decrement carries its own
/// `stock >= qty` guard so two orders racing for the last unit cannot both
/// win; the loser sees zero rows affected and the transaction rolls back.
pub(crate) async fn take_stock<C: ConnectionTrait>(
    conn: &C,
    items: &[OrderItemModel],
) -> Result<(), ServiceError> {
    for item in items {
        let result = ProductVariant::update_many()
            .col_expr(
                product_variant::Column::Stock,
                Expr::col(product_variant::Column::Stock).sub(item.quantity),
            )
            .col_expr(product_variant::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product_variant::Column::Id.eq(item.variant_id))
            .filter(product_variant::Column::Stock.gte(item.quantity))
            .exec(conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "{} ({} / {})",
                item.product_name, item.size, item.color
            )));
        }

        Product::update_many()
            .col_expr(
                product::Column::SoldCount,
                Expr::col(product::Column::SoldCount).add(item.quantity),
            )
            .filter(product::Column::Id.eq(item.product_id))
            .exec(conn)
            .await?;
    }
    Ok(())
}

/// Return stock after a cancellation.
pub(crate) async fn return_stock<C: ConnectionTrait>(
    conn: &C,
    items: &[OrderItemModel],
) -> Result<(), ServiceError> {
    for item in items {
        ProductVariant::update_many()
            .col_expr(
                product_variant::Column::Stock,
                Expr::col(product_variant::Column::Stock).add(item.quantity),
            )
            .col_expr(product_variant::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product_variant::Column::Id.eq(item.variant_id))
            .exec(conn)
            .await?;
        Product::update_many()
            .col_expr(
                product::Column::SoldCount,
                Expr::col(product::Column::SoldCount).sub(item.quantity),
            )
            .filter(product::Column::Id.eq(item.product_id))
            .exec(conn)
            .await?;
    }
    Ok(())
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        cart: CartService,
        coupons: CouponService,
        pricing: PricingService,
        events: EventSender,
    ) -> Self {
        Self {
            db,
            cart,
            coupons,
            pricing,
            events,
        }
    }

    /// Create the order row, frozen line items and the first timeline entry
    /// inside the caller's transaction. Prices are recomputed from the live
    /// catalog, never trusted from the client.
    pub(crate) async fn create_order_in_txn<C: ConnectionTrait>(
        &self,
        txn: &C,
        user_id: Uuid,
        email: Option<String>,
        input: &PlaceOrderInput,
        method: PaymentMethod,
    ) -> Result<(OrderModel, Vec<OrderItemModel>), ServiceError> {
        input.validate()?;

        let lines = self.cart.load_lines(txn, user_id).await?;
        if lines.is_empty() {
            return Err(ServiceError::CartEmpty);
        }

        let subtotal: i64 = lines.iter().map(|l| l.line_total).sum();
        let (coupon_code, discount) = match &input.coupon_code {
            Some(code) => {
                let (coupon, discount) = self.coupons.validate(txn, code, subtotal).await?;
                (Some(coupon.code), discount)
            }
            None => (None, 0),
        };

        let quote = self.pricing.quote(subtotal, discount, input.shipping_tier);
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_number = generate_order_number();

        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            user_id: Set(Some(user_id)),
            email: Set(email),
            ship_name: Set(input.address.name.clone()),
            ship_phone: Set(input.address.phone.clone()),
            ship_line1: Set(input.address.line1.clone()),
            ship_line2: Set(input.address.line2.clone()),
            ship_city: Set(input.address.city.clone()),
            ship_state: Set(input.address.state.clone()),
            ship_pincode: Set(input.address.pincode.clone()),
            subtotal: Set(quote.subtotal),
            discount: Set(quote.discount),
            shipping: Set(quote.shipping),
            tax: Set(quote.tax),
            total: Set(quote.total),
            coupon_code: Set(coupon_code),
            payment_method: Set(method),
            payment_status: Set(PaymentStatus::Pending),
            fulfillment_status: Set(FulfillmentStatus::Pending),
            gateway_order_id: Set(None),
            gateway_payment_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let item = self.freeze_line(txn, order_id, line, now).await?;
            items.push(item);
        }

        append_timeline(txn, order_id, "pending", "Order placed").await?;
        Ok((order, items))
    }

    async fn freeze_line<C: ConnectionTrait>(
        &self,
        txn: &C,
        order_id: Uuid,
        line: &CartLine,
        now: chrono::DateTime<Utc>,
    ) -> Result<OrderItemModel, ServiceError> {
        Ok(order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            variant_id: Set(line.variant_id),
            product_name: Set(line.product_name.clone()),
            sku: Set(line.sku.clone()),
            size: Set(line.size.clone()),
            color: Set(line.color.clone()),
            unit_price: Set(line.unit_price),
            image_url: Set(line.image_url.clone()),
            quantity: Set(line.quantity),
            line_total: Set(line.line_total),
            created_at: Set(now),
        }
        .insert(txn)
        .await?)
    }

    /// Place a cash-on-delivery order. Everything that must not outlive a
    /// failed placement happens inside one transaction.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn place_cod_order(
        &self,
        user_id: Uuid,
        email: Option<String>,
        input: PlaceOrderInput,
    ) -> Result<OrderDetail, ServiceError> {
        let txn = self.db.begin().await?;

        let (order, items) = self
            .create_order_in_txn(&txn, user_id, email, &input, PaymentMethod::Cod)
            .await?;
        take_stock(&txn, &items).await?;
        if let Some(code) = &order.coupon_code {
            self.coupons.redeem_by_code(&txn, code).await?;
        }
        self.cart.clear_on(&txn, user_id).await?;

        txn.commit().await?;
        info!(order_number = %order.order_number, total = order.total, "COD order placed");

        self.events
            .send_or_log(Event::OrderPlaced {
                order_id: order.id,
                order_number: order.order_number.clone(),
                email: order.email.clone(),
                total: order.total,
            })
            .await;
        if let Some(code) = &order.coupon_code {
            self.events
                .send_or_log(Event::CouponRedeemed {
                    coupon_code: code.clone(),
                    order_id: order.id,
                })
                .await;
        }

        self.load_detail(order).await
    }

    /// Fetch an order, enforcing ownership unless `admin`.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        admin: bool,
    ) -> Result<OrderDetail, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {}", order_id)))?;
        if !admin && order.user_id != Some(user_id) {
            // Hide existence from other customers
            return Err(ServiceError::NotFound(format!("Order {}", order_id)));
        }
        self.load_detail(order).await
    }

    pub async fn get_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<OrderDetail, ServiceError> {
        let order = Order::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {}", order_number)))?;
        self.load_detail(order).await
    }

    /// Customer's own order history, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(self.db.as_ref(), per_page.clamp(1, 100));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Admin listing with status filters.
    pub async fn list_all(
        &self,
        filters: OrderListFilters,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let mut query = Order::find();
        if let Some(status) = filters.fulfillment_status {
            query = query.filter(order::Column::FulfillmentStatus.eq(status));
        }
        if let Some(status) = filters.payment_status {
            query = query.filter(order::Column::PaymentStatus.eq(status));
        }
        let per_page = filters.per_page.unwrap_or(25).clamp(1, 100);
        let page = filters.page.unwrap_or(1).max(1);
        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(self.db.as_ref(), per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;
        Ok((orders, total))
    }

    /// Customer-initiated cancellation. Allowed until the order ships;
    /// stock goes back on the shelf in the same transaction.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        admin: bool,
    ) -> Result<OrderDetail, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {}", order_id)))?;
        if !admin && order.user_id != Some(user_id) {
            return Err(ServiceError::NotFound(format!("Order {}", order_id)));
        }

        match order.fulfillment_status {
            FulfillmentStatus::Pending
            | FulfillmentStatus::Confirmed
            | FulfillmentStatus::Processing => {}
            status => {
                return Err(ServiceError::InvalidOperation(format!(
                    "cannot cancel an order that is {}",
                    status
                )));
            }
        }

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        // Stock was only taken once payment settled (or at COD placement)
        let stock_taken = order.payment_method == PaymentMethod::Cod
            || order.payment_status == PaymentStatus::Paid;
        if stock_taken {
            return_stock(&txn, &items).await?;
        }

        let old_status = order.fulfillment_status;
        let order_number = order.order_number.clone();
        let email = order.email.clone();
        let mut model: order::ActiveModel = order.into();
        model.fulfillment_status = Set(FulfillmentStatus::Cancelled);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&txn).await?;

        append_timeline(&txn, order_id, "cancelled", "Order cancelled").await?;
        txn.commit().await?;

        self.events
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                order_number,
                email,
                old_status: old_status.to_string(),
                new_status: FulfillmentStatus::Cancelled.to_string(),
            })
            .await;

        self.load_detail(updated).await
    }

    pub(crate) async fn load_detail(&self, order: OrderModel) -> Result<OrderDetail, ServiceError> {
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(self.db.as_ref())
            .await?;
        let timeline = OrderTimeline::find()
            .filter(order_timeline::Column::OrderId.eq(order.id))
            .order_by_asc(order_timeline::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(OrderDetail {
            order,
            items,
            timeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_shape() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TL");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!parts[2].chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn order_numbers_are_distinct() {
        let a = generate_order_number();
        let b = generate_order_number();
        assert_ne!(a, b);
    }
}
