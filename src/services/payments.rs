use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::{
    order, order_item, FulfillmentStatus, Order, OrderItem, OrderModel, PaymentMethod,
    PaymentStatus,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::gateway::PaymentGateway;
use crate::services::cart::CartService;
use crate::services::coupons::CouponService;
use crate::services::orders::{append_timeline, take_stock, OrderDetail, OrderService, PlaceOrderInput};

/// Online payment flow.
///
/// An online order is created pending with no stock taken; the browser pays
/// through the gateway widget, and settlement (stock, coupon, cart) runs
/// only after the gateway signature checks out.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    orders: OrderService,
    cart: CartService,
    coupons: CouponService,
    gateway: Arc<dyn PaymentGateway>,
    events: EventSender,
}

/// Everything the checkout widget needs to open.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentInitiation {
    pub order_id: Uuid,
    pub order_number: String,
    /// Amount in rupees
    pub amount: i64,
    pub gateway_order_id: String,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentInput {
    pub order_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        orders: OrderService,
        cart: CartService,
        coupons: CouponService,
        gateway: Arc<dyn PaymentGateway>,
        events: EventSender,
    ) -> Self {
        Self {
            db,
            orders,
            cart,
            coupons,
            gateway,
            events,
        }
    }

    /// Create a pending online order and register it with the gateway. The
    /// order commits before the gateway call so a gateway timeout never
    /// holds a database transaction open.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn create_payment_order(
        &self,
        user_id: Uuid,
        email: Option<String>,
        input: PlaceOrderInput,
    ) -> Result<PaymentInitiation, ServiceError> {
        let txn = self.db.begin().await?;
        let (order, _items) = self
            .orders
            .create_order_in_txn(&txn, user_id, email, &input, PaymentMethod::Online)
            .await?;
        txn.commit().await?;

        let gateway_order = self
            .gateway
            .create_order(order.total, &order.order_number)
            .await
            .map_err(|e| {
                warn!(order_number = %order.order_number, "gateway order creation failed: {}", e);
                ServiceError::ExternalServiceError(e.to_string())
            })?;

        let order_id = order.id;
        let order_number = order.order_number.clone();
        let total = order.total;
        let mut model: order::ActiveModel = order.into();
        model.gateway_order_id = Set(Some(gateway_order.id.clone()));
        model.updated_at = Set(Utc::now());
        model.update(self.db.as_ref()).await?;

        info!(order_number = %order_number, gateway_order_id = %gateway_order.id, "payment order created");
        Ok(PaymentInitiation {
            order_id,
            order_number,
            amount: total,
            gateway_order_id: gateway_order.id,
            currency: gateway_order.currency,
        })
    }

    /// Verify the signature returned by the checkout widget and settle the
    /// order. Idempotent: verifying an already-paid order is a no-op.
    #[instrument(skip(self, input), fields(order_id = %input.order_id))]
    pub async fn verify_payment(
        &self,
        user_id: Uuid,
        input: VerifyPaymentInput,
    ) -> Result<OrderDetail, ServiceError> {
        let order = Order::find_by_id(input.order_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {}", input.order_id)))?;
        if order.user_id != Some(user_id) {
            return Err(ServiceError::NotFound(format!("Order {}", input.order_id)));
        }
        if order.payment_method != PaymentMethod::Online {
            return Err(ServiceError::InvalidOperation(
                "order is not an online payment order".into(),
            ));
        }
        if order.payment_status == PaymentStatus::Paid {
            return self.orders.load_detail(order).await;
        }
        if order.gateway_order_id.as_deref() != Some(input.gateway_order_id.as_str()) {
            return Err(ServiceError::ValidationError(
                "gateway order does not match".into(),
            ));
        }

        if !self.gateway.verify_signature(
            &input.gateway_order_id,
            &input.gateway_payment_id,
            &input.signature,
        ) {
            return self.record_failure(order, "signature verification failed").await;
        }

        match self.settle(&order, &input.gateway_payment_id).await {
            Ok(Some(detail)) => {
                self.events
                    .send_or_log(Event::PaymentVerified {
                        order_id: detail.order.id,
                        order_number: detail.order.order_number.clone(),
                        gateway_payment_id: input.gateway_payment_id,
                    })
                    .await;
                self.events
                    .send_or_log(Event::OrderPlaced {
                        order_id: detail.order.id,
                        order_number: detail.order.order_number.clone(),
                        email: detail.order.email.clone(),
                        total: detail.order.total,
                    })
                    .await;
                Ok(detail)
            }
            Ok(None) => {
                // A racing verify settled the order first; report its state.
                let fresh = Order::find_by_id(order.id)
                    .one(self.db.as_ref())
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Order {}", order.id)))?;
                self.orders.load_detail(fresh).await
            }
            Err(ServiceError::InsufficientStock(what)) => {
                // Payment went through but someone else took the last unit
                // between checkout and verification. Cancel and refund.
                self.record_refund(
                    order,
                    &input.gateway_payment_id,
                    "Items went out of stock before payment completed; refund initiated",
                )
                .await?;
                Err(ServiceError::InsufficientStock(what))
            }
            Err(ServiceError::CouponUsageExceeded(what)) => {
                // Same race on the coupon's last use. Cancel and refund
                // instead of stranding a paid order in pending.
                self.record_refund(
                    order,
                    &input.gateway_payment_id,
                    "Coupon was exhausted before payment completed; refund initiated",
                )
                .await?;
                Err(ServiceError::CouponUsageExceeded(what))
            }
            Err(e) => Err(e),
        }
    }

    /// Settle inside one transaction. Returns `None` when the order was
    /// already settled by a concurrent verify call.
    async fn settle(
        &self,
        order: &OrderModel,
        gateway_payment_id: &str,
    ) -> Result<Option<OrderDetail>, ServiceError> {
        let txn = self.db.begin().await?;

        // Claim the order with a conditional flip so two concurrent verify
        // calls cannot both run the side effects below.
        let claimed = Order::update_many()
            .col_expr(
                order::Column::PaymentStatus,
                Expr::value(PaymentStatus::Paid),
            )
            .col_expr(
                order::Column::FulfillmentStatus,
                Expr::value(FulfillmentStatus::Confirmed),
            )
            .col_expr(
                order::Column::GatewayPaymentId,
                Expr::value(gateway_payment_id),
            )
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order.id))
            .filter(
                order::Column::PaymentStatus
                    .is_in([PaymentStatus::Pending, PaymentStatus::Failed]),
            )
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&txn)
            .await?;
        take_stock(&txn, &items).await?;
        if let Some(code) = &order.coupon_code {
            self.coupons.redeem_by_code(&txn, code).await?;
        }
        if let Some(user_id) = order.user_id {
            self.cart.clear_on(&txn, user_id).await?;
        }

        append_timeline(&txn, order.id, "confirmed", "Payment received").await?;
        txn.commit().await?;

        let updated = Order::find_by_id(order.id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {}", order.id)))?;
        info!(order_number = %updated.order_number, "payment settled");
        Ok(Some(self.orders.load_detail(updated).await?))
    }

    async fn record_failure(
        &self,
        order: OrderModel,
        reason: &str,
    ) -> Result<OrderDetail, ServiceError> {
        let order_id = order.id;
        let order_number = order.order_number.clone();

        let txn = self.db.begin().await?;
        let mut model: order::ActiveModel = order.into();
        model.payment_status = Set(PaymentStatus::Failed);
        model.updated_at = Set(Utc::now());
        model.update(&txn).await?;
        append_timeline(&txn, order_id, "payment_failed", "Payment verification failed").await?;
        txn.commit().await?;

        self.events
            .send_or_log(Event::PaymentFailed {
                order_id,
                order_number: order_number.clone(),
                reason: reason.to_string(),
            })
            .await;
        warn!(order_number = %order_number, "payment failed: {}", reason);
        Err(ServiceError::PaymentFailed(reason.to_string()))
    }

    /// Paid but unsettleable: cancel the order, mark it refunded and keep
    /// the gateway payment id so the refund can be reconciled.
    async fn record_refund(
        &self,
        order: OrderModel,
        gateway_payment_id: &str,
        note: &str,
    ) -> Result<(), ServiceError> {
        let order_id = order.id;
        let order_number = order.order_number.clone();

        let txn = self.db.begin().await?;
        let mut model: order::ActiveModel = order.into();
        model.payment_status = Set(PaymentStatus::Refunded);
        model.fulfillment_status = Set(FulfillmentStatus::Cancelled);
        model.gateway_payment_id = Set(Some(gateway_payment_id.to_string()));
        model.updated_at = Set(Utc::now());
        model.update(&txn).await?;
        append_timeline(&txn, order_id, "cancelled", note).await?;
        txn.commit().await?;

        warn!(order_number = %order_number, "refund recorded: {}", note);
        Ok(())
    }
}
