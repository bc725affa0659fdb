use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{order, FulfillmentStatus, Order, PaymentMethod, PaymentStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::orders::{append_timeline, OrderDetail, OrderService};

/// Admin-side order lifecycle updates.
///
/// Transitions are not restricted to a fixed graph; support staff fix
/// mislabeled orders often enough that every change is allowed and the
/// timeline keeps the audit trail instead.
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
    orders: OrderService,
    events: EventSender,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusInput {
    pub status: FulfillmentStatus,
    pub message: Option<String>,
}

impl OrderStatusService {
    pub fn new(db: Arc<DatabaseConnection>, orders: OrderService, events: EventSender) -> Self {
        Self { db, orders, events }
    }

    #[instrument(skip(self, input), fields(order_id = %order_id, status = %input.status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        input: UpdateStatusInput,
    ) -> Result<OrderDetail, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {}", order_id)))?;

        let old_status = order.fulfillment_status;
        let order_number = order.order_number.clone();
        let email = order.email.clone();

        // COD collects at the door, so delivery is also the payment event
        let mark_cod_paid = input.status == FulfillmentStatus::Delivered
            && order.payment_method == PaymentMethod::Cod
            && order.payment_status == PaymentStatus::Pending;

        let mut model: order::ActiveModel = order.into();
        model.fulfillment_status = Set(input.status);
        if mark_cod_paid {
            model.payment_status = Set(PaymentStatus::Paid);
        }
        model.updated_at = Set(Utc::now());
        let updated = model.update(&txn).await?;

        let status_label = input.status.to_string();
        let message = input
            .message
            .unwrap_or_else(|| format!("Order marked {}", status_label.replace('_', " ")));
        append_timeline(&txn, order_id, &status_label, &message).await?;
        if mark_cod_paid {
            append_timeline(&txn, order_id, &status_label, "Cash collected on delivery").await?;
        }
        txn.commit().await?;

        info!(order_number = %order_number, from = %old_status, to = %input.status, "order status updated");
        if old_status != input.status {
            self.events
                .send_or_log(Event::OrderStatusChanged {
                    order_id,
                    order_number,
                    email,
                    old_status: old_status.to_string(),
                    new_status: input.status.to_string(),
                })
                .await;
        }

        self.orders.load_detail(updated).await
    }

    /// Directly set the payment status, for refunds handled out of band.
    #[instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        order_id: Uuid,
        status: PaymentStatus,
    ) -> Result<OrderDetail, ServiceError> {
        let txn = self.db.begin().await?;
        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {}", order_id)))?;

        let fulfillment = order.fulfillment_status.to_string();
        let mut model: order::ActiveModel = order.into();
        model.payment_status = Set(status);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&txn).await?;

        append_timeline(
            &txn,
            order_id,
            &fulfillment,
            &format!("Payment status set to {:?}", status),
        )
        .await?;
        txn.commit().await?;

        self.orders.load_detail(updated).await
    }
}
