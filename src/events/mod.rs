use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::notifications::{order_confirmation_email, status_update_email, Mailer};

/// Domain events emitted after the owning transaction commits.
///
/// Handlers are best-effort: a failed email never rolls back an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderPlaced {
        order_id: Uuid,
        order_number: String,
        email: Option<String>,
        total: i64,
    },
    PaymentVerified {
        order_id: Uuid,
        order_number: String,
        gateway_payment_id: String,
    },
    PaymentFailed {
        order_id: Uuid,
        order_number: String,
        reason: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        order_number: String,
        email: Option<String>,
        old_status: String,
        new_status: String,
    },
    ReviewSubmitted {
        review_id: Uuid,
        product_id: Uuid,
    },
    CouponRedeemed {
        coupon_code: String,
        order_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Send without surfacing the error to the caller. Used at the end of
    /// commit paths where event loss is acceptable.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Event channel closed, dropping event: {}", e);
        }
    }
}

/// Consume events and dispatch side effects (currently email).
pub async fn process_events(mut rx: mpsc::Receiver<Event>, mailer: Arc<dyn Mailer>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!(?event, "processing event");

        match event {
            Event::OrderPlaced {
                order_number,
                email,
                total,
                ..
            } => {
                if let Some(to) = email {
                    let message = order_confirmation_email(&to, &order_number, total);
                    if let Err(e) = mailer.send(message).await {
                        error!(
                            order_number = %order_number,
                            "Failed to send order confirmation email: {}", e
                        );
                    }
                }
            }
            Event::OrderStatusChanged {
                order_number,
                email,
                new_status,
                ..
            } => {
                if let Some(to) = email {
                    let message = status_update_email(&to, &order_number, &new_status);
                    if let Err(e) = mailer.send(message).await {
                        error!(
                            order_number = %order_number,
                            "Failed to send status update email: {}", e
                        );
                    }
                }
            }
            Event::PaymentVerified { order_number, .. } => {
                info!(order_number = %order_number, "payment verified");
            }
            Event::PaymentFailed {
                order_number,
                reason,
                ..
            } => {
                info!(order_number = %order_number, reason = %reason, "payment failed");
            }
            Event::ReviewSubmitted { product_id, .. } => {
                debug!(product_id = %product_id, "review submitted");
            }
            Event::CouponRedeemed { coupon_code, .. } => {
                debug!(coupon_code = %coupon_code, "coupon redeemed");
            }
        }
    }

    info!("Event processing loop stopped");
}
