/*!
 * Online payment gateway bridge.
 *
 * The storefront creates a gateway order before handing the browser to the
 * gateway's checkout widget, then verifies the returned payment signature
 * before marking anything paid.
 */

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Gateway returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Gateway response was malformed: {0}")]
    MalformedResponse(String),
}

/// Order registered with the gateway; `id` is what the checkout widget needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Amount in the gateway's smallest unit (paise)
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register an order with the gateway. `amount` is in rupees; the wire
    /// format uses paise.
    async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder, GatewayError>;

    /// Check the signature the gateway handed back after checkout.
    fn verify_signature(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool;
}

/// HMAC-SHA256 over `"{gateway_order_id}|{payment_id}"`, hex-encoded.
pub fn compute_signature(secret: &str, gateway_order_id: &str, payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time signature check.
pub fn verify_signature(
    secret: &str,
    gateway_order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let expected = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Razorpay-style REST gateway client.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpGateway {
    pub fn new(base_url: String, key_id: String, key_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            key_id,
            key_secret,
        }
    }
}

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct CreateOrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    #[instrument(skip(self), fields(receipt = %receipt))]
    async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder, GatewayError> {
        let request = CreateOrderRequest {
            amount: amount * 100,
            currency: "INR",
            receipt,
        };
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected { status, body });
        }

        let parsed: CreateOrderResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        Ok(GatewayOrder {
            id: parsed.id,
            amount: parsed.amount,
            currency: parsed.currency,
        })
    }

    fn verify_signature(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_signature(&self.key_secret, gateway_order_id, payment_id, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trip() {
        let sig = compute_signature("secret", "order_abc", "pay_xyz");
        assert!(verify_signature("secret", "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn rejects_tampered_payment_id() {
        let sig = compute_signature("secret", "order_abc", "pay_xyz");
        assert!(!verify_signature("secret", "order_abc", "pay_other", &sig));
    }

    #[test]
    fn rejects_wrong_secret() {
        let sig = compute_signature("secret", "order_abc", "pay_xyz");
        assert!(!verify_signature("another-secret", "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn rejects_non_hex_signature() {
        assert!(!verify_signature("secret", "order_abc", "pay_xyz", "not hex!"));
    }
}
