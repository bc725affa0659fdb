/*!
 * Transactional email.
 *
 * Delivery goes through an HTTP email API; everything is best-effort and
 * dispatched from the event loop after the owning transaction commits.
 */

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Email API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Email API returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError>;
}

/// Mailer backed by a Resend-style HTTP API.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, email), fields(to = %email.to, subject = %email.subject))]
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        let request = SendRequest {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        };
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected { status, body });
        }
        debug!("email accepted for delivery");
        Ok(())
    }
}

/// No-op mailer for development and tests.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        debug!(to = %email.to, subject = %email.subject, "email suppressed (noop mailer)");
        Ok(())
    }
}

pub fn order_confirmation_email(to: &str, order_number: &str, total: i64) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("Order {} confirmed", order_number),
        html: format!(
            "<p>Thanks for shopping with us!</p>\
             <p>Your order <strong>{}</strong> for &#8377;{} has been placed. \
             We'll email you again when it ships.</p>",
            order_number, total
        ),
    }
}

pub fn status_update_email(to: &str, order_number: &str, new_status: &str) -> OutboundEmail {
    let friendly = new_status.replace('_', " ");
    OutboundEmail {
        to: to.to_string(),
        subject: format!("Order {} update: {}", order_number, friendly),
        html: format!(
            "<p>Your order <strong>{}</strong> is now <strong>{}</strong>.</p>",
            order_number, friendly
        ),
    }
}
