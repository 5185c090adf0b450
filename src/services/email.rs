// src/services/email.rs

//! Order-confirmation notifications over Brevo's transactional email API.
//! Strictly best-effort: a failed send is logged by the caller and never
//! blocks order creation or changes order state.

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::ShippingAddress;

#[derive(Debug, Clone)]
pub struct OrderConfirmation {
  pub order_ids: Vec<Uuid>,
  pub recipient_email: String,
  pub recipient_name: Option<String>,
  /// One display line per item, e.g. "T-Shirt / Black / M x1".
  pub item_lines: Vec<String>,
  pub shipping_address: ShippingAddress,
  pub total_cents: i64,
}

#[async_trait]
pub trait OrderNotifier: Send + Sync {
  async fn send_order_confirmation(&self, confirmation: &OrderConfirmation) -> Result<()>;
}

pub struct BrevoNotifier {
  http: reqwest::Client,
  api_key: Option<String>,
  sender: String,
}

impl BrevoNotifier {
  pub fn new(api_key: Option<String>, sender: String, timeout: std::time::Duration) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build Brevo HTTP client: {}", e)))?;
    Ok(Self { http, api_key, sender })
  }

  fn render_html(confirmation: &OrderConfirmation) -> String {
    let items = confirmation
      .item_lines
      .iter()
      .map(|line| format!("<li>{}</li>", line))
      .collect::<Vec<_>>()
      .join("");
    format!(
      "<h2>Thanks for your order!</h2><ul>{}</ul><p>Total: ${}.{:02}</p>",
      items,
      confirmation.total_cents / 100,
      confirmation.total_cents % 100
    )
  }
}

#[async_trait]
impl OrderNotifier for BrevoNotifier {
  async fn send_order_confirmation(&self, confirmation: &OrderConfirmation) -> Result<()> {
    let api_key = self
      .api_key
      .as_deref()
      .ok_or_else(|| AppError::Brevo("BREVO_API_KEY is not configured".to_string()))?;

    let body = json!({
      "sender": {"email": self.sender},
      "to": [{"email": confirmation.recipient_email, "name": confirmation.recipient_name}],
      "subject": "Your order is confirmed",
      "htmlContent": Self::render_html(confirmation),
    });

    let response = self
      .http
      .post("https://api.brevo.com/v3/smtp/email")
      .header("api-key", api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| AppError::Brevo(format!("Confirmation email request failed: {}", e)))?;

    if !response.status().is_success() {
      let status = response.status();
      let detail = response.text().await.unwrap_or_default();
      return Err(AppError::Brevo(format!("Brevo returned {}: {}", status, detail)));
    }

    tracing::info!(
      recipient = %confirmation.recipient_email,
      orders = confirmation.order_ids.len(),
      "Order confirmation email sent"
    );
    Ok(())
  }
}

/// Logs instead of sending. Used in local development when no Brevo key is
/// configured.
pub struct LogOnlyNotifier;

#[async_trait]
impl OrderNotifier for LogOnlyNotifier {
  async fn send_order_confirmation(&self, confirmation: &OrderConfirmation) -> Result<()> {
    tracing::info!(
      recipient = %confirmation.recipient_email,
      orders = ?confirmation.order_ids,
      total_cents = confirmation.total_cents,
      "Order confirmation (log-only notifier)"
    );
    Ok(())
  }
}
