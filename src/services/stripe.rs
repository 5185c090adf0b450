// src/services/stripe.rs

//! Payment-provider adapter: webhook signature verification plus the two
//! retrieval calls the event processor depends on. The webhook body itself is
//! never trusted as the source of line items; the session is always re-fetched
//! fully expanded.

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::errors::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Reject signatures whose timestamp is further than this from now.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

// --- Wire types ---

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
  pub id: String,
  #[serde(rename = "type")]
  pub event_type: String,
  pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
  pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
  pub id: String,
  /// "paid", "unpaid" or "no_payment_required".
  pub payment_status: String,
  /// Total paid after discounts, in cents.
  pub amount_total: Option<i64>,
  #[serde(default)]
  pub customer_details: Option<CustomerDetails>,
  #[serde(default)]
  pub payment_intent: Option<PaymentIntentRef>,
  #[serde(default)]
  pub metadata: HashMap<String, String>,
  #[serde(default)]
  pub line_items: Option<LineItemList>,
  #[serde(default)]
  pub shipping_details: Option<ShippingDetails>,
}

impl CheckoutSession {
  pub fn payment_intent_id(&self) -> Option<&str> {
    match self.payment_intent.as_ref()? {
      PaymentIntentRef::Expanded(info) => Some(&info.id),
      PaymentIntentRef::Id(id) => Some(id),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
  pub email: Option<String>,
  pub name: Option<String>,
}

/// `payment_intent` arrives as a bare id unless the retrieval asked for the
/// expansion; both shapes are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PaymentIntentRef {
  Expanded(PaymentIntentInfo),
  Id(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentInfo {
  pub id: String,
  pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemList {
  #[serde(default)]
  pub data: Vec<SessionLineItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionLineItem {
  pub description: Option<String>,
  pub quantity: Option<i64>,
  pub amount_total: Option<i64>,
}

impl SessionLineItem {
  /// Shipping is modelled as its own line item and must not produce an order.
  pub fn is_shipping(&self) -> bool {
    self
      .description
      .as_deref()
      .map(|d| d.trim().to_lowercase().starts_with("shipping"))
      .unwrap_or(false)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingDetails {
  pub name: Option<String>,
  pub phone: Option<String>,
  pub address: Option<StripeAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeAddress {
  pub line1: Option<String>,
  pub line2: Option<String>,
  pub city: Option<String>,
  pub state: Option<String>,
  pub postal_code: Option<String>,
  pub country: Option<String>,
}

// --- Signature verification ---

/// Verifies a `t=<unix>,v1=<hex>` signature header against the raw payload.
/// Fails closed: no configured secret is a server misconfiguration (500-class),
/// a missing or bad header is a rejected event (400-class). Shared by the live
/// client and any test double so both enforce the identical scheme.
pub fn verify_event_signature(
  secret: Option<&str>,
  payload: &[u8],
  signature_header: Option<&str>,
  tolerance_secs: i64,
) -> Result<()> {
  let secret = secret.ok_or_else(|| AppError::Config("Stripe webhook secret is not configured".to_string()))?;
  let header =
    signature_header.ok_or_else(|| AppError::Auth("Missing stripe-signature header".to_string()))?;

  let mut timestamp: Option<i64> = None;
  let mut candidates: Vec<&str> = Vec::new();
  for part in header.split(',') {
    match part.trim().split_once('=') {
      Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
      Some(("v1", value)) => candidates.push(value),
      _ => {}
    }
  }

  let timestamp = timestamp.ok_or_else(|| AppError::Auth("Signature header missing timestamp".to_string()))?;
  if (chrono::Utc::now().timestamp() - timestamp).abs() > tolerance_secs {
    return Err(AppError::Auth("Signature timestamp outside tolerance".to_string()));
  }
  if candidates.is_empty() {
    return Err(AppError::Auth("Signature header missing v1 signature".to_string()));
  }

  for candidate in candidates {
    let Ok(candidate_bytes) = hex::decode(candidate) else {
      continue;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
      .map_err(|e| AppError::Internal(format!("HMAC init failed: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    if mac.verify_slice(&candidate_bytes).is_ok() {
      return Ok(());
    }
  }

  Err(AppError::Auth("Webhook signature verification failed".to_string()))
}

// --- Gateway trait + live client ---

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Precondition for all webhook processing; no side effects may run before
  /// this succeeds.
  fn verify_event(&self, payload: &[u8], signature_header: Option<&str>) -> Result<()>;

  /// Retrieves the authoritative session with line items and payment intent
  /// expanded.
  async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession>;

  async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntentInfo>;
}

pub struct StripeClient {
  http: reqwest::Client,
  secret_key: String,
  webhook_secret: Option<String>,
}

impl StripeClient {
  pub fn new(secret_key: String, webhook_secret: Option<String>, timeout: std::time::Duration) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build Stripe HTTP client: {}", e)))?;
    Ok(Self {
      http,
      secret_key,
      webhook_secret,
    })
  }

  async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
    let response = self
      .http
      .get(url)
      .bearer_auth(&self.secret_key)
      .query(query)
      .send()
      .await
      .map_err(|e| AppError::Stripe(format!("Request to {} failed: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(AppError::Stripe(format!("{} returned {}: {}", url, status, body)));
    }
    response
      .json::<T>()
      .await
      .map_err(|e| AppError::Stripe(format!("Failed to decode response from {}: {}", url, e)))
  }
}

#[async_trait]
impl PaymentGateway for StripeClient {
  fn verify_event(&self, payload: &[u8], signature_header: Option<&str>) -> Result<()> {
    verify_event_signature(
      self.webhook_secret.as_deref(),
      payload,
      signature_header,
      SIGNATURE_TOLERANCE_SECS,
    )
  }

  async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession> {
    let url = format!("{}/checkout/sessions/{}", STRIPE_API_BASE, session_id);
    self
      .get_json(&url, &[("expand[]", "line_items"), ("expand[]", "payment_intent")])
      .await
  }

  async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntentInfo> {
    let url = format!("{}/payment_intents/{}", STRIPE_API_BASE, payment_intent_id);
    self.get_json(&url, &[]).await
  }
}
