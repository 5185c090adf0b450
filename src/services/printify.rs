// src/services/printify.rs

//! Print-provider adapter. Stateless: it submits one fulfillment request and
//! translates the response or failure into this system's vocabulary. All
//! state transitions stay with the orchestrator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy surfaced to the orchestrator. Which of these came back
/// decides whether an order is worth retrying automatically or needs an
/// operator/config fix first.
#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
  /// Network failure, timeout or provider 5xx. Retryable.
  #[error("print provider unreachable: {0}")]
  ProviderUnavailable(String),
  /// Provider rejected the variant/product reference. Not retryable until the
  /// underlying data is fixed.
  #[error("print provider rejected variant or product: {0}")]
  InvalidVariant(String),
  /// Credentials missing or rejected. Not retryable until config is fixed.
  #[error("print provider rejected credentials: {0}")]
  AuthenticationFailure(String),
  /// Anything else. Retryable with caution.
  #[error("unexpected print provider error: {0}")]
  UnknownProvider(String),
}

impl FulfillmentError {
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      FulfillmentError::ProviderUnavailable(_) | FulfillmentError::UnknownProvider(_)
    )
  }
}

// --- Wire types ---

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderProduct {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub variants: Vec<ProviderVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderVariant {
  pub id: i64,
  /// Human-readable, e.g. "Bella Canvas / Black / S".
  pub title: String,
  pub price: Option<i64>,
  #[serde(default = "default_enabled")]
  pub is_enabled: bool,
}

fn default_enabled() -> bool {
  true
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
  /// The local order id, passed through opaquely so the provider-side order
  /// can be traced back without querying this system.
  pub external_id: String,
  pub line_items: Vec<OrderLineItem>,
  pub shipping_method: i64,
  pub send_shipping_notification: bool,
  pub address_to: AddressTo,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderLineItem {
  pub product_id: String,
  pub variant_id: i64,
  pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AddressTo {
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: String,
  pub country: String,
  pub region: String,
  pub address1: String,
  pub address2: String,
  pub city: String,
  pub zip: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderOrder {
  pub id: String,
  #[serde(default)]
  pub status: String,
}

// --- Provider trait + live client ---

#[async_trait]
pub trait PrintProvider: Send + Sync {
  /// Fetches the live product definition with its full variant list. Always
  /// called at submission time; provider catalogs are mutable and a stale
  /// local mapping can silently submit the wrong size/color.
  async fn get_product(&self, product_id: &str) -> Result<ProviderProduct, FulfillmentError>;

  async fn create_order(&self, request: &CreateOrderRequest) -> Result<ProviderOrder, FulfillmentError>;

  async fn get_order(&self, provider_order_id: &str) -> Result<ProviderOrder, FulfillmentError>;
}

pub struct PrintifyClient {
  http: reqwest::Client,
  api_token: Option<String>,
  shop_id: String,
  base_url: String,
}

impl PrintifyClient {
  pub fn new(
    api_token: Option<String>,
    shop_id: String,
    timeout: std::time::Duration,
  ) -> Result<Self, FulfillmentError> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| FulfillmentError::UnknownProvider(format!("failed to build HTTP client: {}", e)))?;
    Ok(Self {
      http,
      api_token,
      shop_id,
      base_url: "https://api.printify.com/v1".to_string(),
    })
  }

  fn token(&self) -> Result<&str, FulfillmentError> {
    self
      .api_token
      .as_deref()
      .ok_or_else(|| FulfillmentError::AuthenticationFailure("PRINTIFY_API_TOKEN is not configured".to_string()))
  }

  fn classify_transport_error(err: reqwest::Error) -> FulfillmentError {
    if err.is_timeout() || err.is_connect() {
      FulfillmentError::ProviderUnavailable(err.to_string())
    } else {
      FulfillmentError::UnknownProvider(err.to_string())
    }
  }

  async fn classify_response_error(response: reqwest::Response) -> FulfillmentError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() {
      return FulfillmentError::ProviderUnavailable(format!("{}: {}", status, body));
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
      return FulfillmentError::AuthenticationFailure(format!("{}: {}", status, body));
    }
    if status.is_client_error() {
      let lowered = body.to_lowercase();
      if lowered.contains("variant") || lowered.contains("product") {
        return FulfillmentError::InvalidVariant(format!("{}: {}", status, body));
      }
    }
    FulfillmentError::UnknownProvider(format!("{}: {}", status, body))
  }

  async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, FulfillmentError> {
    if !response.status().is_success() {
      return Err(Self::classify_response_error(response).await);
    }
    response
      .json::<T>()
      .await
      .map_err(|e| FulfillmentError::UnknownProvider(format!("failed to decode provider response: {}", e)))
  }
}

#[async_trait]
impl PrintProvider for PrintifyClient {
  async fn get_product(&self, product_id: &str) -> Result<ProviderProduct, FulfillmentError> {
    let url = format!("{}/shops/{}/products/{}.json", self.base_url, self.shop_id, product_id);
    let response = self
      .http
      .get(&url)
      .bearer_auth(self.token()?)
      .send()
      .await
      .map_err(Self::classify_transport_error)?;
    Self::decode(response).await
  }

  async fn create_order(&self, request: &CreateOrderRequest) -> Result<ProviderOrder, FulfillmentError> {
    let url = format!("{}/shops/{}/orders.json", self.base_url, self.shop_id);
    tracing::info!(
      external_id = %request.external_id,
      line_items = request.line_items.len(),
      "Submitting order to Printify"
    );
    let response = self
      .http
      .post(&url)
      .bearer_auth(self.token()?)
      .json(request)
      .send()
      .await
      .map_err(Self::classify_transport_error)?;
    Self::decode(response).await
  }

  async fn get_order(&self, provider_order_id: &str) -> Result<ProviderOrder, FulfillmentError> {
    let url = format!("{}/shops/{}/orders/{}.json", self.base_url, self.shop_id, provider_order_id);
    let response = self
      .http
      .get(&url)
      .bearer_auth(self.token()?)
      .send()
      .await
      .map_err(Self::classify_transport_error)?;
    Self::decode(response).await
  }
}
