// src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

/// Settings the fulfillment orchestrator needs, split out so tests can build
/// an orchestrator without touching the process environment.
#[derive(Debug, Clone)]
pub struct FulfillmentSettings {
  /// ISO country code used when a shipping address carries none.
  pub default_country: String,
  /// Whether the static size->variant table may be used when the live
  /// catalog lookup is unreachable. Off by default: a stale table can
  /// silently submit the wrong size/color.
  pub allow_static_variant_fallback: bool,
}

impl Default for FulfillmentSettings {
  fn default() -> Self {
    Self {
      default_country: "US".to_string(),
      allow_static_variant_fallback: false,
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  // Stripe
  pub stripe_secret_key: String,
  pub stripe_webhook_secret: Option<String>,

  // Printify
  pub printify_api_token: Option<String>,
  pub printify_shop_id: String,

  // Brevo (transactional email, best-effort)
  pub brevo_api_key: Option<String>,
  pub notification_sender: String,

  /// Request-level bound on every outbound provider call.
  pub provider_timeout_secs: u64,

  pub default_country: String,
  pub allow_static_variant_fallback: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;

    let stripe_secret_key = get_env("STRIPE_SECRET_KEY")?;
    // Deliberately optional at startup: the webhook handler fails closed with
    // a 500 when it is missing, rather than the whole server refusing to boot.
    let stripe_webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").ok();

    let printify_api_token = env::var("PRINTIFY_API_TOKEN").ok();
    let printify_shop_id = get_env("PRINTIFY_SHOP_ID")?;

    let brevo_api_key = env::var("BREVO_API_KEY").ok();
    let notification_sender = get_env("NOTIFICATION_SENDER").unwrap_or_else(|_| "orders@printworks.dev".to_string());

    let provider_timeout_secs = get_env("PROVIDER_TIMEOUT_SECS")
      .unwrap_or_else(|_| "30".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid PROVIDER_TIMEOUT_SECS: {}", e)))?;

    let default_country = get_env("DEFAULT_SHIPPING_COUNTRY").unwrap_or_else(|_| "US".to_string());
    let allow_static_variant_fallback = get_env("PRINTWORKS_ALLOW_STATIC_VARIANT_FALLBACK")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid PRINTWORKS_ALLOW_STATIC_VARIANT_FALLBACK: {}", e)))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      stripe_secret_key,
      stripe_webhook_secret,
      printify_api_token,
      printify_shop_id,
      brevo_api_key,
      notification_sender,
      provider_timeout_secs,
      default_country,
      allow_static_variant_fallback,
    })
  }

  pub fn fulfillment_settings(&self) -> FulfillmentSettings {
    FulfillmentSettings {
      default_country: self.default_country.clone(),
      allow_static_variant_fallback: self.allow_static_variant_fallback,
    }
  }
}
