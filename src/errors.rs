// src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::fulfillment::variants::VariantResolutionError;
use crate::services::printify::FulfillmentError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Order not approvable: current status is '{0}'")]
  NotApprovable(String),

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Stripe API Error: {0}")]
  Stripe(String),

  #[error("Brevo Email Error: {0}")]
  Brevo(String),

  #[error("Fulfillment Provider Error: {source}")]
  Fulfillment {
    #[from]
    source: FulfillmentError,
  },

  #[error("Variant Resolution Error: {source}")]
  VariantResolution {
    #[from]
    source: VariantResolutionError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Allow anyhow::Error to be converted into AppError::Internal for convenience in handlers
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    if err.is::<sqlx::Error>() {
      return AppError::Sqlx(err.downcast::<sqlx::Error>().unwrap());
    }
    AppError::Internal(err.to_string())
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      // Webhook signature failures come back as 400 so the payment provider
      // records a delivery failure instead of treating the event as handled.
      AppError::Auth(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::NotApprovable(status) => {
        HttpResponse::BadRequest().json(json!({"error": "order_not_approvable", "status": status}))
      }
      AppError::Payment(m) => HttpResponse::PaymentRequired().json(json!({"error": m})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Stripe(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Payment provider error", "detail": m}))
      }
      AppError::Brevo(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Email service error", "detail": m}))
      }
      AppError::Fulfillment { source } => {
        let body = json!({
          "error": "fulfillment_provider_error",
          "detail": source.to_string(),
          "retryable": source.is_retryable(),
        });
        match source {
          FulfillmentError::ProviderUnavailable(_) => HttpResponse::ServiceUnavailable().json(body),
          FulfillmentError::InvalidVariant(_) => HttpResponse::UnprocessableEntity().json(body),
          FulfillmentError::AuthenticationFailure(_) => HttpResponse::InternalServerError().json(body),
          FulfillmentError::UnknownProvider(_) => HttpResponse::BadGateway().json(body),
        }
      }
      AppError::VariantResolution { source } => HttpResponse::UnprocessableEntity().json(json!({
        "error": "cannot_determine_variant",
        "detail": source.to_string(),
        "available_variants": source.available_titles,
      })),
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
