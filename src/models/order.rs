// src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type as SqlxType;
use uuid::Uuid;

use crate::errors::{AppError, Result};

// Matches order_status_enum in schema.sql.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  /// Manually created order awaiting human review.
  PendingApproval,
  /// Payment verified, not yet sent to the print provider.
  Paid,
  /// Successfully submitted to the print provider.
  Processing,
  /// Cannot be submitted: missing catalog product id or shipping address.
  NeedsFulfillment,
  /// Provider submission failed during the automatic webhook-triggered
  /// attempt. The payment is real; retry via the approval endpoint.
  PaymentReceived,
  /// Provider submission failed during a manual approval. Also retryable.
  PrintifyError,
}

impl OrderStatus {
  /// Statuses from which an "approve and ship" action may run. Everything
  /// except `Processing`: a submitted order must never be re-submitted, and
  /// `NeedsFulfillment` re-runs the precondition checks so an operator can
  /// fix the underlying data and retry.
  pub fn is_approvable(self) -> bool {
    !matches!(self, OrderStatus::Processing)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::PendingApproval => "pending_approval",
      OrderStatus::Paid => "paid",
      OrderStatus::Processing => "processing",
      OrderStatus::NeedsFulfillment => "needs_fulfillment",
      OrderStatus::PaymentReceived => "payment_received",
      OrderStatus::PrintifyError => "printify_error",
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
  pub name: Option<String>,
  pub phone: Option<String>,
  pub line1: Option<String>,
  pub line2: Option<String>,
  pub city: Option<String>,
  pub state: Option<String>,
  pub postal_code: Option<String>,
  pub country: Option<String>,
}

impl ShippingAddress {
  /// line1 is the minimum the print provider will accept.
  pub fn is_shippable(&self) -> bool {
    self.line1.as_deref().map(|l| !l.trim().is_empty()).unwrap_or(false)
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
  pub id: Uuid,
  pub design_id: String,
  pub customer_email: String,
  pub customer_name: Option<String>,
  pub shipping_address: ShippingAddress,
  pub product_type: String,
  pub color: String,
  pub size: String,
  pub quantity: i64,
  pub total_cents: i64,
  pub stripe_session_id: Option<String>,
  pub stripe_payment_intent_id: Option<String>,
  pub printify_order_id: Option<String>,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
}

/// Creation payload. The store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub design_id: String,
  pub customer_email: String,
  pub customer_name: Option<String>,
  pub shipping_address: ShippingAddress,
  pub product_type: String,
  pub color: String,
  pub size: String,
  pub quantity: i64,
  pub total_cents: i64,
  pub stripe_session_id: Option<String>,
  pub stripe_payment_intent_id: Option<String>,
  pub status: OrderStatus,
}

impl NewOrder {
  /// Creation invariants: design reference and customer email are mandatory,
  /// quantity is at least one, total is non-negative.
  pub fn validate(&self) -> Result<()> {
    if self.design_id.trim().is_empty() {
      return Err(AppError::Validation("Order requires a design reference".to_string()));
    }
    if self.customer_email.trim().is_empty() {
      return Err(AppError::Validation("Order requires a customer email".to_string()));
    }
    if self.quantity < 1 {
      return Err(AppError::Validation(format!("Order quantity must be >= 1, got {}", self.quantity)));
    }
    if self.total_cents < 0 {
      return Err(AppError::Validation(format!(
        "Order total must be non-negative, got {} cents",
        self.total_cents
      )));
    }
    Ok(())
  }

  pub fn into_order(self, id: Uuid, created_at: DateTime<Utc>) -> Order {
    Order {
      id,
      design_id: self.design_id,
      customer_email: self.customer_email,
      customer_name: self.customer_name,
      shipping_address: self.shipping_address,
      product_type: self.product_type,
      color: self.color,
      size: self.size,
      quantity: self.quantity,
      total_cents: self.total_cents,
      stripe_session_id: self.stripe_session_id,
      stripe_payment_intent_id: self.stripe_payment_intent_id,
      printify_order_id: None,
      status: self.status,
      created_at,
    }
  }
}

/// Partial update: only supplied fields change.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
  pub status: Option<OrderStatus>,
  pub printify_order_id: Option<String>,
  pub stripe_payment_intent_id: Option<String>,
}
