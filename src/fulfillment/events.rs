// src/fulfillment/events.rs

//! Payment Event Processor: verifies an inbound payment-provider event,
//! re-fetches the authoritative checkout session, reconstructs the typed
//! line-item descriptors it implies, and hands order creation to the
//! orchestrator. Verification failures are the only errors that prevent
//! order creation entirely; everything later degrades per item.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::fulfillment::orchestrator::FulfillmentOrchestrator;
use crate::models::line_item::{parse_description, split_total_cents, LineItemDescriptor};
use crate::models::ShippingAddress;
use crate::services::email::{OrderConfirmation, OrderNotifier};
use crate::services::stripe::{CheckoutSession, PaymentGateway, PaymentIntentRef, StripeEvent};
use crate::store::OrderStore;

#[derive(Debug, Default, Serialize)]
pub struct WebhookAck {
  pub received: bool,
  pub orders_created: Vec<Uuid>,
  pub orders_upgraded: usize,
}

impl WebhookAck {
  fn received() -> Self {
    Self {
      received: true,
      ..Self::default()
    }
  }
}

pub struct PaymentEventProcessor {
  gateway: Arc<dyn PaymentGateway>,
  store: Arc<dyn OrderStore>,
  notifier: Arc<dyn OrderNotifier>,
  orchestrator: Arc<FulfillmentOrchestrator>,
}

impl PaymentEventProcessor {
  pub fn new(
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn OrderNotifier>,
    orchestrator: Arc<FulfillmentOrchestrator>,
  ) -> Self {
    Self {
      gateway,
      store,
      notifier,
      orchestrator,
    }
  }

  /// Entry point for one webhook delivery. The payload stays an opaque byte
  /// sequence until the signature check passes.
  #[instrument(skip(self, payload, signature_header), fields(payload_len = payload.len()))]
  pub async fn process(&self, payload: &[u8], signature_header: Option<&str>) -> Result<WebhookAck> {
    self.gateway.verify_event(payload, signature_header)?;

    let event: StripeEvent = serde_json::from_slice(payload)
      .map_err(|e| AppError::Validation(format!("Invalid event payload: {}", e)))?;

    match event.event_type.as_str() {
      "checkout.session.completed" => {
        let session_id = event
          .data
          .object
          .get("id")
          .and_then(|v| v.as_str())
          .ok_or_else(|| AppError::Validation("checkout.session.completed event without session id".to_string()))?;
        self.handle_checkout_completed(session_id).await
      }
      "payment_intent.succeeded" => {
        let payment_intent_id = event
          .data
          .object
          .get("id")
          .and_then(|v| v.as_str())
          .ok_or_else(|| AppError::Validation("payment_intent.succeeded event without id".to_string()))?;
        let upgraded = self.orchestrator.reconcile_payment_intent(payment_intent_id).await?;
        Ok(WebhookAck {
          received: true,
          orders_created: Vec::new(),
          orders_upgraded: upgraded,
        })
      }
      other => {
        info!(event_type = other, "Ignoring unhandled event type");
        Ok(WebhookAck::received())
      }
    }
  }

  async fn handle_checkout_completed(&self, session_id: &str) -> Result<WebhookAck> {
    // Never trust the webhook body's line items: it may be a partial
    // snapshot. Fetch the session fully expanded.
    let session = self.gateway.retrieve_session(session_id).await?;

    if session.payment_status != "paid" {
      info!(
        %session_id,
        payment_status = %session.payment_status,
        "Session not paid yet; acknowledging without creating orders"
      );
      return Ok(WebhookAck::received());
    }
    if let Some(PaymentIntentRef::Expanded(pi)) = &session.payment_intent {
      if pi.status != "succeeded" {
        info!(
          %session_id,
          payment_intent_status = %pi.status,
          "Payment intent not succeeded; acknowledging without creating orders"
        );
        return Ok(WebhookAck::received());
      }
    }

    let descriptors = descriptors_from_session(&session);
    if descriptors.is_empty() {
      warn!(%session_id, "Paid session yielded no resolvable line items");
      return Ok(WebhookAck::received());
    }

    let (customer_email, customer_name) = match session.customer_details.as_ref() {
      Some(details) => (details.email.clone(), details.name.clone()),
      None => (None, None),
    };
    let Some(customer_email) = customer_email else {
      warn!(%session_id, "Paid session has no customer email; cannot create orders");
      return Ok(WebhookAck::received());
    };

    let address = shipping_address_from_session(&session);
    let payment_intent_id = session.payment_intent_id().map(str::to_string);

    let mut created: Vec<Uuid> = Vec::new();
    let mut item_lines: Vec<String> = Vec::new();
    let mut created_total = 0i64;

    for descriptor in &descriptors {
      // Duplicate delivery of the same event must not duplicate orders.
      match self
        .store
        .find_by_session_and_design(&session.id, &descriptor.design_id)
        .await?
      {
        Some(existing) => {
          info!(
            %session_id,
            design_id = %descriptor.design_id,
            order_id = %existing.id,
            "Order already exists for this session line item; skipping"
          );
          continue;
        }
        None => {}
      }

      let order = match self
        .orchestrator
        .create_paid_order(
          descriptor,
          &customer_email,
          customer_name.as_deref(),
          address.clone(),
          &session.id,
          payment_intent_id.as_deref(),
        )
        .await
      {
        Ok(order) => order,
        Err(e) => {
          // One bad line item must never abort its siblings.
          warn!(
            %session_id,
            design_id = %descriptor.design_id,
            error = %e,
            "Failed to persist order for line item; continuing with remaining items"
          );
          continue;
        }
      };

      created.push(order.id);
      created_total += order.total_cents;
      item_lines.push(format!(
        "{} / {} / {} x{}",
        descriptor.product_type, descriptor.color, descriptor.size, descriptor.quantity
      ));

      // Submission failures are captured into the order status.
      self.orchestrator.fulfill_new_order(&order).await;
    }

    if !created.is_empty() {
      let confirmation = OrderConfirmation {
        order_ids: created.clone(),
        recipient_email: customer_email,
        recipient_name: customer_name,
        item_lines,
        shipping_address: address,
        total_cents: created_total,
      };
      if let Err(e) = self.notifier.send_order_confirmation(&confirmation).await {
        warn!(%session_id, error = %e, "Order confirmation email failed; continuing");
      }
    }

    Ok(WebhookAck {
      received: true,
      orders_created: created,
      orders_upgraded: 0,
    })
  }
}

fn metadata_list(session: &CheckoutSession, key: &str) -> Vec<String> {
  session
    .metadata
    .get(key)
    .map(|joined| joined.split(',').map(|s| s.trim().to_string()).collect())
    .unwrap_or_default()
}

fn non_empty(value: Option<&String>) -> Option<String> {
  value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Reconstructs typed descriptors from a session's non-shipping line items.
/// Field resolution order per item: structured metadata arrays (indexed by
/// line-item position) first, then the parsed description string, then skip
/// the item. A skipped item is logged and never aborts the session.
pub fn descriptors_from_session(session: &CheckoutSession) -> Vec<LineItemDescriptor> {
  let all_items = session.line_items.as_ref().map(|l| l.data.as_slice()).unwrap_or(&[]);
  let items: Vec<_> = all_items.iter().filter(|item| !item.is_shipping()).collect();

  // The discount-adjusted total to divide is the goods portion only.
  let shipping_cents: i64 = all_items
    .iter()
    .filter(|item| item.is_shipping())
    .filter_map(|item| item.amount_total)
    .sum();
  let goods_total = (session.amount_total.unwrap_or(0) - shipping_cents).max(0);

  let design_ids = metadata_list(session, "design_ids");
  let product_types = metadata_list(session, "product_types");
  let colors = metadata_list(session, "colors");
  let sizes = metadata_list(session, "sizes");

  let quantities: Vec<i64> = items.iter().map(|item| item.quantity.unwrap_or(1).max(1)).collect();
  let shares = split_total_cents(goods_total, &quantities);

  let mut descriptors = Vec::with_capacity(items.len());
  for (index, item) in items.iter().enumerate() {
    let Some(design_id) = non_empty(design_ids.get(index)) else {
      warn!(
        session_id = %session.id,
        line_item_index = index,
        "Line item has no resolvable design reference; skipping"
      );
      continue;
    };

    let parsed = item.description.as_deref().and_then(parse_description);
    let product_type = non_empty(product_types.get(index)).or_else(|| parsed.as_ref().map(|p| p.0.clone()));
    let color = non_empty(colors.get(index)).or_else(|| parsed.as_ref().map(|p| p.1.clone()));
    let size = non_empty(sizes.get(index)).or_else(|| parsed.as_ref().map(|p| p.2.clone()));

    let (Some(product_type), Some(color), Some(size)) = (product_type, color, size) else {
      warn!(
        session_id = %session.id,
        line_item_index = index,
        description = ?item.description,
        "Line item product/color/size unresolvable from metadata or description; skipping"
      );
      continue;
    };

    descriptors.push(LineItemDescriptor {
      design_id,
      product_type,
      color,
      size,
      quantity: quantities[index],
      total_cents: shares[index],
    });
  }

  descriptors
}

fn shipping_address_from_session(session: &CheckoutSession) -> ShippingAddress {
  let details = session.shipping_details.as_ref();
  let address = details.and_then(|d| d.address.as_ref());
  ShippingAddress {
    name: details.and_then(|d| d.name.clone()),
    phone: details.and_then(|d| d.phone.clone()),
    line1: address.and_then(|a| a.line1.clone()),
    line2: address.and_then(|a| a.line2.clone()),
    city: address.and_then(|a| a.city.clone()),
    state: address.and_then(|a| a.state.clone()),
    postal_code: address.and_then(|a| a.postal_code.clone()),
    country: address.and_then(|a| a.country.clone()),
  }
}
