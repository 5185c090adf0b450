// tests/webhook_flow.rs

//! End-to-end webhook behavior: order creation from checkout sessions,
//! idempotent redelivery, fail-closed verification, and payment-intent
//! reconciliation.

#[path = "common/mod.rs"]
mod common;

use std::sync::atomic::Ordering;

use common::*;
use printworks::errors::AppError;
use printworks::models::{NewOrder, OrderStatus, ShippingAddress};
use printworks::store::OrderStore;

fn paid_new_order(design_id: &str, payment_intent_id: &str, status: OrderStatus) -> NewOrder {
  NewOrder {
    design_id: design_id.to_string(),
    customer_email: "buyer@example.com".to_string(),
    customer_name: Some("Jane Doe".to_string()),
    shipping_address: ShippingAddress {
      line1: Some("123 Main St".to_string()),
      ..ShippingAddress::default()
    },
    product_type: "T-Shirt".to_string(),
    color: "Black".to_string(),
    size: "S".to_string(),
    quantity: 1,
    total_cents: 2999,
    stripe_session_id: Some("cs_seed".to_string()),
    stripe_payment_intent_id: Some(payment_intent_id.to_string()),
    status,
  }
}

#[tokio::test]
async fn paid_session_creates_one_order_per_line_item_with_exact_totals() {
  let h = harness();
  seed_two_designs(&h);
  h.gateway.put_session(two_item_paid_session("cs_1"));

  let payload = checkout_completed_event("cs_1");
  let header = sign_payload(&payload, WEBHOOK_SECRET);
  let ack = h.events.process(&payload, Some(&header)).await.unwrap();

  assert!(ack.received);
  assert_eq!(ack.orders_created.len(), 2);

  let mut totals = 0i64;
  for order_id in &ack.orders_created {
    let order = h.store.get(*order_id).await.unwrap().unwrap();
    // Both submissions succeeded, so the orders advanced past `paid`.
    assert_eq!(order.status, OrderStatus::Processing);
    assert!(order.printify_order_id.is_some());
    assert_eq!(order.stripe_session_id.as_deref(), Some("cs_1"));
    assert_eq!(order.stripe_payment_intent_id.as_deref(), Some("pi_1"));
    // $54.98 discounted total split across two single-quantity items.
    assert_eq!(order.total_cents, 2749);
    totals += order.total_cents;
  }
  assert_eq!(totals, 5498);

  assert_eq!(h.provider.create_calls.load(Ordering::SeqCst), 2);
  assert_eq!(h.designs.sales_count("d1"), 1);
  assert_eq!(h.designs.sales_count("d2"), 1);
  assert_eq!(h.notifier.sent.lock().len(), 1);
}

#[tokio::test]
async fn replaying_the_identical_webhook_creates_no_duplicate_orders() {
  let h = harness();
  seed_two_designs(&h);
  h.gateway.put_session(two_item_paid_session("cs_1"));

  let payload = checkout_completed_event("cs_1");
  let header = sign_payload(&payload, WEBHOOK_SECRET);

  let first = h.events.process(&payload, Some(&header)).await.unwrap();
  assert_eq!(first.orders_created.len(), 2);

  let replay = h.events.process(&payload, Some(&header)).await.unwrap();
  assert!(replay.received);
  assert!(replay.orders_created.is_empty());

  assert_eq!(h.store.len(), 2);
  assert_eq!(h.provider.create_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalid_signature_creates_zero_orders_and_makes_zero_provider_calls() {
  let h = harness();
  seed_two_designs(&h);
  h.gateway.put_session(two_item_paid_session("cs_1"));

  let payload = checkout_completed_event("cs_1");
  let header = sign_payload(&payload, "whsec_wrong_secret");

  let err = h.events.process(&payload, Some(&header)).await.unwrap_err();
  assert!(matches!(err, AppError::Auth(_)));

  assert!(h.store.is_empty());
  assert_eq!(h.provider.provider_call_count(), 0);
  assert_eq!(h.gateway.session_fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_signature_header_is_rejected_before_any_side_effect() {
  let h = harness();
  seed_two_designs(&h);
  h.gateway.put_session(two_item_paid_session("cs_1"));

  let payload = checkout_completed_event("cs_1");
  let err = h.events.process(&payload, None).await.unwrap_err();
  assert!(matches!(err, AppError::Auth(_)));
  assert!(h.store.is_empty());
}

#[tokio::test]
async fn missing_webhook_secret_is_a_config_error_with_no_side_effects() {
  let h = harness_with_secret(None);
  seed_two_designs(&h);
  h.gateway.put_session(two_item_paid_session("cs_1"));

  let payload = checkout_completed_event("cs_1");
  let header = sign_payload(&payload, WEBHOOK_SECRET);
  let err = h.events.process(&payload, Some(&header)).await.unwrap_err();
  assert!(matches!(err, AppError::Config(_)));
  assert!(h.store.is_empty());
}

#[tokio::test]
async fn unpaid_session_is_acknowledged_without_creating_orders() {
  let h = harness();
  seed_two_designs(&h);
  let mut session = two_item_paid_session("cs_1");
  session.payment_status = "unpaid".to_string();
  h.gateway.put_session(session);

  let payload = checkout_completed_event("cs_1");
  let header = sign_payload(&payload, WEBHOOK_SECRET);
  let ack = h.events.process(&payload, Some(&header)).await.unwrap();

  assert!(ack.received);
  assert!(ack.orders_created.is_empty());
  assert!(h.store.is_empty());
}

#[tokio::test]
async fn line_item_without_design_reference_is_skipped_not_fatal() {
  let h = harness();
  seed_two_designs(&h);
  let mut session = two_item_paid_session("cs_1");
  // Second entry of the design_ids array is gone; the first item must still
  // become an order.
  session.metadata.insert("design_ids".to_string(), "d1".to_string());
  h.gateway.put_session(session);

  let payload = checkout_completed_event("cs_1");
  let header = sign_payload(&payload, WEBHOOK_SECRET);
  let ack = h.events.process(&payload, Some(&header)).await.unwrap();

  assert_eq!(ack.orders_created.len(), 1);
  let order = h.store.get(ack.orders_created[0]).await.unwrap().unwrap();
  assert_eq!(order.design_id, "d1");
}

#[tokio::test]
async fn notification_failure_never_affects_order_creation() {
  let h = harness();
  seed_two_designs(&h);
  h.gateway.put_session(two_item_paid_session("cs_1"));
  *h.notifier.fail_next.lock() = true;

  let payload = checkout_completed_event("cs_1");
  let header = sign_payload(&payload, WEBHOOK_SECRET);
  let ack = h.events.process(&payload, Some(&header)).await.unwrap();

  assert_eq!(ack.orders_created.len(), 2);
  assert_eq!(h.store.len(), 2);
}

#[tokio::test]
async fn payment_intent_succeeded_with_no_matching_order_is_a_noop() {
  let h = harness();

  let payload = payment_intent_succeeded_event("pi_unknown");
  let header = sign_payload(&payload, WEBHOOK_SECRET);
  let ack = h.events.process(&payload, Some(&header)).await.unwrap();

  assert!(ack.received);
  assert_eq!(ack.orders_upgraded, 0);
  assert!(h.store.is_empty());
}

#[tokio::test]
async fn payment_intent_succeeded_upgrades_pending_orders_only() {
  let h = harness();
  let pending = h
    .store
    .insert(paid_new_order("d1", "pi_9", OrderStatus::PendingApproval))
    .await
    .unwrap();
  let processing = h
    .store
    .insert(paid_new_order("d2", "pi_9", OrderStatus::Processing))
    .await
    .unwrap();

  let payload = payment_intent_succeeded_event("pi_9");
  let header = sign_payload(&payload, WEBHOOK_SECRET);
  let ack = h.events.process(&payload, Some(&header)).await.unwrap();

  assert_eq!(ack.orders_upgraded, 1);
  assert_eq!(
    h.store.get(pending.id).await.unwrap().unwrap().status,
    OrderStatus::Paid
  );
  // Out-of-order delivery must never downgrade an already-submitted order.
  assert_eq!(
    h.store.get(processing.id).await.unwrap().unwrap().status,
    OrderStatus::Processing
  );
}

#[tokio::test]
async fn provider_outage_during_auto_submission_leaves_orders_retryable() {
  let h = harness();
  seed_two_designs(&h);
  h.gateway.put_session(two_item_paid_session("cs_1"));
  *h.provider.fail_create_with.lock() =
    Some(printworks::services::printify::FulfillmentError::ProviderUnavailable(
      "simulated outage".to_string(),
    ));

  let payload = checkout_completed_event("cs_1");
  let header = sign_payload(&payload, WEBHOOK_SECRET);
  let ack = h.events.process(&payload, Some(&header)).await.unwrap();

  // Payment was real: the rows exist and the failure is captured in status.
  assert_eq!(ack.orders_created.len(), 2);
  for order_id in &ack.orders_created {
    let order = h.store.get(*order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::PaymentReceived);
    assert!(order.printify_order_id.is_none());
  }

  // Once the provider is reachable again, approval retries succeed.
  *h.provider.fail_create_with.lock() = None;
  let outcome = h.orchestrator.approve_order(ack.orders_created[0]).await.unwrap();
  assert_eq!(outcome.status, OrderStatus::Processing);
  assert!(outcome.printify_order_id.is_some());
}

#[tokio::test]
async fn unhandled_event_types_are_acknowledged_and_ignored() {
  let h = harness();
  let payload = serde_json::json!({
    "id": "evt_x",
    "type": "customer.created",
    "data": { "object": { "id": "cus_1" } }
  })
  .to_string()
  .into_bytes();
  let header = sign_payload(&payload, WEBHOOK_SECRET);

  let ack = h.events.process(&payload, Some(&header)).await.unwrap();
  assert!(ack.received);
  assert!(ack.orders_created.is_empty());
  assert!(h.store.is_empty());
}
