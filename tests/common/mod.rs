// tests/common/mod.rs

//! Shared harness for the integration suites: an in-memory order store plus
//! hand-written doubles for the payment gateway and print provider, wired
//! into a real orchestrator and event processor.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use sha2::Sha256;

use printworks::config::FulfillmentSettings;
use printworks::errors::{AppError, Result as AppResult};
use printworks::fulfillment::{FulfillmentOrchestrator, PaymentEventProcessor};
use printworks::services::designs::{DesignSummary, MemoryDesignRegistry};
use printworks::services::email::{OrderConfirmation, OrderNotifier};
use printworks::services::printify::{
  CreateOrderRequest, FulfillmentError, PrintProvider, ProviderOrder, ProviderProduct,
};
use printworks::services::stripe::{
  verify_event_signature, CheckoutSession, PaymentGateway, PaymentIntentInfo, SIGNATURE_TOLERANCE_SECS,
};
use printworks::store::MemoryOrderStore;

pub const WEBHOOK_SECRET: &str = "whsec_integration_test";

// --- Signature helpers (same scheme the live client enforces) ---

pub fn sign_payload(payload: &[u8], secret: &str) -> String {
  type HmacSha256 = Hmac<Sha256>;
  let timestamp = chrono::Utc::now().timestamp().to_string();
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
  mac.update(timestamp.as_bytes());
  mac.update(b".");
  mac.update(payload);
  format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

pub fn checkout_completed_event(session_id: &str) -> Vec<u8> {
  json!({
    "id": "evt_checkout",
    "type": "checkout.session.completed",
    "data": { "object": { "id": session_id } }
  })
  .to_string()
  .into_bytes()
}

pub fn payment_intent_succeeded_event(payment_intent_id: &str) -> Vec<u8> {
  json!({
    "id": "evt_pi",
    "type": "payment_intent.succeeded",
    "data": { "object": { "id": payment_intent_id, "status": "succeeded" } }
  })
  .to_string()
  .into_bytes()
}

// --- Payment gateway double ---

pub struct StubGateway {
  secret: Option<String>,
  sessions: RwLock<HashMap<String, CheckoutSession>>,
  pub session_fetches: AtomicUsize,
}

impl StubGateway {
  pub fn new(secret: Option<&str>) -> Self {
    Self {
      secret: secret.map(str::to_string),
      sessions: RwLock::new(HashMap::new()),
      session_fetches: AtomicUsize::new(0),
    }
  }

  pub fn put_session(&self, session: CheckoutSession) {
    self.sessions.write().insert(session.id.clone(), session);
  }
}

#[async_trait]
impl PaymentGateway for StubGateway {
  fn verify_event(&self, payload: &[u8], signature_header: Option<&str>) -> AppResult<()> {
    verify_event_signature(self.secret.as_deref(), payload, signature_header, SIGNATURE_TOLERANCE_SECS)
  }

  async fn retrieve_session(&self, session_id: &str) -> AppResult<CheckoutSession> {
    self.session_fetches.fetch_add(1, Ordering::SeqCst);
    self
      .sessions
      .read()
      .get(session_id)
      .cloned()
      .ok_or_else(|| AppError::Stripe(format!("no such session: {}", session_id)))
  }

  async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> AppResult<PaymentIntentInfo> {
    Err(AppError::Stripe(format!(
      "retrieve_payment_intent not stubbed for {}",
      payment_intent_id
    )))
  }
}

// --- Print provider double ---

#[derive(Default)]
pub struct StubPrintProvider {
  products: RwLock<HashMap<String, ProviderProduct>>,
  pub fail_create_with: Mutex<Option<FulfillmentError>>,
  pub fail_get_product_with: Mutex<Option<FulfillmentError>>,
  pub get_product_calls: AtomicUsize,
  pub create_calls: AtomicUsize,
  pub submitted: Mutex<Vec<CreateOrderRequest>>,
}

impl StubPrintProvider {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn put_product(&self, product: ProviderProduct) {
    self.products.write().insert(product.id.clone(), product);
  }

  pub fn provider_call_count(&self) -> usize {
    self.get_product_calls.load(Ordering::SeqCst) + self.create_calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PrintProvider for StubPrintProvider {
  async fn get_product(&self, product_id: &str) -> Result<ProviderProduct, FulfillmentError> {
    self.get_product_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(err) = self.fail_get_product_with.lock().clone() {
      return Err(err);
    }
    self
      .products
      .read()
      .get(product_id)
      .cloned()
      .ok_or_else(|| FulfillmentError::InvalidVariant(format!("unknown product {}", product_id)))
  }

  async fn create_order(&self, request: &CreateOrderRequest) -> Result<ProviderOrder, FulfillmentError> {
    let call_number = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if let Some(err) = self.fail_create_with.lock().clone() {
      return Err(err);
    }
    self.submitted.lock().push(request.clone());
    Ok(ProviderOrder {
      id: format!("prnt_{}", call_number),
      status: "on-hold".to_string(),
    })
  }

  async fn get_order(&self, provider_order_id: &str) -> Result<ProviderOrder, FulfillmentError> {
    Ok(ProviderOrder {
      id: provider_order_id.to_string(),
      status: "on-hold".to_string(),
    })
  }
}

// --- Notifier double ---

#[derive(Default)]
pub struct RecordingNotifier {
  pub sent: Mutex<Vec<OrderConfirmation>>,
  pub fail_next: Mutex<bool>,
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
  async fn send_order_confirmation(&self, confirmation: &OrderConfirmation) -> AppResult<()> {
    if *self.fail_next.lock() {
      return Err(AppError::Brevo("simulated notification outage".to_string()));
    }
    self.sent.lock().push(confirmation.clone());
    Ok(())
  }
}

// --- Harness ---

pub struct TestHarness {
  pub store: Arc<MemoryOrderStore>,
  pub gateway: Arc<StubGateway>,
  pub provider: Arc<StubPrintProvider>,
  pub designs: Arc<MemoryDesignRegistry>,
  pub notifier: Arc<RecordingNotifier>,
  pub orchestrator: Arc<FulfillmentOrchestrator>,
  pub events: Arc<PaymentEventProcessor>,
}

pub fn harness() -> TestHarness {
  harness_with_secret(Some(WEBHOOK_SECRET))
}

pub fn harness_with_secret(secret: Option<&str>) -> TestHarness {
  let store = Arc::new(MemoryOrderStore::new());
  let gateway = Arc::new(StubGateway::new(secret));
  let provider = Arc::new(StubPrintProvider::new());
  let designs = Arc::new(MemoryDesignRegistry::new());
  let notifier = Arc::new(RecordingNotifier::default());

  let orchestrator = Arc::new(FulfillmentOrchestrator::new(
    store.clone(),
    provider.clone(),
    designs.clone(),
    FulfillmentSettings::default(),
  ));
  let events = Arc::new(PaymentEventProcessor::new(
    gateway.clone(),
    store.clone(),
    notifier.clone(),
    orchestrator.clone(),
  ));

  TestHarness {
    store,
    gateway,
    provider,
    designs,
    notifier,
    orchestrator,
    events,
  }
}

// --- Fixtures ---

pub fn design(id: &str, printify_product_id: Option<&str>) -> DesignSummary {
  DesignSummary {
    id: id.to_string(),
    title: format!("Design {}", id),
    printify_product_id: printify_product_id.map(str::to_string),
  }
}

pub fn bella_canvas_product(id: &str) -> ProviderProduct {
  serde_json::from_value(json!({
    "id": id,
    "title": "Bella Canvas Tee",
    "variants": [
      { "id": 101, "title": "Bella Canvas / Black / S", "price": 1999, "is_enabled": true },
      { "id": 102, "title": "Bella Canvas / Black / M", "price": 1999, "is_enabled": true },
      { "id": 103, "title": "Bella Canvas / White / S", "price": 1999, "is_enabled": true },
      { "id": 104, "title": "Bella Canvas / White / M", "price": 1999, "is_enabled": true }
    ]
  }))
  .expect("valid product fixture")
}

/// A fully paid two-item session: design d1 (Black S) and d2 (White M),
/// $59.98 nominal discounted to $54.98 paid.
pub fn two_item_paid_session(session_id: &str) -> CheckoutSession {
  serde_json::from_value(json!({
    "id": session_id,
    "payment_status": "paid",
    "amount_total": 5498,
    "customer_details": { "email": "buyer@example.com", "name": "Jane Doe" },
    "payment_intent": { "id": "pi_1", "status": "succeeded" },
    "metadata": {
      "design_ids": "d1,d2",
      "product_types": "T-Shirt,T-Shirt",
      "colors": "Black,White",
      "sizes": "S,M"
    },
    "line_items": {
      "data": [
        { "description": "T-Shirt - Black - S", "quantity": 1, "amount_total": 2999 },
        { "description": "T-Shirt - White - M", "quantity": 1, "amount_total": 2999 }
      ]
    },
    "shipping_details": {
      "name": "Jane Doe",
      "address": {
        "line1": "123 Main St",
        "city": "Springfield",
        "state": "IL",
        "postal_code": "62704",
        "country": "US"
      }
    }
  }))
  .expect("valid session fixture")
}

/// Seeds designs d1/d2 and their catalog products so the two-item session is
/// fully fulfillable.
pub fn seed_two_designs(h: &TestHarness) {
  h.designs.put(design("d1", Some("prod_1")));
  h.designs.put(design("d2", Some("prod_2")));
  h.provider.put_product(bella_canvas_product("prod_1"));
  h.provider.put_product(bella_canvas_product("prod_2"));
}
