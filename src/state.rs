// src/state.rs

use std::sync::Arc;

use crate::config::AppConfig;
use crate::fulfillment::{FulfillmentOrchestrator, PaymentEventProcessor};
use crate::store::OrderStore;

/// Everything the handlers need, constructed once at process start. Each
/// collaborator sits behind a trait object so tests can substitute doubles
/// for the payment gateway and the print provider.
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn OrderStore>,
  pub events: Arc<PaymentEventProcessor>,
  pub orchestrator: Arc<FulfillmentOrchestrator>,
  pub config: Arc<AppConfig>,
}
