// src/store/mod.rs

//! Durable persistence for order records. The orchestrator is the only writer
//! once an order exists; every mutation is per-row and keyed by order id.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{NewOrder, Order, OrderPatch, OrderStatus};

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Persists a new order. Validates the creation invariants and assigns the
  /// id and timestamp. The row must exist before any provider call is made.
  async fn insert(&self, new_order: NewOrder) -> Result<Order>;

  async fn get(&self, id: Uuid) -> Result<Option<Order>>;

  /// Partial update: only the patch's supplied fields change. Returns the
  /// updated row, or `None` when the order does not exist.
  async fn update(&self, id: Uuid, patch: OrderPatch) -> Result<Option<Order>>;

  /// Atomic compare-and-set on status: succeeds only when the current status
  /// is one of `allowed_from`. Serializes concurrent approval requests so the
  /// provider is never double-submitted.
  async fn transition(&self, id: Uuid, allowed_from: &[OrderStatus], to: OrderStatus) -> Result<Option<Order>>;

  /// Reconciliation lookup for out-of-order `payment_intent.succeeded`
  /// events. One session can yield several orders sharing a payment intent.
  async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Vec<Order>>;

  /// Idempotency lookup: has this (session, design) line item already been
  /// turned into an order?
  async fn find_by_session_and_design(&self, session_id: &str, design_id: &str) -> Result<Option<Order>>;

  /// The operator's "what needs attention" query.
  async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>>;
}

pub use memory::MemoryOrderStore;
pub use pg::PgOrderStore;
