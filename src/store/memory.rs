// src/store/memory.rs

//! In-memory `OrderStore` used by tests and local development. The single
//! `RwLock` over the map makes `transition` a true compare-and-set.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{NewOrder, Order, OrderPatch, OrderStatus};
use crate::store::OrderStore;

#[derive(Default)]
pub struct MemoryOrderStore {
  orders: RwLock<HashMap<Uuid, Order>>,
}

impl MemoryOrderStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.orders.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.orders.read().is_empty()
  }
}

fn apply_patch(order: &mut Order, patch: OrderPatch) {
  if let Some(status) = patch.status {
    order.status = status;
  }
  if let Some(printify_order_id) = patch.printify_order_id {
    order.printify_order_id = Some(printify_order_id);
  }
  if let Some(payment_intent_id) = patch.stripe_payment_intent_id {
    order.stripe_payment_intent_id = Some(payment_intent_id);
  }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
  async fn insert(&self, new_order: NewOrder) -> Result<Order> {
    new_order.validate()?;
    let order = new_order.into_order(Uuid::new_v4(), Utc::now());
    self.orders.write().insert(order.id, order.clone());
    Ok(order)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Order>> {
    Ok(self.orders.read().get(&id).cloned())
  }

  async fn update(&self, id: Uuid, patch: OrderPatch) -> Result<Option<Order>> {
    let mut orders = self.orders.write();
    let Some(order) = orders.get_mut(&id) else {
      return Ok(None);
    };
    apply_patch(order, patch);
    Ok(Some(order.clone()))
  }

  async fn transition(&self, id: Uuid, allowed_from: &[OrderStatus], to: OrderStatus) -> Result<Option<Order>> {
    let mut orders = self.orders.write();
    let Some(order) = orders.get_mut(&id) else {
      return Ok(None);
    };
    if !allowed_from.contains(&order.status) {
      return Ok(None);
    }
    order.status = to;
    Ok(Some(order.clone()))
  }

  async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Vec<Order>> {
    Ok(
      self
        .orders
        .read()
        .values()
        .filter(|o| o.stripe_payment_intent_id.as_deref() == Some(payment_intent_id))
        .cloned()
        .collect(),
    )
  }

  async fn find_by_session_and_design(&self, session_id: &str, design_id: &str) -> Result<Option<Order>> {
    Ok(
      self
        .orders
        .read()
        .values()
        .find(|o| o.stripe_session_id.as_deref() == Some(session_id) && o.design_id == design_id)
        .cloned(),
    )
  }

  async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .orders
      .read()
      .values()
      .filter(|o| o.status == status)
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }
}
