// src/store/pg.rs

//! Postgres `OrderStore`. Queries are runtime-bound (no compile-time macros)
//! so the crate builds without a live database; see schema.sql for the DDL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{NewOrder, Order, OrderPatch, OrderStatus, ShippingAddress};
use crate::store::OrderStore;

const ORDER_COLUMNS: &str = "id, design_id, customer_email, customer_name, shipping_address, \
   product_type, color, size, quantity, total_cents, stripe_session_id, \
   stripe_payment_intent_id, printify_order_id, status, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
  id: Uuid,
  design_id: String,
  customer_email: String,
  customer_name: Option<String>,
  shipping_address: Json<ShippingAddress>,
  product_type: String,
  color: String,
  size: String,
  quantity: i64,
  total_cents: i64,
  stripe_session_id: Option<String>,
  stripe_payment_intent_id: Option<String>,
  printify_order_id: Option<String>,
  status: OrderStatus,
  created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
  fn from(row: OrderRow) -> Self {
    Order {
      id: row.id,
      design_id: row.design_id,
      customer_email: row.customer_email,
      customer_name: row.customer_name,
      shipping_address: row.shipping_address.0,
      product_type: row.product_type,
      color: row.color,
      size: row.size,
      quantity: row.quantity,
      total_cents: row.total_cents,
      stripe_session_id: row.stripe_session_id,
      stripe_payment_intent_id: row.stripe_payment_intent_id,
      printify_order_id: row.printify_order_id,
      status: row.status,
      created_at: row.created_at,
    }
  }
}

pub struct PgOrderStore {
  pool: PgPool,
}

impl PgOrderStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl OrderStore for PgOrderStore {
  async fn insert(&self, new_order: NewOrder) -> Result<Order> {
    new_order.validate()?;
    let sql = format!(
      "INSERT INTO orders (id, design_id, customer_email, customer_name, shipping_address, \
         product_type, color, size, quantity, total_cents, stripe_session_id, \
         stripe_payment_intent_id, status, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
       RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(Uuid::new_v4())
      .bind(&new_order.design_id)
      .bind(&new_order.customer_email)
      .bind(&new_order.customer_name)
      .bind(Json(&new_order.shipping_address))
      .bind(&new_order.product_type)
      .bind(&new_order.color)
      .bind(&new_order.size)
      .bind(new_order.quantity)
      .bind(new_order.total_cents)
      .bind(&new_order.stripe_session_id)
      .bind(&new_order.stripe_payment_intent_id)
      .bind(new_order.status)
      .bind(Utc::now())
      .fetch_one(&self.pool)
      .await?;
    Ok(row.into())
  }

  async fn get(&self, id: Uuid) -> Result<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Order::from))
  }

  async fn update(&self, id: Uuid, patch: OrderPatch) -> Result<Option<Order>> {
    // COALESCE keeps unspecified fields untouched; the write stays a single
    // atomic row update.
    let sql = format!(
      "UPDATE orders SET \
         status = COALESCE($2, status), \
         printify_order_id = COALESCE($3, printify_order_id), \
         stripe_payment_intent_id = COALESCE($4, stripe_payment_intent_id) \
       WHERE id = $1 \
       RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(id)
      .bind(patch.status)
      .bind(patch.printify_order_id)
      .bind(patch.stripe_payment_intent_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Order::from))
  }

  async fn transition(&self, id: Uuid, allowed_from: &[OrderStatus], to: OrderStatus) -> Result<Option<Order>> {
    let allowed: Vec<String> = allowed_from.iter().map(|s| s.as_str().to_string()).collect();
    let sql = format!(
      "UPDATE orders SET status = $3 \
       WHERE id = $1 AND status::text = ANY($2) \
       RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(id)
      .bind(&allowed)
      .bind(to)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Order::from))
  }

  async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Vec<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE stripe_payment_intent_id = $1");
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(payment_intent_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(rows.into_iter().map(Order::from).collect())
  }

  async fn find_by_session_and_design(&self, session_id: &str, design_id: &str) -> Result<Option<Order>> {
    let sql = format!(
      "SELECT {ORDER_COLUMNS} FROM orders \
       WHERE stripe_session_id = $1 AND design_id = $2 \
       LIMIT 1"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(session_id)
      .bind(design_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Order::from))
  }

  async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE status = $1 ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(status)
      .fetch_all(&self.pool)
      .await?;
    Ok(rows.into_iter().map(Order::from).collect())
  }
}
