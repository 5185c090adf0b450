// src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::fulfillment::orchestrator::{ManualOrderContact, ManualOrderItem};
use crate::models::{OrderStatus, ShippingAddress};
use crate::state::AppState;

// --- DTOs ---

#[derive(Debug, Deserialize)]
pub struct FreeOrderRequest {
  pub items: Vec<FreeOrderItem>,
  pub shipping: FreeOrderShipping,
}

#[derive(Debug, Deserialize)]
pub struct FreeOrderItem {
  pub design_id: String,
  pub product_type: String,
  pub color: String,
  pub size: String,
  #[serde(default = "default_quantity")]
  pub quantity: i64,
}

fn default_quantity() -> i64 {
  1
}

#[derive(Debug, Deserialize)]
pub struct FreeOrderShipping {
  pub email: String,
  pub name: Option<String>,
  pub phone: Option<String>,
  pub line1: Option<String>,
  pub line2: Option<String>,
  pub city: Option<String>,
  pub state: Option<String>,
  pub postal_code: Option<String>,
  pub country: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreatedOrderSummary {
  order_id: Uuid,
  status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
  pub status: OrderStatus,
}

// --- Handlers ---

#[instrument(name = "handler::approve_order", skip(app_state))]
pub async fn approve_order_handler(
  app_state: web::Data<AppState>,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let outcome = app_state.orchestrator.approve_order(order_id.into_inner()).await?;
  info!(status = outcome.status.as_str(), "Approval handled");
  Ok(HttpResponse::Ok().json(outcome))
}

#[instrument(name = "handler::create_free_orders", skip(app_state, payload))]
pub async fn create_free_orders_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<FreeOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  if payload.items.is_empty() {
    return Err(AppError::Validation("Free order request contains no items".to_string()));
  }

  let items: Vec<ManualOrderItem> = payload
    .items
    .into_iter()
    .map(|item| ManualOrderItem {
      design_id: item.design_id,
      product_type: item.product_type,
      color: item.color,
      size: item.size,
      quantity: item.quantity,
    })
    .collect();

  let shipping = payload.shipping;
  let contact = ManualOrderContact {
    email: shipping.email,
    name: shipping.name.clone(),
    address: ShippingAddress {
      name: shipping.name,
      phone: shipping.phone,
      line1: shipping.line1,
      line2: shipping.line2,
      city: shipping.city,
      state: shipping.state,
      postal_code: shipping.postal_code,
      country: shipping.country,
    },
  };

  let orders = app_state.orchestrator.create_free_orders(&items, &contact).await?;
  let summaries: Vec<CreatedOrderSummary> = orders
    .iter()
    .map(|o| CreatedOrderSummary {
      order_id: o.id,
      status: o.status,
    })
    .collect();

  info!(created = summaries.len(), "Free orders created");
  Ok(HttpResponse::Created().json(json!({ "orders": summaries })))
}

#[instrument(name = "handler::list_orders", skip(app_state))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.store.list_by_status(query.status).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}
