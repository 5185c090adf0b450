// src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(
    name = "handler::stripe_webhook",
    skip(app_state, req, body),
    fields(payload_len = body.len())
)]
pub async fn stripe_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes, // Raw request body; signature verification needs the exact bytes
) -> Result<HttpResponse, AppError> {
  let signature_header = req
    .headers()
    .get("stripe-signature")
    .and_then(|h_val| h_val.to_str().ok());

  info!(
    has_signature = signature_header.is_some(),
    "Received Stripe webhook delivery"
  );

  // A verification failure propagates as an error response (400/500); any
  // handled event acknowledges receipt so the provider stops redelivering.
  let ack = app_state.events.process(&body, signature_header).await?;

  info!(
    orders_created = ack.orders_created.len(),
    orders_upgraded = ack.orders_upgraded,
    "Webhook delivery handled"
  );
  Ok(HttpResponse::Ok().json(ack))
}
