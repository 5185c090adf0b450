// src/fulfillment/orchestrator.rs

//! The coordinator. Persists orders before any provider call is attempted,
//! resolves variants against the live catalog, submits to the print provider,
//! and captures every post-persistence failure into the order's status so
//! "what needs attention" is queryable rather than buried in logs.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::FulfillmentSettings;
use crate::errors::{AppError, Result};
use crate::fulfillment::variants::{resolve_variant, static_fallback_variant};
use crate::models::{LineItemDescriptor, NewOrder, Order, OrderPatch, OrderStatus, ShippingAddress};
use crate::services::designs::DesignRegistry;
use crate::services::printify::{AddressTo, CreateOrderRequest, FulfillmentError, OrderLineItem, PrintProvider};
use crate::store::OrderStore;

/// Statuses an "approve and ship" action may start from. `Processing` is
/// deliberately absent: a submitted order is never re-submitted.
const APPROVABLE_STATUSES: &[OrderStatus] = &[
  OrderStatus::PendingApproval,
  OrderStatus::Paid,
  OrderStatus::NeedsFulfillment,
  OrderStatus::PaymentReceived,
  OrderStatus::PrintifyError,
];

#[derive(Debug)]
pub enum SubmissionOutcome {
  Submitted { printify_order_id: String },
  /// A precondition failed; the order was parked in `needs_fulfillment` for
  /// an operator.
  NeedsFulfillment { reason: &'static str },
}

#[derive(Debug, Serialize)]
pub struct ApprovalOutcome {
  pub order_id: Uuid,
  pub status: OrderStatus,
  pub printify_order_id: Option<String>,
  pub reason: Option<String>,
}

/// One line of a manually created (free/approved) order request.
#[derive(Debug, Clone)]
pub struct ManualOrderItem {
  pub design_id: String,
  pub product_type: String,
  pub color: String,
  pub size: String,
  pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct ManualOrderContact {
  pub email: String,
  pub name: Option<String>,
  pub address: ShippingAddress,
}

pub struct FulfillmentOrchestrator {
  store: Arc<dyn OrderStore>,
  provider: Arc<dyn PrintProvider>,
  designs: Arc<dyn DesignRegistry>,
  settings: FulfillmentSettings,
}

impl FulfillmentOrchestrator {
  pub fn new(
    store: Arc<dyn OrderStore>,
    provider: Arc<dyn PrintProvider>,
    designs: Arc<dyn DesignRegistry>,
    settings: FulfillmentSettings,
  ) -> Self {
    Self {
      store,
      provider,
      designs,
      settings,
    }
  }

  /// Persists one webhook-derived order as `paid`. This runs before any
  /// provider call so a crash or outage never loses the fact that the
  /// customer paid.
  #[instrument(skip(self, descriptor, address), fields(design_id = %descriptor.design_id))]
  pub async fn create_paid_order(
    &self,
    descriptor: &LineItemDescriptor,
    customer_email: &str,
    customer_name: Option<&str>,
    address: ShippingAddress,
    session_id: &str,
    payment_intent_id: Option<&str>,
  ) -> Result<Order> {
    let order = self
      .store
      .insert(NewOrder {
        design_id: descriptor.design_id.clone(),
        customer_email: customer_email.to_string(),
        customer_name: customer_name.map(str::to_string),
        shipping_address: address,
        product_type: descriptor.product_type.clone(),
        color: descriptor.color.clone(),
        size: descriptor.size.clone(),
        quantity: descriptor.quantity,
        total_cents: descriptor.total_cents,
        stripe_session_id: Some(session_id.to_string()),
        stripe_payment_intent_id: payment_intent_id.map(str::to_string),
        status: OrderStatus::Paid,
      })
      .await?;

    info!(order_id = %order.id, total_cents = order.total_cents, "Order persisted from checkout session");

    // Sales-count bookkeeping is best-effort.
    if let Err(e) = self.designs.increment_sales(&descriptor.design_id, descriptor.quantity).await {
      warn!(design_id = %descriptor.design_id, error = %e, "Failed to increment design sales count");
    }

    Ok(order)
  }

  /// Automatic submission right after webhook-derived creation. Failures are
  /// captured into the order's status (`payment_received`), never propagated:
  /// the money is real and the order row already exists for retry.
  pub async fn fulfill_new_order(&self, order: &Order) {
    match self.submit_order(order, OrderStatus::PaymentReceived).await {
      Ok(SubmissionOutcome::Submitted { printify_order_id }) => {
        info!(order_id = %order.id, %printify_order_id, "Order auto-submitted to print provider");
      }
      Ok(SubmissionOutcome::NeedsFulfillment { reason }) => {
        warn!(order_id = %order.id, reason, "Order parked as needs_fulfillment");
      }
      Err(e) => {
        error!(order_id = %order.id, error = %e, "Automatic submission failed; order left retryable");
      }
    }
  }

  /// Manual "free/approved" creation. Each item lands as `pending_approval`,
  /// or straight in `needs_fulfillment` when its preconditions already fail.
  pub async fn create_free_orders(
    &self,
    items: &[ManualOrderItem],
    contact: &ManualOrderContact,
  ) -> Result<Vec<Order>> {
    let mut created = Vec::with_capacity(items.len());
    for item in items {
      let design = self.designs.get_design(&item.design_id).await?;
      let has_catalog_product = design
        .as_ref()
        .map(|d| d.printify_product_id.is_some())
        .unwrap_or(false);
      let status = if has_catalog_product && contact.address.is_shippable() {
        OrderStatus::PendingApproval
      } else {
        OrderStatus::NeedsFulfillment
      };

      let order = self
        .store
        .insert(NewOrder {
          design_id: item.design_id.clone(),
          customer_email: contact.email.clone(),
          customer_name: contact.name.clone(),
          shipping_address: contact.address.clone(),
          product_type: item.product_type.clone(),
          color: item.color.clone(),
          size: item.size.clone(),
          quantity: item.quantity,
          total_cents: 0,
          stripe_session_id: None,
          stripe_payment_intent_id: None,
          status,
        })
        .await?;
      info!(order_id = %order.id, status = order.status.as_str(), "Manual order created");
      created.push(order);
    }
    Ok(created)
  }

  /// Explicit "approve and ship". Rejects orders already in `processing`
  /// before anything else happens, so a duplicate approval never reaches the
  /// provider.
  #[instrument(skip(self))]
  pub async fn approve_order(&self, order_id: Uuid) -> Result<ApprovalOutcome> {
    let order = self
      .store
      .get(order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} does not exist", order_id)))?;

    if !order.status.is_approvable() {
      return Err(AppError::NotApprovable(order.status.as_str().to_string()));
    }

    match self.submit_order(&order, OrderStatus::PrintifyError).await? {
      SubmissionOutcome::Submitted { printify_order_id } => Ok(ApprovalOutcome {
        order_id,
        status: OrderStatus::Processing,
        printify_order_id: Some(printify_order_id),
        reason: None,
      }),
      SubmissionOutcome::NeedsFulfillment { reason } => Ok(ApprovalOutcome {
        order_id,
        status: OrderStatus::NeedsFulfillment,
        printify_order_id: None,
        reason: Some(reason.to_string()),
      }),
    }
  }

  /// The submission state machine. Precondition checks run in order:
  /// (a) the design must have a catalog product id, (b) the address must have
  /// a line1; either failure parks the order in `needs_fulfillment`;
  /// (c) variant resolution failure leaves the status untouched so a human
  /// can fix size/color data and retry; (d) a provider failure during
  /// submission moves the order to `failure_status` without losing the row.
  pub async fn submit_order(&self, order: &Order, failure_status: OrderStatus) -> Result<SubmissionOutcome> {
    let design = self
      .designs
      .get_design(&order.design_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Design '{}' for order {}", order.design_id, order.id)))?;

    let Some(product_id) = design.printify_product_id.clone() else {
      self.park_needs_fulfillment(order.id).await?;
      return Ok(SubmissionOutcome::NeedsFulfillment {
        reason: "design_has_no_catalog_product",
      });
    };

    if !order.shipping_address.is_shippable() {
      self.park_needs_fulfillment(order.id).await?;
      return Ok(SubmissionOutcome::NeedsFulfillment {
        reason: "missing_shipping_address",
      });
    }

    let variant_id = match self.provider.get_product(&product_id).await {
      Ok(product) => resolve_variant(&product, &order.size, &order.color)?,
      Err(lookup_err @ FulfillmentError::ProviderUnavailable(_))
        if self.settings.allow_static_variant_fallback =>
      {
        match static_fallback_variant(&order.size) {
          Some(variant_id) => {
            warn!(
              order_id = %order.id,
              %product_id,
              variant_id,
              error = %lookup_err,
              "Live catalog unreachable; using STATIC variant fallback (degraded path)"
            );
            variant_id
          }
          None => {
            self.capture_failure(order.id, failure_status, &lookup_err).await;
            return Err(lookup_err.into());
          }
        }
      }
      Err(lookup_err) => {
        self.capture_failure(order.id, failure_status, &lookup_err).await;
        return Err(lookup_err.into());
      }
    };

    // Compare-and-set to processing before the provider call: of two
    // concurrent approvals for the same order, exactly one gets past here.
    let claimed = self
      .store
      .transition(order.id, APPROVABLE_STATUSES, OrderStatus::Processing)
      .await?;
    if claimed.is_none() {
      warn!(order_id = %order.id, "Lost submission race; order no longer in an approvable status");
      return Err(AppError::NotApprovable(OrderStatus::Processing.as_str().to_string()));
    }

    let request = self.build_provider_request(order, &product_id, variant_id);
    match self.provider.create_order(&request).await {
      Ok(provider_order) => {
        self
          .store
          .update(
            order.id,
            OrderPatch {
              printify_order_id: Some(provider_order.id.clone()),
              ..OrderPatch::default()
            },
          )
          .await?;
        info!(
          order_id = %order.id,
          printify_order_id = %provider_order.id,
          provider_status = %provider_order.status,
          "Order submitted to print provider"
        );
        Ok(SubmissionOutcome::Submitted {
          printify_order_id: provider_order.id,
        })
      }
      Err(submit_err) => {
        self.capture_failure(order.id, failure_status, &submit_err).await;
        Err(submit_err.into())
      }
    }
  }

  /// Advances orders matching a `payment_intent.succeeded` reconciliation
  /// event. Upgrades only (`pending_approval -> paid`); every other status is
  /// already at-or-past paid. No matching order is a no-op, because the two
  /// Stripe events can arrive in either order.
  pub async fn reconcile_payment_intent(&self, payment_intent_id: &str) -> Result<usize> {
    let orders = self.store.find_by_payment_intent(payment_intent_id).await?;
    if orders.is_empty() {
      info!(%payment_intent_id, "payment_intent.succeeded with no matching order; ignoring");
      return Ok(0);
    }

    let mut upgraded = 0;
    for order in orders {
      if order.status != OrderStatus::PendingApproval {
        continue;
      }
      if self
        .store
        .transition(order.id, &[OrderStatus::PendingApproval], OrderStatus::Paid)
        .await?
        .is_some()
      {
        info!(order_id = %order.id, %payment_intent_id, "Order upgraded to paid via reconciliation");
        upgraded += 1;
      }
    }
    Ok(upgraded)
  }

  pub fn store(&self) -> &Arc<dyn OrderStore> {
    &self.store
  }

  async fn park_needs_fulfillment(&self, order_id: Uuid) -> Result<()> {
    self
      .store
      .update(
        order_id,
        OrderPatch {
          status: Some(OrderStatus::NeedsFulfillment),
          ..OrderPatch::default()
        },
      )
      .await?;
    Ok(())
  }

  /// Records a provider failure in the order row. The status write itself is
  /// best-effort: if it also fails we still return the provider error, and
  /// the order stays in its previous (approvable) status.
  async fn capture_failure(&self, order_id: Uuid, failure_status: OrderStatus, err: &FulfillmentError) {
    error!(
      %order_id,
      failure_status = failure_status.as_str(),
      retryable = err.is_retryable(),
      error = %err,
      "Provider call failed; capturing into order status"
    );
    let patch = OrderPatch {
      status: Some(failure_status),
      ..OrderPatch::default()
    };
    if let Err(store_err) = self.store.update(order_id, patch).await {
      error!(%order_id, error = %store_err, "Failed to record failure status on order");
    }
  }

  fn build_provider_request(&self, order: &Order, product_id: &str, variant_id: i64) -> CreateOrderRequest {
    let addr = &order.shipping_address;
    let display_name = addr
      .name
      .clone()
      .or_else(|| order.customer_name.clone())
      .unwrap_or_default();
    let (first_name, last_name) = match display_name.split_once(' ') {
      Some((first, last)) => (first.to_string(), last.to_string()),
      None => (display_name, String::new()),
    };

    CreateOrderRequest {
      // The local order id travels as the provider-side correlation id.
      external_id: order.id.to_string(),
      line_items: vec![OrderLineItem {
        product_id: product_id.to_string(),
        variant_id,
        quantity: order.quantity,
      }],
      shipping_method: 1,
      send_shipping_notification: false,
      address_to: AddressTo {
        first_name,
        last_name,
        email: order.customer_email.clone(),
        phone: addr.phone.clone().unwrap_or_default(),
        country: addr
          .country
          .clone()
          .unwrap_or_else(|| self.settings.default_country.clone()),
        region: addr.state.clone().unwrap_or_default(),
        address1: addr.line1.clone().unwrap_or_default(),
        address2: addr.line2.clone().unwrap_or_default(),
        city: addr.city.clone().unwrap_or_default(),
        zip: addr.postal_code.clone().unwrap_or_default(),
      },
    }
  }
}
