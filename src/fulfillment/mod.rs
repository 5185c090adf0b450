// src/fulfillment/mod.rs

//! The fulfillment core: variant resolution against the live catalog, the
//! payment-event processor that turns verified checkout sessions into orders,
//! and the orchestrator that drives each order through the provider.

pub mod events;
pub mod orchestrator;
pub mod variants;

pub use events::{PaymentEventProcessor, WebhookAck};
pub use orchestrator::{ApprovalOutcome, FulfillmentOrchestrator, SubmissionOutcome};
