// src/lib.rs

//! Print-on-demand storefront backend: takes confirmed Stripe payment events,
//! durably records orders, resolves them to concrete Printify variants, and
//! drives them through fulfillment while tolerating partial failures at every
//! external boundary.

pub mod config;
pub mod errors;
pub mod fulfillment;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
