// src/models/mod.rs

//! Data structures for the fulfillable unit of work and its line items.

pub mod line_item;
pub mod order;

pub use line_item::LineItemDescriptor;
pub use order::{NewOrder, Order, OrderPatch, OrderStatus, ShippingAddress};
