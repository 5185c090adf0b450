// src/web/handlers/mod.rs

pub mod order_handlers;
pub mod webhook_handlers;
