// src/services/mod.rs

//! Thin adapters over the external collaborators. Each boundary is a trait so
//! the orchestrator can be wired to a test double instead of the live service.

pub mod designs;
pub mod email;
pub mod printify;
pub mod stripe;
