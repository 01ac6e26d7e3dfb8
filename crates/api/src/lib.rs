//! HTTP API: server, routing, and request/response mapping.
//!
//! Thin by construction: every handler hands its input to
//! [`stockflow_infra::InventoryService`] and maps the outcome.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
