//! HTTP request handlers for the Axum web server.
//!
//! Handlers are thin wrappers that delegate to `RelaySupervisor`.

pub mod events;
pub mod relay;
