//! Axum web adapter for the stagehand relay supervisor.
//!
//! Exposes relay status, start/stop, publish paths, configuration, relay
//! logs and a lifecycle event stream under `/api/relay`.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use async_trait as _;
#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;
#[cfg(test)]
use tower as _;

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod sse;
pub mod state;

pub use bootstrap::{AxumContext, CorsConfig, ServerConfig, bootstrap, start_server};
pub use error::{ApiResponse, HttpError};
pub use routes::create_router;
pub use state::AppState;
