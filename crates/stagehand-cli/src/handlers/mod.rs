//! Command handlers.

pub mod probe;
pub mod relay;
pub mod serve;
