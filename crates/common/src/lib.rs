//! Shared building blocks: logging bootstrap, Prometheus metrics and small wire types.

pub mod types;
pub mod utils;
pub mod telemetry;
