//! Telemetry for the funnel pipeline.
//!
//! Structured logs via `tracing`, a process-wide health registry, and
//! in-memory counters reported through the health and metrics endpoints.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
