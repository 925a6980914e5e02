//! Switchyard Observability
//!
//! This crate provides observability features:
//! - Structured logging (tracing-subscriber initialization)
//! - Routing metrics collection (Prometheus)

pub mod logging;
pub mod metrics;

pub use logging::{LogFormat, LoggingConfig, LoggingError, init_logging};
pub use metrics::{RequestKind, RoutingMetrics};
