//! HTTP middleware shared across services.

pub mod metrics;
pub mod security_headers;
pub mod tracing;
