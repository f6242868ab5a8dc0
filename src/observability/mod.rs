//! # Observability
//!
//! Prometheus metrics for the controller, exposed by the HTTP server.

pub mod metrics;
