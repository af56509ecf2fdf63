//! # Observability
//!
//! Prometheus metrics for the controller and every outgoing AWS call.

pub mod metrics;
