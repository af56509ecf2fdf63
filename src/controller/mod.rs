//! # Controller
//!
//! Runtime glue around the managed-resource template.
//!
//! ## Module Structure
//!
//! - `backoff.rs` - Fibonacci error backoff per record
//! - `managed.rs` - One reconciliation pass over a managed record
//! - `provider_config.rs` - ProviderConfig usage counting and in-use finalizer
//! - `server.rs` - Metrics and probe HTTP server

pub mod backoff;
pub mod managed;
pub mod provider_config;
pub mod server;

pub use managed::{reconcile_once, ManagedContext, Outcome};
