//! # Runtime
//!
//! Process start-up, controller watch loops and their error policies.
//!
//! ## Module Structure
//!
//! - `error_policy.rs` - Requeue and watch error handling
//! - `initialization.rs` - Start-up and per-kind contexts
//! - `watch_loop.rs` - Controller loops and shutdown

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
