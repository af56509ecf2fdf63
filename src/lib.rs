//! AWS Provider Controller Library
//!
//! Reconciles declared AWS resources (classic load balancers, IAM roles,
//! users, groups and memberships, CloudFront distributions) held as
//! Kubernetes records against their remote state.
//!
//! ## Quick Start
//!
//! ```rust
//! use aws_provider_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod clients;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod drift;
pub mod error;
pub mod managed;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
