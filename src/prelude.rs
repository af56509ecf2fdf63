//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use aws_provider_controller::prelude::*;
//! ```

// CRD types - most commonly used
pub use crate::crd::*;

// Lifecycle contract and the template implementing it
pub use crate::managed::{
    Connector, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate, Managed,
    ManagedExternal, RecordStore, ReferenceReader, ResourceClient, UsageTracker,
};

// Reconciler types - core controller functionality
pub use crate::controller::{reconcile_once, ManagedContext, Outcome};

// Config types - for configuration management
pub use crate::config::{ControllerConfig, ServerConfig};

// Common error types
pub use crate::error::{Error, ErrorKind, Result, ResultExt};

// Session resolution
pub use crate::clients::{AwsSession, ClientResolver};
