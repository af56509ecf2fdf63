//! # Managed-Resource Reconciler
//!
//! The Observe/Create/Update/Delete contract every record kind is driven
//! through, and the template implementing it once for all kinds.
//!
//! ## Module Structure
//!
//! - `conditions.rs` - Ready and Synced conditions
//! - `external.rs` - Lifecycle contract and its result types
//! - `meta.rs` - External name and finalizer helpers
//! - `references.rs` - Cross-record reference resolution
//! - `store.rs` - Persisting records back to the cluster
//! - `template.rs` - Hook-based default lifecycle implementation
//! - `usage.rs` - ProviderConfigUsage tracking

pub mod conditions;
pub mod external;
pub mod meta;
pub mod references;
pub mod store;
pub mod template;
pub mod usage;

pub use external::{
    ConnectionDetails, Connector, ExternalClient, ExternalCreation, ExternalObservation,
    ExternalUpdate,
};
pub use meta::{
    add_finalizer, external_name, has_finalizer, is_deleting, record_name, remove_finalizer,
    set_external_name,
};
pub use references::{KubeReferenceReader, ReferenceReader, ReferenceTarget};
pub use store::{KubeRecordStore, RecordStore};
pub use template::{ManagedExternal, ResourceClient};
pub use usage::{KubeUsageTracker, Usage, UsageTracker};

use crate::constants::GLOBAL_REGION;
use crate::crd::{Condition, ManagedStatus, ResourceSpec};
use crate::error::Result;
use async_trait::async_trait;
use kube::core::ClusterResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A cluster-scoped record driven toward a remote object
#[async_trait]
pub trait Managed:
    Resource<DynamicType = (), Scope = ClusterResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Declared parameters (`spec.forProvider`)
    type ForProvider: Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync;
    /// Observed fields (`status.atProvider`)
    type AtProvider: Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync;

    fn resource_spec(&self) -> &ResourceSpec;
    fn for_provider(&self) -> &Self::ForProvider;
    fn for_provider_mut(&mut self) -> &mut Self::ForProvider;
    fn managed_status(&self) -> Option<&ManagedStatus<Self::AtProvider>>;
    fn managed_status_mut(&mut self) -> &mut ManagedStatus<Self::AtProvider>;

    /// Region the remote object lives in
    fn region(&self) -> String {
        GLOBAL_REGION.to_string()
    }

    /// External name to assign before the first observation, if any.
    ///
    /// Kinds whose identifier is chosen by the service return `None` and set
    /// the external name after create instead.
    fn initial_external_name(&self) -> Option<String> {
        self.meta().name.clone()
    }

    /// Resolve references into literal values; returns whether anything changed
    async fn resolve_references(&mut self, _reader: &dyn ReferenceReader) -> Result<bool> {
        Ok(false)
    }

    fn conditions(&self) -> &[Condition] {
        self.managed_status()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    fn at_provider(&self) -> Option<&Self::AtProvider> {
        self.managed_status().and_then(|s| s.at_provider.as_ref())
    }
}

/// Implement [`Managed`] for a CRD with `spec.resource_spec`, `spec.for_provider`
/// and an optional `status` of `ManagedStatus<$at>`.
///
/// An optional trailing block adds or overrides trait items.
#[macro_export]
macro_rules! impl_managed {
    ($kind:ty, $for_provider:ty, $at_provider:ty $(, { $($extra:tt)* })?) => {
        #[async_trait::async_trait]
        impl $crate::managed::Managed for $kind {
            type ForProvider = $for_provider;
            type AtProvider = $at_provider;

            fn resource_spec(&self) -> &$crate::crd::ResourceSpec {
                &self.spec.resource_spec
            }

            fn for_provider(&self) -> &$for_provider {
                &self.spec.for_provider
            }

            fn for_provider_mut(&mut self) -> &mut $for_provider {
                &mut self.spec.for_provider
            }

            fn managed_status(&self) -> Option<&$crate::crd::ManagedStatus<$at_provider>> {
                self.status.as_ref()
            }

            fn managed_status_mut(&mut self) -> &mut $crate::crd::ManagedStatus<$at_provider> {
                self.status.get_or_insert_with(Default::default)
            }

            $($($extra)*)?
        }
    };
}
