//! # Lifecycle Contract
//!
//! What the runtime calls per record, and what it gets back.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Secrets produced by the remote object, keyed by name
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

/// Result of observing the remote object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalObservation {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
    /// The declared spec was late-initialized and persisted
    pub resource_late_initialized: bool,
    pub connection_details: ConnectionDetails,
    /// JSON patch towards the declared state; empty when up to date
    pub diff: String,
}

impl ExternalObservation {
    /// The remote object does not exist
    pub fn absent() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalCreation {
    pub connection_details: ConnectionDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalUpdate {
    pub connection_details: ConnectionDetails,
}

/// Lifecycle operations on the remote counterpart of a record.
///
/// Operations take the record mutably: observe writes late-initialized
/// fields and the observation block, create may assign the external name.
#[async_trait]
pub trait ExternalClient<R>: Send + Sync {
    async fn observe(&self, record: &mut R) -> Result<ExternalObservation>;
    async fn create(&self, record: &mut R) -> Result<ExternalCreation>;
    async fn update(&self, record: &mut R) -> Result<ExternalUpdate>;
    async fn delete(&self, record: &mut R) -> Result<()>;
}

/// Builds an [`ExternalClient`] authenticated for one record
#[async_trait]
pub trait Connector<R>: Send + Sync {
    async fn connect(&self, record: &R) -> Result<Box<dyn ExternalClient<R>>>;
}
