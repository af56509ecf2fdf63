//! Persisting records back to the cluster.

use super::Managed;
use crate::constants::FIELD_MANAGER;
use crate::error::Result;
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams, PostParams};
#[cfg(test)]
use mockall::automock;
use serde_json::json;

/// Writes records back to the cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordStore<R: Managed>: Send + Sync {
    /// Persist metadata and spec; refreshes the record's resource version
    async fn update(&self, record: &mut R) -> Result<()>;

    /// Persist the status block
    async fn update_status(&self, record: &R) -> Result<()>;
}

/// [`RecordStore`] backed by the Kubernetes API
pub struct KubeRecordStore<R: Managed> {
    api: Api<R>,
}

impl<R: Managed> std::fmt::Debug for KubeRecordStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeRecordStore")
            .field("kind", &R::kind(&()))
            .finish()
    }
}

impl<R: Managed> KubeRecordStore<R> {
    pub fn new(client: kube::Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl<R: Managed> RecordStore<R> for KubeRecordStore<R> {
    async fn update(&self, record: &mut R) -> Result<()> {
        let name = super::record_name(record).to_string();
        let updated = self
            .api
            .replace(&name, &PostParams::default(), record)
            .await?;
        // The in-memory status is newer than the stored one.
        record.meta_mut().resource_version = updated.meta().resource_version.clone();
        Ok(())
    }

    async fn update_status(&self, record: &R) -> Result<()> {
        let name = super::record_name(record);
        self.api
            .patch_status(
                name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(json!({ "status": record.managed_status() })),
            )
            .await?;
        Ok(())
    }
}
