//! # ProviderConfig Usage
//!
//! A `ProviderConfigUsage` links a record to the ProviderConfig it uses. It
//! is created before the first SDK call on behalf of the record and removed
//! when the record is finalized. The usage is owned by the record, so the
//! garbage collector also removes it if finalization is skipped.

use super::Managed;
use crate::constants::PROVIDER_CONFIG_LABEL;
use crate::crd::{ProviderConfigReference, ProviderConfigUsage, ProviderConfigUsageSpec, TypedReference};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, DeleteParams, ObjectMeta, PostParams};
#[cfg(test)]
use mockall::automock;
use std::collections::BTreeMap;
use tracing::debug;

/// One record's use of one ProviderConfig
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub provider_config: String,
    pub resource: TypedReference,
}

impl Usage {
    pub fn of<R: Managed>(record: &R) -> Self {
        let meta = record.meta();
        Self {
            provider_config: record.resource_spec().provider_config_name().to_string(),
            resource: TypedReference {
                api_version: R::api_version(&()).into_owned(),
                kind: R::kind(&()).into_owned(),
                name: meta.name.clone().unwrap_or_default(),
                uid: meta.uid.clone(),
            },
        }
    }

    /// Name of the usage object: the record UID when known
    pub fn object_name(&self) -> String {
        match &self.resource.uid {
            Some(uid) if !uid.is_empty() => uid.clone(),
            _ => format!(
                "{}-{}",
                self.resource.kind.to_ascii_lowercase(),
                self.resource.name
            ),
        }
    }

    /// Usage object to create in the cluster
    pub fn to_object(&self) -> ProviderConfigUsage {
        let owner_references = self.resource.uid.as_ref().map(|uid| {
            vec![OwnerReference {
                api_version: self.resource.api_version.clone(),
                kind: self.resource.kind.clone(),
                name: self.resource.name.clone(),
                uid: uid.clone(),
                ..OwnerReference::default()
            }]
        });
        ProviderConfigUsage {
            metadata: ObjectMeta {
                name: Some(self.object_name()),
                labels: Some(BTreeMap::from([(
                    PROVIDER_CONFIG_LABEL.to_string(),
                    self.provider_config.clone(),
                )])),
                owner_references,
                ..ObjectMeta::default()
            },
            spec: ProviderConfigUsageSpec {
                provider_config_ref: ProviderConfigReference {
                    name: self.provider_config.clone(),
                },
                resource_ref: self.resource.clone(),
            },
        }
    }
}

/// Records and releases ProviderConfig usages
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UsageTracker: Send + Sync {
    /// Idempotent
    async fn track(&self, usage: &Usage) -> Result<()>;

    /// Idempotent
    async fn release(&self, usage: &Usage) -> Result<()>;
}

/// [`UsageTracker`] backed by `ProviderConfigUsage` objects
#[derive(Clone)]
pub struct KubeUsageTracker {
    api: Api<ProviderConfigUsage>,
}

impl std::fmt::Debug for KubeUsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeUsageTracker").finish_non_exhaustive()
    }
}

impl KubeUsageTracker {
    pub fn new(client: kube::Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl UsageTracker for KubeUsageTracker {
    async fn track(&self, usage: &Usage) -> Result<()> {
        match self.api.create(&PostParams::default(), &usage.to_object()).await {
            Ok(_) => {
                debug!(
                    provider_config = %usage.provider_config,
                    resource.kind = %usage.resource.kind,
                    resource.name = %usage.resource.name,
                    "Recorded provider config usage"
                );
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn release(&self, usage: &Usage) -> Result<()> {
        match self
            .api
            .delete(&usage.object_name(), &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
