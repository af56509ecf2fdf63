//! # Reference Resolution
//!
//! Declared fields that point at other records may be given as a literal, a
//! name reference, or a label selector. Resolution writes the referenced
//! record's external name into the literal; a literal that is already set
//! wins.

use crate::crd::{Reference, Selector};
use crate::error::{Error, Result};
use async_trait::async_trait;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams};
use kube::Resource;
#[cfg(test)]
use mockall::automock;

/// Kind a reference points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
}

impl ReferenceTarget {
    pub fn of<K: Resource<DynamicType = ()>>() -> Self {
        Self {
            group: K::group(&()).into_owned(),
            version: K::version(&()).into_owned(),
            kind: K::kind(&()).into_owned(),
            plural: K::plural(&()).into_owned(),
        }
    }

    fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk_with_plural(
            &GroupVersionKind::gvk(&self.group, &self.version, &self.kind),
            &self.plural,
        )
    }
}

/// Reads referenced records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReferenceReader: Send + Sync {
    /// External name of the named record, empty when not yet assigned
    async fn external_name(&self, target: &ReferenceTarget, name: &str) -> Result<String>;

    /// External name of the first record matching the selector
    async fn select(&self, target: &ReferenceTarget, selector: &Selector) -> Result<Option<String>>;
}

/// [`ReferenceReader`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeReferenceReader {
    client: kube::Client,
}

impl std::fmt::Debug for KubeReferenceReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeReferenceReader").finish_non_exhaustive()
    }
}

impl KubeReferenceReader {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn api(&self, target: &ReferenceTarget) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), &target.api_resource())
    }
}

#[async_trait]
impl ReferenceReader for KubeReferenceReader {
    async fn external_name(&self, target: &ReferenceTarget, name: &str) -> Result<String> {
        let object = self.api(target).get(name).await?;
        Ok(super::external_name(&object).to_string())
    }

    async fn select(&self, target: &ReferenceTarget, selector: &Selector) -> Result<Option<String>> {
        let labels = selector
            .match_labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        let list = self
            .api(target)
            .list(&ListParams::default().labels(&labels))
            .await?;
        Ok(list
            .items
            .iter()
            .map(|o| super::external_name(o).to_string())
            .find(|n| !n.is_empty()))
    }
}

/// Resolve one literal/reference/selector triple.
///
/// Returns whether `value` was written.
pub async fn resolve_field(
    reader: &dyn ReferenceReader,
    target: &ReferenceTarget,
    value: &mut Option<String>,
    reference: Option<&Reference>,
    selector: Option<&Selector>,
) -> Result<bool> {
    if value.as_deref().is_some_and(|v| !v.is_empty()) {
        return Ok(false);
    }
    let resolved = if let Some(reference) = reference {
        let name = reader.external_name(target, &reference.name).await?;
        if name.is_empty() {
            return Err(Error::precondition(format!(
                "referenced {} {} is not ready yet",
                target.kind, reference.name
            )));
        }
        name
    } else if let Some(selector) = selector {
        reader.select(target, selector).await?.ok_or_else(|| {
            Error::precondition(format!("no ready {} matches the selector", target.kind))
        })?
    } else {
        return Ok(false);
    };
    *value = Some(resolved);
    Ok(true)
}
