//! # ProviderConfig Controller
//!
//! Counts the `ProviderConfigUsage` objects that name a ProviderConfig,
//! writes the count to `status.users`, and holds the in-use finalizer while
//! the count is positive. A ProviderConfig that is still in use therefore
//! cannot be deleted.

use crate::config::ControllerConfig;
use crate::constants::{FIELD_MANAGER, IN_USE_FINALIZER, PROVIDER_CONFIG_LABEL};
use crate::crd::{ProviderConfig, ProviderConfigUsage};
use crate::error::{Result, ResultExt};
use crate::managed::{add_finalizer, record_name, remove_finalizer};
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube_runtime::reflector::ObjectRef;
use kube::Client;
use kube_runtime::controller::Action;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

/// Shared state for the ProviderConfig controller
#[derive(Clone)]
pub struct ProviderConfigContext {
    pub client: Client,
    pub config: ControllerConfig,
}

impl std::fmt::Debug for ProviderConfigContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfigContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Label selector matching the usages of `name`
pub fn usage_selector(name: &str) -> String {
    format!("{PROVIDER_CONFIG_LABEL}={name}")
}

/// ProviderConfig a usage object points at, for the controller's watch
pub fn usage_owner(usage: &ProviderConfigUsage) -> Option<ObjectRef<ProviderConfig>> {
    usage
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(PROVIDER_CONFIG_LABEL))
        .map(|name| ObjectRef::new(name.as_str()))
}

/// Apply the in-use finalizer rule; returns whether metadata changed
pub fn sync_finalizer(config: &mut ProviderConfig, users: usize) -> bool {
    if users > 0 {
        add_finalizer(config, IN_USE_FINALIZER)
    } else {
        remove_finalizer(config, IN_USE_FINALIZER)
    }
}

pub async fn reconcile(obj: Arc<ProviderConfig>, ctx: Arc<ProviderConfigContext>) -> Result<Action> {
    let name = record_name(obj.as_ref()).to_string();
    let span = info_span!("reconcile", resource.kind = "ProviderConfig", resource.name = name.as_str());

    async move {
        let usages: Api<ProviderConfigUsage> = Api::all(ctx.client.clone());
        let users = usages
            .list(&ListParams::default().labels(&usage_selector(&name)))
            .await
            .wrap_err("cannot list provider config usages")?
            .items
            .len();

        let configs: Api<ProviderConfig> = Api::all(ctx.client.clone());
        let mut config = (*obj).clone();
        if sync_finalizer(&mut config, users) {
            info!(users, "Updating in-use finalizer");
            let finalizers = config.metadata.finalizers.clone().unwrap_or_default();
            configs
                .patch(
                    &name,
                    &PatchParams::default(),
                    &Patch::Merge(json!({ "metadata": { "finalizers": finalizers } })),
                )
                .await
                .wrap_err("cannot update in-use finalizer")?;
        }

        if users == 0 && config.metadata.deletion_timestamp.is_some() {
            debug!("ProviderConfig released");
            return Ok(Action::await_change());
        }

        configs
            .patch_status(
                &name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(json!({ "status": { "users": users } })),
            )
            .await
            .wrap_err("cannot update provider config status")?;
        debug!(users, "ProviderConfig usage recorded");
        Ok(Action::requeue(ctx.config.sync_interval()))
    }
    .instrument(span)
    .await
}
