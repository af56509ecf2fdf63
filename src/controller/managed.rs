//! # Managed Record Reconciliation
//!
//! Drives one pass over a managed record: external name, references,
//! connect, observe, then delete, create or update as the observation
//! demands. Conditions and the observation block are patched onto the
//! record's status at the end of every pass, failed passes included.

use super::backoff::{BackoffState, BackoffStates};
use crate::config::ControllerConfig;
use crate::constants::MANAGED_FINALIZER;
use crate::crd::DeletionPolicy;
use crate::error::{Error, Result, ResultExt};
use crate::managed::conditions::{self, set_condition};
use crate::managed::{
    add_finalizer, external_name, is_deleting, record_name, remove_finalizer, set_external_name,
    Connector, Managed, RecordStore, ReferenceReader, Usage, UsageTracker,
};
use crate::observability::metrics;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Shared state for the controller of one record kind
pub struct ManagedContext<R: Managed> {
    pub connector: Arc<dyn Connector<R>>,
    pub store: Arc<dyn RecordStore<R>>,
    pub usage: Arc<dyn UsageTracker>,
    pub references: Arc<dyn ReferenceReader>,
    pub config: ControllerConfig,
    pub backoff_states: BackoffStates,
}

impl<R: Managed> std::fmt::Debug for ManagedContext<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedContext")
            .field("kind", &R::kind(&()))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<R: Managed> ManagedContext<R> {
    pub fn new(
        connector: Arc<dyn Connector<R>>,
        store: Arc<dyn RecordStore<R>>,
        usage: Arc<dyn UsageTracker>,
        references: Arc<dyn ReferenceReader>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            connector,
            store,
            usage,
            references,
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Key of `record` in the backoff map
    pub fn backoff_key(record: &R) -> String {
        format!("{}/{}", R::kind(&()), record_name(record))
    }

    /// Next error backoff for `record`, advancing its sequence
    pub fn next_backoff(&self, record: &R) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(Self::backoff_key(record)).or_insert_with(|| {
                    BackoffState::new(
                        self.config.backoff_min_minutes,
                        self.config.backoff_max_minutes,
                    )
                });
                state.increment_error();
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using default backoff", e);
                (Duration::from_secs(60), 0)
            }
        }
    }

    fn reset_backoff(&self, record: &R) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(&Self::backoff_key(record)) {
                state.reset();
            }
        }
    }
}

/// What a successful pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A remote create, update or delete was issued
    Mutated,
    /// The remote object matches the declared state
    InSync,
    /// The finalizer was removed and the record is going away
    Released,
}

impl Outcome {
    /// Requeue action for this outcome
    pub fn action(self, config: &ControllerConfig) -> Action {
        match self {
            Outcome::Mutated => {
                metrics::increment_requeues_total("short-wait");
                Action::requeue(config.short_wait())
            }
            Outcome::InSync => {
                metrics::increment_requeues_total("sync-interval");
                Action::requeue(config.sync_interval())
            }
            Outcome::Released => Action::await_change(),
        }
    }
}

async fn release<R: Managed>(record: &mut R, ctx: &ManagedContext<R>) -> Result<Outcome> {
    ctx.usage
        .release(&Usage::of(record))
        .await
        .wrap_err("cannot release provider config usage")?;
    if remove_finalizer(record, MANAGED_FINALIZER) {
        ctx.store
            .update(record)
            .await
            .wrap_err("cannot remove finalizer")?;
    }
    info!(name = %record_name(record), "Record released");
    Ok(Outcome::Released)
}

/// Run one pass over `record`, mutating it in place.
///
/// Status is not written here; [`reconcile`] patches it afterwards.
pub async fn reconcile_once<R: Managed>(record: &mut R, ctx: &ManagedContext<R>) -> Result<Outcome> {
    let deleting = is_deleting(record);
    if deleting && record.resource_spec().deletion_policy == DeletionPolicy::Orphan {
        debug!(name = %record_name(record), "Orphaning remote object");
        return release(record, ctx).await;
    }

    if !deleting {
        if external_name(record).is_empty() {
            if let Some(name) = record.initial_external_name() {
                set_external_name(record, &name);
                ctx.store
                    .update(record)
                    .await
                    .wrap_err("cannot persist external name")?;
            }
        }
        let resolved = record
            .resolve_references(ctx.references.as_ref())
            .await
            .wrap_err("cannot resolve references")?;
        if resolved {
            ctx.store
                .update(record)
                .await
                .wrap_err("cannot persist resolved references")?;
        }
    }

    let external = ctx
        .connector
        .connect(record)
        .await
        .wrap_err("cannot connect")?;

    debug!(operation = "observe", external_name = %external_name(record), "Observing remote object");
    let observation = external.observe(record).await?;

    if deleting {
        if observation.resource_exists {
            debug!(operation = "delete", external_name = %external_name(record), "Deleting remote object");
            external.delete(record).await?;
            return Ok(Outcome::Mutated);
        }
        return release(record, ctx).await;
    }

    // Every live record is held by the finalizer, imported ones included
    if add_finalizer(record, MANAGED_FINALIZER) {
        ctx.store
            .update(record)
            .await
            .wrap_err("cannot add finalizer")?;
    }

    if !observation.resource_exists {
        debug!(operation = "create", name = %record_name(record), "Creating remote object");
        external.create(record).await?;
        ctx.store
            .update(record)
            .await
            .wrap_err("cannot persist external name after create")?;
        set_condition(
            &mut record.managed_status_mut().conditions,
            conditions::reconcile_success(),
        );
        info!(
            name = %record_name(record),
            external_name = %external_name(record),
            "Remote object created"
        );
        return Ok(Outcome::Mutated);
    }

    if !observation.resource_up_to_date {
        debug!(operation = "update", diff = %observation.diff, "Remote object drifted");
        external.update(record).await?;
        set_condition(
            &mut record.managed_status_mut().conditions,
            conditions::reconcile_success(),
        );
        info!(name = %record_name(record), "Remote object updated");
        return Ok(Outcome::Mutated);
    }

    set_condition(
        &mut record.managed_status_mut().conditions,
        conditions::reconcile_success(),
    );
    Ok(Outcome::InSync)
}

/// Reconcile entry point handed to the kube controller
pub async fn reconcile<R: Managed>(obj: Arc<R>, ctx: Arc<ManagedContext<R>>) -> Result<Action> {
    let kind = R::kind(&()).to_string();
    let name = record_name(obj.as_ref()).to_string();
    let span = info_span!(
        "reconcile",
        resource.kind = kind.as_str(),
        resource.name = name.as_str(),
        external_name = external_name(obj.as_ref())
    );

    async move {
        let start = Instant::now();
        let mut record = (*obj).clone();
        let timeout = ctx.config.reconcile_timeout();
        let result = tokio::time::timeout(timeout, reconcile_once(&mut record, &ctx))
            .await
            .unwrap_or(Err(Error::Timeout(timeout)));
        metrics::observe_reconcile_duration(&kind, start.elapsed().as_secs_f64());

        match result {
            Ok(Outcome::Released) => {
                metrics::increment_reconciliations(&kind, "success");
                ctx.reset_backoff(&record);
                Ok(Action::await_change())
            }
            Ok(outcome) => {
                ctx.store
                    .update_status(&record)
                    .await
                    .wrap_err("cannot update status")?;
                metrics::increment_reconciliations(&kind, "success");
                ctx.reset_backoff(&record);
                Ok(outcome.action(&ctx.config))
            }
            Err(e) => {
                error!(error = %e, kind = %e.kind(), "Reconciliation failed");
                set_condition(
                    &mut record.managed_status_mut().conditions,
                    conditions::reconcile_error(&e),
                );
                if let Err(status_error) = ctx.store.update_status(&record).await {
                    warn!(error = %status_error, "Failed to record reconcile error in status");
                }
                metrics::increment_reconciliations(&kind, "error");
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}
