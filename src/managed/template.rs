//! # Lifecycle Template
//!
//! [`ManagedExternal`] implements the Observe/Create/Update/Delete contract
//! once, on top of a per-kind [`ResourceClient`]. A kind supplies input
//! generators, the SDK calls and the observation mapping; every hook has a
//! default that a kind overrides only where the remote API has quirks.
//!
//! Errors leaving the template carry a stable prefix naming the step that
//! failed ("cannot observe", "pre-create failed", ...). NotFound from
//! describe means the remote object is absent and NotFound from delete means
//! it is already gone; neither is an error.

use super::conditions::{self, set_condition};
use super::external::{ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate};
use super::{external_name, Managed, RecordStore};
use crate::drift::{self, DiffOptions, LateInitOptions};
use crate::error::{Result, ResultExt};
use async_trait::async_trait;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Per-kind SDK glue driven by [`ManagedExternal`]
#[async_trait]
pub trait ResourceClient<R: Managed>: Send + Sync {
    type DescribeInput: Send + Sync;
    /// Remote object as returned by describe, in declared naming
    type Observed: Serialize + Send + Sync;
    type CreateInput: Send + Sync;
    type Created: Send + Sync;
    type UpdateInput: Send + Sync;
    type Updated: Send + Sync;
    type DeleteInput: Send + Sync;

    fn generate_describe_input(&self, record: &R) -> Result<Self::DescribeInput>;
    async fn describe(&self, input: Self::DescribeInput) -> Result<Self::Observed>;
    fn generate_observation(&self, observed: &Self::Observed) -> R::AtProvider;

    fn generate_create_input(&self, record: &R) -> Result<Self::CreateInput>;
    async fn create(&self, input: Self::CreateInput) -> Result<Self::Created>;

    fn generate_update_input(&self, record: &R) -> Result<Self::UpdateInput>;
    async fn update(&self, input: Self::UpdateInput) -> Result<Self::Updated>;

    fn generate_delete_input(&self, record: &R) -> Result<Self::DeleteInput>;
    async fn delete(&self, input: Self::DeleteInput) -> Result<()>;

    fn late_init_options(&self) -> LateInitOptions {
        LateInitOptions::default()
    }

    fn diff_options(&self) -> DiffOptions {
        DiffOptions::default().with_late_init(self.late_init_options())
    }

    async fn pre_observe(&self, _record: &R, _input: &mut Self::DescribeInput) -> Result<()> {
        Ok(())
    }

    /// Runs last in observe; by default marks the record available
    async fn post_observe(
        &self,
        record: &mut R,
        _observed: &Self::Observed,
        observation: ExternalObservation,
    ) -> Result<ExternalObservation> {
        set_condition(
            &mut record.managed_status_mut().conditions,
            conditions::available(),
        );
        Ok(observation)
    }

    /// Fill unset declared fields from the remote object
    fn late_initialize(
        &self,
        declared: &mut R::ForProvider,
        observed: &Self::Observed,
    ) -> Result<bool> {
        Ok(drift::late_initialize_typed(
            declared,
            observed,
            &self.late_init_options(),
        )?)
    }

    /// Whether the remote object matches the declared parameters, with a diff
    fn is_up_to_date(&self, record: &R, observed: &Self::Observed) -> Result<(bool, String)> {
        Ok(drift::is_up_to_date(
            record.for_provider(),
            observed,
            &self.diff_options(),
        )?)
    }

    async fn pre_create(&self, _record: &mut R, _input: &mut Self::CreateInput) -> Result<()> {
        Ok(())
    }

    async fn post_create(
        &self,
        _record: &mut R,
        _created: &Self::Created,
        creation: ExternalCreation,
    ) -> Result<ExternalCreation> {
        Ok(creation)
    }

    async fn pre_update(&self, _record: &R, _input: &mut Self::UpdateInput) -> Result<()> {
        Ok(())
    }

    async fn post_update(
        &self,
        _record: &mut R,
        _updated: &Self::Updated,
        update: ExternalUpdate,
    ) -> Result<ExternalUpdate> {
        Ok(update)
    }

    /// Returns `true` to skip the delete call for this pass
    async fn pre_delete(&self, _record: &mut R, _input: &mut Self::DeleteInput) -> Result<bool> {
        Ok(false)
    }

    async fn post_delete(&self, _record: &mut R) -> Result<()> {
        Ok(())
    }
}

/// [`ExternalClient`] built from a [`ResourceClient`]
pub struct ManagedExternal<R: Managed, C> {
    client: C,
    store: Arc<dyn RecordStore<R>>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Managed, C> std::fmt::Debug for ManagedExternal<R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedExternal")
            .field("kind", &R::kind(&()))
            .finish_non_exhaustive()
    }
}

impl<R: Managed, C> ManagedExternal<R, C> {
    pub fn new(client: C, store: Arc<dyn RecordStore<R>>) -> Self {
        Self {
            client,
            store,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<R, C> ExternalClient<R> for ManagedExternal<R, C>
where
    R: Managed,
    C: ResourceClient<R>,
{
    async fn observe(&self, record: &mut R) -> Result<ExternalObservation> {
        if external_name(record).is_empty() {
            return Ok(ExternalObservation::absent());
        }

        let mut input = self.client.generate_describe_input(record)?;
        self.client
            .pre_observe(record, &mut input)
            .await
            .wrap_err("pre-observe failed")?;

        let observed = match self.client.describe(input).await {
            Ok(observed) => observed,
            Err(e) if e.is_not_found() => return Ok(ExternalObservation::absent()),
            Err(e) => return Err(e.wrap("cannot observe")),
        };

        let before = record.for_provider().clone();
        let late_initialized = self
            .client
            .late_initialize(record.for_provider_mut(), &observed)
            .wrap_err("cannot late-initialize")?
            && *record.for_provider() != before;
        if late_initialized {
            debug!(
                name = %super::record_name(record),
                "Persisting late-initialized parameters"
            );
            self.store
                .update(record)
                .await
                .wrap_err("cannot persist late-initialized parameters")?;
        }

        record.managed_status_mut().at_provider = Some(self.client.generate_observation(&observed));

        let (up_to_date, diff) = self
            .client
            .is_up_to_date(record, &observed)
            .wrap_err("cannot check if resource is up to date")?;

        let observation = ExternalObservation {
            resource_exists: true,
            resource_up_to_date: up_to_date,
            resource_late_initialized: late_initialized,
            diff,
            ..ExternalObservation::default()
        };
        self.client
            .post_observe(record, &observed, observation)
            .await
            .wrap_err("post-observe failed")
    }

    async fn create(&self, record: &mut R) -> Result<ExternalCreation> {
        set_condition(
            &mut record.managed_status_mut().conditions,
            conditions::creating(),
        );
        let mut input = self.client.generate_create_input(record)?;
        self.client
            .pre_create(record, &mut input)
            .await
            .wrap_err("pre-create failed")?;
        let created = self
            .client
            .create(input)
            .await
            .wrap_err("cannot create")?;
        self.client
            .post_create(record, &created, ExternalCreation::default())
            .await
            .wrap_err("post-create failed")
    }

    async fn update(&self, record: &mut R) -> Result<ExternalUpdate> {
        let mut input = self.client.generate_update_input(record)?;
        self.client
            .pre_update(record, &mut input)
            .await
            .wrap_err("pre-update failed")?;
        let updated = self
            .client
            .update(input)
            .await
            .wrap_err("cannot update")?;
        self.client
            .post_update(record, &updated, ExternalUpdate::default())
            .await
            .wrap_err("post-update failed")
    }

    async fn delete(&self, record: &mut R) -> Result<()> {
        set_condition(
            &mut record.managed_status_mut().conditions,
            conditions::deleting(),
        );
        let mut input = self.client.generate_delete_input(record)?;
        let ignore = self
            .client
            .pre_delete(record, &mut input)
            .await
            .wrap_err("pre-delete failed")?;
        if ignore {
            return Ok(());
        }
        match self.client.delete(input).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.wrap("cannot delete")),
        }
        self.client
            .post_delete(record)
            .await
            .wrap_err("post-delete failed")
    }
}
