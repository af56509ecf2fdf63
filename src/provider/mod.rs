//! # Resource Providers
//!
//! Per-service glue between the lifecycle template and the AWS SDK. Each
//! kind has a narrow API trait over the SDK calls it needs, an SDK-backed
//! implementation, and a [`ResourceClient`](crate::managed::ResourceClient)
//! that maps records onto that API.
//!
//! ## Module Structure
//!
//! - `elb.rs` - Classic load balancers
//! - `iam/` - Roles, users, groups and group memberships
//! - `cloudfront.rs` - CloudFront distributions

pub mod cloudfront;
pub mod elb;
pub mod iam;

use crate::clients::{AwsSession, ClientResolver};
use crate::error::Result;
use crate::managed::{Connector, ExternalClient, Managed, RecordStore};
use async_trait::async_trait;
use aws_smithy_types::date_time::Format;
use aws_smithy_types::DateTime;
use std::sync::Arc;

type Build<R> = fn(&AwsSession, Arc<dyn RecordStore<R>>) -> Result<Box<dyn ExternalClient<R>>>;

/// [`Connector`] resolving a session for the record, then building its client
pub struct AwsConnector<R: Managed> {
    resolver: Arc<ClientResolver>,
    store: Arc<dyn RecordStore<R>>,
    build: Build<R>,
}

impl<R: Managed> std::fmt::Debug for AwsConnector<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConnector")
            .field("kind", &R::kind(&()))
            .finish_non_exhaustive()
    }
}

impl<R: Managed> AwsConnector<R> {
    pub fn new(resolver: Arc<ClientResolver>, store: Arc<dyn RecordStore<R>>, build: Build<R>) -> Self {
        Self {
            resolver,
            store,
            build,
        }
    }
}

#[async_trait]
impl<R: Managed> Connector<R> for AwsConnector<R> {
    async fn connect(&self, record: &R) -> Result<Box<dyn ExternalClient<R>>> {
        let session = self.resolver.get_session(record, &record.region()).await?;
        (self.build)(&session, Arc::clone(&self.store))
    }
}

/// RFC 3339 rendering of an SDK timestamp
pub(crate) fn timestamp(value: Option<&DateTime>) -> Option<String> {
    value.and_then(|t| t.fmt(Format::DateTime).ok())
}

/// `None` for empty collections, for optional SDK setters
pub(crate) fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}
