//! # CloudFront Distributions
//!
//! `Distribution` records. CloudFront assigns the identifier on create, so
//! the external name is written by post-create. Every write carries the
//! last observed ETag as `If-Match`; the ETag lands in status but never takes
//! part in drift.
//!
//! A distribution only accepts changes once it reports `Deployed`. Until
//! then it is treated as up to date, and deletion waits. Deletion also
//! requires the distribution to be disabled first: a record still declaring
//! `enabled: true` fails with a precondition error, while a record declaring
//! `enabled: false` gets the disable issued in-line and is deleted on a later
//! pass once the change has deployed.

use super::{non_empty, timestamp, AwsConnector};
use crate::clients::{AwsSession, ClientResolver, CloudError};
use crate::crd::{
    CacheBehavior, CustomErrorResponse, CustomOriginConfig, DefaultCacheBehavior, Distribution,
    DistributionConfig, DistributionObservation, DistributionParameters, LambdaFunctionAssociation,
    Origin, S3OriginConfig,
};
use crate::drift::DiffOptions;
use crate::error::{Error, Result};
use crate::managed::conditions::{self, set_condition};
use crate::managed::{
    external_name, set_external_name, ExternalClient, ExternalCreation, ExternalObservation,
    ExternalUpdate, Managed, ManagedExternal, RecordStore, ResourceClient,
};
use async_trait::async_trait;
use aws_sdk_cloudfront as cf;
use kube::Resource;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Remote status once a change has propagated
pub const STATUS_DEPLOYED: &str = "Deployed";

crate::impl_managed!(Distribution, DistributionParameters, DistributionObservation, {
    fn region(&self) -> String {
        self.spec.for_provider.region.clone()
    }

    fn initial_external_name(&self) -> Option<String> {
        None
    }
});

/// Remote distribution, in declared naming
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionDescription {
    pub id: String,
    pub arn: String,
    pub domain_name: String,
    pub status: String,
    pub e_tag: Option<String>,
    pub last_modified_time: Option<String>,
    pub in_progress_invalidation_batches: i32,
    pub distribution_config: DistributionConfig,
}

impl DistributionDescription {
    pub fn is_deployed(&self) -> bool {
        self.status == STATUS_DEPLOYED
    }
}

/// Identifier and ETag of an existing distribution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionRef {
    pub id: String,
    pub if_match: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DistributionUpdate {
    pub target: DistributionRef,
    pub config: DistributionConfig,
}

/// The CloudFront calls this crate makes
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DistributionApi: Send + Sync {
    async fn get(&self, id: &str) -> Result<DistributionDescription>;
    async fn create(&self, config: DistributionConfig) -> Result<DistributionDescription>;
    async fn update(
        &self,
        id: &str,
        if_match: Option<String>,
        config: DistributionConfig,
    ) -> Result<DistributionDescription>;
    async fn delete(&self, id: &str, if_match: Option<String>) -> Result<()>;
}

/// [`ResourceClient`] for `Distribution` records
#[derive(Debug)]
pub struct DistributionClient<A> {
    api: A,
}

impl<A: DistributionApi> DistributionClient<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

fn last_etag(record: &Distribution) -> Option<String> {
    record.at_provider().and_then(|a| a.e_tag.clone())
}

fn remember_etag(record: &mut Distribution, etag: Option<String>) {
    if let Some(at) = record.managed_status_mut().at_provider.as_mut() {
        at.e_tag = etag;
    }
}

#[async_trait]
impl<A: DistributionApi> ResourceClient<Distribution> for DistributionClient<A> {
    type DescribeInput = String;
    type Observed = DistributionDescription;
    type CreateInput = DistributionConfig;
    type Created = DistributionDescription;
    type UpdateInput = DistributionUpdate;
    type Updated = DistributionDescription;
    type DeleteInput = DistributionRef;

    fn generate_describe_input(&self, record: &Distribution) -> Result<String> {
        Ok(external_name(record).to_string())
    }

    async fn describe(&self, id: String) -> Result<DistributionDescription> {
        self.api.get(&id).await
    }

    fn generate_observation(&self, observed: &DistributionDescription) -> DistributionObservation {
        DistributionObservation {
            id: Some(observed.id.clone()),
            arn: Some(observed.arn.clone()),
            domain_name: Some(observed.domain_name.clone()),
            status: Some(observed.status.clone()),
            e_tag: observed.e_tag.clone(),
            enabled: Some(observed.distribution_config.enabled),
            last_modified_time: observed.last_modified_time.clone(),
            in_progress_invalidation_batches: Some(observed.in_progress_invalidation_batches),
        }
    }

    async fn post_observe(
        &self,
        record: &mut Distribution,
        observed: &DistributionDescription,
        observation: ExternalObservation,
    ) -> Result<ExternalObservation> {
        let condition = if observed.is_deployed() {
            conditions::available()
        } else {
            conditions::unavailable()
        };
        set_condition(&mut record.managed_status_mut().conditions, condition);
        Ok(observation)
    }

    fn diff_options(&self) -> DiffOptions {
        DiffOptions::default()
            .ignore("region")
            .with_late_init(self.late_init_options())
    }

    /// Changes are deferred until the distribution has deployed
    fn is_up_to_date(
        &self,
        record: &Distribution,
        observed: &DistributionDescription,
    ) -> Result<(bool, String)> {
        if !observed.is_deployed() {
            return Ok((true, String::new()));
        }
        Ok(crate::drift::is_up_to_date(
            record.for_provider(),
            observed,
            &self.diff_options(),
        )?)
    }

    fn generate_create_input(&self, record: &Distribution) -> Result<DistributionConfig> {
        Ok(record.for_provider().distribution_config.clone())
    }

    async fn pre_create(&self, record: &mut Distribution, config: &mut DistributionConfig) -> Result<()> {
        if config.caller_reference.as_deref().map_or(true, str::is_empty) {
            let reference = record
                .meta()
                .uid
                .clone()
                .unwrap_or_else(|| crate::managed::record_name(record).to_string());
            config.caller_reference = Some(reference.clone());
            record.for_provider_mut().distribution_config.caller_reference = Some(reference);
        }
        Ok(())
    }

    async fn create(&self, config: DistributionConfig) -> Result<DistributionDescription> {
        info!(
            provider = "aws",
            caller_reference = config.caller_reference.as_deref().unwrap_or_default(),
            operation = "create",
            "Creating CloudFront distribution"
        );
        self.api.create(config).await
    }

    async fn post_create(
        &self,
        record: &mut Distribution,
        created: &DistributionDescription,
        creation: ExternalCreation,
    ) -> Result<ExternalCreation> {
        set_external_name(record, &created.id);
        record.managed_status_mut().at_provider = Some(self.generate_observation(created));
        Ok(creation)
    }

    fn generate_update_input(&self, record: &Distribution) -> Result<DistributionUpdate> {
        Ok(DistributionUpdate {
            target: DistributionRef {
                id: external_name(record).to_string(),
                if_match: None,
            },
            config: record.for_provider().distribution_config.clone(),
        })
    }

    async fn pre_update(&self, record: &Distribution, input: &mut DistributionUpdate) -> Result<()> {
        input.target.if_match = last_etag(record);
        Ok(())
    }

    async fn update(&self, input: DistributionUpdate) -> Result<DistributionDescription> {
        info!(
            provider = "aws",
            distribution = %input.target.id,
            operation = "update",
            "Updating CloudFront distribution"
        );
        self.api
            .update(&input.target.id, input.target.if_match, input.config)
            .await
    }

    async fn post_update(
        &self,
        record: &mut Distribution,
        updated: &DistributionDescription,
        update: ExternalUpdate,
    ) -> Result<ExternalUpdate> {
        remember_etag(record, updated.e_tag.clone());
        Ok(update)
    }

    fn generate_delete_input(&self, record: &Distribution) -> Result<DistributionRef> {
        Ok(DistributionRef {
            id: external_name(record).to_string(),
            if_match: last_etag(record),
        })
    }

    async fn pre_delete(&self, record: &mut Distribution, input: &mut DistributionRef) -> Result<bool> {
        let (deployed, remote_enabled) = record
            .at_provider()
            .map(|a| (a.status.as_deref() == Some(STATUS_DEPLOYED), a.enabled == Some(true)))
            .unwrap_or_default();
        if !deployed {
            debug!(distribution = %input.id, "Waiting for distribution to deploy before deleting");
            return Ok(true);
        }
        if !remote_enabled {
            return Ok(false);
        }
        let declared = record.for_provider().distribution_config.clone();
        if declared.enabled {
            return Err(Error::precondition(
                "distribution needs to be disabled before deletion",
            ));
        }
        info!(distribution = %input.id, "Disabling distribution before deletion");
        let updated = self
            .api
            .update(&input.id, input.if_match.clone(), declared)
            .await?;
        remember_etag(record, updated.e_tag);
        Ok(true)
    }

    async fn delete(&self, input: DistributionRef) -> Result<()> {
        info!(
            provider = "aws",
            distribution = %input.id,
            operation = "delete",
            "Deleting CloudFront distribution"
        );
        self.api.delete(&input.id, input.if_match).await
    }
}

fn invalid(e: impl std::fmt::Display) -> Error {
    Error::invalid_input(format!("invalid distribution config: {e}"))
}

fn to_sdk_lambdas(items: &[LambdaFunctionAssociation]) -> Result<Option<cf::types::LambdaFunctionAssociations>> {
    if items.is_empty() {
        return Ok(None);
    }
    let items = items
        .iter()
        .map(|l| {
            cf::types::LambdaFunctionAssociation::builder()
                .lambda_function_arn(&l.lambda_function_arn)
                .event_type(cf::types::EventType::from(l.event_type.as_str()))
                .set_include_body(l.include_body)
                .build()
                .map_err(invalid)
        })
        .collect::<Result<Vec<_>>>()?;
    cf::types::LambdaFunctionAssociations::builder()
        .quantity(i32::try_from(items.len()).map_err(invalid)?)
        .set_items(Some(items))
        .build()
        .map(Some)
        .map_err(invalid)
}

fn to_sdk_origin(origin: &Origin) -> Result<cf::types::Origin> {
    let custom = origin
        .custom_origin_config
        .as_ref()
        .map(|c| {
            cf::types::CustomOriginConfig::builder()
                .http_port(c.http_port.unwrap_or(80))
                .https_port(c.https_port.unwrap_or(443))
                .origin_protocol_policy(cf::types::OriginProtocolPolicy::from(
                    c.origin_protocol_policy.as_deref().unwrap_or("https-only"),
                ))
                .build()
                .map_err(invalid)
        })
        .transpose()?;
    let s3 = origin.s3_origin_config.as_ref().map(|s| {
        cf::types::S3OriginConfig::builder()
            .origin_access_identity(s.origin_access_identity.clone().unwrap_or_default())
            .build()
    });
    cf::types::Origin::builder()
        .id(&origin.id)
        .domain_name(&origin.domain_name)
        .set_origin_path(origin.origin_path.clone())
        .set_custom_origin_config(custom)
        .set_s3_origin_config(s3)
        .build()
        .map_err(invalid)
}

fn to_sdk_config(config: &DistributionConfig) -> Result<cf::types::DistributionConfig> {
    let origins = config
        .origins
        .iter()
        .map(to_sdk_origin)
        .collect::<Result<Vec<_>>>()?;
    let origins = cf::types::Origins::builder()
        .quantity(i32::try_from(origins.len()).map_err(invalid)?)
        .set_items(Some(origins))
        .build()
        .map_err(invalid)?;

    let aliases = non_empty(config.aliases.clone())
        .map(|items| {
            cf::types::Aliases::builder()
                .quantity(i32::try_from(items.len()).map_err(invalid)?)
                .set_items(Some(items))
                .build()
                .map_err(invalid)
        })
        .transpose()?;

    let default_cache_behavior = config
        .default_cache_behavior
        .as_ref()
        .map(|b| {
            cf::types::DefaultCacheBehavior::builder()
                .target_origin_id(&b.target_origin_id)
                .viewer_protocol_policy(cf::types::ViewerProtocolPolicy::from(
                    b.viewer_protocol_policy.as_str(),
                ))
                .set_compress(b.compress)
                .set_cache_policy_id(b.cache_policy_id.clone())
                .set_lambda_function_associations(to_sdk_lambdas(&b.lambda_function_associations)?)
                .build()
                .map_err(invalid)
        })
        .transpose()?;

    let cache_behaviors = non_empty(config.cache_behaviors.clone())
        .map(|items| {
            let items = items
                .iter()
                .map(|b| {
                    cf::types::CacheBehavior::builder()
                        .path_pattern(&b.path_pattern)
                        .target_origin_id(&b.target_origin_id)
                        .viewer_protocol_policy(cf::types::ViewerProtocolPolicy::from(
                            b.viewer_protocol_policy.as_str(),
                        ))
                        .set_compress(b.compress)
                        .set_cache_policy_id(b.cache_policy_id.clone())
                        .set_lambda_function_associations(to_sdk_lambdas(
                            &b.lambda_function_associations,
                        )?)
                        .build()
                        .map_err(invalid)
                })
                .collect::<Result<Vec<_>>>()?;
            cf::types::CacheBehaviors::builder()
                .quantity(i32::try_from(items.len()).map_err(invalid)?)
                .set_items(Some(items))
                .build()
                .map_err(invalid)
        })
        .transpose()?;

    let custom_error_responses = non_empty(config.custom_error_responses.clone())
        .map(|items| {
            let items = items
                .iter()
                .map(|r| {
                    cf::types::CustomErrorResponse::builder()
                        .error_code(r.error_code)
                        .set_response_code(r.response_code.clone())
                        .set_response_page_path(r.response_page_path.clone())
                        .set_error_caching_min_ttl(r.error_caching_min_ttl)
                        .build()
                        .map_err(invalid)
                })
                .collect::<Result<Vec<_>>>()?;
            cf::types::CustomErrorResponses::builder()
                .quantity(i32::try_from(items.len()).map_err(invalid)?)
                .set_items(Some(items))
                .build()
                .map_err(invalid)
        })
        .transpose()?;

    cf::types::DistributionConfig::builder()
        .caller_reference(config.caller_reference.clone().unwrap_or_default())
        .comment(config.comment.clone().unwrap_or_default())
        .enabled(config.enabled)
        .set_default_root_object(config.default_root_object.clone())
        .set_price_class(config.price_class.as_deref().map(cf::types::PriceClass::from))
        .set_http_version(config.http_version.as_deref().map(cf::types::HttpVersion::from))
        .set_is_ipv6_enabled(config.is_ipv6_enabled)
        .set_aliases(aliases)
        .origins(origins)
        .set_default_cache_behavior(default_cache_behavior)
        .set_cache_behaviors(cache_behaviors)
        .set_custom_error_responses(custom_error_responses)
        .build()
        .map_err(invalid)
}

fn from_sdk_lambdas(
    associations: Option<&cf::types::LambdaFunctionAssociations>,
) -> Vec<LambdaFunctionAssociation> {
    associations
        .map(|a| a.items())
        .unwrap_or_default()
        .iter()
        .map(|l| LambdaFunctionAssociation {
            lambda_function_arn: l.lambda_function_arn().to_string(),
            event_type: l.event_type().as_str().to_string(),
            include_body: l.include_body(),
        })
        .collect()
}

fn from_sdk_config(config: &cf::types::DistributionConfig) -> DistributionConfig {
    DistributionConfig {
        caller_reference: Some(config.caller_reference().to_string()),
        comment: Some(config.comment().to_string()).filter(|c| !c.is_empty()),
        enabled: config.enabled(),
        default_root_object: config
            .default_root_object()
            .filter(|o| !o.is_empty())
            .map(str::to_string),
        price_class: config.price_class().map(|p| p.as_str().to_string()),
        http_version: config.http_version().map(|v| v.as_str().to_string()),
        is_ipv6_enabled: config.is_ipv6_enabled(),
        aliases: config
            .aliases()
            .map(|a| a.items().to_vec())
            .unwrap_or_default(),
        origins: config
            .origins()
            .map(|o| o.items())
            .unwrap_or_default()
            .iter()
            .map(|o| Origin {
                id: o.id().to_string(),
                domain_name: o.domain_name().to_string(),
                origin_path: o.origin_path().map(str::to_string),
                custom_origin_config: o.custom_origin_config().map(|c| CustomOriginConfig {
                    http_port: Some(c.http_port()),
                    https_port: Some(c.https_port()),
                    origin_protocol_policy: Some(c.origin_protocol_policy().as_str().to_string()),
                }),
                s3_origin_config: o.s3_origin_config().map(|s| S3OriginConfig {
                    origin_access_identity: Some(s.origin_access_identity().to_string()),
                }),
            })
            .collect(),
        default_cache_behavior: config.default_cache_behavior().map(|b| DefaultCacheBehavior {
            target_origin_id: b.target_origin_id().to_string(),
            viewer_protocol_policy: b.viewer_protocol_policy().as_str().to_string(),
            compress: b.compress(),
            cache_policy_id: b.cache_policy_id().map(str::to_string),
            lambda_function_associations: from_sdk_lambdas(b.lambda_function_associations()),
        }),
        cache_behaviors: config
            .cache_behaviors()
            .map(|c| c.items())
            .unwrap_or_default()
            .iter()
            .map(|b| CacheBehavior {
                path_pattern: b.path_pattern().to_string(),
                target_origin_id: b.target_origin_id().to_string(),
                viewer_protocol_policy: b.viewer_protocol_policy().as_str().to_string(),
                compress: b.compress(),
                cache_policy_id: b.cache_policy_id().map(str::to_string),
                lambda_function_associations: from_sdk_lambdas(b.lambda_function_associations()),
            })
            .collect(),
        custom_error_responses: config
            .custom_error_responses()
            .map(|c| c.items())
            .unwrap_or_default()
            .iter()
            .map(|r| CustomErrorResponse {
                error_code: r.error_code(),
                response_code: r.response_code().map(str::to_string),
                response_page_path: r.response_page_path().map(str::to_string),
                error_caching_min_ttl: r.error_caching_min_ttl(),
            })
            .collect(),
    }
}

fn to_description(
    distribution: Option<&cf::types::Distribution>,
    e_tag: Option<&str>,
) -> Result<DistributionDescription> {
    let d = distribution.ok_or_else(|| {
        Error::from(CloudError::service("NoSuchDistribution", "distribution missing from response"))
    })?;
    Ok(DistributionDescription {
        id: d.id().to_string(),
        arn: d.arn().to_string(),
        domain_name: d.domain_name().to_string(),
        status: d.status().to_string(),
        e_tag: e_tag.map(str::to_string),
        last_modified_time: timestamp(Some(d.last_modified_time())),
        in_progress_invalidation_batches: d.in_progress_invalidation_batches(),
        distribution_config: d
            .distribution_config()
            .map(from_sdk_config)
            .unwrap_or_default(),
    })
}

/// [`DistributionApi`] backed by the SDK
#[derive(Debug, Clone)]
pub struct SdkDistributionApi {
    client: cf::Client,
}

impl SdkDistributionApi {
    pub fn new(client: cf::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DistributionApi for SdkDistributionApi {
    async fn get(&self, id: &str) -> Result<DistributionDescription> {
        let output = self
            .client
            .get_distribution()
            .id(id)
            .send()
            .await
            .map_err(CloudError::from)?;
        to_description(output.distribution(), output.e_tag())
    }

    async fn create(&self, config: DistributionConfig) -> Result<DistributionDescription> {
        let output = self
            .client
            .create_distribution()
            .distribution_config(to_sdk_config(&config)?)
            .send()
            .await
            .map_err(CloudError::from)?;
        to_description(output.distribution(), output.e_tag())
    }

    async fn update(
        &self,
        id: &str,
        if_match: Option<String>,
        config: DistributionConfig,
    ) -> Result<DistributionDescription> {
        let output = self
            .client
            .update_distribution()
            .id(id)
            .set_if_match(if_match)
            .distribution_config(to_sdk_config(&config)?)
            .send()
            .await
            .map_err(CloudError::from)?;
        to_description(output.distribution(), output.e_tag())
    }

    async fn delete(&self, id: &str, if_match: Option<String>) -> Result<()> {
        self.client
            .delete_distribution()
            .id(id)
            .set_if_match(if_match)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }
}

fn build(
    session: &AwsSession,
    store: Arc<dyn RecordStore<Distribution>>,
) -> Result<Box<dyn ExternalClient<Distribution>>> {
    let api = SdkDistributionApi::new(session.cloudfront()?);
    Ok(Box::new(ManagedExternal::new(DistributionClient::new(api), store)))
}

/// Connector for `Distribution` records
pub fn connector(
    resolver: Arc<ClientResolver>,
    store: Arc<dyn RecordStore<Distribution>>,
) -> AwsConnector<Distribution> {
    AwsConnector::new(resolver, store, build)
}
