//! # CloudFront Distribution
//!
//! `Distribution` record. The remote object can only change once it reports
//! `Deployed`, and must be disabled before it can be deleted.

use super::{ManagedStatus, ResourceSpec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Distribution Custom Resource Definition
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Distribution",
    group = "cloudfront.aws.crossplane.io",
    version = "v1alpha1",
    status = "DistributionStatus",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"Status", "type":"string", "jsonPath":".status.atProvider.status"}, {"name":"Domain", "type":"string", "jsonPath":".status.atProvider.domainName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: DistributionParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DistributionParameters {
    pub region: String,
    pub distribution_config: DistributionConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DistributionConfig {
    /// Idempotency token; defaults to the record UID on create
    pub caller_reference: Option<String>,
    pub comment: Option<String>,
    pub enabled: bool,
    pub default_root_object: Option<String>,
    pub price_class: Option<String>,
    pub http_version: Option<String>,
    #[serde(rename = "isIPV6Enabled")]
    pub is_ipv6_enabled: Option<bool>,
    pub aliases: Vec<String>,
    pub origins: Vec<Origin>,
    pub default_cache_behavior: Option<DefaultCacheBehavior>,
    pub cache_behaviors: Vec<CacheBehavior>,
    pub custom_error_responses: Vec<CustomErrorResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Origin {
    pub id: String,
    pub domain_name: String,
    pub origin_path: Option<String>,
    pub custom_origin_config: Option<CustomOriginConfig>,
    pub s3_origin_config: Option<S3OriginConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomOriginConfig {
    #[serde(rename = "httpPort")]
    pub http_port: Option<i32>,
    #[serde(rename = "httpsPort")]
    pub https_port: Option<i32>,
    pub origin_protocol_policy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct S3OriginConfig {
    pub origin_access_identity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultCacheBehavior {
    pub target_origin_id: String,
    pub viewer_protocol_policy: String,
    pub compress: Option<bool>,
    pub cache_policy_id: Option<String>,
    pub lambda_function_associations: Vec<LambdaFunctionAssociation>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheBehavior {
    pub path_pattern: String,
    pub target_origin_id: String,
    pub viewer_protocol_policy: String,
    pub compress: Option<bool>,
    pub cache_policy_id: Option<String>,
    pub lambda_function_associations: Vec<LambdaFunctionAssociation>,
}

/// Lambda@Edge association, keyed by its function ARN
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LambdaFunctionAssociation {
    pub lambda_function_arn: String,
    pub event_type: String,
    pub include_body: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomErrorResponse {
    pub error_code: i32,
    pub response_code: Option<String>,
    pub response_page_path: Option<String>,
    #[serde(rename = "errorCachingMinTTL")]
    pub error_caching_min_ttl: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DistributionObservation {
    pub id: Option<String>,
    pub arn: Option<String>,
    pub domain_name: Option<String>,
    /// InProgress or Deployed
    pub status: Option<String>,
    /// Generation token sent as If-Match; never compared for drift
    pub e_tag: Option<String>,
    pub enabled: Option<bool>,
    pub last_modified_time: Option<String>,
    pub in_progress_invalidation_batches: Option<i32>,
}

pub type DistributionStatus = ManagedStatus<DistributionObservation>;
