//! # ProviderConfig
//!
//! Cluster-scoped credential and endpoint recipe referenced by managed
//! records, and the usage objects that keep it alive while referenced.

use super::Condition;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ProviderConfig Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: aws.crossplane.io/v1beta1
/// kind: ProviderConfig
/// metadata:
///   name: default
/// spec:
///   credentials:
///     source: Secret
///     secretRef:
///       namespace: crossplane-system
///       name: aws-creds
///       key: credentials
///   assumeRole:
///     roleARN: arn:aws:iam::123456789012:role/provider
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ProviderConfig",
    group = "aws.crossplane.io",
    version = "v1beta1",
    status = "ProviderConfigStatus",
    printcolumn = r#"{"name":"Source", "type":"string", "jsonPath":".spec.credentials.source"}, {"name":"Users", "type":"integer", "jsonPath":".status.users"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// Where credentials come from
    pub credentials: ProviderCredentials,
    /// Role to assume with the base credentials
    #[serde(default)]
    pub assume_role: Option<AssumeRoleOptions>,
    /// Role to assume by presenting a web identity token
    #[serde(default)]
    pub assume_role_with_web_identity: Option<WebIdentityOptions>,
    /// Endpoint override for every client built from this config
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,
}

/// Credential source and its locator
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    pub source: CredentialsSource,
    /// Used when `source` is Secret
    #[serde(default)]
    pub secret_ref: Option<SecretKeySelector>,
    /// Used when `source` is Environment
    #[serde(default)]
    pub env: Option<EnvSelector>,
    /// Used when `source` is Filesystem
    #[serde(default)]
    pub fs: Option<FsSelector>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum CredentialsSource {
    #[default]
    None,
    Secret,
    InjectedIdentity,
    Environment,
    Filesystem,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct SecretKeySelector {
    pub namespace: String,
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct EnvSelector {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct FsSelector {
    pub path: String,
}

/// Options for AssumeRole
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssumeRoleOptions {
    #[serde(rename = "roleARN")]
    pub role_arn: String,
    #[serde(default, rename = "externalID")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<SessionTag>,
    #[serde(default)]
    pub transitive_tag_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct SessionTag {
    pub key: String,
    pub value: String,
}

/// Options for AssumeRoleWithWebIdentity
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebIdentityOptions {
    #[serde(rename = "roleARN")]
    pub role_arn: String,
    #[serde(default)]
    pub role_session_name: Option<String>,
    /// Token file; defaults to `AWS_WEB_IDENTITY_TOKEN_FILE`
    #[serde(default)]
    pub token_file: Option<String>,
}

/// Endpoint override
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    pub url: UrlConfig,
    #[serde(default)]
    pub hostname_immutable: Option<bool>,
    #[serde(default, rename = "partitionID")]
    pub partition_id: Option<String>,
    #[serde(default)]
    pub signing_name: Option<String>,
    #[serde(default)]
    pub signing_region: Option<String>,
    #[serde(default)]
    pub signing_method: Option<String>,
    #[serde(default)]
    pub source: Option<EndpointSource>,
}

/// URL of an endpoint override; `type` is Static or Dynamic
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct UrlConfig {
    pub r#type: String,
    #[serde(default)]
    pub r#static: Option<String>,
    #[serde(default)]
    pub dynamic: Option<DynamicUrlConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct DynamicUrlConfig {
    /// http or https
    pub protocol: String,
    pub host: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum EndpointSource {
    #[default]
    ServiceMetadata,
    Custom,
}

/// Status of a ProviderConfig
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigStatus {
    /// Number of managed records using this config
    #[serde(default)]
    pub users: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Back-reference from a managed record to the ProviderConfig it uses
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ProviderConfigUsage",
    group = "aws.crossplane.io",
    version = "v1beta1",
    printcolumn = r#"{"name":"Config", "type":"string", "jsonPath":".spec.providerConfigRef.name"}, {"name":"Resource-Kind", "type":"string", "jsonPath":".spec.resourceRef.kind"}, {"name":"Resource-Name", "type":"string", "jsonPath":".spec.resourceRef.name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigUsageSpec {
    pub provider_config_ref: super::ProviderConfigReference,
    pub resource_ref: TypedReference,
}

/// Reference to a record of any kind
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypedReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: Option<String>,
}
