//! # IAM Records
//!
//! `Role`, `User`, `Group` and `UserGroupMembership` records. IAM is a
//! global service; these records carry no region.

use super::{ManagedStatus, Reference, ResourceSpec, Selector, Tag};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Role Custom Resource Definition
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Role",
    group = "iam.aws.crossplane.io",
    version = "v1beta1",
    status = "RoleStatus",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"ARN", "type":"string", "jsonPath":".status.atProvider.arn"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RoleSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: RoleParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleParameters {
    /// Trust policy, compared semantically
    pub assume_role_policy_document: String,
    pub description: Option<String>,
    /// Maximum session duration in seconds
    pub max_session_duration: Option<i32>,
    pub path: Option<String>,
    /// ARN of the managed policy used as permissions boundary
    pub permissions_boundary: Option<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleObservation {
    pub arn: Option<String>,
    #[serde(rename = "roleID")]
    pub role_id: Option<String>,
    pub create_date: Option<String>,
}

pub type RoleStatus = ManagedStatus<RoleObservation>;

/// User Custom Resource Definition
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "User",
    group = "iam.aws.crossplane.io",
    version = "v1beta1",
    status = "UserStatus",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct UserSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    #[serde(default)]
    pub for_provider: UserParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UserParameters {
    pub path: Option<String>,
    pub permissions_boundary: Option<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UserObservation {
    pub arn: Option<String>,
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
    pub create_date: Option<String>,
}

pub type UserStatus = ManagedStatus<UserObservation>;

/// Group Custom Resource Definition
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Group",
    group = "iam.aws.crossplane.io",
    version = "v1beta1",
    status = "GroupStatus",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GroupSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    #[serde(default)]
    pub for_provider: GroupParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupParameters {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupObservation {
    pub arn: Option<String>,
    #[serde(rename = "groupID")]
    pub group_id: Option<String>,
    pub create_date: Option<String>,
}

pub type GroupStatus = ManagedStatus<GroupObservation>;

/// UserGroupMembership Custom Resource Definition
///
/// The external name is `{groupName}/{userName}`.
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "UserGroupMembership",
    group = "iam.aws.crossplane.io",
    version = "v1beta1",
    status = "UserGroupMembershipStatus",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct UserGroupMembershipSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    #[serde(default)]
    pub for_provider: UserGroupMembershipParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UserGroupMembershipParameters {
    pub group_name: Option<String>,
    pub group_name_ref: Option<Reference>,
    pub group_name_selector: Option<Selector>,
    pub user_name: Option<String>,
    pub user_name_ref: Option<Reference>,
    pub user_name_selector: Option<Selector>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UserGroupMembershipObservation {
    pub group_arn: Option<String>,
    pub user_arn: Option<String>,
}

pub type UserGroupMembershipStatus = ManagedStatus<UserGroupMembershipObservation>;
