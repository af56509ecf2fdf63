//! # IAM
//!
//! Roles, users, groups and group memberships. IAM is a global service, so
//! these records always resolve the `global` region.
//!
//! ## Module Structure
//!
//! - `role.rs` - Roles, with semantic trust-policy comparison
//! - `user.rs` - Users
//! - `group.rs` - Groups
//! - `membership.rs` - User-in-group bindings named `{group}/{user}`

pub mod group;
pub mod membership;
pub mod role;
pub mod user;

use super::timestamp;
use crate::clients::CloudError;
use crate::crd::Tag;
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_sdk_iam as iam;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;

/// Remote role, in declared naming
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDescription {
    pub role_name: String,
    pub arn: String,
    #[serde(rename = "roleID")]
    pub role_id: String,
    pub create_date: Option<String>,
    /// As returned by IAM, usually percent-encoded
    pub assume_role_policy_document: Option<String>,
    pub description: Option<String>,
    pub max_session_duration: Option<i32>,
    pub path: Option<String>,
    pub permissions_boundary: Option<String>,
    pub tags: Vec<Tag>,
}

/// Remote user, in declared naming
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDescription {
    pub user_name: String,
    pub arn: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub create_date: Option<String>,
    pub path: Option<String>,
    pub permissions_boundary: Option<String>,
    pub tags: Vec<Tag>,
}

/// Remote group, in declared naming
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDescription {
    pub group_name: String,
    pub arn: String,
    #[serde(rename = "groupID")]
    pub group_id: String,
    pub create_date: Option<String>,
    pub path: Option<String>,
}

/// A user listed as a member of a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub user_name: String,
    pub arn: String,
}

/// Input of `CreateRole`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleCreate {
    pub name: String,
    pub assume_role_policy_document: String,
    pub description: Option<String>,
    pub max_session_duration: Option<i32>,
    pub path: Option<String>,
    pub permissions_boundary: Option<String>,
    pub tags: Vec<Tag>,
}

/// Input of `CreateUser`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserCreate {
    pub name: String,
    pub path: Option<String>,
    pub permissions_boundary: Option<String>,
    pub tags: Vec<Tag>,
}

/// The IAM calls this crate makes
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IamApi: Send + Sync {
    async fn get_role(&self, name: &str) -> Result<RoleDescription>;
    async fn create_role(&self, input: RoleCreate) -> Result<RoleDescription>;
    async fn update_role(
        &self,
        name: &str,
        description: Option<String>,
        max_session_duration: Option<i32>,
    ) -> Result<()>;
    async fn update_assume_role_policy(&self, name: &str, document: &str) -> Result<()>;
    async fn put_role_permissions_boundary(&self, name: &str, boundary: &str) -> Result<()>;
    async fn tag_role(&self, name: &str, tags: Vec<Tag>) -> Result<()>;
    async fn untag_role(&self, name: &str, keys: Vec<String>) -> Result<()>;
    async fn delete_role(&self, name: &str) -> Result<()>;

    async fn get_user(&self, name: &str) -> Result<UserDescription>;
    async fn create_user(&self, input: UserCreate) -> Result<UserDescription>;
    async fn update_user_path(&self, name: &str, path: &str) -> Result<()>;
    async fn put_user_permissions_boundary(&self, name: &str, boundary: &str) -> Result<()>;
    async fn tag_user(&self, name: &str, tags: Vec<Tag>) -> Result<()>;
    async fn untag_user(&self, name: &str, keys: Vec<String>) -> Result<()>;
    async fn delete_user(&self, name: &str) -> Result<()>;

    async fn get_group(&self, name: &str) -> Result<GroupDescription>;
    async fn create_group(&self, name: &str, path: Option<String>) -> Result<GroupDescription>;
    async fn update_group_path(&self, name: &str, path: &str) -> Result<()>;
    async fn delete_group(&self, name: &str) -> Result<()>;

    /// Every member of the group, across all pages
    async fn list_group_members(&self, group: &str) -> Result<(GroupDescription, Vec<GroupMember>)>;
    async fn add_user_to_group(&self, group: &str, user: &str) -> Result<()>;
    async fn remove_user_from_group(&self, group: &str, user: &str) -> Result<()>;
}

/// Tags to add and tag keys to remove so `current` becomes `desired`.
///
/// Nothing is removed when no tags are declared.
pub fn tag_changes(current: &[Tag], desired: &[Tag]) -> (Vec<Tag>, Vec<String>) {
    if desired.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let add = desired
        .iter()
        .filter(|t| !current.contains(t))
        .cloned()
        .collect();
    let remove = current
        .iter()
        .filter(|t| !desired.iter().any(|d| d.key == t.key))
        .map(|t| t.key.clone())
        .collect();
    (add, remove)
}

/// Declared value differs from the remote one; unset declared values never differ
pub(crate) fn differs<T: PartialEq>(declared: Option<&T>, remote: Option<&T>) -> bool {
    declared.is_some() && declared != remote
}

/// [`IamApi`] backed by the SDK
#[derive(Debug, Clone)]
pub struct SdkIamApi {
    client: iam::Client,
}

impl SdkIamApi {
    pub fn new(client: iam::Client) -> Self {
        Self { client }
    }
}

fn to_sdk_tags(tags: &[Tag]) -> Result<Option<Vec<iam::types::Tag>>> {
    if tags.is_empty() {
        return Ok(None);
    }
    tags.iter()
        .map(|t| {
            iam::types::Tag::builder()
                .key(&t.key)
                .value(t.value.clone().unwrap_or_default())
                .build()
                .map_err(|e| Error::invalid_input(format!("invalid tag: {e}")))
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn from_sdk_tags(tags: &[iam::types::Tag]) -> Vec<Tag> {
    tags.iter()
        .map(|t| Tag {
            key: t.key().to_string(),
            value: Some(t.value().to_string()),
        })
        .collect()
}

fn missing(what: &str, name: &str) -> Error {
    CloudError::service("NoSuchEntity", format!("{what} {name} not found")).into()
}

fn role_description(role: &iam::types::Role) -> RoleDescription {
    RoleDescription {
        role_name: role.role_name().to_string(),
        arn: role.arn().to_string(),
        role_id: role.role_id().to_string(),
        create_date: timestamp(Some(role.create_date())),
        assume_role_policy_document: role.assume_role_policy_document().map(str::to_string),
        description: role.description().map(str::to_string),
        max_session_duration: role.max_session_duration(),
        path: Some(role.path().to_string()),
        permissions_boundary: role
            .permissions_boundary()
            .and_then(|b| b.permissions_boundary_arn())
            .map(str::to_string),
        tags: from_sdk_tags(role.tags()),
    }
}

fn user_description(user: &iam::types::User) -> UserDescription {
    UserDescription {
        user_name: user.user_name().to_string(),
        arn: user.arn().to_string(),
        user_id: user.user_id().to_string(),
        create_date: timestamp(Some(user.create_date())),
        path: Some(user.path().to_string()),
        permissions_boundary: user
            .permissions_boundary()
            .and_then(|b| b.permissions_boundary_arn())
            .map(str::to_string),
        tags: from_sdk_tags(user.tags()),
    }
}

fn group_description(group: &iam::types::Group) -> GroupDescription {
    GroupDescription {
        group_name: group.group_name().to_string(),
        arn: group.arn().to_string(),
        group_id: group.group_id().to_string(),
        create_date: timestamp(Some(group.create_date())),
        path: Some(group.path().to_string()),
    }
}

#[async_trait]
impl IamApi for SdkIamApi {
    async fn get_role(&self, name: &str) -> Result<RoleDescription> {
        let output = self
            .client
            .get_role()
            .role_name(name)
            .send()
            .await
            .map_err(CloudError::from)?;
        output
            .role()
            .map(role_description)
            .ok_or_else(|| missing("role", name))
    }

    async fn create_role(&self, input: RoleCreate) -> Result<RoleDescription> {
        let output = self
            .client
            .create_role()
            .role_name(&input.name)
            .assume_role_policy_document(&input.assume_role_policy_document)
            .set_description(input.description)
            .set_max_session_duration(input.max_session_duration)
            .set_path(input.path)
            .set_permissions_boundary(input.permissions_boundary)
            .set_tags(to_sdk_tags(&input.tags)?)
            .send()
            .await
            .map_err(CloudError::from)?;
        output
            .role()
            .map(role_description)
            .ok_or_else(|| missing("role", &input.name))
    }

    async fn update_role(
        &self,
        name: &str,
        description: Option<String>,
        max_session_duration: Option<i32>,
    ) -> Result<()> {
        self.client
            .update_role()
            .role_name(name)
            .set_description(description)
            .set_max_session_duration(max_session_duration)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn update_assume_role_policy(&self, name: &str, document: &str) -> Result<()> {
        self.client
            .update_assume_role_policy()
            .role_name(name)
            .policy_document(document)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn put_role_permissions_boundary(&self, name: &str, boundary: &str) -> Result<()> {
        self.client
            .put_role_permissions_boundary()
            .role_name(name)
            .permissions_boundary(boundary)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn tag_role(&self, name: &str, tags: Vec<Tag>) -> Result<()> {
        self.client
            .tag_role()
            .role_name(name)
            .set_tags(to_sdk_tags(&tags)?)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn untag_role(&self, name: &str, keys: Vec<String>) -> Result<()> {
        self.client
            .untag_role()
            .role_name(name)
            .set_tag_keys(Some(keys))
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn delete_role(&self, name: &str) -> Result<()> {
        self.client
            .delete_role()
            .role_name(name)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn get_user(&self, name: &str) -> Result<UserDescription> {
        let output = self
            .client
            .get_user()
            .user_name(name)
            .send()
            .await
            .map_err(CloudError::from)?;
        output
            .user()
            .map(user_description)
            .ok_or_else(|| missing("user", name))
    }

    async fn create_user(&self, input: UserCreate) -> Result<UserDescription> {
        let output = self
            .client
            .create_user()
            .user_name(&input.name)
            .set_path(input.path)
            .set_permissions_boundary(input.permissions_boundary)
            .set_tags(to_sdk_tags(&input.tags)?)
            .send()
            .await
            .map_err(CloudError::from)?;
        output
            .user()
            .map(user_description)
            .ok_or_else(|| missing("user", &input.name))
    }

    async fn update_user_path(&self, name: &str, path: &str) -> Result<()> {
        self.client
            .update_user()
            .user_name(name)
            .new_path(path)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn put_user_permissions_boundary(&self, name: &str, boundary: &str) -> Result<()> {
        self.client
            .put_user_permissions_boundary()
            .user_name(name)
            .permissions_boundary(boundary)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn tag_user(&self, name: &str, tags: Vec<Tag>) -> Result<()> {
        self.client
            .tag_user()
            .user_name(name)
            .set_tags(to_sdk_tags(&tags)?)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn untag_user(&self, name: &str, keys: Vec<String>) -> Result<()> {
        self.client
            .untag_user()
            .user_name(name)
            .set_tag_keys(Some(keys))
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn delete_user(&self, name: &str) -> Result<()> {
        self.client
            .delete_user()
            .user_name(name)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn get_group(&self, name: &str) -> Result<GroupDescription> {
        let output = self
            .client
            .get_group()
            .group_name(name)
            .max_items(1)
            .send()
            .await
            .map_err(CloudError::from)?;
        output
            .group()
            .map(group_description)
            .ok_or_else(|| missing("group", name))
    }

    async fn create_group(&self, name: &str, path: Option<String>) -> Result<GroupDescription> {
        let output = self
            .client
            .create_group()
            .group_name(name)
            .set_path(path)
            .send()
            .await
            .map_err(CloudError::from)?;
        output
            .group()
            .map(group_description)
            .ok_or_else(|| missing("group", name))
    }

    async fn update_group_path(&self, name: &str, path: &str) -> Result<()> {
        self.client
            .update_group()
            .group_name(name)
            .new_path(path)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn delete_group(&self, name: &str) -> Result<()> {
        self.client
            .delete_group()
            .group_name(name)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn list_group_members(&self, group: &str) -> Result<(GroupDescription, Vec<GroupMember>)> {
        let mut members = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let output = self
                .client
                .get_group()
                .group_name(group)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(CloudError::from)?;
            members.extend(output.users().iter().map(|u| GroupMember {
                user_name: u.user_name().to_string(),
                arn: u.arn().to_string(),
            }));
            if output.is_truncated() {
                marker = output.marker().map(str::to_string);
            }
            if marker.is_none() {
                let description = output
                    .group()
                    .map(group_description)
                    .ok_or_else(|| missing("group", group))?;
                return Ok((description, members));
            }
        }
    }

    async fn add_user_to_group(&self, group: &str, user: &str) -> Result<()> {
        self.client
            .add_user_to_group()
            .group_name(group)
            .user_name(user)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn remove_user_from_group(&self, group: &str, user: &str) -> Result<()> {
        self.client
            .remove_user_from_group()
            .group_name(group)
            .user_name(user)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }
}
