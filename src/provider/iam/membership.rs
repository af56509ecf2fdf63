//! User-in-group memberships.
//!
//! A membership has no identifier of its own. Its external name is
//! `{groupName}/{userName}`, written after the user is added to the group,
//! and observe finds the user among the group's members.

use super::{GroupMember, IamApi, SdkIamApi};
use crate::clients::{AwsSession, ClientResolver, CloudError};
use crate::crd::{
    Group, User, UserGroupMembership, UserGroupMembershipObservation, UserGroupMembershipParameters,
};
use crate::error::{Error, Result};
use crate::managed::references::resolve_field;
use crate::managed::{
    external_name, set_external_name, ExternalClient, ExternalCreation, Managed, ManagedExternal,
    RecordStore, ReferenceReader, ReferenceTarget, ResourceClient,
};
use crate::provider::AwsConnector;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

crate::impl_managed!(
    UserGroupMembership,
    UserGroupMembershipParameters,
    UserGroupMembershipObservation,
    {
        fn initial_external_name(&self) -> Option<String> {
            None
        }

        async fn resolve_references(
            &mut self,
            reader: &dyn ReferenceReader,
        ) -> crate::error::Result<bool> {
            let params = &mut self.spec.for_provider;
            let group = resolve_field(
                reader,
                &ReferenceTarget::of::<Group>(),
                &mut params.group_name,
                params.group_name_ref.as_ref(),
                params.group_name_selector.as_ref(),
            )
            .await?;
            let user = resolve_field(
                reader,
                &ReferenceTarget::of::<User>(),
                &mut params.user_name,
                params.user_name_ref.as_ref(),
                params.user_name_selector.as_ref(),
            )
            .await?;
            Ok(group || user)
        }
    }
);

/// Group and user a membership binds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipKey {
    pub group: String,
    pub user: String,
}

impl MembershipKey {
    /// Parse a `{group}/{user}` external name
    pub fn parse(external_name: &str) -> Result<Self> {
        match external_name.split_once('/') {
            Some((group, user)) if !group.is_empty() && !user.is_empty() && !user.contains('/') => {
                Ok(Self {
                    group: group.to_string(),
                    user: user.to_string(),
                })
            }
            _ => Err(Error::invalid_input(format!(
                "external name {external_name:?} is not of the form <group>/<user>"
            ))),
        }
    }
}

impl std::fmt::Display for MembershipKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group, self.user)
    }
}

/// Remote membership as seen from the group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipDescription {
    pub group_arn: String,
    pub user_arn: String,
}

/// [`ResourceClient`] for `UserGroupMembership` records
#[derive(Debug)]
pub struct MembershipClient<A> {
    api: A,
}

impl<A: IamApi> MembershipClient<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<A: IamApi> ResourceClient<UserGroupMembership> for MembershipClient<A> {
    type DescribeInput = MembershipKey;
    type Observed = MembershipDescription;
    type CreateInput = MembershipKey;
    type Created = MembershipKey;
    type UpdateInput = ();
    type Updated = ();
    type DeleteInput = MembershipKey;

    fn generate_describe_input(&self, record: &UserGroupMembership) -> Result<MembershipKey> {
        MembershipKey::parse(external_name(record))
    }

    async fn describe(&self, key: MembershipKey) -> Result<MembershipDescription> {
        let (group, members) = self.api.list_group_members(&key.group).await?;
        members
            .into_iter()
            .find(|GroupMember { user_name, .. }| *user_name == key.user)
            .map(|member| MembershipDescription {
                group_arn: group.arn,
                user_arn: member.arn,
            })
            .ok_or_else(|| {
                CloudError::service(
                    "NoSuchEntity",
                    format!("user {} is not a member of group {}", key.user, key.group),
                )
                .into()
            })
    }

    fn generate_observation(&self, observed: &MembershipDescription) -> UserGroupMembershipObservation {
        UserGroupMembershipObservation {
            group_arn: Some(observed.group_arn.clone()),
            user_arn: Some(observed.user_arn.clone()),
        }
    }

    fn generate_create_input(&self, record: &UserGroupMembership) -> Result<MembershipKey> {
        let params = record.for_provider();
        let group = params
            .group_name
            .clone()
            .filter(|g| !g.is_empty())
            .ok_or_else(|| Error::invalid_input("groupName is required"))?;
        let user = params
            .user_name
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::invalid_input("userName is required"))?;
        Ok(MembershipKey { group, user })
    }

    async fn create(&self, key: MembershipKey) -> Result<MembershipKey> {
        info!(
            provider = "aws",
            group = %key.group,
            user = %key.user,
            operation = "create",
            "Adding user to group"
        );
        self.api.add_user_to_group(&key.group, &key.user).await?;
        Ok(key)
    }

    async fn post_create(
        &self,
        record: &mut UserGroupMembership,
        created: &MembershipKey,
        creation: ExternalCreation,
    ) -> Result<ExternalCreation> {
        set_external_name(record, &created.to_string());
        Ok(creation)
    }

    fn generate_update_input(&self, _record: &UserGroupMembership) -> Result<()> {
        Ok(())
    }

    async fn update(&self, _input: ()) -> Result<()> {
        Ok(())
    }

    fn generate_delete_input(&self, record: &UserGroupMembership) -> Result<MembershipKey> {
        MembershipKey::parse(external_name(record))
    }

    async fn delete(&self, key: MembershipKey) -> Result<()> {
        info!(
            provider = "aws",
            group = %key.group,
            user = %key.user,
            operation = "delete",
            "Removing user from group"
        );
        self.api.remove_user_from_group(&key.group, &key.user).await
    }

    fn late_initialize(
        &self,
        _declared: &mut UserGroupMembershipParameters,
        _observed: &MembershipDescription,
    ) -> Result<bool> {
        Ok(false)
    }

    fn is_up_to_date(
        &self,
        _record: &UserGroupMembership,
        _observed: &MembershipDescription,
    ) -> Result<(bool, String)> {
        Ok((true, String::new()))
    }
}

fn build(
    session: &AwsSession,
    store: Arc<dyn RecordStore<UserGroupMembership>>,
) -> Result<Box<dyn ExternalClient<UserGroupMembership>>> {
    let api = SdkIamApi::new(session.iam()?);
    Ok(Box::new(ManagedExternal::new(MembershipClient::new(api), store)))
}

/// Connector for `UserGroupMembership` records
pub fn connector(
    resolver: Arc<ClientResolver>,
    store: Arc<dyn RecordStore<UserGroupMembership>>,
) -> AwsConnector<UserGroupMembership> {
    AwsConnector::new(resolver, store, build)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn external_name_round_trips() {
        let key = MembershipKey::parse("g1/u1").unwrap();
        assert_eq!(key.group, "g1");
        assert_eq!(key.user, "u1");
        assert_eq!(key.to_string(), "g1/u1");
    }

    #[test]
    fn malformed_external_names_are_invalid_input() {
        for name in ["badformat", "/u1", "g1/", "g1/u1/x", ""] {
            let err = MembershipKey::parse(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{name}");
        }
    }

    #[test]
    fn memberships_start_without_external_name() {
        let membership = UserGroupMembership::new(
            "m",
            crate::crd::UserGroupMembershipSpec {
                resource_spec: Default::default(),
                for_provider: UserGroupMembershipParameters::default(),
            },
        );
        assert!(membership.initial_external_name().is_none());
    }
}
