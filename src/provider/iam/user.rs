//! IAM users.

use super::{tag_changes, IamApi, SdkIamApi, UserCreate, UserDescription};
use crate::clients::{AwsSession, ClientResolver};
use crate::crd::{User, UserObservation, UserParameters};
use crate::drift::LateInitOptions;
use crate::error::Result;
use crate::managed::{
    external_name, ExternalClient, Managed, ManagedExternal, RecordStore, ResourceClient,
};
use crate::provider::AwsConnector;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

crate::impl_managed!(User, UserParameters, UserObservation);

#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub desired: UserParameters,
}

/// [`ResourceClient`] for `User` records
#[derive(Debug)]
pub struct UserClient<A> {
    api: A,
}

impl<A: IamApi> UserClient<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<A: IamApi> ResourceClient<User> for UserClient<A> {
    type DescribeInput = String;
    type Observed = UserDescription;
    type CreateInput = UserCreate;
    type Created = UserDescription;
    type UpdateInput = UserUpdate;
    type Updated = ();
    type DeleteInput = String;

    fn generate_describe_input(&self, record: &User) -> Result<String> {
        Ok(external_name(record).to_string())
    }

    async fn describe(&self, name: String) -> Result<UserDescription> {
        self.api.get_user(&name).await
    }

    fn generate_observation(&self, observed: &UserDescription) -> UserObservation {
        UserObservation {
            arn: Some(observed.arn.clone()),
            user_id: Some(observed.user_id.clone()),
            create_date: observed.create_date.clone(),
        }
    }

    fn generate_create_input(&self, record: &User) -> Result<UserCreate> {
        let params = record.for_provider();
        Ok(UserCreate {
            name: external_name(record).to_string(),
            path: params.path.clone(),
            permissions_boundary: params.permissions_boundary.clone(),
            tags: params.tags.clone(),
        })
    }

    async fn create(&self, input: UserCreate) -> Result<UserDescription> {
        info!(provider = "aws", user = %input.name, operation = "create", "Creating IAM user");
        self.api.create_user(input).await
    }

    fn generate_update_input(&self, record: &User) -> Result<UserUpdate> {
        Ok(UserUpdate {
            name: external_name(record).to_string(),
            desired: record.for_provider().clone(),
        })
    }

    async fn update(&self, input: UserUpdate) -> Result<()> {
        let UserUpdate { name, desired } = input;
        let current = self.api.get_user(&name).await?;
        if let Some(path) = desired.path.as_deref() {
            if current.path.as_deref() != Some(path) {
                self.api.update_user_path(&name, path).await?;
            }
        }
        if let Some(boundary) = desired.permissions_boundary.as_deref() {
            if current.permissions_boundary.as_deref() != Some(boundary) {
                self.api.put_user_permissions_boundary(&name, boundary).await?;
            }
        }
        let (add, remove) = tag_changes(&current.tags, &desired.tags);
        if !remove.is_empty() {
            self.api.untag_user(&name, remove).await?;
        }
        if !add.is_empty() {
            self.api.tag_user(&name, add).await?;
        }
        Ok(())
    }

    fn generate_delete_input(&self, record: &User) -> Result<String> {
        Ok(external_name(record).to_string())
    }

    async fn delete(&self, name: String) -> Result<()> {
        info!(provider = "aws", user = %name, operation = "delete", "Deleting IAM user");
        self.api.delete_user(&name).await
    }

    fn late_init_options(&self) -> LateInitOptions {
        LateInitOptions::default().skip("tags")
    }
}

fn build(
    session: &AwsSession,
    store: Arc<dyn RecordStore<User>>,
) -> Result<Box<dyn ExternalClient<User>>> {
    let api = SdkIamApi::new(session.iam()?);
    Ok(Box::new(ManagedExternal::new(UserClient::new(api), store)))
}

/// Connector for `User` records
pub fn connector(resolver: Arc<ClientResolver>, store: Arc<dyn RecordStore<User>>) -> AwsConnector<User> {
    AwsConnector::new(resolver, store, build)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Tag, UserSpec};
    use crate::provider::iam::MockIamApi;

    fn remote() -> UserDescription {
        UserDescription {
            user_name: "alice".into(),
            arn: "arn:aws:iam::123456789012:user/alice".into(),
            user_id: "AIDAEXAMPLE".into(),
            path: Some("/".into()),
            tags: vec![Tag { key: "team".into(), value: Some("a".into()) }],
            ..UserDescription::default()
        }
    }

    #[test]
    fn observation_carries_arn_and_id() {
        let client = UserClient::new(MockIamApi::new());
        let observation = client.generate_observation(&remote());
        assert_eq!(observation.arn.as_deref(), Some("arn:aws:iam::123456789012:user/alice"));
        assert_eq!(observation.user_id.as_deref(), Some("AIDAEXAMPLE"));
    }

    #[test]
    fn unset_tags_are_not_drift() {
        let client = UserClient::new(MockIamApi::new());
        let mut user = User::new(
            "alice",
            UserSpec {
                resource_spec: Default::default(),
                for_provider: UserParameters::default(),
            },
        );
        crate::managed::set_external_name(&mut user, "alice");
        let (up_to_date, _) = client.is_up_to_date(&user, &remote()).unwrap();
        assert!(up_to_date);
    }

    #[tokio::test]
    async fn update_moves_user_to_declared_path() {
        let mut api = MockIamApi::new();
        api.expect_get_user().returning(|_| Ok(remote()));
        api.expect_update_user_path()
            .withf(|name, path| name == "alice" && path == "/engineering/")
            .times(1)
            .returning(|_, _| Ok(()));
        api.expect_tag_user().never();
        api.expect_untag_user().never();
        UserClient::new(api)
            .update(UserUpdate {
                name: "alice".into(),
                desired: UserParameters {
                    path: Some("/engineering/".into()),
                    ..UserParameters::default()
                },
            })
            .await
            .unwrap();
    }
}
