//! IAM groups.

use super::{GroupDescription, IamApi, SdkIamApi};
use crate::clients::{AwsSession, ClientResolver};
use crate::crd::{Group, GroupObservation, GroupParameters};
use crate::error::Result;
use crate::managed::{
    external_name, ExternalClient, Managed, ManagedExternal, RecordStore, ResourceClient,
};
use crate::provider::AwsConnector;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

crate::impl_managed!(Group, GroupParameters, GroupObservation);

/// [`ResourceClient`] for `Group` records
#[derive(Debug)]
pub struct GroupClient<A> {
    api: A,
}

impl<A: IamApi> GroupClient<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<A: IamApi> ResourceClient<Group> for GroupClient<A> {
    type DescribeInput = String;
    type Observed = GroupDescription;
    type CreateInput = (String, Option<String>);
    type Created = GroupDescription;
    /// Group name and declared path
    type UpdateInput = (String, Option<String>);
    type Updated = ();
    type DeleteInput = String;

    fn generate_describe_input(&self, record: &Group) -> Result<String> {
        Ok(external_name(record).to_string())
    }

    async fn describe(&self, name: String) -> Result<GroupDescription> {
        self.api.get_group(&name).await
    }

    fn generate_observation(&self, observed: &GroupDescription) -> GroupObservation {
        GroupObservation {
            arn: Some(observed.arn.clone()),
            group_id: Some(observed.group_id.clone()),
            create_date: observed.create_date.clone(),
        }
    }

    fn generate_create_input(&self, record: &Group) -> Result<(String, Option<String>)> {
        Ok((
            external_name(record).to_string(),
            record.for_provider().path.clone(),
        ))
    }

    async fn create(&self, (name, path): (String, Option<String>)) -> Result<GroupDescription> {
        info!(provider = "aws", group = %name, operation = "create", "Creating IAM group");
        self.api.create_group(&name, path).await
    }

    fn generate_update_input(&self, record: &Group) -> Result<(String, Option<String>)> {
        self.generate_create_input(record)
    }

    async fn update(&self, (name, path): (String, Option<String>)) -> Result<()> {
        match path {
            Some(path) => self.api.update_group_path(&name, &path).await,
            None => Ok(()),
        }
    }

    fn generate_delete_input(&self, record: &Group) -> Result<String> {
        Ok(external_name(record).to_string())
    }

    async fn delete(&self, name: String) -> Result<()> {
        info!(provider = "aws", group = %name, operation = "delete", "Deleting IAM group");
        self.api.delete_group(&name).await
    }
}

fn build(
    session: &AwsSession,
    store: Arc<dyn RecordStore<Group>>,
) -> Result<Box<dyn ExternalClient<Group>>> {
    let api = SdkIamApi::new(session.iam()?);
    Ok(Box::new(ManagedExternal::new(GroupClient::new(api), store)))
}

/// Connector for `Group` records
pub fn connector(resolver: Arc<ClientResolver>, store: Arc<dyn RecordStore<Group>>) -> AwsConnector<Group> {
    AwsConnector::new(resolver, store, build)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::GroupSpec;
    use crate::provider::iam::MockIamApi;

    fn group(path: Option<&str>) -> Group {
        let mut group = Group::new(
            "admins",
            GroupSpec {
                resource_spec: Default::default(),
                for_provider: GroupParameters {
                    path: path.map(str::to_string),
                },
            },
        );
        crate::managed::set_external_name(&mut group, "admins");
        group
    }

    fn remote() -> GroupDescription {
        GroupDescription {
            group_name: "admins".into(),
            arn: "arn:aws:iam::123456789012:group/admins".into(),
            group_id: "AGPAEXAMPLE".into(),
            create_date: None,
            path: Some("/".into()),
        }
    }

    #[test]
    fn path_change_is_drift() {
        let client = GroupClient::new(MockIamApi::new());
        let (up_to_date, diff) = client.is_up_to_date(&group(Some("/ops/")), &remote()).unwrap();
        assert!(!up_to_date);
        assert!(diff.contains("/ops/"), "{diff}");
        assert!(client.is_up_to_date(&group(None), &remote()).unwrap().0);
    }

    #[test]
    fn late_init_fills_path() {
        let client = GroupClient::new(MockIamApi::new());
        let mut params = GroupParameters::default();
        assert!(client.late_initialize(&mut params, &remote()).unwrap());
        assert_eq!(params.path.as_deref(), Some("/"));
    }
}
