//! IAM roles.
//!
//! The trust policy is compared semantically: IAM hands it back
//! percent-encoded and reformatted, so a textual comparison would report
//! drift on every pass.

use super::{differs, tag_changes, IamApi, RoleCreate, RoleDescription, SdkIamApi};
use crate::clients::{AwsSession, ClientResolver};
use crate::crd::{Role, RoleObservation, RoleParameters};
use crate::drift::{self, policy, DiffOptions, LateInitOptions};
use crate::error::Result;
use crate::managed::{
    external_name, ExternalClient, Managed, ManagedExternal, RecordStore, ResourceClient,
};
use crate::provider::AwsConnector;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

crate::impl_managed!(Role, RoleParameters, RoleObservation);

const POLICY_FIELD: &str = "assumeRolePolicyDocument";

#[derive(Debug, Clone)]
pub struct RoleUpdate {
    pub name: String,
    pub desired: RoleParameters,
}

/// [`ResourceClient`] for `Role` records
#[derive(Debug)]
pub struct RoleClient<A> {
    api: A,
}

impl<A: IamApi> RoleClient<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<A: IamApi> ResourceClient<Role> for RoleClient<A> {
    type DescribeInput = String;
    type Observed = RoleDescription;
    type CreateInput = RoleCreate;
    type Created = RoleDescription;
    type UpdateInput = RoleUpdate;
    type Updated = ();
    type DeleteInput = String;

    fn generate_describe_input(&self, record: &Role) -> Result<String> {
        Ok(external_name(record).to_string())
    }

    async fn describe(&self, name: String) -> Result<RoleDescription> {
        self.api.get_role(&name).await
    }

    fn generate_observation(&self, observed: &RoleDescription) -> RoleObservation {
        RoleObservation {
            arn: Some(observed.arn.clone()),
            role_id: Some(observed.role_id.clone()),
            create_date: observed.create_date.clone(),
        }
    }

    fn generate_create_input(&self, record: &Role) -> Result<RoleCreate> {
        let params = record.for_provider();
        Ok(RoleCreate {
            name: external_name(record).to_string(),
            assume_role_policy_document: params.assume_role_policy_document.clone(),
            description: params.description.clone(),
            max_session_duration: params.max_session_duration,
            path: params.path.clone(),
            permissions_boundary: params.permissions_boundary.clone(),
            tags: params.tags.clone(),
        })
    }

    async fn create(&self, input: RoleCreate) -> Result<RoleDescription> {
        info!(provider = "aws", role = %input.name, operation = "create", "Creating IAM role");
        self.api.create_role(input).await
    }

    fn generate_update_input(&self, record: &Role) -> Result<RoleUpdate> {
        Ok(RoleUpdate {
            name: external_name(record).to_string(),
            desired: record.for_provider().clone(),
        })
    }

    async fn update(&self, input: RoleUpdate) -> Result<()> {
        let RoleUpdate { name, desired } = input;
        let current = self.api.get_role(&name).await?;

        if differs(desired.description.as_ref(), current.description.as_ref())
            || differs(
                desired.max_session_duration.as_ref(),
                current.max_session_duration.as_ref(),
            )
        {
            self.api
                .update_role(&name, desired.description.clone(), desired.max_session_duration)
                .await?;
        }

        if !policy::is_policy_equal_opt(
            Some(desired.assume_role_policy_document.as_str()),
            current.assume_role_policy_document.as_deref(),
        )? {
            info!(role = %name, "Updating assume role policy");
            self.api
                .update_assume_role_policy(&name, &desired.assume_role_policy_document)
                .await?;
        }

        if let Some(boundary) = desired.permissions_boundary.as_deref() {
            if current.permissions_boundary.as_deref() != Some(boundary) {
                self.api.put_role_permissions_boundary(&name, boundary).await?;
            }
        }

        let (add, remove) = tag_changes(&current.tags, &desired.tags);
        if !remove.is_empty() {
            self.api.untag_role(&name, remove).await?;
        }
        if !add.is_empty() {
            self.api.tag_role(&name, add).await?;
        }
        Ok(())
    }

    fn generate_delete_input(&self, record: &Role) -> Result<String> {
        Ok(external_name(record).to_string())
    }

    async fn delete(&self, name: String) -> Result<()> {
        info!(provider = "aws", role = %name, operation = "delete", "Deleting IAM role");
        self.api.delete_role(&name).await
    }

    fn late_init_options(&self) -> LateInitOptions {
        LateInitOptions::default()
            .skip(POLICY_FIELD)
            .skip("permissionsBoundary")
            .skip("tags")
    }

    // Role paths cannot be changed after creation
    fn diff_options(&self) -> DiffOptions {
        DiffOptions::default().ignore(POLICY_FIELD).ignore("path")
    }

    fn is_up_to_date(&self, record: &Role, observed: &RoleDescription) -> Result<(bool, String)> {
        let (fields_match, diff) =
            drift::is_up_to_date(record.for_provider(), observed, &self.diff_options())?;
        let policy_match = policy::is_policy_equal_opt(
            Some(record.for_provider().assume_role_policy_document.as_str()),
            observed.assume_role_policy_document.as_deref(),
        )?;
        let diff = match (policy_match, diff.is_empty()) {
            (true, _) => diff,
            (false, true) => format!("{POLICY_FIELD} differs"),
            (false, false) => format!("{diff}; {POLICY_FIELD} differs"),
        };
        Ok((fields_match && policy_match, diff))
    }
}

fn build(
    session: &AwsSession,
    store: Arc<dyn RecordStore<Role>>,
) -> Result<Box<dyn ExternalClient<Role>>> {
    let api = SdkIamApi::new(session.iam()?);
    Ok(Box::new(ManagedExternal::new(RoleClient::new(api), store)))
}

/// Connector for `Role` records
pub fn connector(resolver: Arc<ClientResolver>, store: Arc<dyn RecordStore<Role>>) -> AwsConnector<Role> {
    AwsConnector::new(resolver, store, build)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::RoleSpec;
    use crate::provider::iam::MockIamApi;

    const DECLARED: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":"sts:AssumeRole","Principal":{"AWS":["A","B"]}}]}"#;
    const OBSERVED: &str = r#"{"Version": "2012-10-17", "Statement": [{"Effect": "Allow", "Action": ["sts:AssumeRole"], "Principal": {"AWS": ["B", "A"]}}]}"#;

    fn role() -> Role {
        let mut role = Role::new(
            "my-role",
            RoleSpec {
                resource_spec: Default::default(),
                for_provider: RoleParameters {
                    assume_role_policy_document: DECLARED.into(),
                    description: Some("provider role".into()),
                    ..RoleParameters::default()
                },
            },
        );
        crate::managed::set_external_name(&mut role, "my-role");
        role
    }

    fn remote(document: &str) -> RoleDescription {
        RoleDescription {
            role_name: "my-role".into(),
            arn: "arn:aws:iam::123456789012:role/my-role".into(),
            role_id: "AROAEXAMPLE".into(),
            assume_role_policy_document: Some(urlencoding::encode(document).into_owned()),
            description: Some("provider role".into()),
            max_session_duration: Some(3600),
            path: Some("/".into()),
            ..RoleDescription::default()
        }
    }

    #[test]
    fn encoded_reordered_trust_policy_is_up_to_date() {
        let client = RoleClient::new(MockIamApi::new());
        let (up_to_date, diff) = client.is_up_to_date(&role(), &remote(OBSERVED)).unwrap();
        assert!(up_to_date, "{diff}");
    }

    #[test]
    fn different_trust_policy_is_drift() {
        let client = RoleClient::new(MockIamApi::new());
        let other = OBSERVED.replace("\"B\"", "\"C\"");
        let (up_to_date, diff) = client.is_up_to_date(&role(), &remote(&other)).unwrap();
        assert!(!up_to_date);
        assert!(diff.contains(POLICY_FIELD));
    }

    #[test]
    fn changed_path_is_not_drift() {
        let client = RoleClient::new(MockIamApi::new());
        let mut moved = role();
        moved.spec.for_provider.path = Some("/service/".into());
        let (up_to_date, diff) = client.is_up_to_date(&moved, &remote(OBSERVED)).unwrap();
        assert!(up_to_date, "{diff}");
    }

    #[test]
    fn late_init_fills_path_and_session_duration_only() {
        let client = RoleClient::new(MockIamApi::new());
        let mut params = role().spec.for_provider;
        assert!(client.late_initialize(&mut params, &remote(OBSERVED)).unwrap());
        assert_eq!(params.path.as_deref(), Some("/"));
        assert_eq!(params.max_session_duration, Some(3600));
        assert_eq!(params.assume_role_policy_document, DECLARED);
    }

    #[tokio::test]
    async fn update_pushes_changed_policy_only() {
        let mut api = MockIamApi::new();
        api.expect_get_role()
            .returning(|_| Ok(remote(&OBSERVED.replace("\"B\"", "\"C\""))));
        api.expect_update_role().never();
        api.expect_update_assume_role_policy()
            .withf(|name, document| name == "my-role" && document == DECLARED)
            .times(1)
            .returning(|_, _| Ok(()));
        let client = RoleClient::new(api);
        client
            .update(RoleUpdate {
                name: "my-role".into(),
                desired: role().spec.for_provider,
            })
            .await
            .unwrap();
    }
}
