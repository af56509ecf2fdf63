//! # Classic Load Balancers
//!
//! `LoadBalancer` records against the classic Elastic Load Balancing API.
//!
//! The external name is the load balancer name. Updates re-read the remote
//! object and apply the difference: listeners are matched by their load
//! balancer port, and a changed listener is deleted before its replacement
//! is created because the API rejects two listeners on one port.

use super::{non_empty, timestamp, AwsConnector};
use crate::clients::{AwsSession, ClientResolver, CloudError};
use crate::crd::{Listener, LoadBalancer, LoadBalancerObservation, LoadBalancerParameters, Tag};
use crate::drift::{self, DiffOptions, LateInitOptions};
use crate::error::{Error, Result};
use crate::managed::{
    external_name, record_name, ExternalClient, Managed, ManagedExternal, RecordStore, ResourceClient,
};
use async_trait::async_trait;
use aws_sdk_elasticloadbalancing as elb;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

crate::impl_managed!(LoadBalancer, LoadBalancerParameters, LoadBalancerObservation, {
    fn region(&self) -> String {
        self.spec.for_provider.region.clone()
    }
});

/// Remote load balancer, in declared naming
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerDescription {
    pub load_balancer_name: String,
    pub availability_zones: Vec<String>,
    pub listeners: Vec<Listener>,
    pub scheme: Option<String>,
    pub security_group_ids: Vec<String>,
    pub subnet_ids: Vec<String>,
    pub tags: Vec<Tag>,
    pub dns_name: Option<String>,
    #[serde(rename = "canonicalHostedZoneNameID")]
    pub canonical_hosted_zone_name_id: Option<String>,
    #[serde(rename = "vpcID")]
    pub vpc_id: Option<String>,
    pub created_time: Option<String>,
}

/// Input of `CreateLoadBalancer`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadBalancerCreate {
    pub name: String,
    pub availability_zones: Vec<String>,
    pub listeners: Vec<Listener>,
    pub scheme: Option<String>,
    pub security_group_ids: Vec<String>,
    pub subnet_ids: Vec<String>,
    pub tags: Vec<Tag>,
}

/// The load balancer calls this crate makes
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    async fn describe(&self, name: &str) -> Result<LoadBalancerDescription>;
    /// Returns the DNS name of the new load balancer
    async fn create(&self, input: LoadBalancerCreate) -> Result<Option<String>>;
    async fn delete(&self, name: &str) -> Result<()>;
    async fn delete_listeners(&self, name: &str, ports: Vec<i32>) -> Result<()>;
    async fn create_listeners(&self, name: &str, listeners: Vec<Listener>) -> Result<()>;
    async fn enable_zones(&self, name: &str, zones: Vec<String>) -> Result<()>;
    async fn disable_zones(&self, name: &str, zones: Vec<String>) -> Result<()>;
    async fn apply_security_groups(&self, name: &str, groups: Vec<String>) -> Result<()>;
    async fn attach_subnets(&self, name: &str, subnets: Vec<String>) -> Result<()>;
    async fn detach_subnets(&self, name: &str, subnets: Vec<String>) -> Result<()>;
    async fn add_tags(&self, name: &str, tags: Vec<Tag>) -> Result<()>;
    async fn remove_tags(&self, name: &str, keys: Vec<String>) -> Result<()>;
}

/// Changes that bring a remote load balancer to the declared state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    pub delete_listener_ports: Vec<i32>,
    pub create_listeners: Vec<Listener>,
    pub enable_zones: Vec<String>,
    pub disable_zones: Vec<String>,
    pub security_groups: Option<Vec<String>>,
    pub attach_subnets: Vec<String>,
    pub detach_subnets: Vec<String>,
    pub add_tags: Vec<Tag>,
    pub remove_tag_keys: Vec<String>,
}

impl UpdatePlan {
    pub fn is_empty(&self) -> bool {
        *self == UpdatePlan::default()
    }
}

/// Declared listener matches a remote one; unset optional fields match anything
fn listener_matches(declared: &Listener, remote: &Listener) -> bool {
    fn optional_eq(declared: Option<&str>, remote: Option<&str>) -> bool {
        declared.is_none_or(|d| remote.is_some_and(|r| d.eq_ignore_ascii_case(r)))
    }
    declared.load_balancer_port == remote.load_balancer_port
        && declared.instance_port == remote.instance_port
        && declared.protocol.eq_ignore_ascii_case(&remote.protocol)
        && optional_eq(declared.instance_protocol.as_deref(), remote.instance_protocol.as_deref())
        && optional_eq(declared.ssl_certificate_id.as_deref(), remote.ssl_certificate_id.as_deref())
}

/// Upper-case listener protocols; the service accepts any case and reports upper case
fn normalize_protocols(listeners: &mut [Listener]) {
    for listener in listeners {
        listener.protocol.make_ascii_uppercase();
        if let Some(protocol) = listener.instance_protocol.as_mut() {
            protocol.make_ascii_uppercase();
        }
    }
}

/// Set difference `a - b`, keeping the order of `a`
fn missing_from(a: &[String], b: &[String]) -> Vec<String> {
    let b: BTreeSet<&String> = b.iter().collect();
    a.iter().filter(|x| !b.contains(x)).cloned().collect()
}

/// Compute what to change on `current` to reach `desired`.
///
/// Empty declared collections leave the remote side alone.
pub fn plan_update(current: &LoadBalancerDescription, desired: &LoadBalancerParameters) -> UpdatePlan {
    let mut plan = UpdatePlan::default();

    if !desired.listeners.is_empty() {
        plan.delete_listener_ports = current
            .listeners
            .iter()
            .filter(|remote| !desired.listeners.iter().any(|d| listener_matches(d, remote)))
            .map(|remote| remote.load_balancer_port)
            .collect();
        plan.create_listeners = desired
            .listeners
            .iter()
            .filter(|d| !current.listeners.iter().any(|remote| listener_matches(d, remote)))
            .cloned()
            .collect();
    }

    if !desired.availability_zones.is_empty() {
        plan.enable_zones = missing_from(&desired.availability_zones, &current.availability_zones);
        plan.disable_zones = missing_from(&current.availability_zones, &desired.availability_zones);
    }

    if !desired.security_group_ids.is_empty() {
        let declared: BTreeSet<&String> = desired.security_group_ids.iter().collect();
        let remote: BTreeSet<&String> = current.security_group_ids.iter().collect();
        if declared != remote {
            plan.security_groups = Some(desired.security_group_ids.clone());
        }
    }

    if !desired.subnet_ids.is_empty() {
        plan.attach_subnets = missing_from(&desired.subnet_ids, &current.subnet_ids);
        plan.detach_subnets = missing_from(&current.subnet_ids, &desired.subnet_ids);
    }

    if !desired.tags.is_empty() {
        plan.add_tags = desired
            .tags
            .iter()
            .filter(|t| !current.tags.contains(t))
            .cloned()
            .collect();
        plan.remove_tag_keys = current
            .tags
            .iter()
            .filter(|t| !desired.tags.iter().any(|d| d.key == t.key))
            .map(|t| t.key.clone())
            .collect();
    }

    plan
}

/// Apply a plan; listener deletions go first
pub async fn apply_plan<A: LoadBalancerApi + ?Sized>(api: &A, name: &str, plan: UpdatePlan) -> Result<()> {
    if !plan.delete_listener_ports.is_empty() {
        api.delete_listeners(name, plan.delete_listener_ports).await?;
    }
    if !plan.create_listeners.is_empty() {
        api.create_listeners(name, plan.create_listeners).await?;
    }
    if !plan.enable_zones.is_empty() {
        api.enable_zones(name, plan.enable_zones).await?;
    }
    if !plan.disable_zones.is_empty() {
        api.disable_zones(name, plan.disable_zones).await?;
    }
    if let Some(groups) = plan.security_groups {
        api.apply_security_groups(name, groups).await?;
    }
    if !plan.attach_subnets.is_empty() {
        api.attach_subnets(name, plan.attach_subnets).await?;
    }
    if !plan.detach_subnets.is_empty() {
        api.detach_subnets(name, plan.detach_subnets).await?;
    }
    if !plan.remove_tag_keys.is_empty() {
        api.remove_tags(name, plan.remove_tag_keys).await?;
    }
    if !plan.add_tags.is_empty() {
        api.add_tags(name, plan.add_tags).await?;
    }
    Ok(())
}

/// Load balancer name and the declared parameters to converge on
#[derive(Debug, Clone)]
pub struct LoadBalancerUpdate {
    pub name: String,
    pub desired: LoadBalancerParameters,
}

/// [`ResourceClient`] for `LoadBalancer` records
#[derive(Debug)]
pub struct LoadBalancerClient<A> {
    api: A,
}

impl<A: LoadBalancerApi> LoadBalancerClient<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

fn load_balancer_name(record: &LoadBalancer) -> Result<String> {
    let name = match external_name(record) {
        "" => record_name(record),
        name => name,
    };
    if name.is_empty() {
        return Err(Error::invalid_input("load balancer has no name"));
    }
    Ok(name.to_string())
}

#[async_trait]
impl<A: LoadBalancerApi> ResourceClient<LoadBalancer> for LoadBalancerClient<A> {
    type DescribeInput = String;
    type Observed = LoadBalancerDescription;
    type CreateInput = LoadBalancerCreate;
    type Created = Option<String>;
    type UpdateInput = LoadBalancerUpdate;
    type Updated = ();
    type DeleteInput = String;

    fn generate_describe_input(&self, record: &LoadBalancer) -> Result<String> {
        load_balancer_name(record)
    }

    async fn describe(&self, name: String) -> Result<LoadBalancerDescription> {
        self.api.describe(&name).await
    }

    fn generate_observation(&self, observed: &LoadBalancerDescription) -> LoadBalancerObservation {
        LoadBalancerObservation {
            dns_name: observed.dns_name.clone(),
            canonical_hosted_zone_name_id: observed.canonical_hosted_zone_name_id.clone(),
            vpc_id: observed.vpc_id.clone(),
            created_time: observed.created_time.clone(),
        }
    }

    fn generate_create_input(&self, record: &LoadBalancer) -> Result<LoadBalancerCreate> {
        let params = &record.spec.for_provider;
        Ok(LoadBalancerCreate {
            name: load_balancer_name(record)?,
            availability_zones: params.availability_zones.clone(),
            listeners: params.listeners.clone(),
            scheme: params.scheme.clone(),
            security_group_ids: params.security_group_ids.clone(),
            subnet_ids: params.subnet_ids.clone(),
            tags: params.tags.clone(),
        })
    }

    async fn create(&self, input: LoadBalancerCreate) -> Result<Option<String>> {
        info!(
            provider = "aws",
            load_balancer = %input.name,
            operation = "create",
            "Creating load balancer"
        );
        self.api.create(input).await
    }

    fn generate_update_input(&self, record: &LoadBalancer) -> Result<LoadBalancerUpdate> {
        Ok(LoadBalancerUpdate {
            name: load_balancer_name(record)?,
            desired: record.spec.for_provider.clone(),
        })
    }

    async fn update(&self, input: LoadBalancerUpdate) -> Result<()> {
        let current = self.api.describe(&input.name).await?;
        let plan = plan_update(&current, &input.desired);
        if plan.is_empty() {
            debug!(load_balancer = %input.name, "Nothing to update");
            return Ok(());
        }
        info!(
            provider = "aws",
            load_balancer = %input.name,
            operation = "update",
            delete_listeners = ?plan.delete_listener_ports,
            create_listeners = plan.create_listeners.len(),
            "Updating load balancer"
        );
        apply_plan(&self.api, &input.name, plan).await
    }

    fn generate_delete_input(&self, record: &LoadBalancer) -> Result<String> {
        load_balancer_name(record)
    }

    async fn delete(&self, name: String) -> Result<()> {
        info!(provider = "aws", load_balancer = %name, operation = "delete", "Deleting load balancer");
        self.api.delete(&name).await
    }

    fn late_init_options(&self) -> LateInitOptions {
        LateInitOptions::default()
            .key("listeners", &["loadBalancerPort"])
            .skip("tags")
    }

    fn diff_options(&self) -> DiffOptions {
        DiffOptions::default()
            .ignore("region")
            .with_late_init(LateInitOptions::default().key("listeners", &["loadBalancerPort"]))
    }

    fn is_up_to_date(
        &self,
        record: &LoadBalancer,
        observed: &LoadBalancerDescription,
    ) -> Result<(bool, String)> {
        let mut declared = record.for_provider().clone();
        let mut observed = observed.clone();
        normalize_protocols(&mut declared.listeners);
        normalize_protocols(&mut observed.listeners);
        Ok(drift::is_up_to_date(&declared, &observed, &self.diff_options())?)
    }
}

/// [`LoadBalancerApi`] backed by the SDK
#[derive(Debug, Clone)]
pub struct SdkLoadBalancerApi {
    client: elb::Client,
}

impl SdkLoadBalancerApi {
    pub fn new(client: elb::Client) -> Self {
        Self { client }
    }
}

fn to_sdk_listener(listener: &Listener) -> Result<elb::types::Listener> {
    elb::types::Listener::builder()
        .protocol(&listener.protocol)
        .load_balancer_port(listener.load_balancer_port)
        .instance_port(listener.instance_port)
        .set_instance_protocol(listener.instance_protocol.clone())
        .set_ssl_certificate_id(listener.ssl_certificate_id.clone())
        .build()
        .map_err(|e| Error::invalid_input(format!("invalid listener: {e}")))
}

fn from_sdk_listener(listener: &elb::types::Listener) -> Listener {
    Listener {
        instance_port: listener.instance_port(),
        instance_protocol: listener.instance_protocol().map(str::to_string),
        load_balancer_port: listener.load_balancer_port(),
        protocol: listener.protocol().to_string(),
        ssl_certificate_id: listener.ssl_certificate_id().map(str::to_string),
    }
}

fn to_sdk_tags(tags: &[Tag]) -> Result<Vec<elb::types::Tag>> {
    tags.iter()
        .map(|t| {
            elb::types::Tag::builder()
                .key(&t.key)
                .set_value(t.value.clone())
                .build()
                .map_err(|e| Error::invalid_input(format!("invalid tag: {e}")))
        })
        .collect()
}

#[async_trait]
impl LoadBalancerApi for SdkLoadBalancerApi {
    async fn describe(&self, name: &str) -> Result<LoadBalancerDescription> {
        let output = self
            .client
            .describe_load_balancers()
            .load_balancer_names(name)
            .send()
            .await
            .map_err(CloudError::from)?;
        let Some(lb) = output.load_balancer_descriptions().first() else {
            return Err(CloudError::service("LoadBalancerNotFound", format!("load balancer {name} not found")).into());
        };
        let tags = self
            .client
            .describe_tags()
            .load_balancer_names(name)
            .send()
            .await
            .map_err(CloudError::from)?;

        Ok(LoadBalancerDescription {
            load_balancer_name: lb.load_balancer_name().unwrap_or(name).to_string(),
            availability_zones: lb.availability_zones().to_vec(),
            listeners: lb
                .listener_descriptions()
                .iter()
                .filter_map(|d| d.listener())
                .map(from_sdk_listener)
                .collect(),
            scheme: lb.scheme().map(str::to_string),
            security_group_ids: lb.security_groups().to_vec(),
            subnet_ids: lb.subnets().to_vec(),
            tags: tags
                .tag_descriptions()
                .iter()
                .flat_map(|d| d.tags())
                .map(|t| Tag {
                    key: t.key().to_string(),
                    value: t.value().map(str::to_string),
                })
                .collect(),
            dns_name: lb.dns_name().map(str::to_string),
            canonical_hosted_zone_name_id: lb.canonical_hosted_zone_name_id().map(str::to_string),
            vpc_id: lb.vpc_id().map(str::to_string),
            created_time: timestamp(lb.created_time()),
        })
    }

    async fn create(&self, input: LoadBalancerCreate) -> Result<Option<String>> {
        let listeners = input
            .listeners
            .iter()
            .map(to_sdk_listener)
            .collect::<Result<Vec<_>>>()?;
        let output = self
            .client
            .create_load_balancer()
            .load_balancer_name(&input.name)
            .set_listeners(Some(listeners))
            .set_availability_zones(non_empty(input.availability_zones))
            .set_scheme(input.scheme)
            .set_security_groups(non_empty(input.security_group_ids))
            .set_subnets(non_empty(input.subnet_ids))
            .set_tags(non_empty(to_sdk_tags(&input.tags)?))
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(output.dns_name().map(str::to_string))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.client
            .delete_load_balancer()
            .load_balancer_name(name)
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn delete_listeners(&self, name: &str, ports: Vec<i32>) -> Result<()> {
        self.client
            .delete_load_balancer_listeners()
            .load_balancer_name(name)
            .set_load_balancer_ports(Some(ports))
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn create_listeners(&self, name: &str, listeners: Vec<Listener>) -> Result<()> {
        let listeners = listeners
            .iter()
            .map(to_sdk_listener)
            .collect::<Result<Vec<_>>>()?;
        self.client
            .create_load_balancer_listeners()
            .load_balancer_name(name)
            .set_listeners(Some(listeners))
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn enable_zones(&self, name: &str, zones: Vec<String>) -> Result<()> {
        self.client
            .enable_availability_zones_for_load_balancer()
            .load_balancer_name(name)
            .set_availability_zones(Some(zones))
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn disable_zones(&self, name: &str, zones: Vec<String>) -> Result<()> {
        self.client
            .disable_availability_zones_for_load_balancer()
            .load_balancer_name(name)
            .set_availability_zones(Some(zones))
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn apply_security_groups(&self, name: &str, groups: Vec<String>) -> Result<()> {
        self.client
            .apply_security_groups_to_load_balancer()
            .load_balancer_name(name)
            .set_security_groups(Some(groups))
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn attach_subnets(&self, name: &str, subnets: Vec<String>) -> Result<()> {
        self.client
            .attach_load_balancer_to_subnets()
            .load_balancer_name(name)
            .set_subnets(Some(subnets))
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn detach_subnets(&self, name: &str, subnets: Vec<String>) -> Result<()> {
        self.client
            .detach_load_balancer_from_subnets()
            .load_balancer_name(name)
            .set_subnets(Some(subnets))
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn add_tags(&self, name: &str, tags: Vec<Tag>) -> Result<()> {
        self.client
            .add_tags()
            .load_balancer_names(name)
            .set_tags(Some(to_sdk_tags(&tags)?))
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }

    async fn remove_tags(&self, name: &str, keys: Vec<String>) -> Result<()> {
        let keys = keys
            .into_iter()
            .map(|k| elb::types::TagKeyOnly::builder().key(k).build())
            .collect();
        self.client
            .remove_tags()
            .load_balancer_names(name)
            .set_tags(Some(keys))
            .send()
            .await
            .map_err(CloudError::from)?;
        Ok(())
    }
}

fn build(
    session: &AwsSession,
    store: Arc<dyn RecordStore<LoadBalancer>>,
) -> Result<Box<dyn ExternalClient<LoadBalancer>>> {
    let api = SdkLoadBalancerApi::new(session.elb()?);
    Ok(Box::new(ManagedExternal::new(LoadBalancerClient::new(api), store)))
}

/// Connector for `LoadBalancer` records
pub fn connector(
    resolver: Arc<ClientResolver>,
    store: Arc<dyn RecordStore<LoadBalancer>>,
) -> AwsConnector<LoadBalancer> {
    AwsConnector::new(resolver, store, build)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;

    fn listener(port: i32) -> Listener {
        Listener {
            instance_port: port,
            instance_protocol: Some("HTTP".into()),
            load_balancer_port: port,
            protocol: "HTTP".into(),
            ssl_certificate_id: None,
        }
    }

    fn remote() -> LoadBalancerDescription {
        LoadBalancerDescription {
            load_balancer_name: "some-elb".into(),
            availability_zones: vec!["us-east-2a".into()],
            listeners: vec![listener(80)],
            ..LoadBalancerDescription::default()
        }
    }

    #[test]
    fn changed_listener_is_deleted_and_recreated() {
        let desired = LoadBalancerParameters {
            listeners: vec![Listener {
                instance_protocol: None,
                ..listener(8180)
            }],
            ..LoadBalancerParameters::default()
        };
        let plan = plan_update(&remote(), &desired);
        assert_eq!(plan.delete_listener_ports, vec![80]);
        assert_eq!(plan.create_listeners.len(), 1);
        assert_eq!(plan.create_listeners[0].load_balancer_port, 8180);
    }

    #[test]
    fn zones_follow_set_difference() {
        let desired = LoadBalancerParameters {
            availability_zones: vec!["us-east-2b".into(), "us-east-2c".into()],
            ..LoadBalancerParameters::default()
        };
        let plan = plan_update(&remote(), &desired);
        assert_eq!(plan.enable_zones, vec!["us-east-2b".to_string(), "us-east-2c".to_string()]);
        assert_eq!(plan.disable_zones, vec!["us-east-2a".to_string()]);
    }

    #[test]
    fn matching_state_plans_nothing() {
        let desired = LoadBalancerParameters {
            region: "us-east-2".into(),
            availability_zones: vec!["us-east-2a".into()],
            listeners: vec![Listener {
                protocol: "http".into(),
                instance_protocol: None,
                ..listener(80)
            }],
            ..LoadBalancerParameters::default()
        };
        assert!(plan_update(&remote(), &desired).is_empty());
    }

    #[test]
    fn protocol_case_is_not_drift() {
        let client = LoadBalancerClient::new(MockLoadBalancerApi::new());
        let record = LoadBalancer::new(
            "some-elb",
            crate::crd::LoadBalancerSpec {
                resource_spec: crate::crd::ResourceSpec::default(),
                for_provider: LoadBalancerParameters {
                    region: "us-east-2".into(),
                    availability_zones: vec!["us-east-2a".into()],
                    listeners: vec![Listener {
                        protocol: "http".into(),
                        instance_protocol: Some("http".into()),
                        ..listener(80)
                    }],
                    ..LoadBalancerParameters::default()
                },
            },
        );

        let (up_to_date, diff) = client.is_up_to_date(&record, &remote()).unwrap();
        assert!(up_to_date, "diff: {diff}");
        assert!(plan_update(&remote(), &record.spec.for_provider).is_empty());

        let mut moved = record.clone();
        moved.spec.for_provider.listeners[0].instance_port = 8080;
        let (up_to_date, _) = client.is_up_to_date(&moved, &remote()).unwrap();
        assert!(!up_to_date);
    }

    #[test]
    fn tags_are_added_and_removed_by_key() {
        let mut current = remote();
        current.tags = vec![
            Tag { key: "team".into(), value: Some("a".into()) },
            Tag { key: "old".into(), value: None },
        ];
        let desired = LoadBalancerParameters {
            tags: vec![Tag { key: "team".into(), value: Some("b".into()) }],
            ..LoadBalancerParameters::default()
        };
        let plan = plan_update(&current, &desired);
        assert_eq!(plan.remove_tag_keys, vec!["old".to_string()]);
        assert_eq!(plan.add_tags.len(), 1);
    }

    #[tokio::test]
    async fn listener_deletion_runs_before_creation() {
        let mut api = MockLoadBalancerApi::new();
        let mut seq = Sequence::new();
        api.expect_delete_listeners()
            .withf(|name, ports| name == "some-elb" && ports == &[80])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        api.expect_create_listeners()
            .withf(|_, listeners| listeners.len() == 1 && listeners[0].load_balancer_port == 8180)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        let plan = plan_update(
            &remote(),
            &LoadBalancerParameters {
                listeners: vec![listener(8180)],
                ..LoadBalancerParameters::default()
            },
        );
        apply_plan(&api, "some-elb", plan).await.unwrap();
    }

    #[tokio::test]
    async fn update_rereads_remote_state() {
        let mut api = MockLoadBalancerApi::new();
        api.expect_describe().times(1).returning(|_| Ok(remote()));
        api.expect_delete_listeners().never();
        api.expect_create_listeners().never();
        let client = LoadBalancerClient::new(api);
        client
            .update(LoadBalancerUpdate {
                name: "some-elb".into(),
                desired: LoadBalancerParameters {
                    listeners: vec![listener(80)],
                    ..LoadBalancerParameters::default()
                },
            })
            .await
            .unwrap();
    }
}
