//! Shared in-memory fakes for the lifecycle tests.
//!
//! The cloud fakes are cheap handles over shared state, so a fresh client
//! built on every connect still sees what earlier passes did.

#![allow(dead_code, reason = "each test binary uses a subset of the fakes")]

use async_trait::async_trait;
use kube::Resource;
use aws_provider_controller::clients::CloudError;
use aws_provider_controller::config::ControllerConfig;
use aws_provider_controller::controller::ManagedContext;
use aws_provider_controller::crd::{DistributionConfig, Listener, Selector, Tag};
use aws_provider_controller::error::{Error, Result};
use aws_provider_controller::managed::{
    Connector, ExternalClient, Managed, RecordStore, ReferenceReader, ReferenceTarget, Usage,
    UsageTracker,
};
use aws_provider_controller::provider::cloudfront::{DistributionApi, DistributionDescription};
use aws_provider_controller::provider::elb::{LoadBalancerApi, LoadBalancerCreate, LoadBalancerDescription};
use aws_provider_controller::provider::iam::{
    GroupDescription, GroupMember, IamApi, RoleCreate, RoleDescription, UserCreate,
    UserDescription,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Record store keeping the last persisted copy
pub struct MemoryStore<R> {
    pub updates: AtomicUsize,
    pub status_updates: AtomicUsize,
    pub last: Mutex<Option<R>>,
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self {
            updates: AtomicUsize::new(0),
            status_updates: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }
}

impl<R> MemoryStore<R> {
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Managed> RecordStore<R> for MemoryStore<R> {
    async fn update(&self, record: &mut R) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(record.clone());
        Ok(())
    }

    async fn update_status(&self, record: &R) -> Result<()> {
        self.status_updates.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(record.clone());
        Ok(())
    }
}

/// Usage tracker holding usage object names
#[derive(Debug, Default)]
pub struct MemoryUsage {
    pub usages: Mutex<BTreeSet<String>>,
}

impl MemoryUsage {
    pub fn contains(&self, usage: &Usage) -> bool {
        self.usages.lock().unwrap().contains(&usage.object_name())
    }
}

#[async_trait]
impl UsageTracker for MemoryUsage {
    async fn track(&self, usage: &Usage) -> Result<()> {
        self.usages.lock().unwrap().insert(usage.object_name());
        Ok(())
    }

    async fn release(&self, usage: &Usage) -> Result<()> {
        self.usages.lock().unwrap().remove(&usage.object_name());
        Ok(())
    }
}

/// Reader for records that declare no references
#[derive(Debug, Default)]
pub struct NoReferences;

#[async_trait]
impl ReferenceReader for NoReferences {
    async fn external_name(&self, target: &ReferenceTarget, name: &str) -> Result<String> {
        Err(Error::precondition(format!("unexpected reference to {target:?} {name}")))
    }

    async fn select(&self, target: &ReferenceTarget, _selector: &Selector) -> Result<Option<String>> {
        Err(Error::precondition(format!("unexpected selector for {target:?}")))
    }
}

type Build<R> = Box<dyn Fn(Arc<dyn RecordStore<R>>) -> Box<dyn ExternalClient<R>> + Send + Sync>;

/// Connector that tracks the usage, as the session resolver does, then
/// builds a client over the shared fakes
pub struct FakeConnector<R> {
    store: Arc<dyn RecordStore<R>>,
    usage: Arc<MemoryUsage>,
    build: Build<R>,
}

#[async_trait]
impl<R: Managed> Connector<R> for FakeConnector<R> {
    async fn connect(&self, record: &R) -> Result<Box<dyn ExternalClient<R>>> {
        self.usage.track(&Usage::of(record)).await?;
        Ok((self.build)(Arc::clone(&self.store)))
    }
}

/// Everything a lifecycle test drives
pub struct Harness<R: Managed> {
    pub ctx: ManagedContext<R>,
    pub store: Arc<MemoryStore<R>>,
    pub usage: Arc<MemoryUsage>,
}

impl<R: Managed> Harness<R> {
    pub fn new(
        build: impl Fn(Arc<dyn RecordStore<R>>) -> Box<dyn ExternalClient<R>> + Send + Sync + 'static,
    ) -> Self {
        let store = Arc::new(MemoryStore::<R>::default());
        let usage = Arc::new(MemoryUsage::default());
        let dyn_store: Arc<dyn RecordStore<R>> = Arc::<MemoryStore<R>>::clone(&store);
        let connector: Arc<dyn Connector<R>> = Arc::new(FakeConnector {
            store: Arc::clone(&dyn_store),
            usage: Arc::clone(&usage),
            build: Box::new(build),
        });
        let ctx = ManagedContext::new(
            connector,
            dyn_store,
            Arc::clone(&usage) as Arc<dyn UsageTracker>,
            Arc::new(NoReferences),
            ControllerConfig::default(),
        );
        Self { ctx, store, usage }
    }
}

/// Mark a record as deleted by the API server
pub fn mark_deleted<R: Managed>(record: &mut R) {
    record.meta_mut().deletion_timestamp =
        Some(serde_json::from_value(serde_json::json!("2024-01-01T00:00:00Z")).unwrap());
}

fn not_found(code: &str, what: &str) -> Error {
    CloudError::service(code, format!("{what} not found")).into()
}

/// Shared call log
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Calls other than reads
    pub fn mutations(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|c| !c.starts_with("describe") && !c.starts_with("get") && !c.starts_with("list"))
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Classic ELB service
#[derive(Debug, Clone, Default)]
pub struct FakeElb {
    pub balancers: Arc<Mutex<BTreeMap<String, LoadBalancerDescription>>>,
    pub calls: Calls,
}

impl FakeElb {
    pub fn with(balancer: LoadBalancerDescription) -> Self {
        let fake = Self::default();
        fake.balancers
            .lock()
            .unwrap()
            .insert(balancer.load_balancer_name.clone(), balancer);
        fake
    }

    pub fn get(&self, name: &str) -> Option<LoadBalancerDescription> {
        self.balancers.lock().unwrap().get(name).cloned()
    }

    fn modify(&self, name: &str, f: impl FnOnce(&mut LoadBalancerDescription)) -> Result<()> {
        let mut balancers = self.balancers.lock().unwrap();
        let balancer = balancers
            .get_mut(name)
            .ok_or_else(|| not_found("LoadBalancerNotFound", name))?;
        f(balancer);
        Ok(())
    }
}

#[async_trait]
impl LoadBalancerApi for FakeElb {
    async fn describe(&self, name: &str) -> Result<LoadBalancerDescription> {
        self.calls.push(format!("describe {name}"));
        self.get(name).ok_or_else(|| not_found("LoadBalancerNotFound", name))
    }

    async fn create(&self, input: LoadBalancerCreate) -> Result<Option<String>> {
        self.calls.push(format!("create {}", input.name));
        let dns_name = format!("{}-123.us-east-2.elb.amazonaws.com", input.name);
        self.balancers.lock().unwrap().insert(
            input.name.clone(),
            LoadBalancerDescription {
                load_balancer_name: input.name,
                availability_zones: input.availability_zones,
                listeners: input.listeners,
                scheme: input.scheme,
                security_group_ids: input.security_group_ids,
                subnet_ids: input.subnet_ids,
                tags: input.tags,
                dns_name: Some(dns_name.clone()),
                ..LoadBalancerDescription::default()
            },
        );
        Ok(Some(dns_name))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.calls.push(format!("delete {name}"));
        self.balancers
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("LoadBalancerNotFound", name))
    }

    async fn delete_listeners(&self, name: &str, ports: Vec<i32>) -> Result<()> {
        self.calls.push(format!("delete_listeners {ports:?}"));
        self.modify(name, |b| b.listeners.retain(|l| !ports.contains(&l.load_balancer_port)))
    }

    async fn create_listeners(&self, name: &str, listeners: Vec<Listener>) -> Result<()> {
        let ports: Vec<i32> = listeners.iter().map(|l| l.load_balancer_port).collect();
        self.calls.push(format!("create_listeners {ports:?}"));
        self.modify(name, |b| b.listeners.extend(listeners))
    }

    async fn enable_zones(&self, name: &str, zones: Vec<String>) -> Result<()> {
        self.calls.push(format!("enable_zones {zones:?}"));
        self.modify(name, |b| b.availability_zones.extend(zones))
    }

    async fn disable_zones(&self, name: &str, zones: Vec<String>) -> Result<()> {
        self.calls.push(format!("disable_zones {zones:?}"));
        self.modify(name, |b| b.availability_zones.retain(|z| !zones.contains(z)))
    }

    async fn apply_security_groups(&self, name: &str, groups: Vec<String>) -> Result<()> {
        self.calls.push(format!("apply_security_groups {groups:?}"));
        self.modify(name, |b| b.security_group_ids = groups)
    }

    async fn attach_subnets(&self, name: &str, subnets: Vec<String>) -> Result<()> {
        self.calls.push(format!("attach_subnets {subnets:?}"));
        self.modify(name, |b| b.subnet_ids.extend(subnets))
    }

    async fn detach_subnets(&self, name: &str, subnets: Vec<String>) -> Result<()> {
        self.calls.push(format!("detach_subnets {subnets:?}"));
        self.modify(name, |b| b.subnet_ids.retain(|s| !subnets.contains(s)))
    }

    async fn add_tags(&self, name: &str, tags: Vec<Tag>) -> Result<()> {
        self.calls.push(format!("add_tags {}", tags.len()));
        self.modify(name, |b| {
            b.tags.retain(|t| !tags.iter().any(|n| n.key == t.key));
            b.tags.extend(tags);
        })
    }

    async fn remove_tags(&self, name: &str, keys: Vec<String>) -> Result<()> {
        self.calls.push(format!("remove_tags {keys:?}"));
        self.modify(name, |b| b.tags.retain(|t| !keys.contains(&t.key)))
    }
}

#[derive(Debug, Default)]
pub struct IamState {
    pub roles: BTreeMap<String, RoleDescription>,
    pub users: BTreeMap<String, UserDescription>,
    pub groups: BTreeMap<String, GroupDescription>,
    pub members: BTreeMap<String, BTreeSet<String>>,
}

/// IAM service
#[derive(Debug, Clone, Default)]
pub struct FakeIam {
    pub state: Arc<Mutex<IamState>>,
    pub calls: Calls,
}

impl FakeIam {
    pub fn add_group(&self, name: &str) {
        self.state.lock().unwrap().groups.insert(
            name.to_string(),
            GroupDescription {
                group_name: name.to_string(),
                arn: format!("arn:aws:iam::123456789012:group/{name}"),
                group_id: format!("AGPA{name}"),
                ..GroupDescription::default()
            },
        );
    }

    pub fn add_user(&self, name: &str) {
        self.state.lock().unwrap().users.insert(
            name.to_string(),
            UserDescription {
                user_name: name.to_string(),
                arn: format!("arn:aws:iam::123456789012:user/{name}"),
                user_id: format!("AIDA{name}"),
                ..UserDescription::default()
            },
        );
    }

    pub fn add_role(&self, role: RoleDescription) {
        self.state.lock().unwrap().roles.insert(role.role_name.clone(), role);
    }

    pub fn is_member(&self, group: &str, user: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .members
            .get(group)
            .is_some_and(|m| m.contains(user))
    }

    fn unsupported(&self, call: &str) -> Error {
        self.calls.push(call.to_string());
        Error::invalid_input(format!("{call} is not supported by the fake"))
    }
}

#[async_trait]
impl IamApi for FakeIam {
    async fn get_role(&self, name: &str) -> Result<RoleDescription> {
        self.calls.push(format!("get_role {name}"));
        let state = self.state.lock().unwrap();
        state.roles.get(name).cloned().ok_or_else(|| not_found("NoSuchEntity", name))
    }

    async fn create_role(&self, input: RoleCreate) -> Result<RoleDescription> {
        self.calls.push(format!("create_role {}", input.name));
        let role = RoleDescription {
            role_name: input.name.clone(),
            arn: format!("arn:aws:iam::123456789012:role/{}", input.name),
            role_id: format!("AROA{}", input.name),
            assume_role_policy_document: Some(input.assume_role_policy_document),
            description: input.description,
            max_session_duration: input.max_session_duration.or(Some(3600)),
            path: input.path.or_else(|| Some("/".into())),
            permissions_boundary: input.permissions_boundary,
            tags: input.tags,
            ..RoleDescription::default()
        };
        self.add_role(role.clone());
        Ok(role)
    }

    async fn update_role(
        &self,
        name: &str,
        description: Option<String>,
        max_session_duration: Option<i32>,
    ) -> Result<()> {
        self.calls.push(format!("update_role {name}"));
        let mut state = self.state.lock().unwrap();
        let role = state.roles.get_mut(name).ok_or_else(|| not_found("NoSuchEntity", name))?;
        role.description = description;
        role.max_session_duration = max_session_duration;
        Ok(())
    }

    async fn update_assume_role_policy(&self, name: &str, document: &str) -> Result<()> {
        self.calls.push(format!("update_assume_role_policy {name}"));
        let mut state = self.state.lock().unwrap();
        let role = state.roles.get_mut(name).ok_or_else(|| not_found("NoSuchEntity", name))?;
        role.assume_role_policy_document = Some(document.to_string());
        Ok(())
    }

    async fn put_role_permissions_boundary(&self, _name: &str, _boundary: &str) -> Result<()> {
        Err(self.unsupported("put_role_permissions_boundary"))
    }

    async fn tag_role(&self, _name: &str, _tags: Vec<Tag>) -> Result<()> {
        Err(self.unsupported("tag_role"))
    }

    async fn untag_role(&self, _name: &str, _keys: Vec<String>) -> Result<()> {
        Err(self.unsupported("untag_role"))
    }

    async fn delete_role(&self, name: &str) -> Result<()> {
        self.calls.push(format!("delete_role {name}"));
        let mut state = self.state.lock().unwrap();
        state.roles.remove(name).map(|_| ()).ok_or_else(|| not_found("NoSuchEntity", name))
    }

    async fn get_user(&self, name: &str) -> Result<UserDescription> {
        self.calls.push(format!("get_user {name}"));
        let state = self.state.lock().unwrap();
        state.users.get(name).cloned().ok_or_else(|| not_found("NoSuchEntity", name))
    }

    async fn create_user(&self, _input: UserCreate) -> Result<UserDescription> {
        Err(self.unsupported("create_user"))
    }

    async fn update_user_path(&self, _name: &str, _path: &str) -> Result<()> {
        Err(self.unsupported("update_user_path"))
    }

    async fn put_user_permissions_boundary(&self, _name: &str, _boundary: &str) -> Result<()> {
        Err(self.unsupported("put_user_permissions_boundary"))
    }

    async fn tag_user(&self, _name: &str, _tags: Vec<Tag>) -> Result<()> {
        Err(self.unsupported("tag_user"))
    }

    async fn untag_user(&self, _name: &str, _keys: Vec<String>) -> Result<()> {
        Err(self.unsupported("untag_user"))
    }

    async fn delete_user(&self, _name: &str) -> Result<()> {
        Err(self.unsupported("delete_user"))
    }

    async fn get_group(&self, name: &str) -> Result<GroupDescription> {
        self.calls.push(format!("get_group {name}"));
        let state = self.state.lock().unwrap();
        state.groups.get(name).cloned().ok_or_else(|| not_found("NoSuchEntity", name))
    }

    async fn create_group(&self, _name: &str, _path: Option<String>) -> Result<GroupDescription> {
        Err(self.unsupported("create_group"))
    }

    async fn update_group_path(&self, _name: &str, _path: &str) -> Result<()> {
        Err(self.unsupported("update_group_path"))
    }

    async fn delete_group(&self, _name: &str) -> Result<()> {
        Err(self.unsupported("delete_group"))
    }

    async fn list_group_members(&self, group: &str) -> Result<(GroupDescription, Vec<GroupMember>)> {
        self.calls.push(format!("list_group_members {group}"));
        let state = self.state.lock().unwrap();
        let description = state
            .groups
            .get(group)
            .cloned()
            .ok_or_else(|| not_found("NoSuchEntity", group))?;
        let members = state
            .members
            .get(group)
            .into_iter()
            .flatten()
            .filter_map(|user| state.users.get(user))
            .map(|user| GroupMember {
                user_name: user.user_name.clone(),
                arn: user.arn.clone(),
            })
            .collect();
        Ok((description, members))
    }

    async fn add_user_to_group(&self, group: &str, user: &str) -> Result<()> {
        self.calls.push(format!("add_user_to_group {group}/{user}"));
        let mut state = self.state.lock().unwrap();
        if !state.groups.contains_key(group) || !state.users.contains_key(user) {
            return Err(not_found("NoSuchEntity", &format!("{group}/{user}")));
        }
        state.members.entry(group.to_string()).or_default().insert(user.to_string());
        Ok(())
    }

    async fn remove_user_from_group(&self, group: &str, user: &str) -> Result<()> {
        self.calls.push(format!("remove_user_from_group {group}/{user}"));
        let mut state = self.state.lock().unwrap();
        let removed = state.members.get_mut(group).is_some_and(|m| m.remove(user));
        if removed {
            Ok(())
        } else {
            Err(not_found("NoSuchEntity", &format!("{group}/{user}")))
        }
    }
}

/// CloudFront service. Every write bumps the ETag and leaves the
/// distribution `InProgress` until [`FakeCloudFront::deploy`] is called.
#[derive(Debug, Clone, Default)]
pub struct FakeCloudFront {
    pub distributions: Arc<Mutex<BTreeMap<String, DistributionDescription>>>,
    pub calls: Calls,
    etags: Arc<AtomicUsize>,
}

impl FakeCloudFront {
    pub fn with(distribution: DistributionDescription) -> Self {
        let fake = Self::default();
        fake.distributions
            .lock()
            .unwrap()
            .insert(distribution.id.clone(), distribution);
        fake
    }

    pub fn distribution(&self, id: &str) -> Option<DistributionDescription> {
        self.distributions.lock().unwrap().get(id).cloned()
    }

    /// Finish propagating the last change
    pub fn deploy(&self, id: &str) {
        if let Some(d) = self.distributions.lock().unwrap().get_mut(id) {
            d.status = "Deployed".into();
        }
    }

    /// Change the ETag without changing the configuration
    pub fn churn_etag(&self, id: &str) {
        let etag = self.next_etag();
        if let Some(d) = self.distributions.lock().unwrap().get_mut(id) {
            d.e_tag = Some(etag);
        }
    }

    fn next_etag(&self) -> String {
        format!("ETAG{}", self.etags.fetch_add(1, Ordering::SeqCst) + 100)
    }
}

#[async_trait]
impl DistributionApi for FakeCloudFront {
    async fn get(&self, id: &str) -> Result<DistributionDescription> {
        self.calls.push(format!("get {id}"));
        self.distribution(id)
            .ok_or_else(|| not_found("NoSuchDistribution", id))
    }

    async fn create(&self, config: DistributionConfig) -> Result<DistributionDescription> {
        self.calls.push("create".to_string());
        let id = format!("E{}", self.distributions.lock().unwrap().len() + 1);
        let description = DistributionDescription {
            id: id.clone(),
            arn: format!("arn:aws:cloudfront::123456789012:distribution/{id}"),
            domain_name: format!("{}.cloudfront.net", id.to_lowercase()),
            status: "InProgress".into(),
            e_tag: Some(self.next_etag()),
            distribution_config: config,
            ..DistributionDescription::default()
        };
        self.distributions.lock().unwrap().insert(id, description.clone());
        Ok(description)
    }

    async fn update(
        &self,
        id: &str,
        if_match: Option<String>,
        config: DistributionConfig,
    ) -> Result<DistributionDescription> {
        self.calls.push(format!("update {id} if-match={}", if_match.clone().unwrap_or_default()));
        let etag = self.next_etag();
        let mut distributions = self.distributions.lock().unwrap();
        let d = distributions
            .get_mut(id)
            .ok_or_else(|| not_found("NoSuchDistribution", id))?;
        if d.e_tag != if_match {
            return Err(CloudError::service("PreconditionFailed", "etag mismatch").into());
        }
        d.distribution_config = config;
        d.status = "InProgress".into();
        d.e_tag = Some(etag);
        Ok(d.clone())
    }

    async fn delete(&self, id: &str, if_match: Option<String>) -> Result<()> {
        self.calls.push(format!("delete {id} if-match={}", if_match.clone().unwrap_or_default()));
        let mut distributions = self.distributions.lock().unwrap();
        let d = distributions
            .get(id)
            .ok_or_else(|| not_found("NoSuchDistribution", id))?;
        if d.distribution_config.enabled {
            return Err(CloudError::service("DistributionNotDisabled", "disable first").into());
        }
        if d.e_tag != if_match {
            return Err(CloudError::service("PreconditionFailed", "etag mismatch").into());
        }
        distributions.remove(id);
        Ok(())
    }
}
