//! # Classic Load Balancer
//!
//! `LoadBalancer` record for the classic Elastic Load Balancing API.

use super::{ManagedStatus, ResourceSpec, Tag};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// LoadBalancer Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: elb.aws.crossplane.io/v1alpha1
/// kind: LoadBalancer
/// metadata:
///   name: some-elb
///   annotations:
///     crossplane.io/external-name: some-elb
/// spec:
///   forProvider:
///     region: us-east-2
///     availabilityZones: [us-east-2a]
///     listeners:
///       - instancePort: 80
///         loadBalancerPort: 80
///         protocol: HTTP
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "LoadBalancer",
    group = "elb.aws.crossplane.io",
    version = "v1alpha1",
    status = "LoadBalancerStatus",
    shortname = "elb",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerSpec {
    #[serde(flatten)]
    pub resource_spec: ResourceSpec,
    pub for_provider: LoadBalancerParameters,
}

/// Desired state of a classic load balancer
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadBalancerParameters {
    pub region: String,
    pub availability_zones: Vec<String>,
    pub listeners: Vec<Listener>,
    /// internet-facing or internal
    pub scheme: Option<String>,
    pub security_group_ids: Vec<String>,
    pub subnet_ids: Vec<String>,
    pub tags: Vec<Tag>,
}

/// Port mapping on the load balancer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Listener {
    pub instance_port: i32,
    pub instance_protocol: Option<String>,
    pub load_balancer_port: i32,
    pub protocol: String,
    #[serde(rename = "sslCertificateID")]
    pub ssl_certificate_id: Option<String>,
}

/// Observed state of a classic load balancer
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadBalancerObservation {
    pub dns_name: Option<String>,
    #[serde(rename = "canonicalHostedZoneNameID")]
    pub canonical_hosted_zone_name_id: Option<String>,
    #[serde(rename = "vpcID")]
    pub vpc_id: Option<String>,
    pub created_time: Option<String>,
}

pub type LoadBalancerStatus = ManagedStatus<LoadBalancerObservation>;
