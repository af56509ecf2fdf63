//! # Custom Resource Definitions
//!
//! CRD types served by the provider.
//!
//! ## Module Structure
//!
//! - `common.rs` - Types shared by every managed record
//! - `provider_config.rs` - ProviderConfig and ProviderConfigUsage
//! - `elb.rs` - Classic load balancer
//! - `iam.rs` - Role, User, Group and UserGroupMembership
//! - `cloudfront.rs` - CloudFront distribution

mod cloudfront;
mod common;
mod elb;
mod iam;
mod provider_config;

pub use cloudfront::{
    CacheBehavior, CustomErrorResponse, CustomOriginConfig, DefaultCacheBehavior, Distribution,
    DistributionConfig, DistributionObservation, DistributionParameters, DistributionSpec,
    DistributionStatus, LambdaFunctionAssociation, Origin, S3OriginConfig,
};
pub use common::{
    Condition, DeletionPolicy, ManagedStatus, ProviderConfigReference, Reference, ResourceSpec,
    Selector, Tag,
};
pub use elb::{
    Listener, LoadBalancer, LoadBalancerObservation, LoadBalancerParameters, LoadBalancerSpec,
    LoadBalancerStatus,
};
pub use iam::{
    Group, GroupObservation, GroupParameters, GroupSpec, GroupStatus, Role, RoleObservation,
    RoleParameters, RoleSpec, RoleStatus, User, UserGroupMembership,
    UserGroupMembershipObservation, UserGroupMembershipParameters, UserGroupMembershipSpec,
    UserGroupMembershipStatus, UserObservation, UserParameters, UserSpec, UserStatus,
};
pub use provider_config::{
    AssumeRoleOptions, CredentialsSource, DynamicUrlConfig, EndpointConfig, EndpointSource,
    EnvSelector, FsSelector, ProviderConfig, ProviderConfigSpec, ProviderConfigStatus,
    ProviderConfigUsage, ProviderConfigUsageSpec, ProviderCredentials, SecretKeySelector,
    SessionTag, TypedReference, UrlConfig, WebIdentityOptions,
};

use kube::CustomResourceExt;

/// Every CRD the provider serves, for `crdgen`
pub fn all_crds() -> Vec<k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition> {
    vec![
        ProviderConfig::crd(),
        ProviderConfigUsage::crd(),
        LoadBalancer::crd(),
        Role::crd(),
        User::crd(),
        Group::crd(),
        UserGroupMembership::crd(),
        Distribution::crd(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn every_served_kind_is_cluster_scoped_and_unique() {
        let crds = all_crds();
        let names: BTreeSet<_> = crds
            .iter()
            .filter_map(|crd| crd.metadata.name.clone())
            .collect();
        assert_eq!(names.len(), crds.len());
        assert!(names.contains("loadbalancers.elb.aws.crossplane.io"));
        assert!(names.contains("distributions.cloudfront.aws.crossplane.io"));
        assert!(names.contains("providerconfigusages.aws.crossplane.io"));
        assert!(crds.iter().all(|crd| crd.spec.scope == "Cluster"));
    }

    #[test]
    fn managed_records_parse_from_manifests() {
        let role: Role = serde_yaml::from_str(
            r#"
apiVersion: iam.aws.crossplane.io/v1beta1
kind: Role
metadata:
  name: deployer
spec:
  providerConfigRef:
    name: team-a
  deletionPolicy: Orphan
  forProvider:
    assumeRolePolicyDocument: "{}"
"#,
        )
        .unwrap();
        assert_eq!(role.spec.resource_spec.provider_config_name(), "team-a");
        assert_eq!(role.spec.resource_spec.deletion_policy, DeletionPolicy::Orphan);
        assert_eq!(role.spec.for_provider.assume_role_policy_document, "{}");
    }
}
