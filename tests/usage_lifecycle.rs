//! ProviderConfig usage bookkeeping across a record's lifetime.

mod common;

use aws_provider_controller::controller::{reconcile_once, Outcome};
use aws_provider_controller::crd::{
    Listener, LoadBalancer, LoadBalancerParameters, LoadBalancerSpec, ProviderConfigReference,
    ResourceSpec,
};
use aws_provider_controller::managed::{ManagedExternal, Usage};
use aws_provider_controller::provider::elb::LoadBalancerClient;
use common::{mark_deleted, FakeElb, Harness};

fn record() -> LoadBalancer {
    LoadBalancer::new(
        "web",
        LoadBalancerSpec {
            resource_spec: ResourceSpec {
                provider_config_ref: Some(ProviderConfigReference {
                    name: "team-a".into(),
                }),
                ..ResourceSpec::default()
            },
            for_provider: LoadBalancerParameters {
                region: "eu-west-1".into(),
                availability_zones: vec!["eu-west-1a".into()],
                listeners: vec![Listener {
                    instance_port: 8080,
                    instance_protocol: Some("HTTP".into()),
                    load_balancer_port: 80,
                    protocol: "HTTP".into(),
                    ssl_certificate_id: None,
                }],
                ..LoadBalancerParameters::default()
            },
        },
    )
}

#[tokio::test]
async fn usage_exists_while_the_record_lives() {
    let elb = FakeElb::default();
    let h = {
        let elb = elb.clone();
        Harness::<LoadBalancer>::new(move |store| {
            Box::new(ManagedExternal::new(LoadBalancerClient::new(elb.clone()), store))
        })
    };
    let mut lb = record();
    let usage = Usage::of(&lb);
    assert_eq!(usage.provider_config, "team-a");

    reconcile_once(&mut lb, &h.ctx).await.unwrap();
    assert!(h.usage.contains(&usage));
    reconcile_once(&mut lb, &h.ctx).await.unwrap();
    assert_eq!(h.usage.usages.lock().unwrap().len(), 1);

    mark_deleted(&mut lb);
    assert_eq!(reconcile_once(&mut lb, &h.ctx).await.unwrap(), Outcome::Mutated);
    assert!(h.usage.contains(&usage), "released before the remote object was gone");

    assert_eq!(reconcile_once(&mut lb, &h.ctx).await.unwrap(), Outcome::Released);
    assert!(!h.usage.contains(&usage));
}
