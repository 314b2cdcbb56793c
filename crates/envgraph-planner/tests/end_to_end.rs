//! Full pipeline tests: request in, ordered plan out.

use std::collections::BTreeSet;

use envgraph_core::{DeploymentRequest, ResourceKind, StackConfig};
use envgraph_planner::{ErrorClass, GrantWiring, Plan, PlanError, Planner, build, ids, order};

fn plan(env: &str, tenants: &[&str]) -> Plan {
    Planner::new(StackConfig::default())
        .plan(&DeploymentRequest::new(env, tenants))
        .unwrap()
}

fn before(plan: &Plan, first: &str, second: &str) -> bool {
    plan.position(first).unwrap() < plan.position(second).unwrap()
}

#[test]
fn every_resource_appears_exactly_once() {
    for (env, tenants) in [
        ("unstable", &[][..]),
        ("staging", &[][..]),
        ("production", &["acme", "globex"][..]),
    ] {
        let plan = plan(env, tenants);
        let unique: BTreeSet<_> = plan.order.iter().collect();
        assert_eq!(unique.len(), plan.order.len(), "{env}: duplicate in order");
        assert_eq!(plan.order.len(), plan.topology.len(), "{env}: order incomplete");
    }
}

#[test]
fn predecessors_always_come_first() {
    let plan = plan("production", &["acme", "globex"]);
    for descriptor in plan.ordered() {
        let at = plan.position(&descriptor.id).unwrap();
        for pred in descriptor.predecessors() {
            let pred_at = plan.position(pred).unwrap();
            assert!(pred_at < at, "{pred} must precede {}", descriptor.id);
        }
    }
}

#[test]
fn staging_orders_network_then_cluster_then_subscriptions() {
    let plan = plan("staging", &[]);
    assert!(plan.ordered().all(|d| !d.is_tenant_scoped()));
    for source in ids::LOG_SOURCES {
        let subscription = ids::log_subscription(source);
        assert!(before(&plan, ids::NETWORK, ids::COMPUTE_CLUSTER));
        assert!(before(&plan, ids::COMPUTE_CLUSTER, &subscription));
    }
}

#[test]
fn non_production_never_contains_tenant_resources() {
    for env in ["unstable", "staging"] {
        let plan = plan(env, &["acme", "globex"]);
        assert!(plan.topology.tenants().is_empty(), "{env} has tenants");
        assert!(plan.ordered().all(|d| !d.is_tenant_scoped()));
    }
}

#[test]
fn production_builds_one_subgraph_per_tenant() {
    let plan = plan("production", &["acme", "globex"]);

    let tenant_buckets = plan
        .ordered()
        .filter(|d| d.kind == ResourceKind::Bucket && d.is_tenant_scoped())
        .count();
    assert_eq!(tenant_buckets, 4);

    for tenant in ["acme", "globex"] {
        assert!(plan.position(&ids::tenant_media_bucket(tenant)).is_some());
        assert!(plan.position(&ids::tenant_frontend_bucket(tenant)).is_some());
        let dns = ids::tenant_dns(tenant);
        let record = plan.topology.get(&dns).unwrap();
        assert!(record.depends_on.contains(ids::FRONTEND_CERTIFICATE));
        assert!(before(&plan, ids::FRONTEND_CERTIFICATE, &dns));
        assert!(before(&plan, &ids::tenant_distribution(tenant), &dns));
    }
}

#[test]
fn subscriptions_are_ordered_after_the_delivery_role() {
    let plan = plan("staging", &[]);
    for source in ids::LOG_SOURCES {
        assert!(before(&plan, ids::LOG_DELIVERY_ROLE, &ids::log_subscription(source)));
    }
    assert!(before(&plan, ids::LOG_STREAM, ids::LOG_DELIVERY_ROLE));
    assert!(before(&plan, ids::STREAM_FORWARDER_ROLE, ids::LOG_FORWARDER));
}

#[test]
fn duplicate_tenant_is_rejected() {
    let err = Planner::new(StackConfig::default())
        .plan(&DeploymentRequest::new("production", &["acme", "acme"]))
        .unwrap_err();
    assert_eq!(err, PlanError::DuplicateTenant("acme".to_string()));
    assert_eq!(err.class(), ErrorClass::InputValidation);
}

#[test]
fn production_without_tenants_is_rejected() {
    let err = Planner::new(StackConfig::default())
        .plan(&DeploymentRequest::new("production", &[]))
        .unwrap_err();
    assert!(matches!(err, PlanError::MissingTenants(_)));
}

#[test]
fn injected_cycle_names_both_resources() {
    let params = envgraph_planner::Resolver::new(StackConfig::default())
        .resolve(&DeploymentRequest::new("staging", &[]))
        .unwrap();
    let mut topology = GrantWiring::default().wire(build(&params).unwrap()).unwrap();
    topology.add_must_follow(ids::NETWORK, ids::COMPUTE_CLUSTER).unwrap();

    let err = order(&topology).unwrap_err();
    assert_eq!(err.class(), ErrorClass::StructuralDefect);
    let PlanError::CycleDetected { cycle } = err else {
        panic!("expected a cycle");
    };
    assert_eq!(
        cycle,
        vec![ids::COMPUTE_CLUSTER.to_string(), ids::NETWORK.to_string()]
    );
}

#[test]
fn identical_requests_give_identical_plans() {
    let a = plan("production", &["globex", "acme"]);
    let b = plan("production", &["globex", "acme"]);
    assert_eq!(a, b);
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn perimeter_denials_add_no_ordering() {
    let mut settings = StackConfig::default();
    settings.perimeter.bucket = false;
    settings.perimeter.queue = false;
    let open = Planner::new(settings)
        .plan(&DeploymentRequest::new("staging", &[]))
        .unwrap();
    let guarded = plan("staging", &[]);

    assert_eq!(open.order, guarded.order);
    assert!(guarded.topology.grants().any(|g| g.is_deny()));
    assert!(!open.topology.grants().any(|g| g.is_deny()));
}
