//! Grant wiring — permission edges across resource boundaries.
//!
//! Grants are derived from the built topology by kind: whatever a
//! principal consumes through `depends_on` (or reaches through its
//! delivery role) it is authorized on. Two kinds of ordering edge follow
//! from the allow grants:
//!
//! 1. A role's policy names the resources it covers, so the role must
//!    follow each of them.
//! 2. A delivery resource (subscription, forwarder) is only usable once
//!    its delivery role's grants are committed, so it must follow the
//!    role. A backend that orders by data dependencies alone would
//!    otherwise create it first and fail once, succeeding only on retry.
//!
//! Perimeter denials are wired last and never add ordering edges; see
//! [`crate::perimeter`].

use tracing::{debug, info};

use envgraph_core::config::PerimeterConfig;
use envgraph_core::{
    ANY_RESOURCE, Action, EnvironmentTopology, GrantCondition, GrantEdge, ResourceDescriptor,
    ResourceKind,
};

use crate::error::{PlanError, PlanResult};
use crate::perimeter::perimeter_denials;

/// Default database port when the descriptor does not carry one.
const DEFAULT_DATABASE_PORT: u16 = 5432;

#[derive(Debug, Clone, Default)]
pub struct GrantWiring {
    perimeter: PerimeterConfig,
}

impl GrantWiring {
    pub fn new(perimeter: PerimeterConfig) -> Self {
        Self { perimeter }
    }

    pub fn wire(&self, mut topology: EnvironmentTopology) -> PlanResult<EnvironmentTopology> {
        let allows = allow_grants(&topology)?;
        for grant in allows {
            topology.add_grant(grant);
        }

        let mut ordering = 0usize;
        for (follower, leader) in ordering_edges(&topology) {
            if topology.add_must_follow(&follower, &leader)? {
                debug!(follower = %follower, leader = %leader, "added ordering edge");
                ordering += 1;
            }
        }

        for denial in perimeter_denials(&topology, &self.perimeter)? {
            topology.add_grant(denial);
        }

        info!(
            environment = %topology.environment,
            grants = topology.grant_count(),
            ordering_edges = ordering,
            "wired grants"
        );
        Ok(topology)
    }
}

fn allow_grants(topology: &EnvironmentTopology) -> PlanResult<Vec<GrantEdge>> {
    let mut grants = Vec::new();
    for descriptor in topology.resources() {
        match descriptor.kind {
            ResourceKind::ComputeCluster => workload_grants(topology, descriptor, &mut grants),
            ResourceKind::Distribution => {
                for bucket in dependencies_of_kind(topology, descriptor, ResourceKind::Bucket) {
                    grants.push(GrantEdge::allow(&descriptor.id, &bucket.id, &[Action::Read]));
                }
            }
            ResourceKind::DeliveryStream => {
                let role = delivery_role(topology, descriptor)?;
                for dep in descriptor.depends_on.iter().filter_map(|id| topology.get(id)) {
                    match dep.kind {
                        ResourceKind::Bucket => grants.push(GrantEdge::allow(
                            role,
                            &dep.id,
                            &[Action::Read, Action::Write, Action::Put],
                        )),
                        ResourceKind::LogStream => grants.push(GrantEdge::allow(
                            role,
                            &dep.id,
                            &[Action::Read, Action::Write],
                        )),
                        _ => {}
                    }
                }
            }
            ResourceKind::LogSubscription => {
                let role = delivery_role(topology, descriptor)?;
                for stream in dependencies_of_kind(topology, descriptor, ResourceKind::LogStream) {
                    grants.push(GrantEdge::allow(role, &stream.id, &[Action::Write]));
                }
                grants.push(GrantEdge::allow(role, role, &[Action::PassRole]));
            }
            _ => {}
        }
    }
    Ok(grants)
}

/// A workload is authorized on everything it consumes.
fn workload_grants(
    topology: &EnvironmentTopology,
    workload: &ResourceDescriptor,
    grants: &mut Vec<GrantEdge>,
) {
    for dep in workload.depends_on.iter().filter_map(|id| topology.get(id)) {
        let grant = match dep.kind {
            ResourceKind::Bucket => {
                GrantEdge::allow(&workload.id, &dep.id, &[Action::Read, Action::Write, Action::Put])
            }
            ResourceKind::Queue => {
                GrantEdge::allow(&workload.id, &dep.id, &[Action::Send, Action::Consume])
            }
            ResourceKind::Database => {
                let port = dep
                    .config
                    .get("port")
                    .and_then(|p| p.as_u64())
                    .and_then(|p| u16::try_from(p).ok())
                    .unwrap_or(DEFAULT_DATABASE_PORT);
                GrantEdge::allow(&workload.id, &dep.id, &[Action::DataApi, Action::Connect])
                    .when(GrantCondition::Port { port })
            }
            ResourceKind::NetworkEndpoint if dep.config_str("service") == Some("sqs") => {
                GrantEdge::allow(&workload.id, &dep.id, &[Action::Send, Action::Receive]).when(
                    GrantCondition::PrincipalIs {
                        principal: workload.id.clone(),
                    },
                )
            }
            _ => continue,
        };
        grants.push(grant);
    }

    // Outbound email has no descriptor; only the workload itself may send.
    grants.push(
        GrantEdge::allow(&workload.id, ANY_RESOURCE, &[Action::SendEmail]).when(
            GrantCondition::PrincipalIs {
                principal: workload.id.clone(),
            },
        ),
    );
}

fn dependencies_of_kind<'a>(
    topology: &'a EnvironmentTopology,
    descriptor: &'a ResourceDescriptor,
    kind: ResourceKind,
) -> impl Iterator<Item = &'a ResourceDescriptor> {
    descriptor
        .depends_on
        .iter()
        .filter_map(|id| topology.get(id))
        .filter(move |d| d.kind == kind)
}

fn delivery_role<'a>(
    topology: &EnvironmentTopology,
    descriptor: &'a ResourceDescriptor,
) -> PlanResult<&'a str> {
    let role = descriptor
        .delivery_role()
        .ok_or_else(|| PlanError::MissingDependency {
            resource: descriptor.id.clone(),
            target: envgraph_core::DELIVERY_ROLE_KEY.to_string(),
        })?;
    match topology.get(role) {
        Some(d) if d.kind == ResourceKind::Role => Ok(role),
        _ => Err(PlanError::MissingDependency {
            resource: descriptor.id.clone(),
            target: role.to_string(),
        }),
    }
}

/// `(follower, leader)` pairs implied by the committed allow grants.
fn ordering_edges(topology: &EnvironmentTopology) -> Vec<(String, String)> {
    let mut edges = Vec::new();

    for grant in topology.grants().filter(|g| !g.is_deny()) {
        let principal_is_role = topology
            .get(&grant.principal)
            .is_some_and(|d| d.kind == ResourceKind::Role);
        if principal_is_role && grant.principal != grant.resource {
            edges.push((grant.principal.clone(), grant.resource.clone()));
        }
    }

    for descriptor in topology.resources() {
        let Some(role) = descriptor.delivery_role() else {
            continue;
        };
        if role != descriptor.id && topology.grants_held_by(role).next().is_some() {
            edges.push((descriptor.id.clone(), role.to_string()));
        }
    }

    edges
}
