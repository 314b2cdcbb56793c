//! Network-perimeter denial policies.
//!
//! "Deny unless the request comes through the network endpoint" is applied
//! per resource kind, as switched on in [`PerimeterConfig`], to the
//! environment-scoped resources a workload inside the network consumes.
//! Resources served to the outside (distribution origins, tenant storage)
//! are not consumed by a workload and stay untouched.
//!
//! Denials reference the endpoint by its stable id, so they add no ordering
//! edges and can be attached in any order relative to other grants on the
//! same resource.

use std::collections::BTreeSet;

use envgraph_core::config::PerimeterConfig;
use envgraph_core::{Action, EnvironmentTopology, GrantCondition, GrantEdge, ResourceKind};

use crate::error::{PlanError, PlanResult};

/// Kinds with a perimeter flag, the endpoint service guarding them, and
/// the actions denied outside the perimeter.
const GUARDED: [(ResourceKind, &str, &[Action]); 2] = [
    (ResourceKind::Bucket, "s3", &[Action::List, Action::Get, Action::Put]),
    (ResourceKind::Queue, "sqs", &[Action::Send, Action::Receive]),
];

fn enabled(perimeter: &PerimeterConfig, kind: ResourceKind) -> bool {
    match kind {
        ResourceKind::Bucket => perimeter.bucket,
        ResourceKind::Queue => perimeter.queue,
        _ => false,
    }
}

pub fn perimeter_denials(
    topology: &EnvironmentTopology,
    perimeter: &PerimeterConfig,
) -> PlanResult<Vec<GrantEdge>> {
    let consumed: BTreeSet<&str> = topology
        .of_kind(ResourceKind::ComputeCluster)
        .flat_map(|w| w.depends_on.iter().map(String::as_str))
        .collect();

    let mut denials = Vec::new();
    for (kind, service, actions) in GUARDED {
        if !enabled(perimeter, kind) {
            continue;
        }
        let guarded = topology
            .of_kind(kind)
            .filter(|d| !d.is_tenant_scoped() && consumed.contains(d.id.as_str()));
        for resource in guarded {
            let endpoint = topology
                .of_kind(ResourceKind::NetworkEndpoint)
                .find(|e| e.config_str("service") == Some(service))
                .ok_or_else(|| PlanError::MissingPerimeterEndpoint {
                    resource: resource.id.clone(),
                    service: service.to_string(),
                })?;
            denials.push(GrantEdge::deny(&resource.id, actions).when(
                GrantCondition::SourceEndpointNot {
                    endpoint: endpoint.id.clone(),
                },
            ));
        }
    }
    Ok(denials)
}
