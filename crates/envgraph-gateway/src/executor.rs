//! Hands a plan to a backend and maps outcomes back to build positions.

use serde::Serialize;
use tracing::{info, warn};

use envgraph_core::{EnvironmentName, ResourceId};
use envgraph_planner::Plan;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{ProvisioningGateway, ResourceOutcome};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionedResource {
    pub position: usize,
    pub id: ResourceId,
    pub outcome: ResourceOutcome,
}

/// Outcome of a fully successful apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionReport {
    pub environment: EnvironmentName,
    pub fingerprint: String,
    pub resources: Vec<ProvisionedResource>,
}

impl ProvisionReport {
    pub fn created(&self) -> usize {
        self.count(&ResourceOutcome::Created)
    }

    pub fn unchanged(&self) -> usize {
        self.count(&ResourceOutcome::Unchanged)
    }

    fn count(&self, outcome: &ResourceOutcome) -> usize {
        self.resources.iter().filter(|r| &r.outcome == outcome).count()
    }
}

/// Apply `plan` through `gateway` once.
///
/// The first failed resource ends the run with its position; nothing is
/// retried.
pub fn provision(plan: &Plan, gateway: &dyn ProvisioningGateway) -> GatewayResult<ProvisionReport> {
    let resources = plan.ordered_resources();
    let grants = plan.grants();
    let outcomes = gateway.apply(&resources, &grants);

    let mut provisioned = Vec::with_capacity(outcomes.len());
    for (position, (descriptor, outcome)) in resources.iter().zip(outcomes.iter()).enumerate() {
        if let ResourceOutcome::Failed(reason) = outcome {
            warn!(
                environment = %plan.environment,
                resource = %descriptor.id,
                position,
                reason = %reason,
                "provisioning stopped"
            );
            return Err(GatewayError::ApplyFailed {
                resource: descriptor.id.clone(),
                position,
                reason: reason.clone(),
            });
        }
        provisioned.push(ProvisionedResource {
            position,
            id: descriptor.id.clone(),
            outcome: outcome.clone(),
        });
    }

    if outcomes.len() != resources.len() {
        return Err(GatewayError::IncompleteApply {
            expected: resources.len(),
            received: outcomes.len(),
        });
    }

    let report = ProvisionReport {
        environment: plan.environment,
        fingerprint: plan.fingerprint(),
        resources: provisioned,
    };
    info!(
        environment = %report.environment,
        created = report.created(),
        unchanged = report.unchanged(),
        "provisioning complete"
    );
    Ok(report)
}

/// Human-readable apply summary.
pub fn format_report(report: &ProvisionReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Applied {} ({} created, {} unchanged)\n",
        report.environment,
        report.created(),
        report.unchanged()
    ));
    for resource in &report.resources {
        out.push_str(&format!(
            "{:>3}. {:<10} {}\n",
            resource.position + 1,
            resource.outcome.to_string(),
            resource.id
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use envgraph_core::{DeploymentRequest, GrantEdge, ResourceDescriptor, StackConfig};
    use envgraph_planner::Planner;

    /// Succeeds for the first `limit` resources, then stops silently.
    struct Truncating {
        limit: usize,
    }

    impl ProvisioningGateway for Truncating {
        fn apply(&self, resources: &[ResourceDescriptor], _: &[GrantEdge]) -> Vec<ResourceOutcome> {
            resources
                .iter()
                .take(self.limit)
                .map(|_| ResourceOutcome::Created)
                .collect()
        }
    }

    fn staging() -> Plan {
        Planner::new(StackConfig::default())
            .plan(&DeploymentRequest::new("staging", &[]))
            .unwrap()
    }

    #[test]
    fn short_outcome_list_is_incomplete() {
        let plan = staging();
        let err = provision(&plan, &Truncating { limit: 3 }).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::IncompleteApply { received: 3, .. }
        ));
    }

    #[test]
    fn report_lists_every_position() {
        let plan = staging();
        let report = provision(&plan, &Truncating { limit: usize::MAX }).unwrap();
        assert_eq!(report.created(), plan.len());
        assert_eq!(report.resources.last().unwrap().position, plan.len() - 1);
        assert!(format_report(&report).contains("created"));
    }
}
