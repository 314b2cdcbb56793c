//! Build plans: a wired topology together with its validated order.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use envgraph_core::{
    DeploymentRequest, EnvironmentName, EnvironmentTopology, GrantEdge, ResourceDescriptor,
    ResourceId, StackConfig,
};

use crate::builder::build;
use crate::error::PlanResult;
use crate::grants::GrantWiring;
use crate::order::order;
use crate::resolver::Resolver;

/// A topology that passed validation, with its deterministic build order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub environment: EnvironmentName,
    pub topology: EnvironmentTopology,
    pub order: Vec<ResourceId>,
}

impl Plan {
    /// Validate `topology` and fix its order. Fails on any structural defect.
    pub fn from_topology(topology: EnvironmentTopology) -> PlanResult<Self> {
        let order = order(&topology)?;
        Ok(Self {
            environment: topology.environment,
            topology,
            order,
        })
    }

    /// Descriptors in build order.
    pub fn ordered(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.order.iter().filter_map(|id| self.topology.get(id))
    }

    pub fn ordered_resources(&self) -> Vec<ResourceDescriptor> {
        self.ordered().cloned().collect()
    }

    pub fn grants(&self) -> Vec<GrantEdge> {
        self.topology.grants().cloned().collect()
    }

    /// Zero-based position of `id` in the build order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|o| o == id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// SHA-256 over the ordered descriptors and the grants. Identical
    /// requests produce identical fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for descriptor in self.ordered() {
            // Serializing owned data of derived types cannot fail.
            let bytes = serde_json::to_vec(descriptor).unwrap_or_default();
            hasher.update(&bytes);
            hasher.update(b"\n");
        }
        for grant in self.topology.grants() {
            let bytes = serde_json::to_vec(grant).unwrap_or_default();
            hasher.update(&bytes);
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// Resolve → build → wire → order, in one call.
#[derive(Debug, Clone)]
pub struct Planner {
    resolver: Resolver,
    wiring: GrantWiring,
}

impl Planner {
    pub fn new(settings: StackConfig) -> Self {
        Self {
            wiring: GrantWiring::new(settings.perimeter.clone()),
            resolver: Resolver::new(settings),
        }
    }

    pub fn plan(&self, request: &DeploymentRequest) -> PlanResult<Plan> {
        let params = self.resolver.resolve(request)?;
        let topology = build(&params)?;
        let wired = self.wiring.wire(topology)?;
        let plan = Plan::from_topology(wired)?;
        info!(
            environment = %plan.environment,
            resources = plan.len(),
            fingerprint = %plan.fingerprint(),
            "plan ready"
        );
        Ok(plan)
    }
}

/// Human-readable plan listing.
pub fn format_plan(plan: &Plan) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Plan for {} ({} resources, {} grants)\n",
        plan.environment,
        plan.len(),
        plan.topology.grant_count()
    ));
    out.push_str(&format!("Fingerprint: {}\n\n", plan.fingerprint()));

    for (position, descriptor) in plan.ordered().enumerate() {
        let owner = descriptor
            .scope
            .tenant()
            .map(|t| format!(" [tenant {t}]"))
            .unwrap_or_default();
        out.push_str(&format!(
            "{:>3}. {:<17} {}{owner}\n",
            position + 1,
            descriptor.kind.label(),
            descriptor.id
        ));
        if !descriptor.depends_on.is_empty() {
            let deps: Vec<&str> = descriptor.depends_on.iter().map(String::as_str).collect();
            out.push_str(&format!("       needs   {}\n", deps.join(", ")));
        }
        if !descriptor.must_follow.is_empty() {
            let after: Vec<&str> = descriptor.must_follow.iter().map(String::as_str).collect();
            out.push_str(&format!("       after   {}\n", after.join(", ")));
        }
    }

    if plan.topology.grant_count() > 0 {
        out.push_str("\nGrants:\n");
        for grant in plan.topology.grants() {
            let actions: Vec<&str> = grant.actions.iter().map(|a| a.as_str()).collect();
            out.push_str(&format!(
                "  {} -> {} [{}]\n",
                grant.principal,
                grant.resource,
                actions.join(", ")
            ));
        }
    }

    out
}
