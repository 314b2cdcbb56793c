//! Planner error types.

use envgraph_core::{EnvironmentName, TopologyError};
use thiserror::Error;

/// Result type alias for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors that can occur while turning a request into a build order.
///
/// None of these are transient: every variant is raised before any
/// provisioning call is issued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid environment: {0} (expected one of unstable, staging, production)")]
    InvalidEnvironment(String),

    #[error("environment {0} requires at least one tenant")]
    MissingTenants(EnvironmentName),

    #[error("duplicate tenant id: {0}")]
    DuplicateTenant(String),

    #[error("invalid tenant id {tenant:?}: {reason}")]
    InvalidTenant { tenant: String, reason: String },

    #[error("resource {resource} depends on unknown resource {target}")]
    MissingDependency { resource: String, target: String },

    #[error("grant on {resource} references unknown resource {party}")]
    UnknownGrantParty { resource: String, party: String },

    #[error("perimeter policy for {resource} needs a {service} network endpoint")]
    MissingPerimeterEndpoint { resource: String, service: String },

    #[error("dependency cycle detected: {}", render_cycle(.cycle))]
    CycleDetected { cycle: Vec<String> },

    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),
}

/// Broad class of a planning failure, for operator-facing reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself is wrong.
    InputValidation,
    /// The topology construction produced an illegal graph.
    StructuralDefect,
}

impl PlanError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PlanError::InvalidEnvironment(_)
            | PlanError::MissingTenants(_)
            | PlanError::DuplicateTenant(_)
            | PlanError::InvalidTenant { .. } => ErrorClass::InputValidation,
            _ => ErrorClass::StructuralDefect,
        }
    }
}

fn render_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {first}", cycle.join(" -> ")),
        None => String::new(),
    }
}
