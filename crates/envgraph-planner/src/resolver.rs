//! Environment parameters resolver.
//!
//! Turns a raw [`DeploymentRequest`] into validated, environment-specific
//! naming and flags. The stack configuration is injected by value at
//! construction so resolution never reads process-wide state.

use tracing::debug;

use envgraph_core::{DeploymentRequest, EnvironmentName, StackConfig};

use crate::error::{PlanError, PlanResult};

/// Everything the topology builder needs to know about one environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentParameters {
    pub environment: EnvironmentName,
    /// Canonical prefix for externally visible resource names.
    pub prefix: String,
    pub is_multi_tenant: bool,
    /// Tenants in request order. Always empty unless multi-tenant.
    pub tenants: Vec<String>,
    pub settings: StackConfig,
}

impl EnvironmentParameters {
    /// `label.domain`, e.g. `staging.example.io`.
    pub fn hostname(&self, label: &str) -> String {
        format!("{label}.{}", self.settings.stack.domain)
    }

    /// The domain with dots replaced, usable inside bucket names.
    pub fn domain_slug(&self) -> String {
        self.settings.stack.domain.replace('.', "-")
    }

    /// Externally visible name of an environment-wide resource.
    pub fn resource_name(&self, suffix: &str) -> String {
        format!("{}-{suffix}-{}", self.prefix, self.domain_slug())
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    settings: StackConfig,
}

impl Resolver {
    pub fn new(settings: StackConfig) -> Self {
        Self { settings }
    }

    pub fn resolve(&self, request: &DeploymentRequest) -> PlanResult<EnvironmentParameters> {
        let environment: EnvironmentName = request
            .environment_name
            .parse()
            .map_err(PlanError::InvalidEnvironment)?;

        let tenants = if environment.is_production() {
            if request.tenant_ids.is_empty() {
                return Err(PlanError::MissingTenants(environment));
            }
            request.tenant_ids.clone()
        } else {
            if !request.tenant_ids.is_empty() {
                debug!(
                    environment = %environment,
                    tenants = request.tenant_ids.len(),
                    "ignoring tenants for non-production environment"
                );
            }
            Vec::new()
        };

        Ok(EnvironmentParameters {
            environment,
            prefix: environment.as_str().to_string(),
            is_multi_tenant: environment.is_production(),
            tenants,
            settings: self.settings.clone(),
        })
    }
}
