//! Deployment requests — the single input of a provisioning run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed set of deployment environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentName {
    Unstable,
    Staging,
    Production,
}

impl EnvironmentName {
    pub const ALL: [EnvironmentName; 3] = [
        EnvironmentName::Unstable,
        EnvironmentName::Staging,
        EnvironmentName::Production,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentName::Unstable => "unstable",
            EnvironmentName::Staging => "staging",
            EnvironmentName::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, EnvironmentName::Production)
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// A request to provision one environment.
///
/// The environment name is kept as raw text so that validation happens in
/// one place, the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub environment_name: String,
    /// Ordered tenant ids; only consulted for production.
    #[serde(default)]
    pub tenant_ids: Vec<String>,
}

impl DeploymentRequest {
    pub fn new(environment_name: &str, tenant_ids: &[&str]) -> Self {
        Self {
            environment_name: environment_name.to_string(),
            tenant_ids: tenant_ids.iter().map(|t| t.to_string()).collect(),
        }
    }
}
