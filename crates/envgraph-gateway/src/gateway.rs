//! Backend interfaces.
//!
//! The planner hands a backend a totally ordered sequence; respecting that
//! order is all a backend needs for correctness. Interfaces are
//! synchronous so tests can drive them without a runtime.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use envgraph_core::{GrantEdge, ResourceDescriptor};

/// What a backend did with one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ResourceOutcome {
    Created,
    Unchanged,
    Failed(String),
}

impl ResourceOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ResourceOutcome::Failed(_))
    }
}

impl fmt::Display for ResourceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceOutcome::Created => write!(f, "created"),
            ResourceOutcome::Unchanged => write!(f, "unchanged"),
            ResourceOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Turns an ordered sequence into live infrastructure.
///
/// Returns one outcome per resource, in order. A backend may stop after
/// the first failure and return fewer outcomes than resources.
pub trait ProvisioningGateway: Send + Sync {
    fn apply(&self, resources: &[ResourceDescriptor], grants: &[GrantEdge])
    -> Vec<ResourceOutcome>;
}

/// Opaque handle to materialized credentials. Never the secret value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef(pub String);

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait SecretProvider: Send + Sync {
    fn materialize_secret(&self, name: &str) -> SecretRef;
}

/// Binds hostnames in the hosted zone. Called once per DNS record during
/// provisioning.
pub trait DnsZoneProvider: Send + Sync {
    fn bind_record(&self, hostname: &str, target: &str);
}

/// Hands out `secret://<name>` references without touching a vault.
#[derive(Debug, Default)]
pub struct StaticSecretProvider {
    issued: Mutex<Vec<String>>,
}

impl StaticSecretProvider {
    pub fn issued(&self) -> Vec<String> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SecretProvider for StaticSecretProvider {
    fn materialize_secret(&self, name: &str) -> SecretRef {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.to_string());
        SecretRef(format!("secret://{name}"))
    }
}

/// Records every binding it is asked for.
#[derive(Debug, Default)]
pub struct RecordingDnsZone {
    bindings: Mutex<Vec<(String, String)>>,
}

impl RecordingDnsZone {
    pub fn bindings(&self) -> Vec<(String, String)> {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DnsZoneProvider for RecordingDnsZone {
    fn bind_record(&self, hostname: &str, target: &str) {
        tracing::debug!(hostname = %hostname, target = %target, "bound dns record");
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((hostname.to_string(), target.to_string()));
    }
}
