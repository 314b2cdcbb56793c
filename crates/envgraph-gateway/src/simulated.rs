//! In-process provisioning backend with a JSON state file.
//!
//! Behaves the way a strict cloud backend does with respect to ordering:
//!
//! ```text
//! for each resource, in the order given:
//!   injected failure?                         → failed
//!   a depends_on / must_follow target absent? → failed
//!   delivery role absent or grants pending?   → failed
//!   recorded with the same fingerprint?       → unchanged
//!   otherwise                                 → created (secret / dns side effects)
//!   commit every grant whose parties now exist
//! ```
//!
//! Processing stops at the first failure. State is only written to disk
//! by [`SimulatedGateway::persist`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use envgraph_core::{
    ANY_PRINCIPAL, ANY_RESOURCE, GrantEdge, ResourceDescriptor, ResourceId, ResourceKind,
};

use crate::error::GatewayResult;
use crate::gateway::{
    DnsZoneProvider, ProvisioningGateway, RecordingDnsZone, ResourceOutcome, SecretProvider,
    SecretRef, StaticSecretProvider,
};

/// Everything the backend has materialized so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayState {
    pub resources: BTreeMap<ResourceId, ResourceRecord>,
    pub grants: BTreeSet<GrantEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub kind: ResourceKind,
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretRef>,
}

impl GatewayState {
    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    fn party_present(&self, id: &str) -> bool {
        id == ANY_PRINCIPAL || id == ANY_RESOURCE || self.contains(id)
    }

    /// Commit every supplied grant whose principal and resource exist.
    fn commit_ready(&mut self, grants: &[GrantEdge]) -> usize {
        let mut committed = 0;
        for grant in grants {
            if self.grants.contains(grant) {
                continue;
            }
            if self.party_present(&grant.principal) && self.party_present(&grant.resource) {
                self.grants.insert(grant.clone());
                committed += 1;
            }
        }
        committed
    }
}

pub struct SimulatedGateway {
    state: Mutex<GatewayState>,
    state_path: Option<PathBuf>,
    fail_on: Mutex<BTreeSet<ResourceId>>,
    secrets: Arc<dyn SecretProvider>,
    dns: Arc<dyn DnsZoneProvider>,
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGateway {
    /// Empty in-memory backend with static secret and recording DNS providers.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GatewayState::default()),
            state_path: None,
            fail_on: Mutex::new(BTreeSet::new()),
            secrets: Arc::new(StaticSecretProvider::default()),
            dns: Arc::new(RecordingDnsZone::default()),
        }
    }

    /// Backend bound to a state file; loads it when it already exists.
    pub fn open(path: &Path) -> GatewayResult<Self> {
        let state = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            GatewayState::default()
        };
        debug!(
            path = %path.display(),
            resources = state.resources.len(),
            "loaded gateway state"
        );
        Ok(Self {
            state: Mutex::new(state),
            state_path: Some(path.to_path_buf()),
            ..Self::new()
        })
    }

    pub fn with_providers(
        mut self,
        secrets: Arc<dyn SecretProvider>,
        dns: Arc<dyn DnsZoneProvider>,
    ) -> Self {
        self.secrets = secrets;
        self.dns = dns;
        self
    }

    /// Fail every apply on `id` until cleared.
    pub fn fail_on(&self, id: &str) {
        self.fail_on
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string());
    }

    pub fn clear_failures(&self) {
        self.fail_on
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn state(&self) -> GatewayState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Write the state file, if this backend has one.
    pub fn persist(&self) -> GatewayResult<()> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.state())?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "saved gateway state");
        Ok(())
    }

    fn apply_one(
        &self,
        state: &mut GatewayState,
        descriptor: &ResourceDescriptor,
        grants: &[GrantEdge],
    ) -> ResourceOutcome {
        let injected = self
            .fail_on
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&descriptor.id);
        if injected {
            return ResourceOutcome::Failed("injected failure".to_string());
        }

        if let Some(missing) = descriptor.predecessors().find(|id| !state.contains(id)) {
            return ResourceOutcome::Failed(format!("{missing} does not exist yet"));
        }

        if let Some(role) = descriptor.delivery_role() {
            if !state.contains(role) {
                return ResourceOutcome::Failed(format!("delivery role {role} does not exist yet"));
            }
            let pending = grants
                .iter()
                .filter(|g| g.principal == role && !g.is_deny())
                .find(|g| !state.grants.contains(*g));
            if let Some(grant) = pending {
                return ResourceOutcome::Failed(format!(
                    "delivery role {role} is not yet authorized on {}",
                    grant.resource
                ));
            }
        }

        let fingerprint = config_fingerprint(descriptor);
        if let Some(record) = state.resources.get(&descriptor.id) {
            if record.fingerprint == fingerprint {
                return ResourceOutcome::Unchanged;
            }
        }

        let secret = match descriptor.kind {
            ResourceKind::Secret => {
                let name = descriptor.config_str("secret_name").unwrap_or(descriptor.id.as_str());
                Some(self.secrets.materialize_secret(name))
            }
            ResourceKind::DnsRecord => {
                let hostname = descriptor.config_str("hostname").unwrap_or(descriptor.id.as_str());
                let target = descriptor.config_str("target").unwrap_or_default();
                self.dns.bind_record(hostname, target);
                None
            }
            _ => None,
        };

        state.resources.insert(
            descriptor.id.clone(),
            ResourceRecord {
                kind: descriptor.kind,
                fingerprint,
                secret,
            },
        );
        ResourceOutcome::Created
    }
}

impl ProvisioningGateway for SimulatedGateway {
    fn apply(
        &self,
        resources: &[ResourceDescriptor],
        grants: &[GrantEdge],
    ) -> Vec<ResourceOutcome> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut outcomes = Vec::with_capacity(resources.len());

        for descriptor in resources {
            let outcome = self.apply_one(&mut state, descriptor, grants);
            match &outcome {
                ResourceOutcome::Failed(reason) => {
                    warn!(resource = %descriptor.id, reason = %reason, "resource failed");
                    outcomes.push(outcome);
                    break;
                }
                _ => {
                    let committed = state.commit_ready(grants);
                    debug!(
                        resource = %descriptor.id,
                        outcome = %outcome,
                        grants_committed = committed,
                        "applied resource"
                    );
                    outcomes.push(outcome);
                }
            }
        }
        outcomes
    }
}

/// SHA-256 over what a backend would have to change on update.
fn config_fingerprint(descriptor: &ResourceDescriptor) -> String {
    let mut hasher = Sha256::new();
    hasher.update(descriptor.kind.label().as_bytes());
    hasher.update(serde_json::to_vec(&descriptor.config).unwrap_or_default());
    hasher.update(serde_json::to_vec(&descriptor.tags).unwrap_or_default());
    hex::encode(hasher.finalize())
}
