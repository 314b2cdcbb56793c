//! Resource descriptors and grant edges — the nodes and authorization
//! edges of an environment topology.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a descriptor, unique within one environment.
pub type ResourceId = String;

/// Opaque per-resource configuration. Ordered so plans serialize the same
/// way on every run.
pub type ResourceConfig = BTreeMap<String, serde_json::Value>;

/// The kind of provisionable unit a descriptor stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    NetworkEndpoint,
    Bucket,
    Database,
    Queue,
    ComputeCluster,
    LogGroup,
    LogStream,
    DeliveryStream,
    LogSubscription,
    Certificate,
    Distribution,
    DnsRecord,
    Secret,
    Role,
}

impl ResourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Network => "network",
            ResourceKind::NetworkEndpoint => "network-endpoint",
            ResourceKind::Bucket => "bucket",
            ResourceKind::Database => "database",
            ResourceKind::Queue => "queue",
            ResourceKind::ComputeCluster => "compute-cluster",
            ResourceKind::LogGroup => "log-group",
            ResourceKind::LogStream => "log-stream",
            ResourceKind::DeliveryStream => "delivery-stream",
            ResourceKind::LogSubscription => "log-subscription",
            ResourceKind::Certificate => "certificate",
            ResourceKind::Distribution => "distribution",
            ResourceKind::DnsRecord => "dns-record",
            ResourceKind::Secret => "secret",
            ResourceKind::Role => "role",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Who a descriptor belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scope {
    /// Shared by the whole environment.
    Environment,
    /// Owned by a single tenant; only ever built for multi-tenant environments.
    Tenant { tenant: String },
}

impl Scope {
    pub fn tenant(&self) -> Option<&str> {
        match self {
            Scope::Environment => None,
            Scope::Tenant { tenant } => Some(tenant),
        }
    }
}

/// Removal policy flag, passed through to the backend unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    #[default]
    Destroy,
    Retain,
    Snapshot,
}

impl RemovalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalPolicy::Destroy => "destroy",
            RemovalPolicy::Retain => "retain",
            RemovalPolicy::Snapshot => "snapshot",
        }
    }
}

/// A single provisionable cloud resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub scope: Scope,
    pub config: ResourceConfig,
    /// Data dependencies: this resource consumes an output of each of these.
    pub depends_on: BTreeSet<ResourceId>,
    /// Ordering-only dependencies: no data flows, but creation must come after.
    pub must_follow: BTreeSet<ResourceId>,
    pub tags: BTreeMap<String, String>,
}

impl ResourceDescriptor {
    pub fn new(id: impl Into<ResourceId>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            scope: Scope::Environment,
            config: ResourceConfig::new(),
            depends_on: BTreeSet::new(),
            must_follow: BTreeSet::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn for_tenant(mut self, tenant: &str) -> Self {
        self.scope = Scope::Tenant { tenant: tenant.to_string() };
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }

    pub fn depends_on(mut self, id: impl Into<ResourceId>) -> Self {
        self.depends_on.insert(id.into());
        self
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }

    /// The role this resource assumes to deliver data, if any.
    pub fn delivery_role(&self) -> Option<&str> {
        self.config_str(DELIVERY_ROLE_KEY)
    }

    /// Union of data and ordering dependencies.
    pub fn predecessors(&self) -> impl Iterator<Item = &ResourceId> {
        self.depends_on.iter().chain(self.must_follow.iter())
    }

    pub fn is_tenant_scoped(&self) -> bool {
        matches!(self.scope, Scope::Tenant { .. })
    }
}

/// Config key naming the role a delivery or subscription resource assumes.
pub const DELIVERY_ROLE_KEY: &str = "delivery_role";

/// Principal id used by grants that apply to any caller.
pub const ANY_PRINCIPAL: &str = "*";

/// Resource id for grants on account-level services with no descriptor,
/// such as outbound email.
pub const ANY_RESOURCE: &str = "*";

/// Permission verbs carried by a grant edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Marks the edge as a denial rather than an allowance.
    Deny,
    Read,
    Write,
    Put,
    Get,
    List,
    Send,
    Receive,
    Consume,
    Connect,
    DataApi,
    PassRole,
    SendEmail,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Deny => "deny",
            Action::Read => "read",
            Action::Write => "write",
            Action::Put => "put",
            Action::Get => "get",
            Action::List => "list",
            Action::Send => "send",
            Action::Receive => "receive",
            Action::Consume => "consume",
            Action::Connect => "connect",
            Action::DataApi => "data_api",
            Action::PassRole => "pass_role",
            Action::SendEmail => "send_email",
        }
    }
}

/// Optional predicate narrowing when a grant applies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GrantCondition {
    /// Applies unless the request arrives through this network endpoint.
    SourceEndpointNot { endpoint: ResourceId },
    /// Applies only when the caller is this principal.
    PrincipalIs { principal: ResourceId },
    /// Applies only to traffic on this port.
    Port { port: u16 },
}

/// An authorization relationship from a principal to a resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GrantEdge {
    pub principal: ResourceId,
    pub resource: ResourceId,
    pub actions: BTreeSet<Action>,
    pub condition: Option<GrantCondition>,
}

impl GrantEdge {
    pub fn allow(principal: &str, resource: &str, actions: &[Action]) -> Self {
        Self {
            principal: principal.to_string(),
            resource: resource.to_string(),
            actions: actions.iter().copied().collect(),
            condition: None,
        }
    }

    /// A denial for any principal, attached directly to `resource`.
    pub fn deny(resource: &str, actions: &[Action]) -> Self {
        let mut actions: BTreeSet<Action> = actions.iter().copied().collect();
        actions.insert(Action::Deny);
        Self {
            principal: ANY_PRINCIPAL.to_string(),
            resource: resource.to_string(),
            actions,
            condition: None,
        }
    }

    pub fn when(mut self, condition: GrantCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn is_deny(&self) -> bool {
        self.actions.contains(&Action::Deny)
    }

    /// Ids this edge refers to that must exist in the topology.
    pub fn referenced_ids(&self) -> Vec<&str> {
        let mut ids = Vec::with_capacity(3);
        if self.principal != ANY_PRINCIPAL {
            ids.push(self.principal.as_str());
        }
        if self.resource != ANY_RESOURCE {
            ids.push(self.resource.as_str());
        }
        match &self.condition {
            Some(GrantCondition::SourceEndpointNot { endpoint }) => ids.push(endpoint.as_str()),
            Some(GrantCondition::PrincipalIs { principal }) => ids.push(principal.as_str()),
            Some(GrantCondition::Port { .. }) | None => {}
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_edges_carry_marker() {
        let edge = GrantEdge::deny("bucket.backend", &[Action::List]);
        assert!(edge.is_deny());
        assert_eq!(edge.principal, ANY_PRINCIPAL);
        assert!(!GrantEdge::allow("a", "b", &[Action::Read]).is_deny());
    }

    #[test]
    fn referenced_ids_skip_any_principal() {
        let edge = GrantEdge::deny("queue", &[Action::Send]).when(GrantCondition::SourceEndpointNot {
            endpoint: "network.sqs-endpoint".to_string(),
        });
        assert_eq!(edge.referenced_ids(), vec!["queue", "network.sqs-endpoint"]);
    }

    #[test]
    fn referenced_ids_skip_any_resource() {
        let edge = GrantEdge::allow("compute-cluster", ANY_RESOURCE, &[Action::SendEmail]).when(
            GrantCondition::PrincipalIs {
                principal: "compute-cluster".to_string(),
            },
        );
        assert_eq!(edge.referenced_ids(), vec!["compute-cluster", "compute-cluster"]);
    }

    #[test]
    fn predecessors_union_both_edge_sets() {
        let mut d = ResourceDescriptor::new("x", ResourceKind::LogSubscription).depends_on("a");
        d.must_follow.insert("b".to_string());
        let preds: Vec<_> = d.predecessors().cloned().collect();
        assert_eq!(preds, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ResourceKind::LogSubscription).unwrap();
        assert_eq!(json, "\"log_subscription\"");
    }
}
