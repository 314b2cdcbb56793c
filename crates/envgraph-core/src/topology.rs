//! The per-environment graph container: every descriptor and grant of one environment.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{TopologyError, TopologyResult};
use crate::request::EnvironmentName;
use crate::types::{GrantEdge, ResourceDescriptor, ResourceId, ResourceKind};

/// The full graph of resources for one deployment environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentTopology {
    pub environment: EnvironmentName,
    resources: BTreeMap<ResourceId, ResourceDescriptor>,
    grants: BTreeSet<GrantEdge>,
}

impl EnvironmentTopology {
    pub fn new(environment: EnvironmentName) -> Self {
        Self {
            environment,
            resources: BTreeMap::new(),
            grants: BTreeSet::new(),
        }
    }

    /// Add a descriptor. Ids are unique within a topology.
    pub fn insert(&mut self, descriptor: ResourceDescriptor) -> TopologyResult<()> {
        if self.resources.contains_key(&descriptor.id) {
            return Err(TopologyError::DuplicateResource(descriptor.id));
        }
        self.resources.insert(descriptor.id.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ResourceDescriptor> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Descriptors in ascending id order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.values()
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.values().filter(move |d| d.kind == kind)
    }

    /// Distinct tenants owning at least one descriptor.
    pub fn tenants(&self) -> BTreeSet<&str> {
        self.resources
            .values()
            .filter_map(|d| d.scope.tenant())
            .collect()
    }

    pub fn grants(&self) -> impl Iterator<Item = &GrantEdge> {
        self.grants.iter()
    }

    pub fn grant_count(&self) -> usize {
        self.grants.len()
    }

    /// Allow grants held by `principal`.
    pub fn grants_held_by<'a>(&'a self, principal: &'a str) -> impl Iterator<Item = &'a GrantEdge> {
        self.grants
            .iter()
            .filter(move |g| !g.is_deny() && g.principal == principal)
    }

    /// All grants attached to `resource`, allow and deny alike.
    pub fn grants_on<'a>(&'a self, resource: &'a str) -> impl Iterator<Item = &'a GrantEdge> {
        self.grants.iter().filter(move |g| g.resource == resource)
    }

    /// Record a grant. Re-adding an identical edge is a no-op.
    pub fn add_grant(&mut self, grant: GrantEdge) -> bool {
        self.grants.insert(grant)
    }

    /// Record that `follower` must be created after `leader`.
    pub fn add_must_follow(&mut self, follower: &str, leader: &str) -> TopologyResult<bool> {
        if follower == leader {
            return Err(TopologyError::SelfOrdering(follower.to_string()));
        }
        if !self.resources.contains_key(leader) {
            return Err(TopologyError::UnknownResource(leader.to_string()));
        }
        let descriptor = self
            .resources
            .get_mut(follower)
            .ok_or_else(|| TopologyError::UnknownResource(follower.to_string()))?;
        Ok(descriptor.must_follow.insert(leader.to_string()))
    }

    /// Set a tag on every descriptor.
    pub fn tag_all(&mut self, key: &str, value: &str) {
        for descriptor in self.resources.values_mut() {
            descriptor.tags.insert(key.to_string(), value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Action;

    fn topology() -> EnvironmentTopology {
        let mut t = EnvironmentTopology::new(EnvironmentName::Staging);
        t.insert(ResourceDescriptor::new("a", ResourceKind::Network)).unwrap();
        t.insert(ResourceDescriptor::new("b", ResourceKind::Bucket).depends_on("a"))
            .unwrap();
        t
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut t = topology();
        let err = t
            .insert(ResourceDescriptor::new("a", ResourceKind::Queue))
            .unwrap_err();
        assert_eq!(err, TopologyError::DuplicateResource("a".to_string()));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn must_follow_requires_known_ids() {
        let mut t = topology();
        assert!(t.add_must_follow("b", "a").unwrap());
        assert!(!t.add_must_follow("b", "a").unwrap());
        assert!(matches!(
            t.add_must_follow("b", "missing"),
            Err(TopologyError::UnknownResource(_))
        ));
        assert!(matches!(
            t.add_must_follow("a", "a"),
            Err(TopologyError::SelfOrdering(_))
        ));
    }

    #[test]
    fn grants_are_deduplicated() {
        let mut t = topology();
        assert!(t.add_grant(GrantEdge::allow("b", "a", &[Action::Read])));
        assert!(!t.add_grant(GrantEdge::allow("b", "a", &[Action::Read])));
        assert_eq!(t.grant_count(), 1);
        assert_eq!(t.grants_held_by("b").count(), 1);
        assert_eq!(t.grants_on("a").count(), 1);
    }
}
