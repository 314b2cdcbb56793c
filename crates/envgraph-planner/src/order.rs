//! Ordering validator — deterministic build order over the combined
//! `depends_on` and `must_follow` edges.
//!
//! Kahn's algorithm with the ready set kept sorted, so among resources
//! whose predecessors are all placed the lexically smallest id goes first.
//! Before sorting, every edge target and every grant party is checked to
//! exist; a topology either passes completely or nothing is provisioned.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, info};

use envgraph_core::{EnvironmentTopology, ResourceId};

use crate::error::{PlanError, PlanResult};

pub fn order(topology: &EnvironmentTopology) -> PlanResult<Vec<ResourceId>> {
    validate_references(topology)?;

    // Predecessor sets per id; a leader named by both edge kinds counts once.
    let predecessors: BTreeMap<&str, BTreeSet<&str>> = topology
        .resources()
        .map(|d| (d.id.as_str(), d.predecessors().map(String::as_str).collect()))
        .collect();

    let mut successors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (&id, preds) in &predecessors {
        for &pred in preds {
            successors.entry(pred).or_default().push(id);
        }
    }

    let mut remaining: BTreeMap<&str, usize> =
        predecessors.iter().map(|(&id, preds)| (id, preds.len())).collect();
    let mut ready: BTreeSet<&str> = remaining
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut sequence = Vec::with_capacity(predecessors.len());
    while let Some(id) = ready.pop_first() {
        remaining.remove(id);
        sequence.push(id.to_string());
        for &next in successors.get(id).into_iter().flatten() {
            if let Some(count) = remaining.get_mut(next) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(next);
                }
            }
        }
    }

    if !remaining.is_empty() {
        let stuck: BTreeSet<&str> = remaining.keys().copied().collect();
        let cycle = minimal_cycle(&predecessors, &stuck);
        debug!(stuck = stuck.len(), cycle = ?cycle, "ordering failed");
        return Err(PlanError::CycleDetected { cycle });
    }

    info!(
        environment = %topology.environment,
        resources = sequence.len(),
        "computed build order"
    );
    Ok(sequence)
}

fn validate_references(topology: &EnvironmentTopology) -> PlanResult<()> {
    for descriptor in topology.resources() {
        for target in descriptor.predecessors() {
            if !topology.contains(target) {
                return Err(PlanError::MissingDependency {
                    resource: descriptor.id.clone(),
                    target: target.clone(),
                });
            }
        }
    }
    for grant in topology.grants() {
        for party in grant.referenced_ids() {
            if !topology.contains(party) {
                return Err(PlanError::UnknownGrantParty {
                    resource: grant.resource.clone(),
                    party: party.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Shortest cycle among the unsortable ids, following dependency edges.
///
/// Every id left over by Kahn's algorithm lies on or behind a cycle. A
/// breadth-first search from each of them back to itself finds the
/// shortest loop through it; the shortest overall wins, ties going to the
/// lexically smallest start. The cycle is returned without repeating its
/// first id.
fn minimal_cycle(
    predecessors: &BTreeMap<&str, BTreeSet<&str>>,
    stuck: &BTreeSet<&str>,
) -> Vec<String> {
    let mut best: Option<Vec<&str>> = None;

    for &start in stuck {
        let mut parent: BTreeMap<&str, &str> = BTreeMap::new();
        let mut queue = VecDeque::from([start]);
        let mut found = None;

        'search: while let Some(node) = queue.pop_front() {
            for &next in predecessors.get(node).into_iter().flatten() {
                if !stuck.contains(next) {
                    continue;
                }
                if next == start {
                    found = Some(node);
                    break 'search;
                }
                if !parent.contains_key(next) {
                    parent.insert(next, node);
                    queue.push_back(next);
                }
            }
        }

        let Some(last) = found else { continue };
        let mut path = vec![last];
        let mut cursor = last;
        while cursor != start {
            cursor = parent[cursor];
            path.push(cursor);
        }
        path.reverse();

        if best.as_ref().is_none_or(|b| path.len() < b.len()) {
            best = Some(path);
        }
    }

    best.unwrap_or_default()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use envgraph_core::{Action, EnvironmentName, GrantEdge, ResourceDescriptor, ResourceKind};

    /// `(id, "dep1,dep2")` pairs.
    fn topology(edges: &[(&str, &str)]) -> EnvironmentTopology {
        let mut t = EnvironmentTopology::new(EnvironmentName::Staging);
        for (id, deps) in edges {
            let mut d = ResourceDescriptor::new(*id, ResourceKind::Bucket);
            for dep in deps.split(',').filter(|s| !s.is_empty()) {
                d = d.depends_on(dep);
            }
            t.insert(d).unwrap();
        }
        t
    }

    #[test]
    fn ties_break_lexically() {
        let t = topology(&[("c", ""), ("a", ""), ("b", "")]);
        assert_eq!(order(&t).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn dependencies_come_first() {
        let t = topology(&[("a", "z"), ("z", ""), ("m", "a")]);
        assert_eq!(order(&t).unwrap(), vec!["z", "a", "m"]);
    }

    #[test]
    fn must_follow_is_respected() {
        let mut t = topology(&[("a", ""), ("b", "")]);
        t.add_must_follow("a", "b").unwrap();
        assert_eq!(order(&t).unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn mutual_dependency_is_a_cycle() {
        let t = topology(&[("x", "y"), ("y", "x"), ("a", "")]);
        let err = order(&t).unwrap_err();
        assert_eq!(
            err,
            PlanError::CycleDetected {
                cycle: vec!["x".to_string(), "y".to_string()]
            }
        );
    }

    #[test]
    fn reports_the_shortest_cycle() {
        // a -> b -> c -> a and d <-> c; the two-node loop is minimal.
        let t = topology(&[
            ("a", "b"),
            ("b", "c"),
            ("c", "a,d"),
            ("d", "c"),
            ("e", "a"),
        ]);
        let PlanError::CycleDetected { cycle } = order(&t).unwrap_err() else {
            panic!("expected a cycle");
        };
        assert_eq!(cycle, vec!["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let t = topology(&[("a", "a")]);
        assert_eq!(
            order(&t).unwrap_err(),
            PlanError::CycleDetected { cycle: vec!["a".to_string()] }
        );
    }

    #[test]
    fn missing_dependency_fails_before_sorting() {
        let t = topology(&[("a", "ghost")]);
        assert_eq!(
            order(&t).unwrap_err(),
            PlanError::MissingDependency {
                resource: "a".to_string(),
                target: "ghost".to_string()
            }
        );
    }

    #[test]
    fn unknown_grant_party_fails() {
        let mut t = topology(&[("a", "")]);
        t.add_grant(GrantEdge::allow("nobody", "a", &[Action::Read]));
        assert!(matches!(
            order(&t).unwrap_err(),
            PlanError::UnknownGrantParty { .. }
        ));
    }
}
