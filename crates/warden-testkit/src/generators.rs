//! Proptest generators for property-based testing.

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;
use proptest::sample::Index;

use warden_core::{Permission, PermissionRegistry, Result};

/// Module name used for generated permissions.
pub const GENERATED_MODULE: &str = "generated";

/// ID of the `i`th generated permission.
pub fn node_id(i: usize) -> String {
    format!("gen.p{i}")
}

/// Generate a syntactically plausible permission ID.
pub fn permission_id() -> impl Strategy<Value = String> {
    "[a-z]{1,8}\\.[a-z]{1,8}".prop_map(String::from)
}

/// A generated set of permission definitions.
#[derive(Debug, Clone)]
pub struct PermissionGraph {
    pub permissions: Vec<Permission>,
}

impl PermissionGraph {
    pub fn ids(&self) -> Vec<String> {
        self.permissions.iter().map(|p| p.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Permission> {
        self.permissions.iter().find(|p| p.id == id)
    }

    /// Register every permission in a fresh registry.
    pub fn registry(&self) -> Result<PermissionRegistry> {
        let registry = PermissionRegistry::new();
        registry.register_all(self.permissions.iter().cloned())?;
        Ok(registry)
    }

    /// Reference closure over `depends_on`, excluding `id` unless it lies on
    /// a cycle through itself.
    pub fn reachable_dependencies(&self, id: &str) -> BTreeSet<String> {
        self.reachable(id, |p| &p.depends_on)
    }

    /// Reference closure over `implies`, including the starting IDs.
    pub fn reachable_implied(&self, ids: &[String]) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = ids.iter().cloned().collect();
        for id in ids {
            out.extend(self.reachable(id, |p| &p.implies));
        }
        out
    }

    fn reachable<F>(&self, id: &str, edges: F) -> BTreeSet<String>
    where
        F: Fn(&Permission) -> &Vec<String>,
    {
        let mut seen = BTreeSet::new();
        let mut pending = vec![id.to_string()];
        while let Some(current) = pending.pop() {
            let Some(permission) = self.get(&current) else {
                continue;
            };
            for next in edges(permission) {
                if seen.insert(next.clone()) {
                    pending.push(next.clone());
                }
            }
        }
        seen
    }
}

/// Build permissions from per-node edge picks.
///
/// Dependencies always point at lower-numbered nodes, so the dependency
/// graph is acyclic. Implications may point anywhere except at the node
/// itself, so implication cycles do occur.
fn build(n: usize, picks: Vec<(Vec<Index>, Vec<Index>)>) -> PermissionGraph {
    let permissions = picks
        .into_iter()
        .enumerate()
        .map(|(i, (deps, implies))| {
            let deps: Vec<String> = if i == 0 {
                Vec::new()
            } else {
                deps.iter().map(|idx| node_id(idx.index(i))).collect()
            };
            let implies: Vec<String> = implies
                .iter()
                .map(|idx| idx.index(n))
                .filter(|&j| j != i)
                .map(node_id)
                .collect();

            Permission::new(node_id(i), GENERATED_MODULE)
                .depends_on(deps)
                .implies(implies)
        })
        .collect();

    PermissionGraph { permissions }
}

/// Generate a graph of up to `max_nodes` permissions with acyclic
/// dependencies and arbitrary implications.
pub fn acyclic_graph(max_nodes: usize) -> impl Strategy<Value = PermissionGraph> {
    (1..=max_nodes.max(1)).prop_flat_map(|n| {
        prop::collection::vec(
            (
                prop::collection::vec(any::<Index>(), 0..4),
                prop::collection::vec(any::<Index>(), 0..3),
            ),
            n,
        )
        .prop_map(move |picks| build(n, picks))
    })
}

/// Generate a dependency ring of 2 to `max_len` permissions:
/// `p1 -> p0`, `p2 -> p1`, ..., and `p0 -> p(n-1)`.
pub fn dependency_cycle(max_len: usize) -> impl Strategy<Value = PermissionGraph> {
    (2..=max_len.max(2)).prop_map(|n| {
        let permissions = (0..n)
            .map(|i| {
                let dep = if i == 0 { n - 1 } else { i - 1 };
                Permission::new(node_id(i), GENERATED_MODULE).depends_on([node_id(dep)])
            })
            .collect();
        PermissionGraph { permissions }
    })
}

/// Generate a subset of the graph's IDs to act as a grant set.
pub fn grant_subset(graph: &PermissionGraph) -> impl Strategy<Value = Vec<String>> {
    let ids = graph.ids();
    prop::sample::subsequence(ids.clone(), 0..=ids.len())
}

/// Whether `set` is closed under the given edges for every member.
pub fn is_closed<F>(graph: &PermissionGraph, set: &HashSet<String>, edges: F) -> bool
where
    F: Fn(&Permission) -> &Vec<String>,
{
    set.iter().all(|id| {
        graph
            .get(id)
            .map_or(true, |p| edges(p).iter().all(|e| set.contains(e)))
    })
}
