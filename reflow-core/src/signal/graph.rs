//! Central dependency graph.
//!
//! A directed acyclic graph over cells, computed nodes, and effects. Edges
//! point from producer to dependent; each node also keeps its forward
//! dependency set so edges can be replaced wholesale after a recompute
//! (dynamic dependency tracking) and unlinked on removal.
//!
//! Edge sets are insertion-ordered so traversal — and therefore dependent
//! notification order — is deterministic.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexSet;

use super::node::{NodeId, NodeKind};

pub(crate) struct NodeEntry {
    kind: NodeKind,
    dirty: bool,
    dependencies: IndexSet<NodeId>,
    dependents: IndexSet<NodeId>,
}

/// The edge store for one runtime instance.
pub(crate) struct Graph {
    nodes: HashMap<NodeId, NodeEntry>,
}

impl Graph {
    pub(crate) fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    pub(crate) fn add_node(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes.insert(
            id,
            NodeEntry {
                kind,
                // Derived nodes start dirty so the first read computes.
                dirty: !matches!(kind, NodeKind::Cell),
                dependencies: IndexSet::new(),
                dependents: IndexSet::new(),
            },
        );
    }

    /// Remove a node and unlink every edge touching it.
    pub(crate) fn remove_node(&mut self, id: NodeId) {
        if let Some(entry) = self.nodes.remove(&id) {
            for dep_id in &entry.dependencies {
                if let Some(dep) = self.nodes.get_mut(dep_id) {
                    dep.dependents.shift_remove(&id);
                }
            }
            for dependent_id in &entry.dependents {
                if let Some(dependent) = self.nodes.get_mut(dependent_id) {
                    dependent.dependencies.shift_remove(&id);
                }
            }
        }
    }

    pub(crate) fn is_dirty(&self, id: NodeId) -> bool {
        self.nodes.get(&id).map(|entry| entry.dirty).unwrap_or(false)
    }

    pub(crate) fn set_dirty(&mut self, id: NodeId, dirty: bool) {
        if let Some(entry) = self.nodes.get_mut(&id) {
            entry.dirty = dirty;
        }
    }

    /// Kind and dependency snapshot for one node.
    pub(crate) fn node_info(&self, id: NodeId) -> Option<(NodeKind, Vec<NodeId>)> {
        self.nodes
            .get(&id)
            .map(|entry| (entry.kind, entry.dependencies.iter().copied().collect()))
    }

    pub(crate) fn dependent_count(&self, id: NodeId) -> usize {
        self.nodes
            .get(&id)
            .map(|entry| entry.dependents.len())
            .unwrap_or(0)
    }

    /// Replace `reader`'s dependency edges with the set recorded during its
    /// latest evaluation. Stale edges from the previous run are unlinked so
    /// they can no longer cause spurious recomputation.
    pub(crate) fn set_dependencies(&mut self, reader: NodeId, new_deps: IndexSet<NodeId>) {
        let old_deps = match self.nodes.get_mut(&reader) {
            Some(entry) => std::mem::replace(&mut entry.dependencies, new_deps.clone()),
            None => return,
        };

        for removed in old_deps.difference(&new_deps) {
            if let Some(entry) = self.nodes.get_mut(removed) {
                entry.dependents.shift_remove(&reader);
            }
        }
        for added in new_deps.difference(&old_deps) {
            if let Some(entry) = self.nodes.get_mut(added) {
                entry.dependents.insert(reader);
            }
        }
    }

    /// Every node transitively reachable from `root` through dependent
    /// edges, in breadth-first visit order. `root` itself is excluded.
    pub(crate) fn affected_from(&self, root: NodeId) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut out = Vec::new();
        let mut queue = VecDeque::new();

        if let Some(entry) = self.nodes.get(&root) {
            queue.extend(entry.dependents.iter().copied());
        }

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            out.push(id);
            if let Some(entry) = self.nodes.get(&id) {
                queue.extend(entry.dependents.iter().copied());
            }
        }

        out
    }

    /// Topological order of `subset` (dependencies before dependents),
    /// considering only edges inside the subset. Kahn's algorithm.
    pub(crate) fn topo_order(&self, subset: &[NodeId]) -> Vec<NodeId> {
        let members: HashSet<NodeId> = subset.iter().copied().collect();
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        let mut queue = VecDeque::new();
        let mut result = Vec::with_capacity(subset.len());

        for &id in subset {
            if let Some(entry) = self.nodes.get(&id) {
                let degree = entry
                    .dependencies
                    .iter()
                    .filter(|dep| members.contains(dep))
                    .count();
                in_degree.insert(id, degree);
                if degree == 0 {
                    queue.push_back(id);
                }
            }
        }

        while let Some(id) = queue.pop_front() {
            result.push(id);
            if let Some(entry) = self.nodes.get(&id) {
                for dependent in &entry.dependents {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            queue.push_back(*dependent);
                        }
                    }
                }
            }
        }

        result
    }
}
