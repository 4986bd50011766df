//! Node identities for the dependency graph.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a node in a dependency graph.
///
/// Ids are unique across graph instances, so a node can be named in error
/// reports without saying which runtime it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub(crate) fn fresh() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A mutable root. No dependencies, only dependents.
    Cell,

    /// A memoized derived node. Has dependencies and may have dependents.
    Computed,

    /// A side-effecting leaf. Has dependencies, never dependents.
    Effect,
}
