//! Signal runtime.
//!
//! One [`Runtime`] instance owns one reactive graph: the edge store, the
//! registry of derived nodes, the cycle guard, and the queue of writes that
//! arrive while a pass is running. All mutation entry points serialize
//! through this instance, so the glitch-free and delivery-order guarantees
//! hold even when handles are shared across threads.
//!
//! # Propagation
//!
//! A cell write collects the transitive dependent closure, orders it
//! topologically, and finalizes nodes in dependency order. A node
//! recomputes only when at least one of its dependencies changed in this
//! pass, so a computed that re-evaluates to an equal value prunes everything
//! below it. Effects are deferred to the end of the pass and run exactly
//! once each, after every value they can observe has been finalized. Writes
//! issued by an effect are queued and drained as follow-up passes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::combinators::{Readable, Transform};
use crate::error::ReactiveError;

use super::cell::Cell;
use super::computed::Computed;
use super::effect::Effect;
use super::graph::Graph;
use super::node::{NodeId, NodeKind};
use super::scope::Scope;

/// A node the runtime can ask to re-evaluate itself.
///
/// `refresh` returns whether the node's value changed; effects always
/// report `false` since nothing depends on them.
pub(crate) trait AnyNode: Send + Sync {
    fn refresh(&self) -> Result<bool, ReactiveError>;
}

/// Handle to a reactive graph instance.
///
/// Cheap to clone; all clones share the same graph.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

pub(crate) struct RuntimeInner {
    graph: Mutex<Graph>,
    registry: Mutex<HashMap<NodeId, Weak<dyn AnyNode>>>,
    /// Nodes currently mid-evaluation; re-entry is a cycle.
    computing: Mutex<HashSet<NodeId>>,
    in_pass: AtomicBool,
    pending: Mutex<VecDeque<NodeId>>,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                graph: Mutex::new(Graph::new()),
                registry: Mutex::new(HashMap::new()),
                computing: Mutex::new(HashSet::new()),
                in_pass: AtomicBool::new(false),
                pending: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Create a cell using `PartialEq` as its equality function.
    pub fn cell<T>(&self, value: T) -> Cell<T>
    where
        T: Clone + Send + Sync + PartialEq + 'static,
    {
        self.cell_with(value, |a: &T, b: &T| a == b)
    }

    /// Create a cell with a custom equality function. A write whose new
    /// value is equal to the current one under this function propagates
    /// nothing.
    pub fn cell_with<T, E>(&self, value: T, eq: E) -> Cell<T>
    where
        T: Clone + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Cell::register(self.inner.clone(), value, Box::new(eq))
    }

    /// Create a memoized derived node. The computation does not run until
    /// the first read.
    pub fn computed<T, F>(&self, compute: F) -> Computed<T>
    where
        T: Clone + Send + Sync + PartialEq + 'static,
        F: Fn(&Scope) -> T + Send + Sync + 'static,
    {
        Computed::register(self.inner.clone(), Box::new(compute))
    }

    /// Create an effect. The action runs once immediately to establish its
    /// dependency set, then once per pass in which a transitive dependency
    /// changed.
    pub fn effect<F>(&self, action: F) -> Effect
    where
        F: Fn(&Scope) + Send + Sync + 'static,
    {
        Effect::register(self.inner.clone(), Box::new(action))
    }

    /// Derive a computed node from `source` through a shared [`Transform`]
    /// stage. Dropped values (and failed stages, which are logged) read as
    /// `None`.
    pub fn derive<T, U, R, S>(&self, source: &R, stage: S) -> Computed<Option<U>>
    where
        T: Clone + Send + Sync + 'static,
        U: Clone + Send + Sync + PartialEq + 'static,
        R: Readable<T> + Clone + Send + Sync + 'static,
        S: Transform<T, U> + Send + 'static,
    {
        let source = source.clone();
        let stage = Mutex::new(stage);
        self.computed(move |scope| match stage.lock().apply(scope.get(&source)) {
            Ok(out) => out,
            Err(err) => {
                tracing::warn!(%err, "derive stage failed; holding None");
                None
            }
        })
    }

    /// Pull-side combine-latest: a computed over the current values of all
    /// sources, in source-list order. Cells always hold a value, so the
    /// combination is ready from the start.
    pub fn combine<T, R>(&self, sources: Vec<R>) -> Computed<Vec<T>>
    where
        T: Clone + Send + Sync + PartialEq + 'static,
        R: Readable<T> + Send + Sync + 'static,
    {
        self.computed(move |scope| sources.iter().map(|source| scope.get(source)).collect())
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the node from the computing set when an evaluation finishes,
/// whether it succeeded or unwound.
pub(crate) struct EvalGuard {
    rt: Arc<RuntimeInner>,
    id: NodeId,
}

impl Drop for EvalGuard {
    fn drop(&mut self) {
        self.rt.computing.lock().remove(&self.id);
    }
}

impl RuntimeInner {
    pub(crate) fn add_node(&self, id: NodeId, kind: NodeKind) {
        self.graph.lock().add_node(id, kind);
    }

    pub(crate) fn register_node(&self, id: NodeId, node: Weak<dyn AnyNode>) {
        self.registry.lock().insert(id, node);
    }

    pub(crate) fn remove_node(&self, id: NodeId) {
        self.graph.lock().remove_node(id);
        self.registry.lock().remove(&id);
    }

    pub(crate) fn is_dirty(&self, id: NodeId) -> bool {
        self.graph.lock().is_dirty(id)
    }

    pub(crate) fn mark_clean(&self, id: NodeId) {
        self.graph.lock().set_dirty(id, false);
    }

    pub(crate) fn dependent_count(&self, id: NodeId) -> usize {
        self.graph.lock().dependent_count(id)
    }

    /// Replace `reader`'s edges with the reads recorded during its latest
    /// evaluation.
    pub(crate) fn replace_dependencies(&self, reader: NodeId, reads: SmallVec<[NodeId; 8]>) {
        let deps: IndexSet<NodeId> = reads.into_iter().collect();
        self.graph.lock().set_dependencies(reader, deps);
    }

    /// Enter an evaluation of `id`, failing if it is already mid-evaluation.
    pub(crate) fn enter_eval(self: &Arc<Self>, id: NodeId) -> Result<EvalGuard, ReactiveError> {
        if !self.computing.lock().insert(id) {
            return Err(ReactiveError::CyclicDependency { node: id });
        }
        Ok(EvalGuard {
            rt: self.clone(),
            id,
        })
    }

    /// Run (or queue) a propagation pass rooted at a changed cell.
    pub(crate) fn propagate(self: &Arc<Self>, root: NodeId) {
        self.pending.lock().push_back(root);
        if self.in_pass.swap(true, Ordering::SeqCst) {
            // A pass is already draining the queue; it will pick this up.
            return;
        }
        loop {
            loop {
                // Pop in its own statement: holding the queue lock across
                // `run_pass` would deadlock a write issued by an effect.
                let next = self.pending.lock().pop_front();
                match next {
                    Some(id) => self.run_pass(id),
                    None => break,
                }
            }
            self.in_pass.store(false, Ordering::SeqCst);
            // A writer may have enqueued between the last pop and the store.
            if self.pending.lock().is_empty() || self.in_pass.swap(true, Ordering::SeqCst) {
                break;
            }
        }
    }

    fn run_pass(self: &Arc<Self>, root: NodeId) {
        let order = {
            let graph = self.graph.lock();
            let affected = graph.affected_from(root);
            graph.topo_order(&affected)
        };
        if order.is_empty() {
            return;
        }
        tracing::debug!(root = root.raw(), nodes = order.len(), "propagation pass");

        let mut changed: HashSet<NodeId> = HashSet::from([root]);
        let mut failed: HashSet<NodeId> = HashSet::new();
        let mut deferred_effects: SmallVec<[NodeId; 4]> = SmallVec::new();

        for id in order {
            let Some((kind, deps)) = self.graph.lock().node_info(id) else {
                continue;
            };
            if deps.iter().any(|dep| failed.contains(dep)) {
                // Work reachable from a cycle stays dirty for this pass.
                self.graph.lock().set_dirty(id, true);
                failed.insert(id);
                continue;
            }
            if !deps.iter().any(|dep| changed.contains(dep)) {
                continue;
            }
            match kind {
                NodeKind::Effect => deferred_effects.push(id),
                NodeKind::Computed => {
                    self.graph.lock().set_dirty(id, true);
                    let Some(node) = self.upgrade(id) else {
                        continue;
                    };
                    match node.refresh() {
                        Ok(true) => {
                            changed.insert(id);
                        }
                        Ok(false) => {
                            tracing::trace!(node = id.raw(), "equal value; pruning dependents");
                        }
                        Err(err) => {
                            tracing::error!(%err, node = id.raw(), "computation aborted");
                            failed.insert(id);
                        }
                    }
                }
                NodeKind::Cell => {}
            }
        }

        for id in deferred_effects {
            let Some(node) = self.upgrade(id) else {
                continue;
            };
            if let Err(err) = node.refresh() {
                tracing::error!(%err, node = id.raw(), "effect aborted");
            }
        }
    }

    fn upgrade(&self, id: NodeId) -> Option<Arc<dyn AnyNode>> {
        self.registry.lock().get(&id).and_then(Weak::upgrade)
    }
}
