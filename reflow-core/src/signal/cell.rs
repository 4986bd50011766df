//! Cell: the mutable root of a signal graph.
//!
//! A cell holds a value and an equality function. Writing an equal value is
//! a no-op: no dependent recomputes, no effect reruns. Writing a different
//! value triggers one glitch-free propagation pass over the dependents.
//!
//! Handles are cheap clones sharing the same underlying state; the node is
//! unlinked from its graph when the last handle drops.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::combinators::Readable;

use super::node::{NodeId, NodeKind};
use super::runtime::RuntimeInner;
use super::scope::Scope;

type EqFn<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// A mutable reactive value. Created through `Runtime::cell` /
/// `Runtime::cell_with`.
pub struct Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<CellInner<T>>,
}

struct CellInner<T> {
    id: NodeId,
    rt: Arc<RuntimeInner>,
    value: RwLock<T>,
    eq: EqFn<T>,
}

impl<T> Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn register(rt: Arc<RuntimeInner>, value: T, eq: EqFn<T>) -> Self {
        let id = NodeId::fresh();
        rt.add_node(id, NodeKind::Cell);
        Self {
            inner: Arc::new(CellInner {
                id,
                rt,
                value: RwLock::new(value),
                eq,
            }),
        }
    }

    /// This cell's node identity.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Read the current value without registering a dependency. Tracked
    /// reads go through [`Scope::get`].
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Write a new value and propagate to dependents.
    ///
    /// A write that is equal to the current value under the cell's equality
    /// function changes nothing and notifies nobody.
    pub fn set(&self, value: T) {
        let changed = {
            let mut guard = self.inner.value.write();
            if (self.inner.eq)(&guard, &value) {
                false
            } else {
                *guard = value;
                true
            }
        };
        if !changed {
            tracing::trace!(cell = self.inner.id.raw(), "write suppressed by equality");
            return;
        }
        self.inner.rt.propagate(self.inner.id);
    }

    /// Derive the new value from the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.inner.value.read();
            f(&guard)
        };
        self.set(new_value);
    }

    /// Number of nodes currently depending on this cell.
    pub fn dependent_count(&self) -> usize {
        self.inner.rt.dependent_count(self.inner.id)
    }
}

impl<T> Readable<T> for Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn node_id(&self) -> NodeId {
        self.inner.id
    }

    fn read_untracked(&self) -> T {
        self.get()
    }

    fn read(&self, scope: &Scope) -> T {
        scope.record(self.inner.id);
        self.get()
    }
}

impl<T> Clone for Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Cell<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.inner.id)
            .field("value", &self.get())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

impl<T> Drop for CellInner<T> {
    fn drop(&mut self) {
        self.rt.remove_node(self.id);
    }
}
